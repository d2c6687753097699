//! Remote procedure client contract.
//!
//! Every operation is a single request/response. Implementations report
//! remote-side refusals as [`BackendError::Rejected`] with the message text
//! unchanged, because callers classify some failures by that text.

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::models::{CtScan, ExternalApiConfig, ScanId, UserProfile, UserRole};

#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// `getCallerUserProfile`. `None` means the caller has not onboarded yet.
    async fn get_caller_user_profile(&self) -> BackendResult<Option<UserProfile>>;

    /// `saveCallerUserProfile`
    async fn save_caller_user_profile(&self, profile: &UserProfile) -> BackendResult<()>;

    /// `getAllScans`
    async fn get_all_scans(&self) -> BackendResult<Vec<CtScan>>;

    /// `readScan`. Fails for an unknown id.
    async fn read_scan(&self, id: ScanId) -> BackendResult<CtScan>;

    /// `uploadScan`. Returns the remotely assigned id.
    async fn upload_scan(&self, patient_id: &str, scan_image: &[u8]) -> BackendResult<ScanId>;

    /// `analyzeScan`. Fails with a message when the external API is not configured.
    async fn analyze_scan(&self, id: ScanId) -> BackendResult<ScanId>;

    /// `getExternalApiConfig`. Admin only.
    async fn get_external_api_config(&self) -> BackendResult<Option<ExternalApiConfig>>;

    /// `configureExternalApi`. Admin only.
    async fn configure_external_api(&self, config: &ExternalApiConfig) -> BackendResult<()>;

    /// `isCallerAdmin`
    async fn is_caller_admin(&self) -> BackendResult<bool>;

    /// `getCallerUserRole`
    async fn get_caller_user_role(&self) -> BackendResult<UserRole>;
}
