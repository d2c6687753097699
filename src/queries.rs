//! Cached queries and write-through mutations over a [`ScanBackend`].
//!
//! Queries resolve through the session's [`QueryCache`](crate::cache::QueryCache).
//! Mutations call the remote side first and only touch the cache by
//! invalidating the identities they affect; every mutation outcome is
//! reported to the [`Notifier`].

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::backend::ScanBackend;
use crate::cache::{CachedValue, QueryFamily, QueryKey, Settled};
use crate::error::{AnalysisFailure, BackendError, BackendResult, MutationError};
use crate::models::{CtScan, ExternalApiConfig, ScanId, UserProfile, UserRole};
use crate::notify::{messages, Notice, Notifier};
use crate::session::Session;
use crate::telemetry::mask_patient_id;
use crate::validation;

/// State of a query as seen by a consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome<T> {
    /// Precondition not met; nothing was attempted.
    Disabled,
    /// A fail-fast identity was rejected.
    Failed { message: String },
    Ready(T),
}

impl<T> QueryOutcome<T> {
    pub fn is_fetched(&self) -> bool {
        matches!(self, QueryOutcome::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            QueryOutcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn resolved_or(self, default: T) -> T {
        self.ready().unwrap_or(default)
    }
}

/// Where a signed-in caller should land.
#[derive(Debug, Clone, PartialEq)]
pub enum Landing {
    /// Client or profile not resolved yet.
    Loading,
    /// Profile lookup was rejected.
    Unresolved { message: String },
    /// No profile saved yet; onboarding comes first.
    NeedsProfile,
    Ready(UserProfile),
}

pub struct Dashboard {
    session: Session,
    notifier: Arc<dyn Notifier>,
}

impl Dashboard {
    pub fn new(session: Session, notifier: Arc<dyn Notifier>) -> Self {
        Self { session, notifier }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    async fn run_query<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
        extract: fn(CachedValue) -> Option<T>,
    ) -> QueryOutcome<T>
    where
        F: FnOnce(Arc<dyn ScanBackend>) -> Fut,
        Fut: Future<Output = Settled>,
    {
        let Some(backend) = self.session.backend().await else {
            debug!("Query {} disabled: client not ready", key);
            return QueryOutcome::Disabled;
        };

        match self.session.cache().fetch(key, || fetch(backend)).await {
            Settled::Value(value) => match extract(value) {
                Some(value) => QueryOutcome::Ready(value),
                None => QueryOutcome::Failed {
                    message: format!("Unexpected cached value for {}", key),
                },
            },
            Settled::Failed(message) => QueryOutcome::Failed { message },
        }
    }

    // Queries

    /// Fail-fast: a rejection is reported, not replaced by a default.
    pub async fn current_user_profile(&self) -> QueryOutcome<Option<UserProfile>> {
        self.run_query(
            QueryKey::CurrentUserProfile,
            |backend| async move {
                match backend.get_caller_user_profile().await {
                    Ok(profile) => Settled::Value(CachedValue::Profile(profile)),
                    Err(err) => {
                        warn!("Failed to fetch caller profile: {}", err);
                        Settled::Failed(err.to_string())
                    }
                }
            },
            |value| match value {
                CachedValue::Profile(profile) => Some(profile),
                _ => None,
            },
        )
        .await
    }

    pub async fn all_scans(&self) -> QueryOutcome<Vec<CtScan>> {
        self.run_query(
            QueryKey::AllScans,
            |backend| async move {
                let scans = degrade(QueryKey::AllScans, backend.get_all_scans().await, Vec::new());
                Settled::Value(CachedValue::Scans(scans))
            },
            |value| match value {
                CachedValue::Scans(scans) => Some(scans),
                _ => None,
            },
        )
        .await
    }

    /// Disabled while no scan is selected.
    pub async fn scan(&self, id: Option<ScanId>) -> QueryOutcome<Option<CtScan>> {
        let Some(id) = id else {
            return QueryOutcome::Disabled;
        };
        let key = QueryKey::Scan(id);

        self.run_query(
            key,
            move |backend| async move {
                let scan = degrade(key, backend.read_scan(id).await.map(Some), None);
                Settled::Value(CachedValue::Scan(scan))
            },
            |value| match value {
                CachedValue::Scan(scan) => Some(scan),
                _ => None,
            },
        )
        .await
    }

    /// `Ready(None)` covers both "not configured" and "not allowed to see it".
    pub async fn external_api_config(&self) -> QueryOutcome<Option<ExternalApiConfig>> {
        self.run_query(
            QueryKey::ExternalApiConfig,
            |backend| async move {
                let config = degrade(
                    QueryKey::ExternalApiConfig,
                    backend.get_external_api_config().await,
                    None,
                );
                Settled::Value(CachedValue::ApiConfig(config))
            },
            |value| match value {
                CachedValue::ApiConfig(config) => Some(config),
                _ => None,
            },
        )
        .await
    }

    /// Fail-closed: any rejection resolves to `false`.
    pub async fn is_caller_admin(&self) -> QueryOutcome<bool> {
        self.run_query(
            QueryKey::IsCallerAdmin,
            |backend| async move {
                let admin = degrade(QueryKey::IsCallerAdmin, backend.is_caller_admin().await, false);
                Settled::Value(CachedValue::Flag(admin))
            },
            |value| match value {
                CachedValue::Flag(admin) => Some(admin),
                _ => None,
            },
        )
        .await
    }

    pub async fn caller_role(&self) -> QueryOutcome<UserRole> {
        self.run_query(
            QueryKey::CallerRole,
            |backend| async move {
                let role = degrade(
                    QueryKey::CallerRole,
                    backend.get_caller_user_role().await,
                    UserRole::Guest,
                );
                Settled::Value(CachedValue::Role(role))
            },
            |value| match value {
                CachedValue::Role(role) => Some(role),
                _ => None,
            },
        )
        .await
    }

    // Derived gates

    /// Analysis is only offered once both API settings are known to be filled in.
    pub async fn can_analyze(&self) -> bool {
        matches!(
            self.external_api_config().await,
            QueryOutcome::Ready(Some(config)) if config.is_complete()
        )
    }

    pub async fn show_admin_controls(&self) -> bool {
        matches!(self.is_caller_admin().await, QueryOutcome::Ready(true))
    }

    pub async fn landing(&self) -> Landing {
        match self.current_user_profile().await {
            QueryOutcome::Disabled => Landing::Loading,
            QueryOutcome::Failed { message } => Landing::Unresolved { message },
            QueryOutcome::Ready(None) => Landing::NeedsProfile,
            QueryOutcome::Ready(Some(profile)) => Landing::Ready(profile),
        }
    }

    // Mutations

    async fn require_backend(&self) -> Result<Arc<dyn ScanBackend>, MutationError> {
        self.session
            .backend()
            .await
            .ok_or(MutationError::Backend(BackendError::Unavailable))
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), MutationError> {
        let outcome = async {
            let profile = validation::profile(profile)?;
            let backend = self.require_backend().await?;
            info!("Saving caller profile");
            backend.save_caller_user_profile(&profile).await?;
            Ok::<(), MutationError>(())
        }
        .await;

        match outcome {
            Ok(()) => {
                self.session
                    .cache()
                    .invalidate(QueryKey::CurrentUserProfile)
                    .await;
                self.notify(Notice::success(messages::PROFILE_SAVED));
                Ok(())
            }
            Err(err) => {
                error!("Failed to save profile: {}", err);
                self.notify(Notice::error(messages::failure(messages::PROFILE_FAILED, &err)));
                Err(err)
            }
        }
    }

    pub async fn upload_scan(
        &self,
        patient_id: &str,
        scan_image: &[u8],
    ) -> Result<ScanId, MutationError> {
        let outcome = async {
            let patient_id = validation::upload(patient_id, scan_image)?;
            let backend = self.require_backend().await?;
            info!(
                "Uploading scan for patient {} ({} bytes)",
                mask_patient_id(&patient_id),
                scan_image.len()
            );
            let id = backend.upload_scan(&patient_id, scan_image).await?;
            Ok::<ScanId, MutationError>(id)
        }
        .await;

        match outcome {
            Ok(id) => {
                info!("Scan uploaded: {}", id);
                self.session.cache().invalidate(QueryKey::AllScans).await;
                self.notify(Notice::success(messages::SCAN_UPLOADED));
                Ok(id)
            }
            Err(err) => {
                error!("Failed to upload scan: {}", err);
                self.notify(Notice::error(messages::failure(messages::UPLOAD_FAILED, &err)));
                Err(err)
            }
        }
    }

    pub async fn analyze_scan(&self, id: ScanId) -> Result<ScanId, MutationError> {
        let outcome = async {
            let backend = self.require_backend().await?;
            info!("Requesting analysis of scan {}", id);
            let analyzed = backend.analyze_scan(id).await?;
            Ok::<ScanId, MutationError>(analyzed)
        }
        .await;

        match outcome {
            Ok(analyzed) => {
                let cache = self.session.cache();
                cache.invalidate(QueryKey::AllScans).await;
                cache.invalidate_family(QueryFamily::Scan).await;
                self.notify(Notice::success(messages::ANALYSIS_COMPLETED));
                Ok(analyzed)
            }
            Err(err) => {
                error!("Analysis of scan {} failed: {}", id, err);
                let failure = AnalysisFailure::classify(&err.to_string());
                self.notify(Notice::error(failure.user_message()));
                Err(err)
            }
        }
    }

    pub async fn configure_external_api(
        &self,
        config: &ExternalApiConfig,
    ) -> Result<(), MutationError> {
        let outcome = async {
            let config = validation::api_config(config)?;
            let backend = self.require_backend().await?;
            info!("Saving external API configuration for {}", config.endpoint_url);
            backend.configure_external_api(&config).await?;
            Ok::<(), MutationError>(())
        }
        .await;

        match outcome {
            Ok(()) => {
                self.session
                    .cache()
                    .invalidate(QueryKey::ExternalApiConfig)
                    .await;
                self.notify(Notice::success(messages::CONFIG_SAVED));
                Ok(())
            }
            Err(err) => {
                error!("Failed to save external API configuration: {}", err);
                self.notify(Notice::error(messages::failure(messages::CONFIG_FAILED, &err)));
                Err(err)
            }
        }
    }
}

fn degrade<T>(key: QueryKey, result: BackendResult<T>, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            if err.is_authorization() {
                debug!("Query {} refused for caller: {}", key, err);
            } else {
                warn!("Query {} failed, using default: {}", key, err);
            }
            default
        }
    }
}
