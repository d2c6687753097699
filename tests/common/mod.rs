#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ct_scan_dashboard::{
    BackendError, BackendResult, CtScan, Dashboard, ExternalApiConfig, NoticeLog, ScanBackend,
    ScanId, Session, TumorDetectionResult, TumorStage, UserProfile, UserRole,
};

/// Remote call as observed by the mock, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetCallerUserProfile,
    SaveCallerUserProfile(UserProfile),
    GetAllScans,
    ReadScan(ScanId),
    UploadScan(String, Vec<u8>),
    AnalyzeScan(ScanId),
    GetExternalApiConfig,
    ConfigureExternalApi(ExternalApiConfig),
    IsCallerAdmin,
    GetCallerUserRole,
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::GetCallerUserProfile => "getCallerUserProfile",
            Call::SaveCallerUserProfile(_) => "saveCallerUserProfile",
            Call::GetAllScans => "getAllScans",
            Call::ReadScan(_) => "readScan",
            Call::UploadScan(..) => "uploadScan",
            Call::AnalyzeScan(_) => "analyzeScan",
            Call::GetExternalApiConfig => "getExternalApiConfig",
            Call::ConfigureExternalApi(_) => "configureExternalApi",
            Call::IsCallerAdmin => "isCallerAdmin",
            Call::GetCallerUserRole => "getCallerUserRole",
        }
    }
}

struct MockState {
    profile: Option<UserProfile>,
    scans: Vec<CtScan>,
    config: Option<ExternalApiConfig>,
    admin: bool,
    next_id: ScanId,
    failures: HashMap<&'static str, BackendError>,
}

/// In-memory remote side that records every call and answers after a short delay.
pub struct MockBackend {
    state: Mutex<MockState>,
    calls: Mutex<Vec<Call>>,
    delay: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                profile: None,
                scans: Vec::new(),
                config: None,
                admin: false,
                next_id: 1,
                failures: HashMap::new(),
            }),
            calls: Mutex::new(Vec::new()),
            delay: Duration::from_millis(10),
        }
    }

    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.state.lock().unwrap().profile = Some(profile);
        self
    }

    pub fn with_scan(self, id: ScanId, patient_id: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.scans.push(CtScan {
                id,
                patient_id: patient_id.to_string(),
                scan_image: vec![0xff, 0xd8, 0xff, 0xe0],
                analysis_result: None,
            });
            state.next_id = state.next_id.max(id + 1);
        }
        self
    }

    pub fn with_config(self, config: ExternalApiConfig) -> Self {
        self.state.lock().unwrap().config = Some(config);
        self
    }

    pub fn as_admin(self) -> Self {
        self.state.lock().unwrap().admin = true;
        self
    }

    /// Make every call to `operation` reject with `error`.
    pub fn fail(&self, operation: &'static str, error: BackendError) {
        self.state.lock().unwrap().failures.insert(operation, error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.name() == operation)
            .count()
    }

    async fn record(&self, call: Call) -> BackendResult<()> {
        let name = call.name();
        self.calls.lock().unwrap().push(call);
        tokio::time::sleep(self.delay).await;
        match self.state.lock().unwrap().failures.get(name) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require_admin(&self) -> BackendResult<()> {
        if self.state.lock().unwrap().admin {
            Ok(())
        } else {
            Err(BackendError::Unauthorized {
                message: "Only admins can access the external API configuration".to_string(),
            })
        }
    }
}

#[async_trait]
impl ScanBackend for MockBackend {
    async fn get_caller_user_profile(&self) -> BackendResult<Option<UserProfile>> {
        self.record(Call::GetCallerUserProfile).await?;
        Ok(self.state.lock().unwrap().profile.clone())
    }

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> BackendResult<()> {
        self.record(Call::SaveCallerUserProfile(profile.clone()))
            .await?;
        self.state.lock().unwrap().profile = Some(profile.clone());
        Ok(())
    }

    async fn get_all_scans(&self) -> BackendResult<Vec<CtScan>> {
        self.record(Call::GetAllScans).await?;
        Ok(self.state.lock().unwrap().scans.clone())
    }

    async fn read_scan(&self, id: ScanId) -> BackendResult<CtScan> {
        self.record(Call::ReadScan(id)).await?;
        self.state
            .lock()
            .unwrap()
            .scans
            .iter()
            .find(|scan| scan.id == id)
            .cloned()
            .ok_or_else(|| BackendError::rejected(format!("Scan not found: {}", id)))
    }

    async fn upload_scan(&self, patient_id: &str, scan_image: &[u8]) -> BackendResult<ScanId> {
        self.record(Call::UploadScan(patient_id.to_string(), scan_image.to_vec()))
            .await?;
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.scans.push(CtScan {
            id,
            patient_id: patient_id.to_string(),
            scan_image: scan_image.to_vec(),
            analysis_result: None,
        });
        Ok(id)
    }

    async fn analyze_scan(&self, id: ScanId) -> BackendResult<ScanId> {
        self.record(Call::AnalyzeScan(id)).await?;
        let mut state = self.state.lock().unwrap();
        match &state.config {
            None => return Err(BackendError::rejected("API endpoint not configured")),
            Some(config) if config.api_key.is_empty() => {
                return Err(BackendError::rejected("API key not configured"))
            }
            Some(_) => {}
        }
        let scan = state
            .scans
            .iter_mut()
            .find(|scan| scan.id == id)
            .ok_or_else(|| BackendError::rejected(format!("Scan not found: {}", id)))?;
        scan.analysis_result = Some(TumorDetectionResult {
            probability: 0.87,
            tumor_found: true,
            mask_image: vec![0x89, b'P', b'N', b'G'],
            stage: TumorStage::Stage2,
            confidence: 0.92,
        });
        Ok(id)
    }

    async fn get_external_api_config(&self) -> BackendResult<Option<ExternalApiConfig>> {
        self.record(Call::GetExternalApiConfig).await?;
        self.require_admin()?;
        Ok(self.state.lock().unwrap().config.clone())
    }

    async fn configure_external_api(&self, config: &ExternalApiConfig) -> BackendResult<()> {
        self.record(Call::ConfigureExternalApi(config.clone()))
            .await?;
        self.require_admin()?;
        self.state.lock().unwrap().config = Some(config.clone());
        Ok(())
    }

    async fn is_caller_admin(&self) -> BackendResult<bool> {
        self.record(Call::IsCallerAdmin).await?;
        Ok(self.state.lock().unwrap().admin)
    }

    async fn get_caller_user_role(&self) -> BackendResult<UserRole> {
        self.record(Call::GetCallerUserRole).await?;
        Ok(if self.state.lock().unwrap().admin {
            UserRole::Admin
        } else {
            UserRole::User
        })
    }
}

pub fn radiologist() -> UserProfile {
    UserProfile {
        name: "Dr. Ada Chen".to_string(),
        specialization: "Abdominal Radiology".to_string(),
        department: "Oncology".to_string(),
    }
}

pub fn complete_config() -> ExternalApiConfig {
    ExternalApiConfig {
        endpoint_url: "https://ai.example.com/analyze".to_string(),
        api_key: "k-123".to_string(),
    }
}

/// Dashboard over `backend`, with notices collected in the returned log.
pub fn setup(backend: &Arc<MockBackend>) -> (Dashboard, Arc<NoticeLog>) {
    let notices = Arc::new(NoticeLog::new());
    let dashboard = Dashboard::new(Session::with_backend(backend.clone()), notices.clone());
    (dashboard, notices)
}
