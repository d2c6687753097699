//! HTTP implementation of the remote procedure client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::backend::ScanBackend;
use crate::config::DashboardConfig;
use crate::error::{BackendError, BackendResult};
use crate::models::{
    ApiResponse, CtScan, ExternalApiConfig, ScanId, ScanUpload, UserProfile, UserRole,
};

const USER_AGENT_VALUE: &str = concat!("ct-scan-dashboard/", env!("CARGO_PKG_VERSION"));

/// Talks to the scan service's JSON API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &DashboardConfig) -> BackendResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|e| BackendError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let request = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send `request` and unwrap the response envelope. `Ok(None)` means the
    /// call succeeded without data.
    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> BackendResult<Option<T>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| BackendError::InvalidResponse {
                message: format!("could not decode response: {}", e),
            })?;

        if !envelope.success {
            return Err(BackendError::Rejected {
                message: envelope
                    .error
                    .unwrap_or_else(|| "request was not successful".to_string()),
            });
        }
        Ok(envelope.data)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> BackendResult<T> {
        self.call(request)
            .await?
            .ok_or_else(|| BackendError::InvalidResponse {
                message: "response carried no data".to_string(),
            })
    }

    async fn call_unit(&self, request: RequestBuilder) -> BackendResult<()> {
        self.call::<serde::de::IgnoredAny>(request).await?;
        Ok(())
    }

    fn json<B: Serialize>(&self, method: Method, path: &str, body: &B) -> RequestBuilder {
        self.request(method, path).json(body)
    }
}

/// Map a non-2xx response to a rejection, preferring the envelope's message.
fn rejection(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ApiResponse<serde::de::IgnoredAny>>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .or_else(|| {
            let body = body.trim();
            (!body.is_empty()).then(|| body.to_string())
        })
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized { message },
        _ => BackendError::Rejected { message },
    }
}

#[async_trait]
impl ScanBackend for HttpBackend {
    async fn get_caller_user_profile(&self) -> BackendResult<Option<UserProfile>> {
        self.call(self.request(Method::GET, "/api/profile")).await
    }

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> BackendResult<()> {
        self.call_unit(self.json(Method::PUT, "/api/profile", profile))
            .await
    }

    async fn get_all_scans(&self) -> BackendResult<Vec<CtScan>> {
        let scans: Vec<CtScan> = self
            .call(self.request(Method::GET, "/api/scans"))
            .await?
            .unwrap_or_default();
        info!("Retrieved {} scans", scans.len());
        Ok(scans)
    }

    async fn read_scan(&self, id: ScanId) -> BackendResult<CtScan> {
        self.call_required(self.request(Method::GET, &format!("/api/scans/{}", id)))
            .await
    }

    async fn upload_scan(&self, patient_id: &str, scan_image: &[u8]) -> BackendResult<ScanId> {
        let upload = ScanUpload {
            patient_id: patient_id.to_string(),
            scan_image: scan_image.to_vec(),
        };
        self.call_required(self.json(Method::POST, "/api/scans", &upload))
            .await
    }

    async fn analyze_scan(&self, id: ScanId) -> BackendResult<ScanId> {
        self.call_required(self.request(Method::POST, &format!("/api/scans/{}/analyze", id)))
            .await
    }

    async fn get_external_api_config(&self) -> BackendResult<Option<ExternalApiConfig>> {
        self.call(self.request(Method::GET, "/api/config/external-api"))
            .await
    }

    async fn configure_external_api(&self, config: &ExternalApiConfig) -> BackendResult<()> {
        self.call_unit(self.json(Method::PUT, "/api/config/external-api", config))
            .await
    }

    async fn is_caller_admin(&self) -> BackendResult<bool> {
        self.call_required(self.request(Method::GET, "/api/admin/status"))
            .await
    }

    async fn get_caller_user_role(&self) -> BackendResult<UserRole> {
        self.call_required(self.request(Method::GET, "/api/role"))
            .await
    }
}
