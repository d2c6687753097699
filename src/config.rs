use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote scan service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Base URL of the remote service, without trailing slash.
    pub base_url: String,
    /// Bearer token of the signed-in caller, if any.
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

impl DashboardConfig {
    /// Read `CT_DASHBOARD_URL`, `CT_DASHBOARD_TOKEN` and `CT_DASHBOARD_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("CT_DASHBOARD_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let auth_token = lookup("CT_DASHBOARD_TOKEN").filter(|token| !token.trim().is_empty());

        let timeout_secs = lookup("CT_DASHBOARD_TIMEOUT_SECS")
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            auth_token,
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
