//! Error types for the dashboard client.

/// Failures reported by a remote procedure client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No client handle is attached to the session yet.
    #[error("Remote client not available")]
    Unavailable,

    /// The remote side rejected the call. The message is kept verbatim.
    #[error("{message}")]
    Rejected { message: String },

    /// The remote side refused the caller (non-admin on an admin operation).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Transport failure before a response arrived.
    #[error("Network error: {message}")]
    Network { message: String },

    /// A response arrived but could not be decoded.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl BackendError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Client-side form checks that stop a mutation before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("Scan image is empty")]
    EmptyScan,

    #[error("API Endpoint URL is required.")]
    MissingEndpoint,

    #[error("Please enter a valid URL (e.g. https://your-api.com/analyze).")]
    InvalidEndpoint,

    #[error("API Key is required.")]
    MissingApiKey,
}

/// Why a mutation did not complete. The user has already been notified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Remote message fragments that identify an incomplete analysis setup.
/// The remote side only reports these as free text.
pub const ENDPOINT_NOT_CONFIGURED: &str = "API endpoint not configured";
pub const API_KEY_NOT_CONFIGURED: &str = "API key not configured";

/// Classification of an analyze-scan failure for user guidance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisFailure {
    EndpointNotConfigured,
    ApiKeyNotConfigured,
    Other(String),
}

impl AnalysisFailure {
    pub fn classify(message: &str) -> Self {
        if message.contains(ENDPOINT_NOT_CONFIGURED) {
            Self::EndpointNotConfigured
        } else if message.contains(API_KEY_NOT_CONFIGURED) {
            Self::ApiKeyNotConfigured
        } else {
            Self::Other(message.to_string())
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::EndpointNotConfigured => format!(
                "{}. Please configure the API settings first.",
                ENDPOINT_NOT_CONFIGURED
            ),
            Self::ApiKeyNotConfigured => format!(
                "{}. Please configure the API settings first.",
                API_KEY_NOT_CONFIGURED
            ),
            Self::Other(message) => format!("Analysis failed: {}", message),
        }
    }
}
