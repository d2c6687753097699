use serde::{Deserialize, Serialize};

/// Remote-assigned scan identity.
pub type ScanId = u64;

pub type PatientId = String;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub specialization: String,
    pub department: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TumorStage {
    Stage0,
    Stage1,
    Stage2,
    Stage3,
    Stage4,
}

impl TumorStage {
    /// Human-readable staging label shown next to a positive finding.
    pub fn label(&self) -> &'static str {
        match self {
            TumorStage::Stage0 => "Stage 0 (In Situ)",
            TumorStage::Stage1 => "Stage I (Localized)",
            TumorStage::Stage2 => "Stage II (Regional)",
            TumorStage::Stage3 => "Stage III (Advanced)",
            TumorStage::Stage4 => "Stage IV (Metastatic)",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TumorDetectionResult {
    pub probability: f64,
    pub tumor_found: bool,
    #[serde(with = "base64_bytes")]
    pub mask_image: Vec<u8>,
    pub stage: TumorStage,
    pub confidence: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CtScan {
    pub id: ScanId,
    pub patient_id: PatientId,
    #[serde(with = "base64_bytes")]
    pub scan_image: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<TumorDetectionResult>,
}

impl CtScan {
    pub fn is_analyzed(&self) -> bool {
        self.analysis_result.is_some()
    }
}

/// Endpoint and credentials of the external tumor-detection service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExternalApiConfig {
    pub endpoint_url: String,
    pub api_key: String,
}

impl ExternalApiConfig {
    /// Both fields present. The remote side re-checks this on every analysis.
    pub fn is_complete(&self) -> bool {
        !self.endpoint_url.is_empty() && !self.api_key.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    #[default]
    Guest,
}

/// Body of an upload request.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScanUpload {
    pub patient_id: PatientId,
    #[serde(with = "base64_bytes")]
    pub scan_image: Vec<u8>,
}

/// Response envelope used by every remote endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn failure(error_code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
            error_code: Some(error_code.to_string()),
        }
    }
}

/// Binary fields travel as standard base64 strings.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
