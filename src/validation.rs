//! Client-side checks applied before a mutation reaches the remote side.

use reqwest::Url;

use crate::error::ValidationError;
use crate::models::{ExternalApiConfig, UserProfile};

/// Trim every profile field and require each to be present.
pub fn profile(profile: &UserProfile) -> Result<UserProfile, ValidationError> {
    let required = |field: &'static str, value: &str| -> Result<String, ValidationError> {
        let value = value.trim();
        if value.is_empty() {
            Err(ValidationError::MissingField { field })
        } else {
            Ok(value.to_string())
        }
    };

    Ok(UserProfile {
        name: required("name", &profile.name)?,
        specialization: required("specialization", &profile.specialization)?,
        department: required("department", &profile.department)?,
    })
}

/// Trimmed patient id for an upload of `scan_image`.
pub fn upload(patient_id: &str, scan_image: &[u8]) -> Result<String, ValidationError> {
    let patient_id = patient_id.trim();
    if patient_id.is_empty() {
        return Err(ValidationError::MissingField {
            field: "patient ID",
        });
    }
    if scan_image.is_empty() {
        return Err(ValidationError::EmptyScan);
    }
    Ok(patient_id.to_string())
}

/// Trim both fields; the endpoint must be an absolute URL.
pub fn api_config(config: &ExternalApiConfig) -> Result<ExternalApiConfig, ValidationError> {
    let endpoint_url = config.endpoint_url.trim();
    if endpoint_url.is_empty() {
        return Err(ValidationError::MissingEndpoint);
    }
    if Url::parse(endpoint_url).is_err() {
        return Err(ValidationError::InvalidEndpoint);
    }

    let api_key = config.api_key.trim();
    if api_key.is_empty() {
        return Err(ValidationError::MissingApiKey);
    }

    Ok(ExternalApiConfig {
        endpoint_url: endpoint_url.to_string(),
        api_key: api_key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint_url: &str, api_key: &str) -> ExternalApiConfig {
        ExternalApiConfig {
            endpoint_url: endpoint_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    #[test]
    fn profile_fields_are_trimmed() {
        let cleaned = profile(&UserProfile {
            name: "  Dr. Ada Chen ".to_string(),
            specialization: "Radiology".to_string(),
            department: " Oncology".to_string(),
        })
        .unwrap();
        assert_eq!(cleaned.name, "Dr. Ada Chen");
        assert_eq!(cleaned.department, "Oncology");
    }

    #[test]
    fn blank_profile_field_is_named() {
        let err = profile(&UserProfile {
            name: "Ada".to_string(),
            specialization: "   ".to_string(),
            department: "Oncology".to_string(),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "specialization is required");
    }

    #[test]
    fn upload_needs_patient_and_image() {
        assert_eq!(upload(" PT-2025-001 ", &[1]).unwrap(), "PT-2025-001");
        assert!(matches!(
            upload("  ", &[1]),
            Err(ValidationError::MissingField { .. })
        ));
        assert_eq!(upload("PT-1", &[]), Err(ValidationError::EmptyScan));
    }

    #[test]
    fn endpoint_must_parse_as_url() {
        assert_eq!(
            api_config(&config("", "key")),
            Err(ValidationError::MissingEndpoint)
        );
        assert_eq!(
            api_config(&config("your-api.com/analyze", "key")),
            Err(ValidationError::InvalidEndpoint)
        );
        assert_eq!(
            api_config(&config("https://ai.example.com/analyze", " ")),
            Err(ValidationError::MissingApiKey)
        );
    }

    #[test]
    fn valid_config_is_trimmed() {
        let cleaned = api_config(&config(" https://ai.example.com/analyze ", " k-123 ")).unwrap();
        assert_eq!(cleaned.endpoint_url, "https://ai.example.com/analyze");
        assert_eq!(cleaned.api_key, "k-123");
    }
}
