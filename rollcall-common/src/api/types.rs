//! Shared API request/response types

use serde::{Deserialize, Serialize};

/// Health check response: status, module name, and version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok(module: &str, version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            module: module.to_string(),
            version: version.to_string(),
        }
    }
}

/// Error body returned by every endpoint
///
/// # Examples
///
/// ```
/// use rollcall_common::api::ErrorResponse;
///
/// let body = ErrorResponse::new("Failed to record attendance")
///     .with_details("Cannot connect to storage");
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["details"], "Cannot connect to storage");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Body of `POST /api/scan`
///
/// `qrData` is whatever the camera decoded: either a JSON payload or a bare
/// record id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    #[serde(default)]
    pub qr_data: Option<String>,
}

/// Query of `GET /api/user`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub qr: Option<String>,
}
