//! HTTP types for the enrichment endpoint (`POST /api/enrich`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body: `{"companyName": "<trimmed name>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichRequest {
    #[serde(rename = "companyName")]
    pub company_name: String,
}

impl EnrichRequest {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
        }
    }
}

/// Failure body. Only a string `detail` is surfaced to users; other shapes
/// (e.g. validation error lists) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Parse a raw failure body, tolerating non-JSON payloads.
    pub fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// The user-facing detail string, if the server sent a non-empty one.
    pub fn detail_message(&self) -> Option<String> {
        match &self.detail {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}
