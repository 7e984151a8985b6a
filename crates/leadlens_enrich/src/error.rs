//! Enrichment failures.
//!
//! The `Display` text of each variant is exactly what the user sees.

use leadlens_protocol::defaults::{EMPTY_QUERY_MESSAGE, INVALID_FORMAT_MESSAGE};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrichError {
    /// Empty or whitespace-only company name. No request is made.
    #[error("{}", EMPTY_QUERY_MESSAGE)]
    Validation,

    /// Transport failure, timeout or non-2xx status.
    #[error("{0}")]
    Request(String),

    /// The success body was not a JSON object.
    #[error("{}", INVALID_FORMAT_MESSAGE)]
    Format,
}

impl EnrichError {
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Request(format!("timeout of {}ms exceeded", timeout.as_millis()))
    }
}
