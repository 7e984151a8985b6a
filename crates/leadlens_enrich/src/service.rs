//! The remote enrichment service seam.

use async_trait::async_trait;
use leadlens_protocol::{EnrichRequest, Record};
use leadlens_security::Credential;

use crate::error::EnrichError;

/// Something that turns a company name into an enrichment record.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// Service name for logs.
    fn name(&self) -> &str;

    /// Perform one enrichment call. `credential` is whatever the session held
    /// at submit time; `None` is sent as an unauthenticated request.
    async fn enrich(
        &self,
        request: &EnrichRequest,
        credential: Option<&Credential>,
    ) -> Result<Record, EnrichError>;
}
