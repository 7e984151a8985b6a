//! reqwest-backed enrichment service (`POST /api/enrich`).

use std::time::Duration;

use async_trait::async_trait;
use leadlens_protocol::defaults::GENERIC_FETCH_ERROR_MESSAGE;
use leadlens_protocol::{ClientConfig, EnrichRequest, ErrorBody, Record};
use leadlens_security::Credential;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::EnrichError;
use crate::service::EnrichmentService;

/// Sent in place of a token when the session has none; the server rejects it
/// like any other bad token.
const ABSENT_CREDENTIAL: &str = "null";

pub struct HttpEnrichmentService {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpEnrichmentService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichError::Request(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, EnrichError> {
        Self::new(config.enrich_url(), config.request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> EnrichError {
        debug!("enrichment transport error: {:?}", err);
        if err.is_timeout() {
            return EnrichError::timeout(self.timeout);
        }
        if err.is_connect() {
            return EnrichError::Request("Network Error".to_string());
        }
        let description = err.to_string();
        if description.trim().is_empty() {
            EnrichError::Request(GENERIC_FETCH_ERROR_MESSAGE.to_string())
        } else {
            EnrichError::Request(description)
        }
    }
}

#[async_trait]
impl EnrichmentService for HttpEnrichmentService {
    fn name(&self) -> &str {
        "http"
    }

    async fn enrich(
        &self,
        request: &EnrichRequest,
        credential: Option<&Credential>,
    ) -> Result<Record, EnrichError> {
        let token = credential.map_or(ABSENT_CREDENTIAL, |c| c.expose());
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = ErrorBody::parse(&body)
                .detail_message()
                .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
            warn!(status = status.as_u16(), "Enrichment request failed: {}", message);
            return Err(EnrichError::Request(message));
        }

        Record::from_slice(&body).map_err(|err| {
            warn!("Enrichment response rejected: {}", err);
            EnrichError::Format
        })
    }
}
