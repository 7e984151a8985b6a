//! Mock enrichment service for deterministic controller tests.
//!
//! Canned results are queued and consumed in order. If nothing is queued the
//! call fails (to catch test configuration issues).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use leadlens_protocol::{EnrichRequest, Record};
use leadlens_security::Credential;

use crate::error::EnrichError;
use crate::service::EnrichmentService;

/// One canned result.
#[derive(Debug, Clone)]
pub struct CannedEnrichment {
    pub result: Result<serde_json::Value, EnrichError>,
    /// Simulated server latency.
    pub delay: Duration,
}

impl CannedEnrichment {
    /// A success body. Non-objects decode to `EnrichError::Format`.
    pub fn record(body: serde_json::Value) -> Self {
        Self {
            result: Ok(body),
            delay: Duration::ZERO,
        }
    }

    pub fn fail(error: EnrichError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A call received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedCall {
    pub company_name: String,
    pub credential: Option<String>,
}

#[derive(Default)]
pub struct MockEnrichmentService {
    responses: Mutex<VecDeque<CannedEnrichment>>,
    calls: Mutex<Vec<ReceivedCall>>,
}

impl MockEnrichmentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, response: CannedEnrichment) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    pub fn calls(&self) -> Vec<ReceivedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EnrichmentService for MockEnrichmentService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn enrich(
        &self,
        request: &EnrichRequest,
        credential: Option<&Credential>,
    ) -> Result<Record, EnrichError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ReceivedCall {
                company_name: request.company_name.clone(),
                credential: credential.map(|c| c.expose().to_string()),
            });
        }

        let next = self.responses.lock().ok().and_then(|mut q| q.pop_front());
        let Some(canned) = next else {
            return Err(EnrichError::Request(
                "No canned enrichment queued. Call queue() before submitting.".to_string(),
            ));
        };

        if !canned.delay.is_zero() {
            tokio::time::sleep(canned.delay).await;
        }
        let body = canned.result?;
        Record::from_json(body).map_err(|_| EnrichError::Format)
    }
}
