//! Single-flight enrichment controller.
//!
//! Each `submit` owns a generation number. A result is applied only while its
//! generation is still the newest, so when submits overlap the last one wins
//! regardless of which response arrives first. Generation bumps and outcome
//! writes both happen under the `watch` channel's lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use leadlens_protocol::{EnrichRequest, Record};
use leadlens_security::SessionManager;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::EnrichError;
use crate::service::EnrichmentService;

/// What the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnrichmentOutcome {
    #[default]
    Idle,
    Pending,
    Succeeded(Record),
    Failed(String),
}

impl EnrichmentOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, EnrichmentOutcome::Pending)
    }

    pub fn record(&self) -> Option<&Record> {
        match self {
            EnrichmentOutcome::Succeeded(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            EnrichmentOutcome::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Broadcast snapshot: the outcome plus the submit it belongs to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichmentState {
    pub generation: u64,
    /// Trimmed company name of the owning submit.
    pub query: String,
    pub outcome: EnrichmentOutcome,
}

pub struct EnrichmentController {
    session: Arc<SessionManager>,
    service: Arc<dyn EnrichmentService>,
    timeout: Duration,
    generation: AtomicU64,
    state: watch::Sender<EnrichmentState>,
}

impl EnrichmentController {
    pub fn new(
        session: Arc<SessionManager>,
        service: Arc<dyn EnrichmentService>,
        timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(EnrichmentState::default());
        Self {
            session,
            service,
            timeout,
            generation: AtomicU64::new(0),
            state,
        }
    }

    /// Submit a company name.
    ///
    /// Returns the outcome this submit applied, or `None` if a later submit
    /// superseded it before its response arrived.
    pub async fn submit(&self, query: &str) -> Option<EnrichmentOutcome> {
        let company = query.trim();
        if company.is_empty() {
            let outcome = EnrichmentOutcome::Failed(EnrichError::Validation.to_string());
            self.begin(company, outcome.clone());
            return Some(outcome);
        }

        let generation = self.begin(company, EnrichmentOutcome::Pending);
        let credential = self.session.credential();
        if credential.is_none() {
            debug!(generation, "submitting without a credential");
        }
        info!(generation, company = %company, service = self.service.name(), "enrichment started");

        let request = EnrichRequest::new(company);
        let call = self.service.enrich(&request, credential.as_ref());
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(EnrichError::timeout(self.timeout)),
        };

        let outcome = match result {
            Ok(record) => {
                info!(generation, fields = record.len(), "enrichment succeeded");
                EnrichmentOutcome::Succeeded(record)
            }
            Err(err) => {
                warn!(generation, company = %company, "Enrichment failed: {}", err);
                EnrichmentOutcome::Failed(err.to_string())
            }
        };

        if self.complete(generation, outcome.clone()) {
            Some(outcome)
        } else {
            debug!(generation, "discarding superseded enrichment result");
            None
        }
    }

    pub fn state(&self) -> EnrichmentState {
        self.state.borrow().clone()
    }

    pub fn outcome(&self) -> EnrichmentOutcome {
        self.state.borrow().outcome.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EnrichmentState> {
        self.state.subscribe()
    }

    /// Start a new generation and publish its first outcome.
    fn begin(&self, query: &str, outcome: EnrichmentOutcome) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = EnrichmentState {
                generation,
                query: query.to_string(),
                outcome,
            };
        });
        generation
    }

    /// Publish a final outcome if `generation` is still the newest.
    fn complete(&self, generation: u64, outcome: EnrichmentOutcome) -> bool {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.outcome = outcome;
            true
        })
    }
}
