//! Application wiring.
//!
//! The session manager is created and initialized first; the enrichment
//! controller receives it by handle and only ever reads its credential.

use std::sync::Arc;

use leadlens_enrich::{EnrichError, EnrichmentController, EnrichmentService, HttpEnrichmentService};
use leadlens_protocol::ClientConfig;
use leadlens_security::{
    AuthError, CredentialStore, DeviceCodeProvider, FileCredentialStore, IdentityProvider,
    SessionManager,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Identity(#[from] AuthError),

    #[error(transparent)]
    Enrichment(#[from] EnrichError),
}

pub struct App {
    pub config: ClientConfig,
    pub session: Arc<SessionManager>,
    pub controller: Arc<EnrichmentController>,
}

impl App {
    /// Build the production stack: file credential store, device-code
    /// identity provider and HTTP enrichment service. Must run inside a Tokio
    /// runtime.
    pub fn open(config: ClientConfig) -> Result<Self, AppError> {
        let store = Arc::new(FileCredentialStore::new(config.credential_store_path()));
        let provider = Arc::new(DeviceCodeProvider::from_config(
            &config.identity,
            &config.provider_session_path(),
        )?);
        let service = Arc::new(HttpEnrichmentService::from_config(&config)?);
        debug!(endpoint = service.endpoint(), "enrichment service configured");
        Ok(Self::from_parts(config, provider, store, service))
    }

    /// Wire explicit collaborators and initialize the session.
    pub fn from_parts(
        config: ClientConfig,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn CredentialStore>,
        service: Arc<dyn EnrichmentService>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(provider, store));
        session.initialize();
        let controller = Arc::new(EnrichmentController::new(
            Arc::clone(&session),
            service,
            config.request_timeout,
        ));
        Self {
            config,
            session,
            controller,
        }
    }
}
