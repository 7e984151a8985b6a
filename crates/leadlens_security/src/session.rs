//! Session lifecycle.
//!
//! `SessionManager` is the single source of truth for "is there a usable
//! credential right now". It follows the identity provider's session stream,
//! runs sign-in/sign-out, mirrors the credential into the durable store and
//! broadcasts every state change to dependents through a `watch` channel.
//!
//! ```text
//! Initializing ──(provider notification)──> Authenticated | Unauthenticated
//! Authenticated <──(login / logout / revoke)──> Unauthenticated
//! ```
//!
//! `Initializing` is entered once, at construction, and never re-entered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use leadlens_protocol::defaults::CREDENTIAL_STORE_KEY;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::identity::{Credential, Identity, ProviderUser, Session, SessionStatus, SignIn};
use crate::provider::{IdentityProvider, ProviderSession};
use crate::store::CredentialStore;

/// State shared with the subscription task.
struct Shared {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
}

impl Shared {
    fn apply_provider_session(&self, update: ProviderSession) {
        match update {
            ProviderSession::Restoring => {
                debug!("identity provider still restoring");
            }
            ProviderSession::SignedOut => {
                if let Err(err) = self.store.remove(CREDENTIAL_STORE_KEY) {
                    warn!("Failed to clear persisted credential: {}", err);
                }
                let previous = self.state.send_replace(Session::Unauthenticated);
                if previous.is_authenticated() {
                    info!("session ended by identity provider");
                }
            }
            ProviderSession::SignedIn(user) => self.apply_user(user),
        }
    }

    fn apply_user(&self, user: ProviderUser) {
        let ProviderUser {
            identity,
            credential,
        } = user;

        let credential = match credential {
            Some(fresh) => {
                if let Err(err) = self.store.set(CREDENTIAL_STORE_KEY, fresh.expose()) {
                    warn!("Failed to persist credential: {}", err);
                }
                Some(fresh)
            }
            None => match self.store.get(CREDENTIAL_STORE_KEY) {
                Ok(persisted) => persisted.map(Credential::new),
                Err(err) => {
                    warn!("Failed to read persisted credential: {}", err);
                    None
                }
            },
        };

        match credential {
            Some(credential) => {
                debug!(uid = %identity.uid, "provider reports active session");
                self.state.send_replace(Session::Authenticated {
                    identity,
                    credential,
                });
            }
            None => {
                warn!(
                    uid = %identity.uid,
                    "provider reports a user but no credential is available; treating as signed out"
                );
                self.state.send_replace(Session::Unauthenticated);
            }
        }
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    shared: Arc<Shared>,
    initialized: AtomicBool,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(Session::Initializing);
        Self {
            provider,
            shared: Arc::new(Shared { store, state }),
            initialized: AtomicBool::new(false),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to the provider's session stream. Only the first call has an
    /// effect. Must run inside a Tokio runtime.
    ///
    /// The provider's current state is applied before returning; later
    /// notifications are applied by a background task.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("session manager already initialized");
            return;
        }

        let mut updates = self.provider.on_session_change();
        let current = updates.borrow_and_update().clone();
        self.shared.apply_provider_session(current);

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let update = updates.borrow_and_update().clone();
                shared.apply_provider_session(update);
            }
            debug!("identity provider session stream closed");
        });

        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(handle);
        }
        info!(provider = self.provider.name(), "session manager initialized");
    }

    /// Interactive sign-in. On failure the session is left as it was.
    ///
    /// Once the provider has signed the user in, the session follows it even
    /// if the credential cannot be persisted; that only costs the restore on
    /// the next start.
    pub async fn login(&self) -> Result<Identity, AuthError> {
        let SignIn {
            identity,
            credential,
        } = self.provider.sign_in().await.map_err(|err| {
            warn!(provider = self.provider.name(), "Sign-in failed: {}", err);
            err
        })?;

        if let Err(err) = self.shared.store.set(CREDENTIAL_STORE_KEY, credential.expose()) {
            warn!(uid = %identity.uid, "Signed in but could not persist credential: {}", err);
        }
        self.shared.state.send_replace(Session::Authenticated {
            identity: identity.clone(),
            credential,
        });
        info!(uid = %identity.uid, "signed in");
        Ok(identity)
    }

    /// Sign out at the provider, then clear the persisted credential and
    /// local state. If the provider call fails nothing local is cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await.map_err(|err| {
            warn!(provider = self.provider.name(), "Sign-out failed: {}", err);
            err
        })?;

        let cleared = self.shared.store.remove(CREDENTIAL_STORE_KEY);
        self.shared.state.send_replace(Session::Unauthenticated);
        info!("signed out");
        cleared.map_err(AuthError::from)
    }

    /// Current credential, if authenticated. Never blocks.
    pub fn credential(&self) -> Option<Credential> {
        self.shared.state.borrow().credential().cloned()
    }

    pub fn session(&self) -> Session {
        self.shared.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.state.borrow().status()
    }

    /// Receive every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.shared.state.subscribe()
    }

    /// Wait until the session has left `Initializing`.
    pub async fn wait_ready(&self) -> Session {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|session| session.status() != SessionStatus::Initializing)
            .await
            .map(|session| session.clone());
        settled.unwrap_or_else(|_| self.session())
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.subscription.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::mock::MockIdentityProvider;
    use crate::store::MemoryCredentialStore;

    fn ada() -> Identity {
        Identity::new("uid-ada", Some("Ada".into()))
    }

    fn setup(provider: MockIdentityProvider) -> (Arc<MockIdentityProvider>, Arc<MemoryCredentialStore>, SessionManager) {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryCredentialStore::new());
        let manager = SessionManager::new(provider.clone(), store.clone());
        (provider, store, manager)
    }

    #[tokio::test]
    async fn starts_initializing_until_provider_answers() {
        let (provider, _store, manager) = setup(MockIdentityProvider::new());
        assert_eq!(manager.status(), SessionStatus::Initializing);

        manager.initialize();
        assert_eq!(manager.status(), SessionStatus::Initializing);
        assert!(manager.credential().is_none());

        provider.notify(ProviderSession::SignedOut);
        let session = manager.wait_ready().await;
        assert_eq!(session, Session::Unauthenticated);
    }

    #[tokio::test]
    async fn initialize_subscribes_once() {
        let (provider, _store, manager) = setup(MockIdentityProvider::signed_out());
        manager.initialize();
        manager.initialize();
        assert_eq!(provider.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn login_persists_and_authenticates() {
        let (provider, store, manager) = setup(MockIdentityProvider::signed_out());
        manager.initialize();
        provider.queue_sign_in(SignIn {
            identity: ada(),
            credential: Credential::new("tok-1"),
        });

        let identity = manager.login().await.unwrap();

        assert_eq!(identity, ada());
        assert_eq!(manager.status(), SessionStatus::Authenticated);
        assert_eq!(manager.credential(), Some(Credential::new("tok-1")));
        assert_eq!(store.get(CREDENTIAL_STORE_KEY).unwrap().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn failed_login_leaves_state_unchanged() {
        let (provider, store, manager) = setup(MockIdentityProvider::signed_out());
        manager.initialize();
        provider.queue_cancel();
        provider.queue_reject("domain not allowed");

        assert!(matches!(manager.login().await, Err(AuthError::Cancelled)));
        assert!(matches!(manager.login().await, Err(AuthError::Rejected(_))));
        assert_eq!(manager.session(), Session::Unauthenticated);
        assert!(!store.contains(CREDENTIAL_STORE_KEY));
    }

    struct ReadOnlyStore;

    impl CredentialStore for ReadOnlyStore {
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }

        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn login_without_persistence_still_authenticates() {
        let provider = Arc::new(MockIdentityProvider::signed_out());
        let manager = SessionManager::new(provider.clone(), Arc::new(ReadOnlyStore));
        manager.initialize();
        provider.queue_sign_in(SignIn {
            identity: ada(),
            credential: Credential::new("tok-1"),
        });

        let identity = manager.login().await.unwrap();

        assert_eq!(identity, ada());
        assert_eq!(manager.status(), SessionStatus::Authenticated);
        assert_eq!(manager.credential(), Some(Credential::new("tok-1")));
    }

    #[tokio::test]
    async fn failed_logout_keeps_session() {
        let (provider, store, manager) = setup(MockIdentityProvider::signed_out());
        manager.initialize();
        provider.queue_sign_in(SignIn {
            identity: ada(),
            credential: Credential::new("tok-1"),
        });
        manager.login().await.unwrap();
        provider.fail_next_sign_out("network down");

        let err = manager.logout().await.unwrap_err();

        assert!(matches!(err, AuthError::SignOut(_)));
        assert_eq!(manager.credential(), Some(Credential::new("tok-1")));
        assert!(store.contains(CREDENTIAL_STORE_KEY));
    }

    #[tokio::test]
    async fn logout_clears_credential_and_store() {
        let (provider, store, manager) = setup(MockIdentityProvider::signed_out());
        manager.initialize();
        provider.queue_sign_in(SignIn {
            identity: ada(),
            credential: Credential::new("tok-1"),
        });
        manager.login().await.unwrap();

        manager.logout().await.unwrap();

        assert!(manager.credential().is_none());
        assert_eq!(manager.status(), SessionStatus::Unauthenticated);
        assert!(!store.contains(CREDENTIAL_STORE_KEY));
    }

    #[tokio::test]
    async fn provider_revocation_ends_session() {
        let (provider, store, manager) = setup(MockIdentityProvider::signed_out());
        manager.initialize();
        provider.queue_sign_in(SignIn {
            identity: ada(),
            credential: Credential::new("tok-1"),
        });
        manager.login().await.unwrap();
        let mut rx = manager.subscribe();

        provider.notify(ProviderSession::SignedOut);

        let session = rx
            .wait_for(|s| !s.is_authenticated())
            .await
            .unwrap()
            .clone();
        assert_eq!(session, Session::Unauthenticated);
        assert!(!store.contains(CREDENTIAL_STORE_KEY));
    }

    #[tokio::test]
    async fn provider_user_without_any_credential_is_unauthenticated() {
        let (_provider, _store, manager) = setup(MockIdentityProvider::signed_in(ProviderUser {
            identity: ada(),
            credential: None,
        }));
        manager.initialize();
        assert_eq!(manager.session(), Session::Unauthenticated);
    }
}
