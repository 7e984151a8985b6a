//! Session lifecycle across simulated process restarts.

use std::sync::Arc;

use leadlens_protocol::defaults::CREDENTIAL_STORE_KEY;
use leadlens_security::{
    Credential, CredentialStore, FileCredentialStore, Identity, MockIdentityProvider,
    ProviderSession, ProviderUser, Session, SessionManager, SessionStatus, SignIn,
};

fn ada() -> Identity {
    Identity::new("uid-ada", Some("Ada".to_string())).with_email("ada@example.com")
}

#[tokio::test]
async fn persisted_credential_restores_session_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("credentials.json");

    // First process: interactive sign-in.
    {
        let provider = Arc::new(MockIdentityProvider::signed_out());
        provider.queue_sign_in(SignIn {
            identity: ada(),
            credential: Credential::new("persisted-token"),
        });
        let manager = SessionManager::new(provider, Arc::new(FileCredentialStore::new(&store_path)));
        manager.initialize();
        manager.login().await.unwrap();
    }

    // Second process: the provider still has the user but issues no token.
    let provider = Arc::new(MockIdentityProvider::new());
    let manager = SessionManager::new(
        provider.clone(),
        Arc::new(FileCredentialStore::new(&store_path)),
    );
    manager.initialize();
    assert_eq!(manager.status(), SessionStatus::Initializing);

    provider.notify(ProviderSession::SignedIn(ProviderUser {
        identity: ada(),
        credential: None,
    }));
    let session = manager.wait_ready().await;

    assert_eq!(
        session,
        Session::Authenticated {
            identity: ada(),
            credential: Credential::new("persisted-token"),
        }
    );
    assert_eq!(provider.sign_in_calls(), 0);
}

#[tokio::test]
async fn logout_then_credential_is_absent_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCredentialStore::new(dir.path().join("credentials.json")));
    let provider = Arc::new(MockIdentityProvider::signed_out());
    provider.queue_sign_in(SignIn {
        identity: ada(),
        credential: Credential::new("tok"),
    });
    let manager = SessionManager::new(provider, store.clone());
    manager.initialize();
    manager.login().await.unwrap();
    assert_eq!(store.get(CREDENTIAL_STORE_KEY).unwrap().as_deref(), Some("tok"));

    manager.logout().await.unwrap();

    assert!(manager.credential().is_none());
    assert_eq!(store.get(CREDENTIAL_STORE_KEY).unwrap(), None);
}

#[tokio::test]
async fn dependents_observe_every_transition() {
    let provider = Arc::new(MockIdentityProvider::new());
    let manager = SessionManager::new(
        provider.clone(),
        Arc::new(leadlens_security::MemoryCredentialStore::new()),
    );
    let mut rx = manager.subscribe();
    manager.initialize();

    provider.notify(ProviderSession::SignedOut);
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status(), SessionStatus::Unauthenticated);

    provider.queue_sign_in(SignIn {
        identity: ada(),
        credential: Credential::new("tok"),
    });
    manager.login().await.unwrap();
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().status(), SessionStatus::Authenticated);
}
