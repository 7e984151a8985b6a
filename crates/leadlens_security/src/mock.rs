//! Mock identity provider for deterministic session tests.
//!
//! Sign-in outcomes are queued and consumed in order. With nothing queued,
//! `sign_in` fails as cancelled (to catch test configuration issues).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::AuthError;
use crate::identity::{ProviderUser, SignIn};
use crate::provider::{IdentityProvider, ProviderSession};

#[derive(Debug, Clone)]
enum ScriptedSignIn {
    Succeed(SignIn),
    Cancel,
    Reject(String),
}

pub struct MockIdentityProvider {
    state: watch::Sender<ProviderSession>,
    sign_ins: Mutex<VecDeque<ScriptedSignIn>>,
    sign_out_failure: Mutex<Option<String>>,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl MockIdentityProvider {
    /// Provider that has not finished restoring yet.
    pub fn new() -> Self {
        Self::with_state(ProviderSession::Restoring)
    }

    /// Provider reporting no active user.
    pub fn signed_out() -> Self {
        Self::with_state(ProviderSession::SignedOut)
    }

    /// Provider reporting an active user (e.g. restored from a previous run).
    pub fn signed_in(user: ProviderUser) -> Self {
        Self::with_state(ProviderSession::SignedIn(user))
    }

    fn with_state(initial: ProviderSession) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            sign_ins: Mutex::new(VecDeque::new()),
            sign_out_failure: Mutex::new(None),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    pub fn queue_sign_in(&self, sign_in: SignIn) {
        self.push_script(ScriptedSignIn::Succeed(sign_in));
    }

    pub fn queue_cancel(&self) {
        self.push_script(ScriptedSignIn::Cancel);
    }

    pub fn queue_reject(&self, reason: impl Into<String>) {
        self.push_script(ScriptedSignIn::Reject(reason.into()));
    }

    /// Make the next `sign_out` fail with this message.
    pub fn fail_next_sign_out(&self, reason: impl Into<String>) {
        if let Ok(mut slot) = self.sign_out_failure.lock() {
            *slot = Some(reason.into());
        }
    }

    /// Simulate an upstream session change (restore finished, revoked, ...).
    pub fn notify(&self, session: ProviderSession) {
        self.state.send_replace(session);
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    fn push_script(&self, script: ScriptedSignIn) {
        if let Ok(mut queue) = self.sign_ins.lock() {
            queue.push_back(script);
        }
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn sign_in(&self) -> Result<SignIn, AuthError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .sign_ins
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        match next {
            Some(ScriptedSignIn::Succeed(sign_in)) => {
                self.state.send_replace(ProviderSession::SignedIn(ProviderUser {
                    identity: sign_in.identity.clone(),
                    credential: Some(sign_in.credential.clone()),
                }));
                Ok(sign_in)
            }
            Some(ScriptedSignIn::Reject(reason)) => Err(AuthError::Rejected(reason)),
            Some(ScriptedSignIn::Cancel) | None => Err(AuthError::Cancelled),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self
            .sign_out_failure
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(reason) = failure {
            return Err(AuthError::SignOut(reason));
        }
        self.state.send_replace(ProviderSession::SignedOut);
        Ok(())
    }

    fn on_session_change(&self) -> watch::Receiver<ProviderSession> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Credential, Identity};

    #[tokio::test]
    async fn unqueued_sign_in_is_cancelled() {
        let provider = MockIdentityProvider::signed_out();
        assert!(matches!(provider.sign_in().await, Err(AuthError::Cancelled)));
        assert_eq!(provider.sign_in_calls(), 1);
    }

    #[tokio::test]
    async fn successful_sign_in_notifies_subscribers() {
        let provider = MockIdentityProvider::signed_out();
        let mut rx = provider.on_session_change();
        provider.queue_sign_in(SignIn {
            identity: Identity::new("u1", Some("Ada".into())),
            credential: Credential::new("tok"),
        });

        provider.sign_in().await.unwrap();

        rx.changed().await.unwrap();
        assert!(matches!(&*rx.borrow(), ProviderSession::SignedIn(user) if user.identity.uid == "u1"));
    }

    #[tokio::test]
    async fn sign_out_failure_is_one_shot() {
        let provider = MockIdentityProvider::signed_out();
        provider.fail_next_sign_out("offline");
        assert!(matches!(provider.sign_out().await, Err(AuthError::SignOut(_))));
        assert!(provider.sign_out().await.is_ok());
        assert_eq!(provider.sign_out_calls(), 2);
    }
}
