//! Identity provider abstraction.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::AuthError;
use crate::identity::{ProviderUser, SignIn};

/// What the provider currently knows about its user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderSession {
    /// Still restoring a previous session; no answer yet.
    #[default]
    Restoring,
    SignedOut,
    SignedIn(ProviderUser),
}

/// External service that authenticates users and issues credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name for logs and messages
    fn name(&self) -> &str;

    /// Run the interactive sign-in.
    async fn sign_in(&self) -> Result<SignIn, AuthError>;

    /// End the provider-side session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Session-change stream. The receiver's current value is the provider's
    /// present state; dropping the receiver unsubscribes.
    fn on_session_change(&self) -> watch::Receiver<ProviderSession>;
}
