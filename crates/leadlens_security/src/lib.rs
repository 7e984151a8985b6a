//! LeadLens Security Module
//!
//! Provides:
//! - **SessionManager**: the authenticated-session lifecycle and its broadcast
//! - **CredentialStore**: durable storage for the bearer credential
//! - **IdentityProvider**: the sign-in/sign-out seam, with an OAuth device-code
//!   implementation for terminals and a scriptable mock

pub mod device_code;
pub mod error;
pub mod identity;
pub mod mock;
pub mod provider;
pub mod session;
pub mod store;

pub use device_code::{DeviceCodePrompt, DeviceCodeProvider};
pub use error::{AuthError, StoreError};
pub use identity::{Credential, Identity, ProviderUser, Session, SessionStatus, SignIn};
pub use mock::MockIdentityProvider;
pub use provider::{IdentityProvider, ProviderSession};
pub use session::SessionManager;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
