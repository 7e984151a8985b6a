//! Error types for the session layer.

use std::path::PathBuf;
use thiserror::Error;

/// Identity-provider and session failures surfaced to login/logout callers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user abandoned or declined the interactive sign-in.
    #[error("Sign-in was cancelled")]
    Cancelled,

    /// The provider refused to issue a credential.
    #[error("Sign-in rejected by identity provider: {0}")]
    Rejected(String),

    /// The provider's sign-out call failed; the local session is kept.
    #[error("Sign-out failed: {0}")]
    SignOut(String),

    /// Transport failure talking to the identity provider.
    #[error("Identity provider unreachable: {0}")]
    Http(String),

    /// A token could not be interpreted.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Required identity settings are missing.
    #[error("Identity provider not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Durable credential store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential store at {path} is corrupt: {message}. Delete this file to reset.")]
    Corrupt { path: PathBuf, message: String },

    #[error("Credential store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
