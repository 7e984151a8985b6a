//! Identity, credential and session types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-scoped opaque user id (`sub`).
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Best human-readable label: display name, then email, then uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// Opaque bearer token. Redacted in `Debug` so it never reaches the logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted, {} bytes>)", self.0.len())
    }
}

/// Result of a successful interactive sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignIn {
    pub identity: Identity,
    pub credential: Credential,
}

/// The provider's view of its current user.
///
/// `credential` is present when the provider can hand out a fresh token;
/// otherwise the session layer falls back to the persisted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUser {
    pub identity: Identity,
    pub credential: Option<Credential>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Unauthenticated,
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current authentication state.
///
/// Identity and credential exist only inside `Authenticated`, so a credential
/// can never be observed without an authenticated status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Initializing,
    Unauthenticated,
    Authenticated {
        identity: Identity,
        credential: Credential,
    },
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        match self {
            Session::Initializing => SessionStatus::Initializing,
            Session::Unauthenticated => SessionStatus::Unauthenticated,
            Session::Authenticated { .. } => SessionStatus::Authenticated,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Session::Authenticated { credential, .. } => Some(credential),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("eyJhbGciOi.secret.sig");
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("redacted"));
        assert_eq!(credential.expose(), "eyJhbGciOi.secret.sig");
    }

    #[test]
    fn credential_present_iff_authenticated() {
        let sessions = [
            Session::Initializing,
            Session::Unauthenticated,
            Session::Authenticated {
                identity: Identity::new("u1", Some("Ada".into())),
                credential: Credential::new("tok"),
            },
        ];
        for session in sessions {
            assert_eq!(
                session.credential().is_some(),
                session.status() == SessionStatus::Authenticated
            );
            assert_eq!(session.identity().is_some(), session.is_authenticated());
        }
    }

    #[test]
    fn identity_label_falls_back() {
        assert_eq!(Identity::new("u1", Some("Ada".into())).label(), "Ada");
        assert_eq!(
            Identity::new("u1", None).with_email("ada@example.com").label(),
            "ada@example.com"
        );
        assert_eq!(Identity::new("u1", None).label(), "u1");
    }
}
