//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

use leadlens_protocol::paths;
use leadlens_security::AuthError;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Enrichment attempted without a signed-in session
    pub fn not_signed_in() -> Self {
        Self::new("Not signed in")
            .with_context("Company enrichment is only available to signed-in users")
            .with_suggestions([
                "TRY: Sign in first: leadlens login",
                "TRY: Check the session: leadlens status",
            ])
    }

    /// Identity provider settings are missing
    pub fn identity_not_configured(reason: &str, home: &Path) -> Self {
        Self::new("Identity provider not configured")
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: export LEADLENS_ISSUER=https://accounts.example.com".to_string(),
                "TRY: export LEADLENS_CLIENT_ID=<your OAuth client id>".to_string(),
                format!(
                    "TRY: Or set [identity] issuer and client_id in {}",
                    paths::config_path(home).display()
                ),
            ])
    }

    /// Interactive sign-in did not produce a session
    pub fn sign_in_failed(err: &AuthError) -> Self {
        let base = Self::new("Sign-in failed").with_context(err.to_string());
        match err {
            AuthError::Cancelled => base.with_suggestion("TRY: Run leadlens login again"),
            AuthError::Http(_) => base.with_suggestions([
                "TRY: Check your network connection",
                "TRY: Verify LEADLENS_ISSUER points at a reachable OpenID issuer",
            ]),
            _ => base.with_suggestion("TRY: Run with -v for details"),
        }
    }

    /// Provider sign-out failed; the local session was kept
    pub fn sign_out_failed(err: &AuthError) -> Self {
        Self::new("Sign-out failed")
            .with_context(format!("{} (you are still signed in)", err))
            .with_suggestion("TRY: Retry once the identity provider is reachable: leadlens logout")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a command failure to stderr, or as `{"error": ...}` on stdout in
/// JSON mode.
pub fn print_error(err: &anyhow::Error, json: bool) {
    if json {
        let message = match err.downcast_ref::<HelpfulError>() {
            Some(helpful) => helpful.message.clone(),
            None => format!("{:#}", err),
        };
        println!("{}", serde_json::json!({ "error": message }));
        return;
    }
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => eprint!("{}", helpful),
        None => eprintln!("ERROR: {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While signing in")
            .with_suggestion("Try again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While signing in"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_identity_not_configured_points_at_config_file() {
        let err = HelpfulError::identity_not_configured("issuer is not set", &PathBuf::from("/h"));
        let display = format!("{}", err);
        assert!(display.contains("LEADLENS_ISSUER"));
        assert!(display.contains("/h/config.toml"));
    }

    #[test]
    fn test_sign_out_failure_says_session_kept() {
        let err = HelpfulError::sign_out_failed(&AuthError::SignOut("offline".into()));
        assert!(err.to_string().contains("still signed in"));
    }
}
