//! CLI commands for LeadLens.

pub mod auth;
pub mod config;
pub mod enrich;
pub mod error;
pub mod shell;

use leadlens::{App, AppError};
use leadlens_protocol::ClientConfig;
use leadlens_security::AuthError;

use error::HelpfulError;

/// Build the application, turning setup failures into actionable errors.
pub fn open_app(config: ClientConfig) -> anyhow::Result<App> {
    let home = config.home.clone();
    App::open(config).map_err(|err| match err {
        AppError::Identity(AuthError::NotConfigured(reason)) => {
            HelpfulError::identity_not_configured(&reason, &home).into()
        }
        other => anyhow::Error::new(other),
    })
}
