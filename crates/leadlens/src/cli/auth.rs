//! `login`, `logout` and `status`.

use anyhow::Result;
use leadlens::App;
use leadlens_security::Session;
use tracing::info;

use super::error::HelpfulError;

pub async fn login(app: &App) -> Result<()> {
    if let Session::Authenticated { identity, .. } = app.session.wait_ready().await {
        println!("Already signed in as {}", identity.label());
        return Ok(());
    }

    let identity = app
        .session
        .login()
        .await
        .map_err(|err| HelpfulError::sign_in_failed(&err))?;
    println!("Welcome, {}", identity.label());
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    if !app.session.wait_ready().await.is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }

    app.session
        .logout()
        .await
        .map_err(|err| HelpfulError::sign_out_failed(&err))?;
    info!("session cleared by user");
    println!("Signed out");
    Ok(())
}

pub async fn status(app: &App, json: bool) -> Result<()> {
    let session = app.session.wait_ready().await;

    if json {
        let identity = session.identity().map(|identity| {
            serde_json::json!({
                "uid": identity.uid,
                "display_name": identity.display_name,
                "email": identity.email,
            })
        });
        let report = serde_json::json!({
            "status": session.status(),
            "identity": identity,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Status: {}", session.status());
    if let Some(identity) = session.identity() {
        println!("User:   {}", identity.label());
        if let Some(email) = &identity.email {
            println!("Email:  {}", email);
        }
    }
    Ok(())
}
