//! `config`: show resolved settings and paths.

use leadlens_protocol::ClientConfig;

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Show resolved configuration in JSON format
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: &ClientConfig, args: ConfigArgs) -> anyhow::Result<()> {
    let config_file = config.config_path();
    let store = config.credential_store_path();
    let provider_session = config.provider_session_path();
    let timeout_ms = config.request_timeout.as_millis();

    if args.json {
        let report = serde_json::json!({
            "home": config.home.to_string_lossy(),
            "config_file": {
                "path": config_file.to_string_lossy(),
                "exists": config_file.exists(),
            },
            "credential_store": {
                "path": store.to_string_lossy(),
                "exists": store.exists(),
            },
            "provider_session": {
                "path": provider_session.to_string_lossy(),
                "exists": provider_session.exists(),
            },
            "api": {
                "base_url": config.api_base_url.as_str(),
                "enrich_url": config.enrich_url(),
                "timeout_ms": timeout_ms,
            },
            "identity": {
                "issuer": config.identity.issuer,
                "client_id": config.identity.client_id,
                "scope": config.identity.scope,
            },
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let exists = |found: bool| if found { "" } else { " (not created)" };
    println!("LeadLens Configuration");
    println!("======================");
    println!();
    println!("Home:             {}", config.home.display());
    println!(
        "Config file:      {}{}",
        config_file.display(),
        exists(config_file.exists())
    );
    println!(
        "Credential store: {}{}",
        store.display(),
        exists(store.exists())
    );
    println!(
        "Provider session: {}{}",
        provider_session.display(),
        exists(provider_session.exists())
    );
    println!();
    println!("Enrich endpoint:  {}", config.enrich_url());
    println!("Timeout:          {} ms", timeout_ms);
    println!();
    println!(
        "Issuer:           {}",
        config.identity.issuer.as_deref().unwrap_or("(not set)")
    );
    println!(
        "Client ID:        {}",
        config.identity.client_id.as_deref().unwrap_or("(not set)")
    );
    println!("Scope:            {}", config.identity.scope);
    Ok(())
}
