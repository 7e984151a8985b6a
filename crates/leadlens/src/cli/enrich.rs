//! `enrich <company>`: one gated submit.

use anyhow::Result;
use leadlens::render;
use leadlens::App;
use leadlens_enrich::EnrichmentOutcome;

use super::error::HelpfulError;

pub async fn run(app: &App, company: &str, json: bool) -> Result<()> {
    if !app.session.wait_ready().await.is_authenticated() {
        return Err(HelpfulError::not_signed_in().into());
    }

    if !json {
        eprintln!("{}", render::LOADING);
    }
    let outcome = app
        .controller
        .submit(company)
        .await
        .unwrap_or_else(|| app.controller.outcome());

    match outcome {
        EnrichmentOutcome::Succeeded(record) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print!("{}", render::render_record(&record, company.trim()));
            }
            Ok(())
        }
        EnrichmentOutcome::Failed(message) => Err(HelpfulError::new(message).into()),
        EnrichmentOutcome::Idle | EnrichmentOutcome::Pending => {
            Err(HelpfulError::new("Enrichment did not complete").into())
        }
    }
}
