//! Interactive enrichment shell.
//!
//! Each input line is submitted on its own task, so typing a new company
//! while one is loading supersedes it. A printer task follows the
//! controller's broadcast and prints every outcome change.

use anyhow::{Context, Result};
use leadlens::render;
use leadlens::App;
use leadlens_enrich::EnrichmentState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::auth;
use super::error::HelpfulError;

const HELP: &str = "Type a company name to enrich it.
Commands: :login  :logout  :status  :help  :quit";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Login,
    Logout,
    Status,
    Help,
    Quit,
    Unknown(&'a str),
    Company(&'a str),
}

fn parse_line(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    match trimmed {
        ":login" => Input::Login,
        ":logout" => Input::Logout,
        ":status" => Input::Status,
        ":help" | ":?" => Input::Help,
        ":quit" | ":q" | ":exit" => Input::Quit,
        cmd if cmd.starts_with(':') => Input::Unknown(cmd),
        _ => Input::Company(line),
    }
}

fn spawn_printer(
    mut states: watch::Receiver<EnrichmentState>,
    mut shutdown: oneshot::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    print_state(&states.borrow_and_update());
                }
                _ = &mut shutdown => {
                    if states.has_changed().unwrap_or(false) {
                        print_state(&states.borrow_and_update());
                    }
                    break;
                }
            }
        }
    })
}

fn print_state(state: &EnrichmentState) {
    if let Some(text) = render::render_state(state) {
        println!("{}", text.trim_end());
    }
}

pub async fn run(app: &App) -> Result<()> {
    println!("LeadLens Enrichment Shell");
    println!("{}", HELP);
    let session = app.session.wait_ready().await;
    println!("Status: {}", session.status());

    let (stop_printer, stop_rx) = oneshot::channel();
    let printer = spawn_printer(app.controller.subscribe(), stop_rx);
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match parse_line(&line) {
            Input::Help => println!("{}", HELP),
            Input::Quit => break,
            Input::Unknown(cmd) => println!("Unknown command {}. {}", cmd, HELP),
            Input::Status => auth::status(app, false).await?,
            Input::Login => {
                if let Err(err) = auth::login(app).await {
                    report(&err);
                }
            }
            Input::Logout => {
                if let Err(err) = auth::logout(app).await {
                    report(&err);
                }
            }
            Input::Company(company) => {
                if !app.session.session().is_authenticated() {
                    println!("Not signed in. Use :login first.");
                    continue;
                }
                if company.trim().is_empty() {
                    // Validation settles without awaiting, so run it in line
                    // to keep it ordered with the submits around it.
                    app.controller.submit(company).await;
                    continue;
                }
                in_flight.retain(|task| !task.is_finished());
                let controller = std::sync::Arc::clone(&app.controller);
                let company = company.to_string();
                in_flight.push(tokio::spawn(async move {
                    if controller.submit(&company).await.is_none() {
                        debug!(company = %company, "superseded by a newer submit");
                    }
                }));
            }
        }
    }

    for task in in_flight {
        let _ = task.await;
    }
    let _ = stop_printer.send(());
    let _ = printer.await;
    Ok(())
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => eprint!("{}", helpful),
        None => eprintln!("ERROR: {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_companies() {
        assert_eq!(parse_line("  "), Input::Company("  "));
        assert_eq!(parse_line(":login"), Input::Login);
        assert_eq!(parse_line(" :q "), Input::Quit);
        assert_eq!(parse_line(":nope"), Input::Unknown(":nope"));
        assert_eq!(parse_line(" Acme Corp "), Input::Company(" Acme Corp "));
    }
}
