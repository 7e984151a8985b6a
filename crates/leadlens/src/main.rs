//! LeadLens command-line client
//!
//! - **login / logout / status**: manage the signed-in session
//! - **enrich**: look up one company (requires a signed-in session)
//! - **shell**: interactive enrichment loop
//! - **config**: show resolved settings and paths

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leadlens_logging::{init_logging, LogConfig};
use leadlens_protocol::{paths, ClientConfig};

mod cli;

#[derive(Parser, Debug)]
#[command(name = "leadlens", version, about = "Company lead enrichment from the terminal")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Enrichment API base URL (overrides LEADLENS_API_URL and config.toml)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// LeadLens home directory
    #[arg(long, global = true, env = "LEADLENS_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in with the configured identity provider
    Login,

    /// Sign out and forget the stored credential
    Logout,

    /// Show the current session
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enrich one company
    Enrich {
        /// Company name
        company: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive enrichment shell
    Shell,

    /// Show resolved configuration
    Config(cli::config::ConfigArgs),
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Status { json } | Commands::Enrich { json, .. } => *json,
            Commands::Config(args) => args.json,
            _ => false,
        }
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let home = cli.home.clone().unwrap_or_else(paths::leadlens_home);
    let config = ClientConfig::load(&home)?;
    match &cli.api_url {
        Some(url) => Ok(config.with_api_base_url(url)?),
        None => Ok(config),
    }
}

fn run_command(cli: Cli, config: ClientConfig) -> Result<()> {
    // Config inspection never touches the network or the session.
    let command = match cli.command {
        Commands::Config(args) => return cli::config::run(&config, args),
        command => command,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let app = cli::open_app(config)?;
        match command {
            Commands::Login => cli::auth::login(&app).await,
            Commands::Logout => cli::auth::logout(&app).await,
            Commands::Status { json } => cli::auth::status(&app, json).await,
            Commands::Enrich { company, json } => cli::enrich::run(&app, &company, json).await,
            Commands::Shell => cli::shell::run(&app).await,
            Commands::Config(_) => Ok(()),
        }
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.command.wants_json();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            cli::error::print_error(&err, json_mode);
            return ExitCode::from(1);
        }
    };

    paths::ensure_home_dir(&config.home);
    if let Err(err) = init_logging(LogConfig {
        app_name: "leadlens",
        log_dir: paths::logs_dir(&config.home),
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            cli::error::print_error(&err, json_mode);
            ExitCode::from(1)
        }
    }
}
