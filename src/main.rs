mod cli;
mod clone;
mod config;
mod error;
mod gate;
mod jira;
mod model;
mod ops;
mod projector;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands, Transport};
use config::{AppConfig, Credentials};
use gate::RequestGate;
use jira::{JiraClient, Tracker};
use ops::Operations;
use server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;
    let creds = config
        .credentials()
        .context("Set JIRA_URL, JIRA_USERNAME and JIRA_API_TOKEN or add them to the config file")?;

    let client = JiraClient::new(&creds.url, &creds.username, &creds.api_token);
    let gate = RequestGate::new(config.rate_limit.calls, config.rate_limit.period())
        .with_max_wait(config.rate_limit.max_wait());
    tracing::info!(
        "Rate limit: {} calls per {}s",
        config.rate_limit.calls,
        config.rate_limit.period_secs
    );
    let tracker = Tracker::new(Arc::new(client), Arc::new(gate));

    match cli.command() {
        Commands::Check => check(&tracker, &creds).await,
        Commands::Run {
            transport: Transport::Stdio,
        } => serve_stdio(tracker).await,
    }
}

/// Logs go to stderr; stdout carries the JSON-RPC stream.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("jira_mcp=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jira_mcp=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn check(tracker: &Tracker, creds: &Credentials) -> Result<()> {
    tracker
        .ensure_connected()
        .await
        .with_context(|| format!("Could not connect to {}", creds.url))?;
    println!("Connected to {} as {}", creds.url, creds.username);
    Ok(())
}

async fn serve_stdio(tracker: Tracker) -> Result<()> {
    // a bad connection should not stop the server; tools report it per call
    if let Err(e) = tracker.ensure_connected().await {
        tracing::warn!("JIRA connection test failed: {e}");
    }

    let server = Arc::new(Server::new(Operations::new(tracker)));
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    tracing::info!("Serving JIRA tools over stdio");

    tokio::select! {
        result = server.serve(reader, writer) => result,
        _ = signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
