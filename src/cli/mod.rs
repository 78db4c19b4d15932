//! Command-line interface.
//!
//! Without a subcommand (or with `serve`) the console server starts.
//! Other subcommands:
//! - `status` - Ask a running console for its health and version
//! - `config check` - Validate the configuration file and print a summary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "curator")]
#[command(author, version, about = "Administrative console for an image gallery", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "curator.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Console URL used by `status`
    #[arg(long, env = "CURATOR_URL", default_value = "http://localhost:3000")]
    pub url: String,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Whether a one-shot command runs instead of the server.
    pub fn runs_command(&self) -> bool {
        !matches!(self.command, None | Some(Commands::Serve))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the console server (the default)
    Serve,

    /// Show health and version of a running console
    Status,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

#[derive(Debug, Deserialize)]
struct Health {
    status: String,
    version: String,
}

pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Status) => cmd_status(cli).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        // serving is handled in main.rs
        Some(Commands::Serve) | None => Ok(()),
    }
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")?;

    let url = format!("{}/health", cli.url.trim_end_matches('/'));
    println!("Connecting to {}...", cli.url);

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to connect to the console. Is curator running?")?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Console returned error {}: {}", status, body);
    }

    let health: Health = response
        .json()
        .await
        .context("Failed to parse health response")?;

    println!();
    println!("Version:    v{}", health.version);
    println!(
        "Status:     {}",
        if health.status == "ok" { "[OK] Healthy" } else { "[!!] Unhealthy" }
    );
    Ok(())
}

fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;
    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("[!!] Configuration file not found: {}", config_path.display());
        println!("Defaults and CURATOR_* environment variables will be used.");
        println!("To create one, copy curator.example.toml to curator.toml");
        println!();
    }

    let config = Config::load(config_path)?;
    if let Err(e) = config.validate() {
        println!("[!!] Configuration is invalid: {:#}", e);
        return Err(e);
    }

    println!("[OK] Configuration is valid!");
    println!();
    for line in summary(&config) {
        println!("{}", line);
    }

    let warnings = warnings(&config);
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in warnings {
            println!("  [!] {}", warning);
        }
    }
    Ok(())
}

fn summary(config: &Config) -> Vec<String> {
    vec![
        "Server:".to_string(),
        format!("  Address:      {}:{}", config.server.host, config.server.port),
        format!("  Request size: {} bytes", config.server.max_request_size),
        "Identity:".to_string(),
        format!("  Endpoint:     {}", config.identity.endpoint_url()),
        format!(
            "  User pool:    {}",
            config.identity.user_pool_id.as_deref().unwrap_or("(any issuer)")
        ),
        format!("  Admin group:  {}", config.identity.admin_group),
        "Gallery API:".to_string(),
        format!("  Endpoint:     {}", config.api.endpoint),
        "Uploads:".to_string(),
        format!("  Max size:     {} bytes", config.upload.max_file_size),
        format!("  Types:        {}", config.upload.accepted_types.join(", ")),
    ]
}

fn warnings(config: &Config) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !config.session.secure_cookie {
        warnings.push("session.secure_cookie is off - the auth cookie is sent over plain HTTP");
    }
    if config.identity.user_pool_id.is_none() {
        warnings.push("No user pool configured - token issuers are not checked");
    }
    if config.api.endpoint.starts_with("http://") {
        warnings.push("Gallery API endpoint is not HTTPS");
    }
    warnings
}
