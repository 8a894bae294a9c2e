//! CLI module for the bazaar command-line interface.
//!
//! With no subcommand (or `serve`) the binary runs the API server. The other
//! subcommands act as a client of a running server:
//! - `login` / `logout` / `whoami` - manage the stored session
//! - `listings <category>` - browse a category
//! - `conversations` - show the inbox
//! - `config check` - validate the configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::client::ApiClient;
use crate::config::{Config, MAX_SESSION_TTL_DAYS};
use crate::db::ListingFilters;
use crate::session::{AuthSession, EncryptedFileStore};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "bazaar")]
#[command(author, version, about = "Marketplace backend and client", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "BAZAAR_CONFIG", default_value = "bazaar.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (overrides `[client] api_url`)
    #[arg(long, env = "BAZAAR_API_URL")]
    pub api_url: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the API server
    Serve,

    /// Sign in and store the session
    Login {
        email: String,
        /// Password (can also be set via BAZAAR_PASSWORD env var)
        #[arg(long, env = "BAZAAR_PASSWORD")]
        password: String,
    },

    /// Revoke and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Browse listings of one category
    Listings {
        /// property, hotel, car, experience or ticket
        category: String,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long = "type")]
        listing_type: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
    },

    /// Show one entry per person you have exchanged messages with
    Conversations,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

impl Cli {
    /// Whether this invocation should start the server
    pub fn is_serve(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

/// The client session persisted in the configured session file
async fn open_session(config: &Config) -> Arc<AuthSession> {
    let store = EncryptedFileStore::new(
        &config.client.session_file,
        &config.client.session_secret,
    );
    Arc::new(AuthSession::restore(Arc::new(store)).await)
}

fn api_url<'a>(cli: &'a Cli, config: &'a Config) -> &'a str {
    cli.api_url.as_deref().unwrap_or(&config.client.api_url)
}

async fn create_client(cli: &Cli, config: &Config) -> Result<(ApiClient, Arc<AuthSession>)> {
    let session = open_session(config).await;
    let client = ApiClient::new(api_url(cli, config))
        .context("Failed to create HTTP client")?
        .with_session(session.clone());
    Ok((client, session))
}

/// Run a client command
pub async fn run_command(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.command {
        Some(Commands::Login { email, password }) => cmd_login(cli, config, email, password).await,
        Some(Commands::Logout) => cmd_logout(cli, config).await,
        Some(Commands::Whoami) => cmd_whoami(cli, config).await,
        Some(Commands::Listings {
            category,
            search,
            location,
            listing_type,
            min_price,
            max_price,
        }) => {
            let filters = ListingFilters {
                listing_type: listing_type.clone(),
                min_price: *min_price,
                max_price: *max_price,
                location: location.clone(),
                search: search.clone(),
            };
            cmd_listings(cli, config, category, &filters).await
        }
        Some(Commands::Conversations) => cmd_conversations(cli, config).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        // Serving is handled in main.rs
        None | Some(Commands::Serve) => Ok(()),
    }
}

async fn cmd_login(cli: &Cli, config: &Config, email: &str, password: &str) -> Result<()> {
    let (client, session) = create_client(cli, config).await?;

    let response = client
        .login(email, password)
        .await
        .context("Login failed")?;
    session
        .sign_in(&response.token, response.user.clone())
        .await
        .context("Signed in, but the session could not be saved")?;

    println!(
        "Signed in as {} ({})",
        response.user.name.as_deref().unwrap_or("-"),
        response.user.email
    );
    Ok(())
}

async fn cmd_logout(cli: &Cli, config: &Config) -> Result<()> {
    let (client, session) = create_client(cli, config).await?;

    if !session.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }

    // The server may be unreachable or the token already expired; forget it locally regardless
    if let Err(e) = client.logout().await {
        tracing::warn!(error = %e, "Server-side logout failed");
    }
    session.sign_out().await.context("Failed to clear stored session")?;

    println!("Signed out.");
    Ok(())
}

async fn cmd_whoami(cli: &Cli, config: &Config) -> Result<()> {
    let (client, session) = create_client(cli, config).await?;

    let Some(cached) = session.user() else {
        println!("Not signed in. Use `bazaar login <email>`.");
        return Ok(());
    };

    match client.me().await {
        Ok(user) => {
            println!("{} <{}>", user.name.as_deref().unwrap_or("-"), user.email);
            println!("ID:   {}", user.id);
            println!("Role: {}", user.role);
        }
        Err(e) if e.status() == Some(401) => {
            println!("Session for {} has expired. Please log in again.", cached.email);
        }
        Err(e) => return Err(e).context("Failed to fetch profile"),
    }
    Ok(())
}

async fn cmd_listings(
    cli: &Cli,
    config: &Config,
    category: &str,
    filters: &ListingFilters,
) -> Result<()> {
    let (client, _) = create_client(cli, config).await?;

    let listings = client
        .listings(category, filters)
        .await
        .context("Failed to fetch listings")?;

    if listings.is_empty() {
        println!("No listings found.");
        return Ok(());
    }

    println!();
    println!(
        "{:<36}  {:<32}  {:<20}  {:>14}  {:<8}",
        "ID", "TITLE", "LOCATION", "PRICE", "RATING"
    );
    println!("{}", "-".repeat(118));

    for item in listings {
        let l = &item.listing;
        println!(
            "{:<36}  {:<32}  {:<20}  {:>14}  {:<8}",
            l.id,
            truncate(&l.title, 32),
            truncate(&l.location, 20),
            format_price(l.price, &l.currency),
            format!("{:.1} ({})", l.rating, l.review_count),
        );
    }

    println!();
    Ok(())
}

async fn cmd_conversations(cli: &Cli, config: &Config) -> Result<()> {
    let (client, session) = create_client(cli, config).await?;

    if !session.is_authenticated() {
        anyhow::bail!("Authentication required. Use `bazaar login <email>` first.");
    }

    let conversations = client
        .conversations()
        .await
        .context("Failed to fetch conversations")?;

    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }

    for convo in conversations {
        let who = convo.user.name.as_deref().unwrap_or(&convo.user.email);
        println!(
            "{:<24}  {}  {}",
            truncate(who, 24),
            convo.last_message.created_at.format("%Y-%m-%d %H:%M"),
            truncate(&convo.last_message.body, 60)
        );
    }
    Ok(())
}

fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("[!!] Configuration file not found: {}", config_path.display());
        println!();
        println!("A default configuration will be used when starting the server.");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("Server:");
            println!("  Host:         {}", config.server.host);
            println!("  Port:         {}", config.server.port);
            println!("  Data Dir:     {}", config.server.data_dir.display());
            println!();
            println!("Auth:");
            println!("  Session TTL:  {} days", config.auth.session_ttl_days);
            println!();
            println!("Client:");
            println!("  API URL:      {}", config.client.api_url);
            println!("  Session File: {}", config.client.session_file.display());
            println!();

            let warnings = config_warnings(&config);
            if !warnings.is_empty() {
                println!("Warnings:");
                for warning in warnings {
                    println!("  [!] {}", warning);
                }
                println!();
            }
            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            anyhow::bail!("Invalid configuration file");
        }
    }
}

fn config_warnings(config: &Config) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if config.client.session_secret == Config::default().client.session_secret {
        warnings.push("Default session secret in use - stored sessions are only obfuscated");
    }
    if config.auth.session_ttl_days < 1 {
        warnings.push("session_ttl_days below 1 is treated as 1");
    }
    if config.auth.session_ttl_days > MAX_SESSION_TTL_DAYS {
        warnings.push("session_ttl_days above 3650 is treated as 3650");
    }
    if config.seed.demo_data {
        warnings.push("Demo data seeding is enabled");
    }
    warnings
}

fn format_price(amount: f64, currency: &str) -> String {
    let total = (amount * 100.0).round() as i64;
    let whole = (total / 100).abs();
    let cents = (total % 100).abs();

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if total < 0 { "-" } else { "" };
    if cents == 0 {
        format!("{}{} {}", sign, grouped, currency)
    } else {
        format!("{}{}.{:02} {}", sign, grouped, cents, currency)
    }
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
