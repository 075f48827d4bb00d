//! Kirana CLI - Cache maintenance and diagnostics.
//!
//! # Usage
//!
//! ```bash
//! # Report cache size
//! kirana-cli cache stats
//!
//! # Drop every cached catalog entry
//! kirana-cli cache clear
//!
//! # Probe internet reachability once
//! kirana-cli net check
//!
//! # Decode a receipt QR token
//! kirana-cli receipt decode -t "eyJjYXJ0X2lkIjo5MSwi..."
//! ```
//!
//! # Commands
//!
//! - `cache` - Inspect or clear the persistent catalog cache
//! - `net` - Connectivity diagnostics
//! - `receipt` - Decode receipt QR tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "kirana-cli")]
#[command(author, version, about = "Kirana CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or clear the persistent catalog cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Connectivity diagnostics
    Net {
        #[command(subcommand)]
        action: NetAction,
    },
    /// Decode receipt QR tokens
    Receipt {
        #[command(subcommand)]
        action: ReceiptAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cache size
    Stats,
    /// Drop every cached catalog entry
    Clear,
}

#[derive(Subcommand)]
enum NetAction {
    /// Probe internet reachability once
    Check,
}

#[derive(Subcommand)]
enum ReceiptAction {
    /// Decode a receipt QR token
    Decode {
        /// The base64 token from the QR code
        #[arg(short, long)]
        token: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    )))
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Sentry must be initialized before the tracing subscriber.
    let _sentry_guard = init_sentry();

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kirana_cli=info,kirana_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cache { action } => match action {
            CacheAction::Stats => commands::cache::stats().await?,
            CacheAction::Clear => commands::cache::clear().await?,
        },
        Commands::Net { action } => match action {
            NetAction::Check => commands::net::check().await?,
        },
        Commands::Receipt { action } => match action {
            ReceiptAction::Decode { token } => commands::receipt::decode(&token)?,
        },
    }
    Ok(())
}
