//! lms-credentials - Program credential reconciliation service
//!
//! **Module Identity:**
//! - Name: lms-credentials
//! - Port: 5780 (default)
//!
//! Listens for course certificate events and backpopulation requests, and
//! issues program credentials for newly completed programs in the background.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lms_common::config::{load_toml_config, ConfigFileResolver, LoggingConfig};
use lms_common::EventBus;
use lms_credentials::config::CredentialsServiceConfig;
use lms_credentials::reconciler::Reconciler;
use lms_credentials::worker::AwardQueue;
use lms_credentials::{build_awarder, build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "lms-credentials", version, about = "Program credential reconciliation service")]
struct Args {
    /// Configuration file (overrides LMS_CONFIG and default locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Port to listen on (serve only)
    #[arg(short, long, global = true, env = "LMS_CREDENTIALS_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API and background award workers (default)
    Serve,
    /// Reconcile one user in the foreground and print the report
    Award {
        /// Username to reconcile
        username: String,
    },
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = ConfigFileResolver::new("lms-credentials")
        .with_cli_path(args.config.clone())
        .resolve();
    let config: CredentialsServiceConfig = load_toml_config(config_path.as_deref())?;

    init_tracing(&config.logging)?;

    // Log build identification immediately after tracing init
    info!(
        "Starting lms-credentials v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }

    let db_path = config.database.resolved_path();
    info!("Database: {}", db_path.display());
    let pool = lms_credentials::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let programs_config = Arc::new(config.programs_model());
    let credentials_config = Arc::new(config.credentials_model());
    let awarder = build_awarder(
        &config,
        pool,
        Arc::clone(&programs_config),
        Arc::clone(&credentials_config),
    )?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Award { username } => {
            let report = awarder.reconcile(&username).await.map_err(|e| {
                error!(%username, error = %e, "Reconciliation failed");
                e
            })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_complete() {
                anyhow::bail!("{} program credential(s) failed to issue", report.failed.len());
            }
            Ok(())
        }
        Command::Serve => {
            let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
            let (queue, _workers) = AwardQueue::start(
                Arc::new(awarder),
                config.worker.clone(),
                event_bus.clone(),
            );
            let _listener = queue.listen(&event_bus);

            let state = AppState::new(queue, event_bus, programs_config, credentials_config);
            let app = build_router(state);

            let port = args.port.unwrap_or(config.server.port);
            let addr = format!("{}:{}", config.server.host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}
