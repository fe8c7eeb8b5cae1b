//! lms-web - Platform preference endpoints
//!
//! **Module Identity:**
//! - Name: lms-web
//! - Port: 5781 (default)
//!
//! Serves the session language endpoint and the XBlock disable / deprecate
//! configuration API.

use anyhow::{Context, Result};
use clap::Parser;
use lms_common::config::{load_toml_config, ConfigFileResolver, LoggingConfig};
use lms_web::config::WebConfig;
use lms_web::{build_router, AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lms-web", version, about = "Language session and XBlock configuration endpoints")]
struct Args {
    /// Configuration file (overrides LMS_CONFIG and default locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "LMS_WEB_PORT")]
    port: Option<u16>,
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

    let config_path = ConfigFileResolver::new("lms-web")
        .with_cli_path(args.config)
        .resolve();
    let config: WebConfig = load_toml_config(config_path.as_deref())?;

    init_tracing(&config.logging)?;

    // Log build identification immediately after tracing init
    info!(
        "Starting lms-web v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }
    info!("Default language: {}", config.i18n.language_code);

    let addr = format!(
        "{}:{}",
        config.server.host,
        args.port.unwrap_or(config.server.port)
    );

    let state = AppState::new(config, config_path);
    info!("XBlock configuration: {}", state.xblock_config.current().value);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
