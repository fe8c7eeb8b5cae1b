//! lms-credentials library interface
//!
//! Program credential reconciliation: when a learner earns a course
//! certificate, work out which programs they have newly completed and ask
//! the credentials service to issue the missing program credentials.

pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reconciler;
pub mod token;
pub mod worker;

pub use crate::error::{ApiError, ApiResult};

use crate::clients::HttpClientFactory;
use crate::config::{CredentialsApiConfig, CredentialsServiceConfig, ProgramsApiConfig};
use crate::db::{SqliteCertificateStore, SqliteUserDirectory};
use crate::error::ClientError;
use crate::reconciler::ProgramCertificateAwarder;
use crate::token::JwtTokenIssuer;
use crate::worker::AwardQueue;
use axum::Router;
use chrono::{DateTime, Utc};
use lms_common::{ConfigModel, EventBus};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Background reconciliation queue
    pub queue: AwardQueue,
    /// Event bus carrying certificate and credential events
    pub event_bus: EventBus,
    pub programs_config: Arc<ConfigModel<ProgramsApiConfig>>,
    pub credentials_config: Arc<ConfigModel<CredentialsApiConfig>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        queue: AwardQueue,
        event_bus: EventBus,
        programs_config: Arc<ConfigModel<ProgramsApiConfig>>,
        credentials_config: Arc<ConfigModel<CredentialsApiConfig>>,
    ) -> Self {
        Self {
            queue,
            event_bus,
            programs_config,
            credentials_config,
            startup_time: Utc::now(),
        }
    }
}

/// Wire the SQLite stores, token issuer and HTTP clients into an awarder
pub fn build_awarder(
    config: &CredentialsServiceConfig,
    pool: SqlitePool,
    programs_config: Arc<ConfigModel<ProgramsApiConfig>>,
    credentials_config: Arc<ConfigModel<CredentialsApiConfig>>,
) -> Result<ProgramCertificateAwarder, ClientError> {
    let tokens = JwtTokenIssuer::new(config.id_token.clone(), config.oauth_clients.clone());
    Ok(ProgramCertificateAwarder::new(
        Arc::new(SqliteUserDirectory::new(pool.clone())),
        Arc::new(SqliteCertificateStore::new(pool)),
        Arc::new(tokens),
        Arc::new(HttpClientFactory::new()?),
        programs_config,
        credentials_config,
        config.service_user.clone(),
    ))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::award_routes())
        .merge(api::config_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
