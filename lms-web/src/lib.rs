//! lms-web library interface
//!
//! Small platform endpoints: the session language preference and the
//! XBlock disable / deprecate configuration.

pub mod api;
pub mod config;
pub mod error;
pub mod lang_pref;
pub mod session;
pub mod xblock;

pub use crate::error::{ApiError, ApiResult};

use crate::config::WebConfig;
use crate::session::SessionStore;
use crate::xblock::XBlockDisableConfig;
use axum::Router;
use chrono::{DateTime, Utc};
use lms_common::ConfigModel;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub xblock_config: Arc<ConfigModel<XBlockDisableConfig>>,
    /// Settings loaded at startup
    pub settings: Arc<WebConfig>,
    /// File the settings came from; reloads read it again
    pub config_path: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(settings: WebConfig, config_path: Option<PathBuf>) -> Self {
        let xblock_config = Arc::new(settings.xblock_model());
        Self {
            sessions: settings.session.store(),
            xblock_config,
            settings: Arc::new(settings),
            config_path,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::i18n_routes())
        .merge(api::xblock_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
