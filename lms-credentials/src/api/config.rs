//! Read-only view of the current remote API configuration

use crate::config::{CredentialsApiConfig, ProgramsApiConfig};
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use lms_common::ConfigEntry;
use serde::Serialize;

/// Current configuration snapshots
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub programs: ConfigEntry<ProgramsApiConfig>,
    pub credentials: ConfigEntry<CredentialsApiConfig>,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        programs: state.programs_config.current().as_ref().clone(),
        credentials: state.credentials_config.current().as_ref().clone(),
    })
}

/// Build config routes
pub fn config_routes() -> Router<AppState> {
    Router::new().route("/api/config", get(get_config))
}
