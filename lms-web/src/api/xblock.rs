//! XBlock configuration endpoints
//!
//! - `GET  /api/xblock/config` current configuration plus derived lists
//! - `GET  /api/xblock/disabled/:block_type`
//! - `PUT  /api/xblock/config` record a new revision
//! - `POST /api/xblock/config/reload` record `[xblock.admin]` from the config file

use crate::config::load_xblock_admin;
use crate::xblock::{deprecated_block_types, disabled_block_types, is_block_type_disabled, XBlockDisableConfig};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use lms_common::ConfigEntry;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Current block configuration with its derived type lists
#[derive(Debug, Serialize)]
pub struct XBlockConfigResponse {
    pub revision: u64,
    pub enabled: bool,
    pub changed_by: Option<String>,
    pub change_date: DateTime<Utc>,
    pub disabled_blocks: String,
    pub deprecated_blocks: String,
    pub disabled_block_types: Vec<String>,
    /// Admin list merged with deployment settings
    pub deprecated_block_types: Vec<String>,
    pub display: String,
}

impl XBlockConfigResponse {
    fn new(entry: &ConfigEntry<XBlockDisableConfig>, settings: Option<&[String]>) -> Self {
        Self {
            revision: entry.revision,
            enabled: entry.enabled,
            changed_by: entry.changed_by.clone(),
            change_date: entry.change_date,
            disabled_blocks: entry.value.disabled_blocks.clone(),
            deprecated_blocks: entry.value.deprecated_blocks.clone(),
            disabled_block_types: disabled_block_types(entry),
            deprecated_block_types: deprecated_block_types(entry, settings),
            display: entry.value.to_string(),
        }
    }
}

fn response_for(state: &AppState, entry: &ConfigEntry<XBlockDisableConfig>) -> XBlockConfigResponse {
    XBlockConfigResponse::new(
        entry,
        state.settings.xblock.deprecated_advanced_component_types.as_deref(),
    )
}

/// GET /api/xblock/config
pub async fn get_xblock_config(State(state): State<AppState>) -> Json<XBlockConfigResponse> {
    Json(response_for(&state, &state.xblock_config.current()))
}

/// Response for a single block type lookup
#[derive(Debug, Serialize)]
pub struct BlockTypeStatus {
    pub block_type: String,
    pub disabled: bool,
}

/// GET /api/xblock/disabled/:block_type
pub async fn get_block_type_status(
    State(state): State<AppState>,
    Path(block_type): Path<String>,
) -> Json<BlockTypeStatus> {
    let disabled = is_block_type_disabled(&state.xblock_config.current(), &block_type);
    Json(BlockTypeStatus { block_type, disabled })
}

/// Request payload for a new configuration revision
#[derive(Debug, Deserialize)]
pub struct UpdateXBlockConfigRequest {
    pub enabled: bool,
    #[serde(default)]
    pub disabled_blocks: String,
    #[serde(default)]
    pub deprecated_blocks: String,
    #[serde(default)]
    pub changed_by: Option<String>,
}

/// PUT /api/xblock/config
pub async fn update_xblock_config(
    State(state): State<AppState>,
    Json(request): Json<UpdateXBlockConfigRequest>,
) -> ApiResult<Json<XBlockConfigResponse>> {
    let entry = state.xblock_config.record(
        request.enabled,
        XBlockDisableConfig {
            disabled_blocks: request.disabled_blocks,
            deprecated_blocks: request.deprecated_blocks,
        },
        request.changed_by.as_deref(),
    );
    info!(revision = entry.revision, "XBlock configuration updated: {}", entry.value);
    Ok(Json(response_for(&state, &entry)))
}

/// POST /api/xblock/config/reload
pub async fn reload_xblock_config(
    State(state): State<AppState>,
) -> ApiResult<Json<XBlockConfigResponse>> {
    let path = state
        .config_path
        .as_deref()
        .ok_or_else(|| ApiError::NotFound("no configuration file in use".to_string()))?;

    let admin = load_xblock_admin(path)?.ok_or_else(|| {
        ApiError::NotFound(format!("{} has no [xblock.admin] section", path.display()))
    })?;

    let entry = state
        .xblock_config
        .record(admin.enabled, admin.blocks, Some("config-reload"));
    info!(
        revision = entry.revision,
        path = %path.display(),
        "XBlock configuration reloaded"
    );
    Ok(Json(response_for(&state, &entry)))
}

/// Build XBlock configuration routes
pub fn xblock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/xblock/config", get(get_xblock_config).put(update_xblock_config))
        .route("/api/xblock/config/reload", post(reload_xblock_config))
        .route("/api/xblock/disabled/:block_type", get(get_block_type_status))
}
