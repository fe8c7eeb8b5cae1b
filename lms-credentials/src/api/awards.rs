//! Award triggers
//!
//! - `POST /api/programs/award/:username` queues a reconciliation directly
//!   (used to backpopulate credentials for a user)
//! - `POST /api/events/certificate-awarded` publishes a course certificate
//!   event; the award queue listener reacts to it

use crate::worker::Enqueued;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use lms_common::LmsEvent;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Response for a queued award request
#[derive(Debug, Serialize)]
pub struct AwardQueuedResponse {
    pub username: String,
    /// "queued" or "coalesced"
    pub status: String,
}

/// POST /api/programs/award/:username
pub async fn queue_award(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<(StatusCode, Json<AwardQueuedResponse>)> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username cannot be empty".to_string()));
    }

    let status = match state.queue.enqueue(&username) {
        Ok(Enqueued::Queued) => "queued",
        Ok(Enqueued::Coalesced) => "coalesced",
        Err(e) => return Err(ApiError::Unavailable(e.to_string())),
    };

    info!(%username, status, "Program credential reconciliation requested");

    Ok((
        StatusCode::ACCEPTED,
        Json(AwardQueuedResponse {
            username,
            status: status.to_string(),
        }),
    ))
}

/// Request payload for a course certificate event
#[derive(Debug, Deserialize)]
pub struct CertificateAwardedRequest {
    pub username: String,
    pub course_id: String,
}

/// Response payload for an accepted event
#[derive(Debug, Serialize)]
pub struct EventAcceptedResponse {
    pub accepted: bool,
    pub subscribers: usize,
}

/// POST /api/events/certificate-awarded
pub async fn certificate_awarded(
    State(state): State<AppState>,
    Json(payload): Json<CertificateAwardedRequest>,
) -> ApiResult<(StatusCode, Json<EventAcceptedResponse>)> {
    if payload.username.trim().is_empty() || payload.course_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "username and course_id are required".to_string(),
        ));
    }

    let subscribers = state
        .event_bus
        .emit(LmsEvent::CourseCertificateAwarded {
            username: payload.username,
            course_id: payload.course_id,
            timestamp: Utc::now(),
        })
        .unwrap_or(0);

    Ok((
        StatusCode::ACCEPTED,
        Json(EventAcceptedResponse {
            accepted: true,
            subscribers,
        }),
    ))
}

/// Build award routes
pub fn award_routes() -> Router<AppState> {
    Router::new()
        .route("/api/programs/award/:username", post(queue_award))
        .route("/api/events/certificate-awarded", post(certificate_awarded))
}
