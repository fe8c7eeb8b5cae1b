//! Language session endpoint

use crate::lang_pref::{apply_language, requested_language};
use crate::session::{extract_session_id, session_cookie};
use crate::{ApiResult, AppState};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tracing::debug;

/// ANY /i18n/session_language
///
/// Only PATCH changes anything; every method answers 200.
pub async fn update_language_session(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    if method != Method::PATCH {
        return Ok(StatusCode::OK.into_response());
    }

    let language = requested_language(&body, &state.settings.i18n.language_code)?;

    let (session_id, created) = state.sessions.resolve(extract_session_id(&headers)).await;
    let changed = state
        .sessions
        .update(session_id, |session| apply_language(session, &language))
        .await;
    debug!(%session_id, %language, changed, "Session language updated");

    let mut response = StatusCode::OK.into_response();
    if created {
        if let Ok(cookie) = HeaderValue::from_str(&session_cookie(session_id)) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    Ok(response)
}

/// Build language routes
pub fn i18n_routes() -> Router<AppState> {
    Router::new().route("/i18n/session_language", any(update_language_session))
}
