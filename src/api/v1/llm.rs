//! Content-generation endpoints

use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::trace;

use crate::api::middleware::truncate_for_log;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

const MAX_LOGGED_PROMPT_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JellyDonutRequest {
    pub message: Option<String>,
}

/// Generate a reply for the optional `message`; the body itself may be
/// omitted
pub async fn jelly_donut(
    State(state): State<AppState>,
    request: Option<Json<JellyDonutRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let message = request.and_then(|Json(request)| request.message);

    if let Some(ref message) = message {
        trace!(
            message = %truncate_for_log(message, MAX_LOGGED_PROMPT_CHARS),
            "Jelly donut request"
        );
    }

    let response = state
        .jelly_donut_service
        .get_jelly_donut_response(message.as_deref())
        .await?;

    Ok(Json(response))
}
