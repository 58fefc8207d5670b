//! v1 API endpoints

pub mod llm;

use axum::{
    Router,
    routing::{get, post},
};

use super::health;
use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/util/health-check", get(health::health_check))
        .route("/llm/jelly-donut", post(llm::jelly_donut))
}
