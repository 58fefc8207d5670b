//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::JellyDonutService;

/// Application state shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub jelly_donut_service: Arc<JellyDonutService>,
}

impl AppState {
    pub fn new(jelly_donut_service: Arc<JellyDonutService>) -> Self {
        Self {
            jelly_donut_service,
        }
    }
}
