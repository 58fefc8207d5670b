//! EdStats LLM Gateway
//!
//! One text-generation contract over interchangeable LLM backends:
//! - Gemini, OpenAI and Anthropic clients behind the `LlmProvider` trait
//! - `LlmFactory` as the single entry point, with retry and timeouts
//! - A small HTTP surface and CLI on top

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::DomainError;
use infrastructure::{llm::LlmFactory, services::JellyDonutService};

/// Build the shared application state from configuration
pub fn create_app_state(config: &AppConfig) -> Result<AppState, DomainError> {
    let factory = LlmFactory::from_config(&config.llm)?;
    let jelly_donut_service = JellyDonutService::new(factory);

    Ok(AppState::new(Arc::new(jelly_donut_service)))
}
