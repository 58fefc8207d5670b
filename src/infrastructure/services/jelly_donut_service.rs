//! Jelly donut service - Content generation on top of the LLM factory

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DomainError, GenerationOptions};
use crate::infrastructure::llm::LlmFactory;

/// Generated content together with the prompt that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JellyDonutResponse {
    pub message: String,
    pub model: String,
    pub provider: String,
    pub prompt: String,
}

/// Content-generation service; knows nothing about individual providers
#[derive(Debug, Clone)]
pub struct JellyDonutService {
    llm: LlmFactory,
}

impl JellyDonutService {
    pub fn new(llm: LlmFactory) -> Self {
        Self { llm }
    }

    /// Generate a reply for `message`, falling back to the default prompt
    pub async fn get_jelly_donut_response(
        &self,
        message: Option<&str>,
    ) -> Result<JellyDonutResponse, DomainError> {
        let prompt = LlmFactory::effective_prompt(message)?;
        debug!(provider = self.llm.provider_name(), "Generating jelly donut response");

        let response = self
            .llm
            .generate_text(Some(prompt), GenerationOptions::default())
            .await?;

        Ok(JellyDonutResponse {
            message: response.text,
            model: response.model,
            provider: response.provider,
            prompt: prompt.to_string(),
        })
    }
}
