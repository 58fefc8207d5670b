use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::{HttpClientTrait, with_deadline};
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole,
    ProviderConfig, ProviderErrorKind, Usage,
};

const PROVIDER: &str = "gemini";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider
pub struct GeminiProvider<C: HttpClientTrait> {
    client: C,
    config: ProviderConfig,
    base_url: String,
}

impl<C: HttpClientTrait> GeminiProvider<C> {
    pub fn new(client: C, config: ProviderConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let base_url = config
            .base_url()
            .unwrap_or(DEFAULT_GEMINI_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn generate_content_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request(&self, request: &LlmRequest) -> GeminiRequest {
        let system_text: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role() == MessageRole::System)
            .map(Message::content)
            .collect();

        let system_instruction = if system_text.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(system_text.join("\n")),
                }],
            })
        };

        let contents = request
            .messages
            .iter()
            .filter(|m| m.role() != MessageRole::System)
            .map(GeminiContent::from_domain)
            .collect();

        let generation_config = GeminiGenerationConfig {
            temperature: request.temperature.or(self.config.temperature()),
            top_p: request.top_p.or(self.config.top_p()),
            top_k: request.top_k.or(self.config.top_k()),
            max_output_tokens: request.max_tokens.or(self.config.max_tokens()),
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(generation_config).filter(|c| !c.is_empty()),
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-goog-api-key", self.config.api_key()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(
        &self,
        json: serde_json::Value,
        requested_model: &str,
    ) -> Result<LlmResponse, DomainError> {
        let response: GeminiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::invalid_upstream(PROVIDER, format!("Failed to parse response: {}", e))
        })?;

        let candidate = match response.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .map(|r| format!("Prompt blocked: {}", r))
                    .unwrap_or_else(|| "No candidates in response".to_string());
                return Err(DomainError::invalid_upstream(PROVIDER, reason));
            }
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let model = response
            .model_version
            .unwrap_or_else(|| requested_model.to_string());

        let mut llm_response = LlmResponse::new(text, model, PROVIDER);

        if let Some(reason) = candidate.finish_reason {
            llm_response = llm_response.with_finish_reason(parse_finish_reason(&reason));
        }

        if let Some(usage) = response.usage_metadata {
            llm_response = llm_response.with_usage(Usage::new(
                usage.prompt_token_count,
                usage.candidates_token_count,
            ));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for GeminiProvider<C> {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.model().to_string());

        let url = self.generate_content_url(&model);
        let body = serde_json::json!(self.build_request(&request));

        let response = with_deadline(
            PROVIDER,
            self.config.timeout(),
            self.client.post_json(&url, self.headers(), &body),
        )
        .await
        .map_err(reclassify_error)?;

        self.parse_response(response, &model)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn default_model(&self) -> &str {
        self.config.model()
    }
}

impl<C: HttpClientTrait> std::fmt::Debug for GeminiProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("config", &self.config)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Gemini reports a bad key as HTTP 400 `API_KEY_INVALID` rather than 401
fn reclassify_error(error: DomainError) -> DomainError {
    let error = error.with_provider(PROVIDER);

    match &error {
        DomainError::Generation {
            kind: ProviderErrorKind::Unknown,
            message,
            ..
        } if message.contains("API_KEY_INVALID")
            || message.to_lowercase().contains("api key not valid") =>
        {
            DomainError::authentication(PROVIDER, message.clone())
        }
        _ => error,
    }
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        other => FinishReason::Other(other.to_lowercase()),
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role() {
            MessageRole::Assistant => "model",
            MessageRole::User | MessageRole::System => "user",
        };

        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart {
                text: Some(message.content().to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl GeminiGenerationConfig {
    fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && self.max_output_tokens.is_none()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
    model_version: Option<String>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use std::time::Duration;

    const TEST_URL: &str =
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent";

    fn config() -> ProviderConfig {
        ProviderConfig::new("test-gemini-key", "gemini-1.5-pro")
            .with_temperature(Some(0.7))
            .with_max_tokens(Some(4096))
            .with_top_p(Some(0.95))
    }

    fn success_body() -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Plants turn light " },
                        { "text": "into chemical energy." }
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 4,
                "candidatesTokenCount": 7,
                "totalTokenCount": 11
            },
            "modelVersion": "gemini-1.5-pro-002"
        })
    }

    #[tokio::test]
    async fn test_gemini_generate() {
        let client = MockHttpClient::new().with_response(TEST_URL, success_body());
        let provider = GeminiProvider::new(client, config()).unwrap();

        let request = LlmRequest::builder().user("Explain photosynthesis").build();
        let response = provider.generate(request).await.unwrap();

        assert_eq!(response.text, "Plants turn light into chemical energy.");
        assert_eq!(response.provider, "gemini");
        assert_eq!(response.model, "gemini-1.5-pro-002");
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage, Some(Usage::new(4, 7)));
    }

    #[tokio::test]
    async fn test_gemini_request_shape() {
        let client = MockHttpClient::new().with_response(TEST_URL, success_body());
        let provider = GeminiProvider::new(client, config()).unwrap();

        let request = LlmRequest::builder()
            .system("Answer in one sentence")
            .user("Hello")
            .assistant("Hi!")
            .user("Explain photosynthesis")
            .temperature(0.2)
            .build();
        provider.generate(request).await.unwrap();

        let captured = provider.client.last_request().unwrap();
        assert_eq!(captured.header("x-goog-api-key"), Some("test-gemini-key"));
        assert!(!captured.url.contains("test-gemini-key"));

        let body = &captured.body;
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Answer in one sentence");
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "Explain photosynthesis");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert!(body["generationConfig"].get("stopSequences").is_none());
    }

    #[tokio::test]
    async fn test_gemini_huge_token_counts_saturate() {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] }, "finishReason": "STOP" }],
            "usageMetadata": { "promptTokenCount": u32::MAX, "candidatesTokenCount": 1 }
        });
        let client = MockHttpClient::new().with_response(TEST_URL, body);
        let provider = GeminiProvider::new(client, config()).unwrap();

        let request = LlmRequest::builder().user("Hello").build();
        let usage = provider.generate(request).await.unwrap().usage.unwrap();

        assert_eq!(usage.prompt_tokens, u32::MAX);
        assert_eq!(usage.total_tokens, u32::MAX);
    }

    #[tokio::test]
    async fn test_gemini_model_override_changes_endpoint() {
        let flash_url =
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "ok" }] }, "finishReason": "STOP" }]
        });
        let client = MockHttpClient::new().with_response(flash_url, body);
        let provider = GeminiProvider::new(client, config()).unwrap();

        let request = LlmRequest::builder()
            .user("Hi")
            .model("gemini-1.5-flash")
            .build();
        let response = provider.generate(request).await.unwrap();

        assert_eq!(response.model, "gemini-1.5-flash");
    }

    #[tokio::test]
    async fn test_gemini_invalid_key_maps_to_authentication() {
        let client = MockHttpClient::new().with_error(
            TEST_URL,
            ProviderErrorKind::Unknown,
            "HTTP 400: API key not valid. Please pass a valid API key.",
        );
        let provider = GeminiProvider::new(client, config()).unwrap();

        let request = LlmRequest::builder().user("Hello").build();
        let error = provider.generate(request).await.unwrap_err();

        assert_eq!(error.kind(), Some(ProviderErrorKind::Authentication));
        assert_eq!(error.provider(), Some("gemini"));
        assert!(!error.to_string().contains("test-gemini-key"));
    }

    #[tokio::test]
    async fn test_gemini_blocked_prompt() {
        let body = serde_json::json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "SAFETY" }
        });
        let client = MockHttpClient::new().with_response(TEST_URL, body);
        let provider = GeminiProvider::new(client, config()).unwrap();

        let request = LlmRequest::builder().user("Hello").build();
        let error = provider.generate(request).await.unwrap_err();

        assert_eq!(error.kind(), Some(ProviderErrorKind::InvalidUpstreamResponse));
        assert!(error.to_string().contains("SAFETY"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gemini_timeout() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, success_body())
            .with_delay(Duration::from_secs(30));
        let provider =
            GeminiProvider::new(client, config().with_timeout(Duration::from_secs(5))).unwrap();

        let request = LlmRequest::builder().user("Hello").build();
        let error = provider.generate(request).await.unwrap_err();

        assert_eq!(error.kind(), Some(ProviderErrorKind::Timeout));
        assert_eq!(error.provider(), Some("gemini"));
    }

    #[test]
    fn test_gemini_requires_credential() {
        let result = GeminiProvider::new(
            MockHttpClient::new(),
            ProviderConfig::new("", "gemini-1.5-pro"),
        );
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let provider = GeminiProvider::new(MockHttpClient::new(), config()).unwrap();
        assert!(!format!("{:?}", provider).contains("test-gemini-key"));
    }
}
