//! OpenAI rewriter - article rewriting over the chat completions API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAiRewriterConfig::new(api_key)
//!     .with_model("gpt-4-turbo-preview");
//!
//! let rewriter = OpenAiRewriter::new(config);
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::PipelineError;
use crate::ports::{
    ImagePromptOutput, ProviderInfo, RewriteOutput, RewriteRequest, Rewriter,
};

use super::prompts;
use super::response::{clean_text_response, parse_rewrite_result};

/// Configuration for the OpenAI rewriter.
#[derive(Debug, Clone)]
pub struct OpenAiRewriterConfig {
    api_key: Secret<String>,
    /// Model to use (e.g. "gpt-4-turbo-preview").
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiRewriterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4-turbo-preview".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Sampling temperature for all rewrite calls.
const TEMPERATURE: f32 = 0.7;
/// Completion budget; a full article rewrite fits comfortably.
const MAX_TOKENS: u32 = 2000;

pub struct OpenAiRewriter {
    config: OpenAiRewriterConfig,
    client: Client,
}

impl OpenAiRewriter {
    pub fn new(config: OpenAiRewriterConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// One chat call: system + user message, returns the assistant text.
    async fn chat(&self, system: &str, user: &str) -> Result<String, PipelineError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = handle_status(response).await?;

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            PipelineError::transient(format!("openai: failed to read response body: {e}"))
        })?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::permanent("openai: response contained no choices"))?;

        Ok(choice.message.content)
    }
}

#[async_trait]
impl Rewriter for OpenAiRewriter {
    async fn rewrite(&self, request: &RewriteRequest) -> Result<RewriteOutput, PipelineError> {
        let system = prompts::rewrite_system_prompt();
        let user = prompts::rewrite_user_prompt(request);

        let raw = self.chat(&system, &user).await?;
        let result = parse_rewrite_result(&raw)?;

        Ok(RewriteOutput {
            result,
            prompt: user,
        })
    }

    async fn image_prompt(
        &self,
        title: &str,
        excerpt: &str,
    ) -> Result<ImagePromptOutput, PipelineError> {
        let user = prompts::image_prompt_user(title, excerpt);
        let raw = self.chat(prompts::IMAGE_PROMPT_SYSTEM, &user).await?;
        let prompt = clean_text_response(&raw)?;

        Ok(ImagePromptOutput {
            prompt,
            request_prompt: user,
        })
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::new("openai", &self.config.model)
    }
}

/// Maps reqwest transport errors; they are all retryable.
fn map_send_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::transient("openai: request timed out")
    } else if e.is_connect() {
        PipelineError::transient(format!("openai: connection failed: {e}"))
    } else {
        PipelineError::transient(format!("openai: request failed: {e}"))
    }
}

/// Classifies non-2xx statuses: client mistakes are permanent, rate limits
/// and server errors are transient.
async fn handle_status(response: Response) -> Result<Response, PipelineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(PipelineError::permanent(format!(
            "openai: authentication failed: {body:.200}"
        ))),
        400 | 404 | 422 => Err(PipelineError::permanent(format!(
            "openai: rejected request ({status}): {body:.200}"
        ))),
        429 => Err(PipelineError::transient(format!(
            "openai: rate limited: {body:.200}"
        ))),
        _ => Err(PipelineError::transient(format!(
            "openai: server error ({status}): {body:.200}"
        ))),
    }
}

// ----- OpenAI API types -----

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = OpenAiRewriterConfig::new("test-key")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com/v1")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://custom.api.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn default_model_is_gpt4_turbo_preview() {
        let config = OpenAiRewriterConfig::new("k");
        assert_eq!(config.model, "gpt-4-turbo-preview");
    }

    #[test]
    fn info_reports_provider_and_model() {
        let rewriter = OpenAiRewriter::new(OpenAiRewriterConfig::new("k"));
        let info = rewriter.info();
        assert_eq!(info.name, "openai");
        assert_eq!(info.model, "gpt-4-turbo-preview");
    }
}
