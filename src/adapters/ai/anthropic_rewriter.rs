//! Anthropic rewriter - article rewriting over the messages API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = AnthropicRewriterConfig::new(api_key)
//!     .with_model("claude-3-opus-20240229");
//!
//! let rewriter = AnthropicRewriter::new(config);
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

/// Configuration for the Anthropic rewriter.
#[derive(Debug, Clone)]
pub struct AnthropicRewriterConfig {
    api_key: Secret<String>,
    /// Model to use (e.g. "claude-3-opus-20240229").
    pub model: String,
    /// Base URL for the API (default: https://api.anthropic.com).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl AnthropicRewriterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "claude-3-opus-20240229".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
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

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
/// Sampling temperature for all rewrite calls.
const TEMPERATURE: f32 = 0.7;
/// Completion budget; a full article rewrite fits comfortably.
const MAX_TOKENS: u32 = 2000;

pub struct AnthropicRewriter {
    config: AnthropicRewriterConfig,
    client: Client,
}

impl AnthropicRewriter {
    pub fn new(config: AnthropicRewriterConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// One messages call: system prompt plus a single user turn, returns
    /// the joined text blocks of the answer.
    async fn chat(&self, system: &str, user: &str) -> Result<String, PipelineError> {
        let request = MessagesRequest {
            model: self.config.model.clone(),
            system: system.to_string(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = handle_status(response).await?;

        let messages_response: MessagesResponse = response.json().await.map_err(|e| {
            PipelineError::transient(format!("anthropic: failed to read response body: {e}"))
        })?;

        let content = messages_response
            .content
            .into_iter()
            .filter_map(|block| {
                if block.block_type == "text" {
                    block.text
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(PipelineError::permanent(
                "anthropic: response contained no text blocks",
            ));
        }

        Ok(content)
    }
}

#[async_trait]
impl Rewriter for AnthropicRewriter {
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
        ProviderInfo::new("anthropic", &self.config.model)
    }
}

fn map_send_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::transient("anthropic: request timed out")
    } else if e.is_connect() {
        PipelineError::transient(format!("anthropic: connection failed: {e}"))
    } else {
        PipelineError::transient(format!("anthropic: request failed: {e}"))
    }
}

async fn handle_status(response: Response) -> Result<Response, PipelineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        401 | 403 => Err(PipelineError::permanent(format!(
            "anthropic: authentication failed: {body:.200}"
        ))),
        400 | 404 | 422 => Err(PipelineError::permanent(format!(
            "anthropic: rejected request ({status}): {body:.200}"
        ))),
        429 | 529 => Err(PipelineError::transient(format!(
            "anthropic: rate limited or overloaded: {body:.200}"
        ))),
        _ => Err(PipelineError::transient(format!(
            "anthropic: server error ({status}): {body:.200}"
        ))),
    }
}

// ----- Anthropic API types -----

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    system: String,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = AnthropicRewriterConfig::new("test-key")
            .with_model("claude-3-haiku-20240307")
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(45));

        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn default_model_is_opus() {
        let config = AnthropicRewriterConfig::new("k");
        assert_eq!(config.model, "claude-3-opus-20240229");
    }

    #[test]
    fn info_reports_provider_and_model() {
        let rewriter = AnthropicRewriter::new(AnthropicRewriterConfig::new("k"));
        let info = rewriter.info();
        assert_eq!(info.name, "anthropic");
        assert_eq!(info.model, "claude-3-opus-20240229");
    }
}
