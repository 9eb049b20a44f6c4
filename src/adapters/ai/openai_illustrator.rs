//! OpenAI illustrator - DALL-E 3 image generation.
//!
//! DALL-E answers with a short-lived URL rather than bytes; the adapter
//! downloads the image immediately so the payload can be re-hosted in our
//! own storage before the URL expires.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::PipelineError;
use crate::ports::{Illustrator, ImagePayload, ProviderInfo};

use super::prompts;

/// Configuration for the OpenAI illustrator.
#[derive(Debug, Clone)]
pub struct OpenAiIllustratorConfig {
    api_key: Secret<String>,
    /// Model to use (e.g. "dall-e-3").
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Request timeout; image generation is slow.
    pub timeout: Duration,
}

impl OpenAiIllustratorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "dall-e-3".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(180),
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

/// Wide hero format supported by DALL-E 3.
const IMAGE_SIZE: &str = "1792x1024";

pub struct OpenAiIllustrator {
    config: OpenAiIllustratorConfig,
    client: Client,
}

impl OpenAiIllustrator {
    pub fn new(config: OpenAiIllustratorConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn generations_url(&self) -> String {
        format!("{}/images/generations", self.config.base_url)
    }

    async fn generate(&self, prompt: &str) -> Result<ImagePayload, PipelineError> {
        let request = ImageRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: IMAGE_SIZE.to_string(),
            quality: "hd".to_string(),
            style: "vivid".to_string(),
            response_format: "url".to_string(),
        };

        let response = self
            .client
            .post(self.generations_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = handle_status(response).await?;

        let image_response: ImageResponse = response.json().await.map_err(|e| {
            PipelineError::transient(format!("openai: failed to read image response: {e}"))
        })?;

        let url = image_response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| PipelineError::permanent("openai: image response carried no url"))?;

        self.download(&url).await
    }

    /// Fetches the generated image from its ephemeral URL.
    async fn download(&self, url: &str) -> Result<ImagePayload, PipelineError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(PipelineError::transient(format!(
                "openai: image download failed with status {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        let bytes = response.bytes().await.map_err(|e| {
            PipelineError::transient(format!("openai: image download interrupted: {e}"))
        })?;

        Ok(ImagePayload::new(bytes.to_vec(), content_type))
    }
}

#[async_trait]
impl Illustrator for OpenAiIllustrator {
    async fn generate_image(&self, prompt: &str) -> Result<ImagePayload, PipelineError> {
        self.generate(prompt).await
    }

    async fn generate_social_card(
        &self,
        title: &str,
        excerpt: &str,
        _image_url: &str,
    ) -> Result<ImagePayload, PipelineError> {
        let prompt = prompts::social_card_prompt(title, excerpt);
        self.generate(&prompt).await
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo::new("openai", &self.config.model)
    }
}

fn map_send_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::transient("openai: image request timed out")
    } else if e.is_connect() {
        PipelineError::transient(format!("openai: connection failed: {e}"))
    } else {
        PipelineError::transient(format!("openai: image request failed: {e}"))
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
            "openai: authentication failed: {body:.200}"
        ))),
        // 400 covers content-policy rejections, which no retry will fix.
        400 | 404 | 422 => Err(PipelineError::permanent(format!(
            "openai: rejected image request ({status}): {body:.200}"
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
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    quality: String,
    style: String,
    response_format: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = OpenAiIllustratorConfig::new("test-key")
            .with_model("dall-e-2")
            .with_base_url("https://custom.api.com/v1")
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.model, "dall-e-2");
        assert_eq!(config.base_url, "https://custom.api.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn info_reports_provider_and_model() {
        let illustrator = OpenAiIllustrator::new(OpenAiIllustratorConfig::new("k"));
        let info = illustrator.info();
        assert_eq!(info.name, "openai");
        assert_eq!(info.model, "dall-e-3");
    }
}
