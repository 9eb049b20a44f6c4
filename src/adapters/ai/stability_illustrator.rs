//! Stability AI illustrator - SDXL text-to-image generation.
//!
//! Stability returns the image inline as a base64 artifact, so unlike the
//! DALL-E adapter there is no follow-up download.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::foundation::PipelineError;
use crate::ports::{Illustrator, ImagePayload, ProviderInfo};

use super::prompts;

/// Configuration for the Stability illustrator.
#[derive(Debug, Clone)]
pub struct StabilityIllustratorConfig {
    api_key: Secret<String>,
    /// Engine to use (e.g. "stable-diffusion-xl-1024-v1-0").
    pub engine: String,
    /// Base URL for the API (default: https://api.stability.ai).
    pub base_url: String,
    /// Request timeout; image generation is slow.
    pub timeout: Duration,
}

impl StabilityIllustratorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            engine: "stable-diffusion-xl-1024-v1-0".to_string(),
            base_url: "https://api.stability.ai".to_string(),
            timeout: Duration::from_secs(180),
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
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

/// Classifier-free guidance; how closely SDXL follows the prompt.
const CFG_SCALE: u32 = 7;
/// Diffusion steps.
const STEPS: u32 = 30;
/// Wide SDXL-native resolution.
const WIDTH: u32 = 1344;
const HEIGHT: u32 = 768;

pub struct StabilityIllustrator {
    config: StabilityIllustratorConfig,
    client: Client,
}

impl StabilityIllustrator {
    pub fn new(config: StabilityIllustratorConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn text_to_image_url(&self) -> String {
        format!(
            "{}/v1/generation/{}/text-to-image",
            self.config.base_url, self.config.engine
        )
    }

    async fn generate(&self, prompt: &str) -> Result<ImagePayload, PipelineError> {
        let request = GenerationRequest {
            text_prompts: vec![TextPrompt {
                text: prompt.to_string(),
                weight: 1.0,
            }],
            cfg_scale: CFG_SCALE,
            steps: STEPS,
            width: WIDTH,
            height: HEIGHT,
            samples: 1,
        };

        let response = self
            .client
            .post(self.text_to_image_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let response = handle_status(response).await?;

        let generation: GenerationResponse = response.json().await.map_err(|e| {
            PipelineError::transient(format!("stability: failed to read response body: {e}"))
        })?;

        let artifact = generation
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::permanent("stability: response carried no artifacts"))?;

        if artifact.finish_reason.as_deref() == Some("CONTENT_FILTERED") {
            return Err(PipelineError::permanent(
                "stability: image was content-filtered",
            ));
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(artifact.base64)
            .map_err(|e| {
                PipelineError::permanent(format!("stability: artifact is not valid base64: {e}"))
            })?;

        Ok(ImagePayload::new(bytes, "image/png"))
    }
}

#[async_trait]
impl Illustrator for StabilityIllustrator {
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
        ProviderInfo::new("stability", &self.config.engine)
    }
}

fn map_send_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::transient("stability: request timed out")
    } else if e.is_connect() {
        PipelineError::transient(format!("stability: connection failed: {e}"))
    } else {
        PipelineError::transient(format!("stability: request failed: {e}"))
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
            "stability: authentication failed: {body:.200}"
        ))),
        400 | 404 | 422 => Err(PipelineError::permanent(format!(
            "stability: rejected request ({status}): {body:.200}"
        ))),
        429 => Err(PipelineError::transient(format!(
            "stability: rate limited: {body:.200}"
        ))),
        _ => Err(PipelineError::transient(format!(
            "stability: server error ({status}): {body:.200}"
        ))),
    }
}

// ----- Stability API types -----

#[derive(Debug, Serialize)]
struct GenerationRequest {
    text_prompts: Vec<TextPrompt>,
    cfg_scale: u32,
    steps: u32,
    width: u32,
    height: u32,
    samples: u32,
}

#[derive(Debug, Serialize)]
struct TextPrompt {
    text: String,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    base64: String,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = StabilityIllustratorConfig::new("test-key")
            .with_engine("stable-diffusion-v1-6")
            .with_base_url("https://custom.api.com")
            .with_timeout(Duration::from_secs(90));

        assert_eq!(config.engine, "stable-diffusion-v1-6");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn default_engine_is_sdxl() {
        let config = StabilityIllustratorConfig::new("k");
        assert_eq!(config.engine, "stable-diffusion-xl-1024-v1-0");
    }

    #[test]
    fn info_reports_provider_and_engine() {
        let illustrator = StabilityIllustrator::new(StabilityIllustratorConfig::new("k"));
        let info = illustrator.info();
        assert_eq!(info.name, "stability");
        assert_eq!(info.model, "stable-diffusion-xl-1024-v1-0");
    }
}
