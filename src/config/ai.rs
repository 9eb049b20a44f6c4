//! AI provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key (chat + DALL-E)
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    pub anthropic_api_key: Option<String>,

    /// Stability AI API key
    pub stability_api_key: Option<String>,

    /// Which provider rewrites articles
    #[serde(default)]
    pub rewriter: RewriterProvider,

    /// Which provider generates images
    #[serde(default)]
    pub illustrator: IllustratorProvider,

    /// Override for the rewrite model id
    pub rewrite_model: Option<String>,

    /// Request timeout in seconds for chat calls
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,

    /// Request timeout in seconds for image calls
    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,
}

/// Rewrite provider type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RewriterProvider {
    #[default]
    OpenAI,
    Anthropic,
}

/// Illustration provider type
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IllustratorProvider {
    #[default]
    OpenAI,
    Stability,
}

impl AiConfig {
    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn has_openai(&self) -> bool {
        self.openai_api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    pub fn has_anthropic(&self) -> bool {
        self.anthropic_api_key
            .as_ref()
            .is_some_and(|k| !k.is_empty())
    }

    pub fn has_stability(&self) -> bool {
        self.stability_api_key
            .as_ref()
            .is_some_and(|k| !k.is_empty())
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.chat_timeout_secs == 0 || self.image_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        match self.rewriter {
            RewriterProvider::OpenAI if !self.has_openai() => {
                return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
            }
            RewriterProvider::Anthropic if !self.has_anthropic() => {
                return Err(ValidationError::MissingRequired("ANTHROPIC_API_KEY"));
            }
            _ => {}
        }

        match self.illustrator {
            IllustratorProvider::OpenAI if !self.has_openai() => {
                return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
            }
            IllustratorProvider::Stability if !self.has_stability() => {
                return Err(ValidationError::MissingRequired("STABILITY_API_KEY"));
            }
            _ => {}
        }

        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            stability_api_key: None,
            rewriter: RewriterProvider::default(),
            illustrator: IllustratorProvider::default(),
            rewrite_model: None,
            chat_timeout_secs: default_chat_timeout(),
            image_timeout_secs: default_image_timeout(),
        }
    }
}

fn default_chat_timeout() -> u64 {
    120
}

fn default_image_timeout() -> u64 {
    180
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pick_openai_for_both_roles() {
        let config = AiConfig::default();
        assert_eq!(config.rewriter, RewriterProvider::OpenAI);
        assert_eq!(config.illustrator, IllustratorProvider::OpenAI);
        assert_eq!(config.chat_timeout(), Duration::from_secs(120));
        assert_eq!(config.image_timeout(), Duration::from_secs(180));
    }

    #[test]
    fn validation_requires_key_for_selected_rewriter() {
        let config = AiConfig {
            rewriter: RewriterProvider::Anthropic,
            openai_api_key: Some("sk-xxx".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_requires_key_for_selected_illustrator() {
        let config = AiConfig {
            rewriter: RewriterProvider::Anthropic,
            anthropic_api_key: Some("sk-ant-xxx".to_string()),
            illustrator: IllustratorProvider::Stability,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AiConfig {
            stability_api_key: Some("sk-stab".to_string()),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let config = AiConfig {
            openai_api_key: Some(String::new()),
            ..Default::default()
        };
        assert!(!config.has_openai());
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = AiConfig {
            openai_api_key: Some("sk-xxx".to_string()),
            chat_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidTimeout)
        ));
    }
}
