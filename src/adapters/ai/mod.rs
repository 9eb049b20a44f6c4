//! AI provider adapters: two rewriters (OpenAI chat, Anthropic messages)
//! and two illustrators (DALL-E 3, Stability SDXL), plus scripted mocks.

mod anthropic_rewriter;
mod mock;
mod openai_illustrator;
mod openai_rewriter;
pub mod prompts;
pub mod response;
mod stability_illustrator;

pub use anthropic_rewriter::{AnthropicRewriter, AnthropicRewriterConfig};
pub use mock::{MockIllustrator, MockRewriter};
pub use openai_illustrator::{OpenAiIllustrator, OpenAiIllustratorConfig};
pub use openai_rewriter::{OpenAiRewriter, OpenAiRewriterConfig};
pub use stability_illustrator::{StabilityIllustrator, StabilityIllustratorConfig};
