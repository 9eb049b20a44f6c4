//! Prompt templates shared by all rewriter providers.
//!
//! Both chat providers receive identical instructions so switching models
//! does not change the wire contract the parser depends on.

use crate::ports::{RewriteRequest, MAX_EXCERPT_CHARS, MAX_TITLE_CHARS};

/// System instructions for the article rewrite call.
pub fn rewrite_system_prompt() -> String {
    format!(
        "You are an experienced news editor. Rewrite the provided article in your own words \
         while preserving every fact, name, number and quote. Respond with a single JSON object \
         and nothing else, with these fields:\n\
         - \"title\": a fresh headline, at most {MAX_TITLE_CHARS} characters\n\
         - \"excerpt\": a one-or-two sentence summary, at most {MAX_EXCERPT_CHARS} characters\n\
         - \"body_html\": the full rewritten article as clean HTML paragraphs\n\
         - \"tags\": an array of 3 to 6 lowercase topic tags\n\
         Do not wrap the JSON in markdown code fences."
    )
}

/// User message for the rewrite call.
pub fn rewrite_user_prompt(request: &RewriteRequest) -> String {
    let mut prompt = String::new();
    if !request.source_name.is_empty() {
        prompt.push_str(&format!("Original author: {}\n", request.source_name));
    }
    if !request.source_url.is_empty() {
        prompt.push_str(&format!("Original source: {}\n", request.source_url));
    }
    prompt.push_str("\nArticle to rewrite:\n\n");
    prompt.push_str(&request.source_text);
    prompt
}

/// System instructions for deriving an illustration prompt from the
/// rewritten copy.
pub const IMAGE_PROMPT_SYSTEM: &str =
    "You write prompts for an image-generation model. Given a news headline and excerpt, \
     answer with one vivid, concrete scene description suitable for an editorial illustration. \
     Photorealistic, no text or logos in the image, no people's faces in close-up. \
     Answer with the prompt text only.";

/// User message for the illustration-prompt call.
pub fn image_prompt_user(title: &str, excerpt: &str) -> String {
    format!("Headline: {title}\nExcerpt: {excerpt}")
}

/// Prompt handed to the image model when composing a social-sharing card.
pub fn social_card_prompt(title: &str, excerpt: &str) -> String {
    format!(
        "A wide social-media sharing card for a news article. Bold modern editorial design, \
         generous margins, a single strong visual motif drawn from the story, muted newsroom \
         palette. The story: \"{title}\" - {excerpt}. No embedded text, no logos, no watermarks."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_system_prompt_names_limits() {
        let prompt = rewrite_system_prompt();
        assert!(prompt.contains("80"));
        assert!(prompt.contains("160"));
        assert!(prompt.contains("body_html"));
    }

    #[test]
    fn rewrite_user_prompt_carries_attribution() {
        let request = RewriteRequest {
            source_text: "Something happened.".into(),
            source_name: "Jane Doe".into(),
            source_url: "https://example.com/a/1".into(),
        };
        let prompt = rewrite_user_prompt(&request);
        assert!(prompt.contains("Jane Doe"));
        assert!(prompt.contains("https://example.com/a/1"));
        assert!(prompt.contains("Something happened."));
    }

    #[test]
    fn rewrite_user_prompt_skips_empty_attribution() {
        let request = RewriteRequest {
            source_text: "Body.".into(),
            source_name: String::new(),
            source_url: String::new(),
        };
        let prompt = rewrite_user_prompt(&request);
        assert!(!prompt.contains("Original author"));
        assert!(!prompt.contains("Original source"));
    }

    #[test]
    fn social_card_prompt_embeds_copy() {
        let prompt = social_card_prompt("Rates cut", "Central bank moves early.");
        assert!(prompt.contains("Rates cut"));
        assert!(prompt.contains("Central bank moves early."));
    }
}
