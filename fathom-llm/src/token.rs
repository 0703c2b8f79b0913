//! Token counting utilities
//!
//! Accurate token counts via tiktoken-rs, used to decide when a prompt must
//! be compacted before sending. Non-OpenAI models fall back to the gpt-4o
//! encoder, which is close enough for budget decisions.

use fathom_core::{FathomError, FathomResult};
use std::sync::OnceLock;
use tiktoken_rs::{get_bpe_from_model, CoreBPE};
use tracing::warn;

/// Token counter for a specific model
pub struct TokenCounter {
    encoder: CoreBPE,
    model_name: String,
}

impl TokenCounter {
    /// Create a new token counter for the specified model
    pub fn new(model_name: &str) -> FathomResult<Self> {
        let encoder = get_bpe_from_model(model_name).map_err(|e| {
            FathomError::config(format!(
                "Failed to get encoder for model {}: {}",
                model_name, e
            ))
        })?;

        Ok(Self {
            encoder,
            model_name: model_name.to_string(),
        })
    }

    /// Count tokens in a text string
    pub fn count_tokens(&self, text: &str) -> usize {
        self.encoder.encode_with_special_tokens(text).len()
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

static DEFAULT_COUNTER: OnceLock<TokenCounter> = OnceLock::new();
static CUSTOM_COUNTER: OnceLock<&'static TokenCounter> = OnceLock::new();

fn default_counter() -> &'static TokenCounter {
    DEFAULT_COUNTER.get_or_init(|| {
        TokenCounter::new("gpt-4o").expect("tiktoken ships the gpt-4o encoder")
    })
}

/// Get a cached token counter for the given model.
///
/// Models without a tiktoken encoder (Anthropic, local llama variants) use
/// the gpt-4o encoder. One process runs one model, so the first resolved
/// non-default model occupies the custom slot for the process lifetime.
pub fn get_token_counter(model_name: &str) -> &'static TokenCounter {
    match model_name {
        "gpt-4o" | "gpt-4o-mini" | "gpt-4" | "gpt-4-turbo" => default_counter(),
        _ => *CUSTOM_COUNTER.get_or_init(|| match TokenCounter::new(model_name) {
            Ok(counter) => Box::leak(Box::new(counter)),
            Err(_) => {
                warn!(
                    "No tiktoken encoder for {}, falling back to gpt-4o",
                    model_name
                );
                default_counter()
            }
        }),
    }
}

/// Count tokens for a specific model
pub fn count_tokens(text: &str, model_name: &str) -> usize {
    get_token_counter(model_name).count_tokens(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_tokens_for_known_model() {
        let counter = TokenCounter::new("gpt-4o").unwrap();

        let text = "Hello, world! This is a test.";
        let token_count = counter.count_tokens(text);

        assert!(token_count > 0);
        assert!(token_count < 20);
    }

    #[test]
    fn unknown_model_falls_back_to_default_encoder() {
        let counter = get_token_counter("claude-haiku-local-build");
        assert!(counter.count_tokens("some text to count") > 0);
    }

    #[test]
    fn empty_text_counts_zero() {
        assert_eq!(count_tokens("", "gpt-4o"), 0);
    }
}
