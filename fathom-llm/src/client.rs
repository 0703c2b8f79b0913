//! LLM client integration using siumai
//!
//! Provides a unified completion interface over multiple providers. The
//! research crates depend only on the `CompletionClient` trait, so tests can
//! substitute canned replies without touching a network.

use async_trait::async_trait;
use fathom_core::{FathomError, FathomResult, LlmConfig};
use siumai::models;
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One-shot completion against an LLM provider.
///
/// Structured replies are requested through the prompt text and parsed by the
/// caller (see `schema::parse_structured`); the trait itself stays plain
/// strings so it remains object-safe and trivially mockable.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion with a system prompt and a user prompt.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> FathomResult<String>;
}

/// Unified LLM client that supports multiple providers
pub struct SiumaiClient {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl SiumaiClient {
    /// Create a new LLM client
    pub async fn new(config: LlmConfig) -> FathomResult<Self> {
        let client = Self::build_client(&config).await?;

        info!(
            "Created LLM client for provider: {} with model: {}",
            config.provider, config.model
        );

        Ok(Self { client, config })
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(config: &LlmConfig) -> FathomResult<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .ok_or_else(|| FathomError::config("OpenAI API key not found"))?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder.build().await.map_err(|e| {
                    FathomError::service(format!("Failed to build OpenAI client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                    .ok_or_else(|| FathomError::config("Anthropic API key not found"))?;

                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    FathomError::service(format!("Failed to build Anthropic client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    FathomError::service(format!("Failed to build Ollama client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            "groq" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("GROQ_API_KEY").ok())
                    .ok_or_else(|| FathomError::config("Groq API key not found"))?;

                let mut builder = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder.build().await.map_err(|e| {
                    FathomError::service(format!("Failed to build Groq client: {}", e))
                })?;

                Ok(Box::new(client))
            }
            provider => Err(FathomError::config(format!(
                "Unsupported LLM provider: {}",
                provider
            ))),
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionClient for SiumaiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> FathomResult<String> {
        let start_time = Instant::now();
        let messages = vec![system!(system_prompt), user!(user_prompt)];

        debug!(
            model = %self.config.model,
            prompt_chars = user_prompt.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .chat(messages)
            .await
            .map_err(|e| FathomError::service(format!("LLM completion failed: {}", e)))?;

        if let Some(content) = response.content_text() {
            debug!(
                "Completion finished in {:?} ({} chars)",
                start_time.elapsed(),
                content.len()
            );
            Ok(content.to_string())
        } else {
            Err(FathomError::service("No text content in LLM response"))
        }
    }
}

/// Helper functions for creating common LLM configurations
pub mod configs {
    use super::*;

    /// Create OpenAI GPT-4o-mini configuration
    pub fn openai_gpt4o_mini() -> LlmConfig {
        LlmConfig {
            provider: "openai".to_string(),
            model: models::openai::GPT_4O_MINI.to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: Some(4096),
            context_tokens: 128_000,
        }
    }

    /// Create Anthropic Claude Haiku configuration
    pub fn anthropic_claude_haiku() -> LlmConfig {
        LlmConfig {
            provider: "anthropic".to_string(),
            model: models::anthropic::CLAUDE_HAIKU_3_5.to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: Some(4096),
            context_tokens: 200_000,
        }
    }

    /// Create Ollama configuration
    pub fn ollama_llama3(base_url: Option<String>) -> LlmConfig {
        LlmConfig {
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            base_url: base_url.or_else(|| Some("http://localhost:11434".to_string())),
            temperature: 0.7,
            max_tokens: Some(4096),
            context_tokens: 128_000,
        }
    }

    /// Create Groq configuration
    pub fn groq_llama3() -> LlmConfig {
        LlmConfig {
            provider: "groq".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: Some(4096),
            context_tokens: 128_000,
        }
    }
}

/// Create a client with automatic provider detection from the environment.
pub async fn create_auto_client() -> FathomResult<SiumaiClient> {
    let providers = vec![
        ("openai", "OPENAI_API_KEY", configs::openai_gpt4o_mini()),
        (
            "anthropic",
            "ANTHROPIC_API_KEY",
            configs::anthropic_claude_haiku(),
        ),
        ("groq", "GROQ_API_KEY", configs::groq_llama3()),
    ];

    for (provider_name, env_var, config) in providers {
        if std::env::var(env_var).is_ok() {
            info!("Auto-detected {} provider", provider_name);
            match SiumaiClient::new(config).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!("Failed to create {} client: {}", provider_name, e);
                    continue;
                }
            }
        }
    }

    // Ollama needs no API key
    info!("Trying Ollama as fallback");
    let ollama_config = configs::ollama_llama3(None);
    SiumaiClient::new(ollama_config).await
}
