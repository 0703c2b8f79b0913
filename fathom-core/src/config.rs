//! Configuration management
//!
//! One TOML file covers every section: LLM provider, search service, research
//! traversal parameters, prompt compaction, and logging. Missing files fall
//! back to defaults so the CLI works with nothing but environment variables.

use crate::error::{FathomError, FathomResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level fathom configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FathomConfig {
    /// LLM provider settings
    pub llm: LlmConfig,
    /// Search/extraction service settings
    pub search: SearchConfig,
    /// Research traversal settings
    pub research: ResearchConfig,
    /// Prompt compaction settings
    pub compaction: CompactionConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (openai, anthropic, ollama, groq)
    pub provider: String,
    /// Model name
    pub model: String,
    /// API key; falls back to the provider's environment variable
    pub api_key: Option<String>,
    /// Base URL override for self-hosted or proxied endpoints
    pub base_url: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate per reply
    pub max_tokens: Option<u32>,
    /// Context window in tokens; prompts are compacted below this before sending
    pub context_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: Some(4096),
            context_tokens: 128_000,
        }
    }
}

/// Search/extraction service configuration (Firecrawl-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Service base URL
    pub base_url: String,
    /// API key; falls back to FIRECRAWL_KEY
    pub api_key: Option<String>,
    /// Scrape format requested per result
    pub format: String,
    /// Maximum results per query
    pub result_limit: usize,
    /// HTTP client timeout in seconds (transport level, below the harvest deadline)
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.firecrawl.dev".to_string(),
            api_key: None,
            format: "markdown".to_string(),
            result_limit: 5,
            timeout_seconds: 30,
            user_agent: "fathom/0.1".to_string(),
        }
    }
}

/// Research traversal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Process-wide cap on in-flight external calls
    pub concurrency: usize,
    /// Deadline for one harvest call in seconds
    pub harvest_timeout_secs: u64,
    /// Deadline for one LLM call in seconds
    pub llm_timeout_secs: u64,
    /// Default recursion depth when the caller does not specify one
    pub default_depth: usize,
    /// Default fan-out when the caller does not specify one
    pub default_breadth: usize,
    /// Cap on learnings extracted per query
    pub max_learnings: usize,
    /// Cap on follow-up questions extracted per query
    pub max_follow_ups: usize,
    /// Per-item character budget for harvested content
    pub content_char_budget: usize,
    /// Character budget for the learnings block of a report or answer prompt
    pub synthesis_char_budget: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            harvest_timeout_secs: 15,
            llm_timeout_secs: 60,
            default_depth: 2,
            default_breadth: 4,
            max_learnings: 3,
            max_follow_ups: 3,
            content_char_budget: 25_000,
            synthesis_char_budget: 150_000,
        }
    }
}

/// Prompt compaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// Floor below which the target is no longer halved and input is truncated
    pub min_chunk_size: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 200,
            min_chunk_size: 140,
        }
    }
}

impl FathomConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> FathomResult<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            FathomError::config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: FathomConfig = toml::from_str(&content)
            .map_err(|e| FathomError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> FathomResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FathomError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Candidate config file locations, most specific first.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("fathom").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".fathom").join("config.toml"));
        }
        paths.push(PathBuf::from("fathom.toml"));
        paths
    }

    /// Load from the first existing candidate path, or fall back to defaults.
    pub fn load_default() -> FathomResult<Self> {
        for path in Self::candidate_paths() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::default())
    }

    /// Validate configuration values
    pub fn validate(&self) -> FathomResult<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(FathomError::config(
                "llm.temperature must be between 0.0 and 2.0",
            ));
        }
        if self.llm.context_tokens == 0 {
            return Err(FathomError::config(
                "llm.context_tokens must be greater than 0",
            ));
        }
        if self.research.concurrency == 0 {
            return Err(FathomError::config(
                "research.concurrency must be greater than 0",
            ));
        }
        if self.research.default_depth == 0 || self.research.default_breadth == 0 {
            return Err(FathomError::config(
                "research.default_depth and research.default_breadth must be greater than 0",
            ));
        }
        if self.research.content_char_budget == 0 || self.research.synthesis_char_budget == 0 {
            return Err(FathomError::config(
                "research.content_char_budget and research.synthesis_char_budget must be greater than 0",
            ));
        }
        if self.search.result_limit == 0 {
            return Err(FathomError::config(
                "search.result_limit must be greater than 0",
            ));
        }
        if self.compaction.chunk_size == 0 {
            return Err(FathomError::config(
                "compaction.chunk_size must be greater than 0",
            ));
        }
        if self.compaction.chunk_overlap >= self.compaction.chunk_size {
            return Err(FathomError::config(
                "compaction.chunk_overlap must be smaller than compaction.chunk_size",
            ));
        }
        if self.compaction.min_chunk_size == 0 {
            return Err(FathomError::config(
                "compaction.min_chunk_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = FathomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.research.concurrency, 2);
        assert_eq!(config.research.harvest_timeout_secs, 15);
        assert_eq!(config.research.llm_timeout_secs, 60);
        assert_eq!(config.compaction.chunk_size, 4000);
        assert_eq!(config.compaction.chunk_overlap, 200);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = FathomConfig::default();
        config.research.default_breadth = 6;
        config.llm.model = "gpt-4o".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = FathomConfig::from_file(&path).unwrap();
        assert_eq!(loaded.research.default_breadth, 6);
        assert_eq!(loaded.llm.model, "gpt-4o");
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        let mut config = FathomConfig::default();
        config.compaction.chunk_overlap = config.compaction.chunk_size;
        assert!(config.validate().is_err());
    }
}
