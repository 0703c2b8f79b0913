//! Insight extraction over the LLM service

use std::sync::Arc;

use fathom_core::{with_timeout, Limiter, LlmConfig, ResearchConfig};
use fathom_llm::{parse_structured, Compactor, CompletionClient};
use tracing::{debug, warn};

use crate::prompts;
use crate::types::LearningSet;

/// Extracts learnings and follow-up questions from harvested content
pub struct InsightExtractor {
    llm: Arc<dyn CompletionClient>,
    limiter: Limiter,
    compactor: Compactor,
    llm_config: LlmConfig,
    research: ResearchConfig,
}

impl InsightExtractor {
    /// Create a new insight extractor
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        limiter: Limiter,
        compactor: Compactor,
        llm_config: LlmConfig,
        research: ResearchConfig,
    ) -> Self {
        Self {
            llm,
            limiter,
            compactor,
            llm_config,
            research,
        }
    }

    /// Extract at most `max_learnings` learnings and `max_follow_ups`
    /// follow-up questions from `contents`
    ///
    /// Content items arrive already compacted per item; the joined block is
    /// additionally bounded to the model context here. Any failure produces
    /// an empty set; extraction never raises.
    pub async fn extract(
        &self,
        query: &str,
        contents: &[String],
        max_learnings: usize,
        max_follow_ups: usize,
    ) -> LearningSet {
        if contents.is_empty() {
            debug!(query, "No harvested content, skipping extraction");
            return LearningSet::default();
        }

        let block = self.compactor.bound_to_model_context(
            &prompts::wrap_contents(contents),
            &self.llm_config.model,
            self.llm_config.context_tokens,
        );
        let user_prompt =
            prompts::build_extract_prompt(query, &block, max_learnings, max_follow_ups);

        let reply = {
            let _guard = match self.limiter.acquire().await {
                Ok(guard) => guard,
                Err(e) => {
                    warn!("Extractor could not acquire a limiter slot: {}", e);
                    return LearningSet::default();
                }
            };
            with_timeout(
                self.llm.complete(&prompts::system_prompt(), &user_prompt),
                self.research.llm_timeout_secs * 1000,
                "extract",
            )
            .await
        };

        match reply.and_then(|text| parse_structured::<LearningSet>(&text)) {
            Ok(mut set) => {
                set.learnings.truncate(max_learnings);
                set.follow_up_questions.truncate(max_follow_ups);
                debug!(
                    query,
                    learnings = set.learnings.len(),
                    follow_ups = set.follow_up_questions.len(),
                    "Extracted learnings"
                );
                set
            }
            Err(e) => {
                warn!(
                    query,
                    "Insight extraction failed, proceeding with an empty set: {}", e
                );
                LearningSet::default()
            }
        }
    }
}
