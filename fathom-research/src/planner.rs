//! Query planning over the LLM service

use std::sync::Arc;

use fathom_core::{with_timeout, Limiter, LlmConfig, ResearchConfig};
use fathom_llm::{parse_structured, Compactor, CompletionClient};
use tracing::{debug, warn};

use crate::prompts;
use crate::types::SerpQuery;

/// Plans a bounded list of search queries for a research narrative
///
/// Query uniqueness is requested of the model but not verified here.
pub struct QueryPlanner {
    llm: Arc<dyn CompletionClient>,
    limiter: Limiter,
    compactor: Compactor,
    llm_config: LlmConfig,
    research: ResearchConfig,
}

impl QueryPlanner {
    /// Create a new query planner
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

    /// Plan up to `max_queries` queries for the narrative in `prompt`
    ///
    /// Any failure (slot acquisition, timeout, service error, unparseable
    /// reply) produces an empty plan; planning never raises.
    pub async fn plan(
        &self,
        prompt: &str,
        max_queries: usize,
        prior_learnings: &[String],
    ) -> Vec<SerpQuery> {
        let topic = self.compactor.bound_to_model_context(
            prompt,
            &self.llm_config.model,
            self.llm_config.context_tokens,
        );
        let user_prompt = prompts::build_plan_prompt(&topic, max_queries, prior_learnings);

        let reply = {
            let _guard = match self.limiter.acquire().await {
                Ok(guard) => guard,
                Err(e) => {
                    warn!("Planner could not acquire a limiter slot: {}", e);
                    return Vec::new();
                }
            };
            with_timeout(
                self.llm.complete(&prompts::system_prompt(), &user_prompt),
                self.research.llm_timeout_secs * 1000,
                "plan",
            )
            .await
        };

        match reply.and_then(|text| parse_structured::<Vec<SerpQuery>>(&text)) {
            Ok(mut queries) => {
                queries.truncate(max_queries);
                debug!(count = queries.len(), "Planned search queries");
                queries
            }
            Err(e) => {
                warn!("Query planning failed, proceeding with no queries: {}", e);
                Vec::new()
            }
        }
    }
}
