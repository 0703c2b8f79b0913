//! Recursive research traversal

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::broadcast;
use tracing::{info, warn};

use fathom_core::{with_timeout, FathomConfig, Limiter};
use fathom_llm::{Compactor, CompletionClient};
use fathom_search::{SearchApiClient, SearchRecord};

use crate::extractor::InsightExtractor;
use crate::planner::QueryPlanner;
use crate::prompts;
use crate::synthesizer::ResearchSynthesizer;
use crate::types::{ResearchContext, ResearchEvent, ResearchResult, SerpQuery};

/// Buffered progress events per subscriber
const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Recursive research engine
///
/// Turns a research narrative into a tree of search queries, harvests and
/// extracts per query, deepens along follow-up directions, and merges every
/// branch into one result. One limiter gates every external call across the
/// whole tree; failed calls fold to empty values and never abort siblings.
pub struct ResearchEngine {
    planner: QueryPlanner,
    extractor: InsightExtractor,
    synthesizer: ResearchSynthesizer,
    search: Arc<dyn SearchApiClient>,
    compactor: Compactor,
    limiter: Limiter,
    config: FathomConfig,
    progress_tx: broadcast::Sender<ResearchEvent>,
}

impl ResearchEngine {
    /// Create a new research engine over the given service clients
    pub fn new(
        config: FathomConfig,
        llm: Arc<dyn CompletionClient>,
        search: Arc<dyn SearchApiClient>,
    ) -> Self {
        let limiter = Limiter::new(config.research.concurrency);
        let compactor = Compactor::new(config.compaction.clone());
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);

        Self {
            planner: QueryPlanner::new(
                llm.clone(),
                limiter.clone(),
                compactor.clone(),
                config.llm.clone(),
                config.research.clone(),
            ),
            extractor: InsightExtractor::new(
                llm.clone(),
                limiter.clone(),
                compactor.clone(),
                config.llm.clone(),
                config.research.clone(),
            ),
            synthesizer: ResearchSynthesizer::new(
                llm,
                limiter.clone(),
                compactor.clone(),
                config.research.clone(),
            ),
            search,
            compactor,
            limiter,
            config,
            progress_tx,
        }
    }

    /// Subscribe to progress events for traversals run by this engine
    pub fn subscribe_to_progress(&self) -> broadcast::Receiver<ResearchEvent> {
        self.progress_tx.subscribe()
    }

    /// Run the full recursive traversal described by `context`
    ///
    /// Total: always returns a result, possibly sparse when calls failed.
    pub async fn explore(&self, context: ResearchContext) -> ResearchResult {
        info!(
            depth = context.depth,
            breadth = context.breadth,
            "Starting research traversal"
        );

        let result = self.explore_level(context, Vec::new()).await;

        info!(
            learnings = result.learnings.len(),
            urls = result.visited_urls.len(),
            "Research traversal finished"
        );
        result
    }

    /// Write a detailed markdown report over a traversal's findings
    pub async fn write_report(&self, topic: &str, result: &ResearchResult) -> String {
        self.synthesizer.write_report(topic, result).await
    }

    /// Write a short answer over a traversal's findings
    pub async fn write_answer(&self, topic: &str, result: &ResearchResult) -> String {
        self.synthesizer.write_answer(topic, result).await
    }

    /// Plan and run every branch of one recursion level
    ///
    /// Boxed because the recursion goes through `explore_branch`; the join
    /// waits for every branch's whole subtree before merging.
    fn explore_level(
        &self,
        context: ResearchContext,
        prior_learnings: Vec<String>,
    ) -> BoxFuture<'_, ResearchResult> {
        async move {
            let queries = self
                .planner
                .plan(&context.prompt, context.breadth, &prior_learnings)
                .await;

            let _ = self.progress_tx.send(ResearchEvent::LevelPlanned {
                depth: context.depth,
                breadth: context.breadth,
                queries: queries.len(),
            });

            let branches = queries
                .into_iter()
                .map(|query| self.explore_branch(&context, query, &prior_learnings));
            let partials = join_all(branches).await;

            ResearchResult::merge_all(partials)
        }
        .boxed()
    }

    /// Harvest, extract, and (below the terminal level) deepen one query
    async fn explore_branch(
        &self,
        context: &ResearchContext,
        query: SerpQuery,
        prior_learnings: &[String],
    ) -> ResearchResult {
        let records = self.harvest(&query.query).await;

        let contents: Vec<String> = records
            .iter()
            .filter(|record| !record.content.is_empty())
            .map(|record| {
                self.compactor
                    .compact(&record.content, self.config.research.content_char_budget)
            })
            .collect();

        let learning_set = self
            .extractor
            .extract(
                &query.query,
                &contents,
                self.config.research.max_learnings,
                self.config.research.max_follow_ups,
            )
            .await;

        let mut own = ResearchResult::default();
        for learning in &learning_set.learnings {
            own.push_learning(learning.clone());
        }
        for record in records {
            own.push_url(record.url);
        }

        let _ = self.progress_tx.send(ResearchEvent::QueryCompleted {
            depth: context.depth,
            query: query.query.clone(),
            learnings: own.learnings.len(),
        });

        if context.depth == 0 {
            return own;
        }

        let mut accumulated = prior_learnings.to_vec();
        for learning in &own.learnings {
            if !accumulated.contains(learning) {
                accumulated.push(learning.clone());
            }
        }

        let next_prompt = prompts::build_next_prompt(&query, &learning_set.follow_up_questions);
        let deeper = self
            .explore_level(context.deepen(next_prompt), accumulated)
            .await;

        let mut merged = own;
        merged.merge(deeper);
        merged
    }

    /// One limiter-gated, deadline-bounded harvest call
    ///
    /// Timeout or error folds to an empty record list.
    async fn harvest(&self, query: &str) -> Vec<SearchRecord> {
        let result = {
            let _guard = match self.limiter.acquire().await {
                Ok(guard) => guard,
                Err(e) => {
                    warn!("Harvester could not acquire a limiter slot: {}", e);
                    return Vec::new();
                }
            };
            with_timeout(
                self.search.search(query, self.config.search.result_limit),
                self.config.research.harvest_timeout_secs * 1000,
                "harvest",
            )
            .await
        };

        match result {
            Ok(records) => records,
            Err(e) => {
                warn!(query, "Harvest failed, proceeding without content: {}", e);
                Vec::new()
            }
        }
    }
}
