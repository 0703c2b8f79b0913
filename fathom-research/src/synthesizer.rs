//! Final synthesis of research findings into a report or short answer

use std::sync::Arc;

use fathom_core::{with_timeout, FathomResult, Limiter, ResearchConfig};
use fathom_llm::{parse_structured, Compactor, CompletionClient};
use serde::Deserialize;
use tracing::{info, warn};

use crate::prompts;
use crate::types::ResearchResult;

/// Compiles merged findings into user-facing output
///
/// Both operations are single-shot and total: when the LLM call or its
/// reply fails, the output degrades to a plain listing of the learnings
/// instead of raising.
pub struct ResearchSynthesizer {
    llm: Arc<dyn CompletionClient>,
    limiter: Limiter,
    compactor: Compactor,
    research: ResearchConfig,
}

/// Report reply wire shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportReply {
    report_markdown: String,
}

/// Answer reply wire shape
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerReply {
    exact_answer: String,
}

impl ResearchSynthesizer {
    /// Create a new synthesizer
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        limiter: Limiter,
        compactor: Compactor,
        research: ResearchConfig,
    ) -> Self {
        Self {
            llm,
            limiter,
            compactor,
            research,
        }
    }

    /// Write a detailed markdown report over the merged findings, with a
    /// sources section listing every visited URL
    pub async fn write_report(&self, topic: &str, result: &ResearchResult) -> String {
        info!(
            learnings = result.learnings.len(),
            urls = result.visited_urls.len(),
            "Writing final report"
        );

        let learnings_block = self.bounded_learnings(&result.learnings);
        let user_prompt = prompts::build_report_prompt(topic, &learnings_block);

        let body = match self.complete(&user_prompt, "report").await {
            Ok(reply) => match parse_structured::<ReportReply>(&reply) {
                Ok(parsed) => parsed.report_markdown,
                Err(_) => reply,
            },
            Err(e) => {
                warn!("Report synthesis failed, falling back to a plain listing: {}", e);
                fallback_report(topic, result)
            }
        };

        append_sources(body, &result.visited_urls)
    }

    /// Write a short answer over the merged findings
    pub async fn write_answer(&self, topic: &str, result: &ResearchResult) -> String {
        info!(learnings = result.learnings.len(), "Writing final answer");

        let learnings_block = self.bounded_learnings(&result.learnings);
        let user_prompt = prompts::build_answer_prompt(topic, &learnings_block);

        match self.complete(&user_prompt, "answer").await {
            Ok(reply) => match parse_structured::<AnswerReply>(&reply) {
                Ok(parsed) => parsed.exact_answer,
                Err(_) => reply,
            },
            Err(e) => {
                warn!("Answer synthesis failed, falling back to a plain listing: {}", e);
                result.learnings.join("\n")
            }
        }
    }

    /// One limiter-gated, deadline-bounded completion call
    async fn complete(&self, user_prompt: &str, operation: &str) -> FathomResult<String> {
        let _guard = self.limiter.acquire().await?;
        with_timeout(
            self.llm.complete(&prompts::system_prompt(), user_prompt),
            self.research.llm_timeout_secs * 1000,
            operation,
        )
        .await
    }

    /// Wrap and bound the learnings block for a synthesis prompt
    fn bounded_learnings(&self, learnings: &[String]) -> String {
        self.compactor.compact(
            &prompts::wrap_learnings(learnings),
            self.research.synthesis_char_budget,
        )
    }
}

/// Plain listing used when report generation fails
fn fallback_report(topic: &str, result: &ResearchResult) -> String {
    let mut report = format!("# Research findings\n\n{}\n\n", topic);
    for (i, learning) in result.learnings.iter().enumerate() {
        report.push_str(&format!("{}. {}\n", i + 1, learning));
    }
    report
}

/// Append the sources section when any URLs were visited
fn append_sources(mut body: String, urls: &[String]) -> String {
    if urls.is_empty() {
        return body;
    }
    body.push_str("\n\n## Sources\n\n");
    for url in urls {
        body.push_str(&format!("- {}\n", url));
    }
    body
}
