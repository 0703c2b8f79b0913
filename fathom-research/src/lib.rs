//! Fathom Research - recursive research engine
//!
//! This crate composes the query planner, content harvester, context
//! compactor, and insight extractor into a recursive, concurrency-bounded
//! traversal: a research prompt becomes a tree of search queries, each query
//! is harvested and distilled into learnings, follow-up directions drive the
//! next level down, and every branch's findings merge into one deduplicated
//! result.

pub mod engine;
pub mod extractor;
pub mod planner;
pub mod prompts;
pub mod synthesizer;
pub mod types;

pub use engine::ResearchEngine;
pub use extractor::InsightExtractor;
pub use planner::QueryPlanner;
pub use synthesizer::ResearchSynthesizer;
pub use types::*;
