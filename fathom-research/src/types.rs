//! Types for the research traversal

use serde::{Deserialize, Serialize};

/// Context for one recursion level
///
/// Created fresh at the top call and at each deepening step, read-only
/// afterwards. The prompt carries the accumulated research narrative:
/// the original goal plus the follow-up directions that led here.
#[derive(Debug, Clone)]
pub struct ResearchContext {
    /// Accumulated research narrative
    pub prompt: String,
    /// Remaining deepening levels; 0 means terminal
    pub depth: usize,
    /// Number of queries to spawn at this level
    pub breadth: usize,
}

impl ResearchContext {
    /// Create a context for a fresh traversal
    pub fn new(prompt: impl Into<String>, depth: usize, breadth: usize) -> Self {
        Self {
            prompt: prompt.into(),
            depth,
            breadth: breadth.max(1),
        }
    }

    /// Context for the next level down: depth decreases by one, breadth halves
    pub fn deepen(&self, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            depth: self.depth.saturating_sub(1),
            breadth: child_breadth(self.breadth),
        }
    }
}

/// Breadth for a child level: half the parent's, rounded up, floored at 1
pub fn child_breadth(breadth: usize) -> usize {
    ((breadth + 1) / 2).max(1)
}

/// One planned search query with its research goal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerpQuery {
    /// Query string for the search service
    pub query: String,
    /// What this query is meant to uncover, and how to go deeper from it
    pub research_goal: String,
}

/// Learnings and follow-up questions extracted from harvested content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSet {
    /// Distilled factual statements
    pub learnings: Vec<String>,
    /// Directions worth a deeper pass
    pub follow_up_questions: Vec<String>,
}

impl LearningSet {
    /// True when nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty() && self.follow_up_questions.is_empty()
    }
}

/// Merged findings of a research traversal
///
/// Both fields are sets under exact string equality, kept as vectors to
/// preserve first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    /// Deduplicated learnings in first-seen order
    pub learnings: Vec<String>,
    /// Deduplicated source URLs in first-seen order
    pub visited_urls: Vec<String>,
}

impl ResearchResult {
    /// Add a learning unless an identical one is already present
    pub fn push_learning(&mut self, learning: String) {
        if !self.learnings.contains(&learning) {
            self.learnings.push(learning);
        }
    }

    /// Add a URL unless an identical one is already present
    pub fn push_url(&mut self, url: String) {
        if !self.visited_urls.contains(&url) {
            self.visited_urls.push(url);
        }
    }

    /// Union with another result, keeping this result's first-seen order
    pub fn merge(&mut self, other: ResearchResult) {
        for learning in other.learnings {
            self.push_learning(learning);
        }
        for url in other.visited_urls {
            self.push_url(url);
        }
    }

    /// Merge a sequence of partial results in order
    pub fn merge_all(results: impl IntoIterator<Item = ResearchResult>) -> ResearchResult {
        let mut merged = ResearchResult::default();
        for result in results {
            merged.merge(result);
        }
        merged
    }
}

/// Progress notification emitted while a traversal runs
///
/// Events are immutable snapshots; subscribers fold them into their own
/// counters. Branches never share mutable progress state.
#[derive(Debug, Clone, Serialize)]
pub enum ResearchEvent {
    /// A recursion level finished planning its queries
    LevelPlanned {
        /// Remaining depth at this level
        depth: usize,
        /// Breadth requested from the planner
        breadth: usize,
        /// Queries actually planned, possibly fewer than requested
        queries: usize,
    },
    /// One query finished harvesting and extraction
    QueryCompleted {
        /// Remaining depth at the query's level
        depth: usize,
        /// The query that ran
        query: String,
        /// Learnings it produced
        learnings: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(learnings: &[&str], urls: &[&str]) -> ResearchResult {
        ResearchResult {
            learnings: learnings.iter().map(|s| s.to_string()).collect(),
            visited_urls: urls.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn child_breadth_halves_and_floors_at_one() {
        assert_eq!(child_breadth(10), 5);
        assert_eq!(child_breadth(5), 3);
        assert_eq!(child_breadth(3), 2);
        assert_eq!(child_breadth(2), 1);
        assert_eq!(child_breadth(1), 1);
        assert_eq!(child_breadth(0), 1);
    }

    #[test]
    fn breadth_sequence_is_non_increasing() {
        let mut breadth = 10;
        for _ in 0..20 {
            let next = child_breadth(breadth);
            assert!(next <= breadth);
            assert!(next >= 1);
            breadth = next;
        }
        assert_eq!(breadth, 1);
    }

    #[test]
    fn deepen_decrements_depth() {
        let context = ResearchContext::new("quantum error correction", 3, 4);
        let child = context.deepen("next direction");
        assert_eq!(child.depth, 2);
        assert_eq!(child.breadth, 2);
        assert_eq!(child.prompt, "next direction");
    }

    #[test]
    fn merge_deduplicates_and_keeps_first_seen_order() {
        let mut a = result(&["alpha", "beta"], &["https://a.example"]);
        let b = result(&["beta", "gamma"], &["https://a.example", "https://b.example"]);

        a.merge(b);

        assert_eq!(a.learnings, vec!["alpha", "beta", "gamma"]);
        assert_eq!(a.visited_urls, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let r = result(&["alpha", "beta"], &["https://a.example"]);
        let mut merged = r.clone();
        merged.merge(r.clone());
        assert_eq!(merged, r);
    }

    #[test]
    fn merge_is_commutative_as_sets() {
        let a = result(&["alpha", "beta"], &["https://a.example"]);
        let b = result(&["gamma"], &["https://b.example", "https://a.example"]);

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);

        let mut ab_learnings = ab.learnings.clone();
        let mut ba_learnings = ba.learnings.clone();
        ab_learnings.sort();
        ba_learnings.sort();
        assert_eq!(ab_learnings, ba_learnings);

        let mut ab_urls = ab.visited_urls.clone();
        let mut ba_urls = ba.visited_urls.clone();
        ab_urls.sort();
        ba_urls.sort();
        assert_eq!(ab_urls, ba_urls);
    }

    #[test]
    fn merge_all_folds_in_order() {
        let merged = ResearchResult::merge_all(vec![
            result(&["one"], &[]),
            result(&["two", "one"], &["https://a.example"]),
            result(&["three"], &["https://a.example"]),
        ]);

        assert_eq!(merged.learnings, vec!["one", "two", "three"]);
        assert_eq!(merged.visited_urls, vec!["https://a.example"]);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let r = result(&["alpha"], &["https://a.example"]);
        let mut merged = r.clone();
        merged.merge(ResearchResult::default());
        assert_eq!(merged, r);
    }
}
