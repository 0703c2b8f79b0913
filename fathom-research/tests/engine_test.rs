//! End-to-end traversal tests over scripted LLM and search clients

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fathom_core::{FathomConfig, FathomError, FathomResult};
use fathom_llm::CompletionClient;
use fathom_research::{ResearchContext, ResearchEngine, ResearchEvent, ResearchResult};
use fathom_search::{SearchApiClient, SearchRecord};

/// Tracks in-flight external calls and the peak reached
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Completion client with canned replies keyed on prompt markers
struct ScriptedLlm {
    queries_per_plan: usize,
    plan_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    gauge: Option<Arc<Gauge>>,
    delay: Duration,
    fail: bool,
}

impl ScriptedLlm {
    fn new(queries_per_plan: usize) -> Self {
        Self {
            queries_per_plan,
            plan_calls: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
            gauge: None,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn failing() -> Self {
        let mut llm = Self::new(0);
        llm.fail = true;
        llm
    }

    fn with_gauge(mut self, gauge: Arc<Gauge>, delay: Duration) -> Self {
        self.gauge = Some(gauge);
        self.delay = delay;
        self
    }

    fn plan_reply(&self) -> String {
        let queries: Vec<String> = (0..self.queries_per_plan)
            .map(|i| format!(r#"{{"query": "query {}", "researchGoal": "goal {}"}}"#, i, i))
            .collect();
        format!("[{}]", queries.join(", "))
    }

    fn plan_count(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    fn extract_count(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> FathomResult<String> {
        if let Some(ref gauge) = self.gauge {
            gauge.enter();
            tokio::time::sleep(self.delay).await;
            gauge.exit();
        }
        if self.fail {
            return Err(FathomError::service("llm down"));
        }

        if user_prompt.contains("<contents>") {
            self.extract_calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"learnings": ["learning one", "learning two"], "followUpQuestions": ["what about the edges?"]}"#.to_string())
        } else if user_prompt.contains("reportMarkdown") {
            Ok(r##"{"reportMarkdown": "# Canned report"}"##.to_string())
        } else if user_prompt.contains("exactAnswer") {
            Ok(r#"{"exactAnswer": "42"}"#.to_string())
        } else {
            self.plan_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.plan_reply())
        }
    }
}

fn record_for(query: &str) -> SearchRecord {
    SearchRecord {
        url: format!("https://example.com/{}", query.replace(' ', "-")),
        title: format!("Result for {}", query),
        content: format!("Page content about {}.", query),
    }
}

/// Search client returning one record per query
struct ScriptedSearch {
    calls: AtomicUsize,
    gauge: Option<Arc<Gauge>>,
    delay: Duration,
    fail: bool,
}

impl ScriptedSearch {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gauge: None,
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn failing() -> Self {
        let mut search = Self::new();
        search.fail = true;
        search
    }

    fn with_gauge(mut self, gauge: Arc<Gauge>, delay: Duration) -> Self {
        self.gauge = Some(gauge);
        self.delay = delay;
        self
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchApiClient for ScriptedSearch {
    async fn search(&self, query: &str, _limit: usize) -> FathomResult<Vec<SearchRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gauge) = self.gauge {
            gauge.enter();
            tokio::time::sleep(self.delay).await;
            gauge.exit();
        }
        if self.fail {
            return Err(FathomError::service("search down"));
        }
        Ok(vec![record_for(query)])
    }
}

/// Search client whose marked query stalls past the harvest deadline
struct StallingSearch {
    stall_marker: String,
    stall: Duration,
}

#[async_trait]
impl SearchApiClient for StallingSearch {
    async fn search(&self, query: &str, _limit: usize) -> FathomResult<Vec<SearchRecord>> {
        if query.contains(&self.stall_marker) {
            tokio::time::sleep(self.stall).await;
        }
        Ok(vec![record_for(query)])
    }
}

fn build_engine(
    llm: ScriptedLlm,
    search: ScriptedSearch,
) -> (ResearchEngine, Arc<ScriptedLlm>, Arc<ScriptedSearch>) {
    let llm = Arc::new(llm);
    let search = Arc::new(search);
    let engine = ResearchEngine::new(FathomConfig::default(), llm.clone(), search.clone());
    (engine, llm, search)
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<ResearchEvent>) -> Vec<ResearchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn end_to_end_traversal_merges_and_deduplicates() {
    let (engine, _llm, _search) = build_engine(ScriptedLlm::new(2), ScriptedSearch::new());

    let result = engine
        .explore(ResearchContext::new("rust async runtimes", 1, 2))
        .await;

    // Every extraction returns the same two learnings, so the union stays
    // at two entries no matter how many branches ran.
    assert_eq!(result.learnings, vec!["learning one", "learning two"]);
    assert!(result.learnings.len() <= 4);

    let mut urls = result.visited_urls.clone();
    urls.sort();
    assert_eq!(
        urls,
        vec!["https://example.com/query-0", "https://example.com/query-1"]
    );
}

#[tokio::test]
async fn recursion_depth_matches_initial_depth() {
    let (engine, llm, _search) = build_engine(ScriptedLlm::new(2), ScriptedSearch::new());
    let mut rx = engine.subscribe_to_progress();

    engine
        .explore(ResearchContext::new("rust async runtimes", 2, 2))
        .await;

    // Levels: depth 2 with 2 branches, depth 1 with one branch each,
    // depth 0 with one branch each.
    assert_eq!(llm.plan_count(), 5);
    assert_eq!(llm.extract_count(), 6);

    let mut planned_depths: Vec<usize> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ResearchEvent::LevelPlanned { depth, .. } => Some(depth),
            _ => None,
        })
        .collect();
    planned_depths.sort_unstable();
    assert_eq!(planned_depths, vec![0, 0, 1, 1, 2]);
}

#[tokio::test]
async fn breadth_halves_level_by_level_and_floors_at_one() {
    let (engine, _llm, _search) = build_engine(ScriptedLlm::new(1), ScriptedSearch::new());
    let mut rx = engine.subscribe_to_progress();

    engine
        .explore(ResearchContext::new("rust async runtimes", 4, 10))
        .await;

    // One query per plan keeps the tree a single chain, so planned levels
    // arrive strictly in order.
    let levels: Vec<(usize, usize)> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ResearchEvent::LevelPlanned { depth, breadth, .. } => Some((depth, breadth)),
            _ => None,
        })
        .collect();

    assert_eq!(levels, vec![(4, 10), (3, 5), (2, 3), (1, 2), (0, 1)]);
}

#[tokio::test]
async fn under_supplied_plan_runs_with_what_it_got() {
    let (engine, llm, search) = build_engine(ScriptedLlm::new(2), ScriptedSearch::new());
    let mut rx = engine.subscribe_to_progress();

    let result = engine
        .explore(ResearchContext::new("rust async runtimes", 0, 4))
        .await;

    assert_eq!(llm.plan_count(), 1);
    assert_eq!(llm.extract_count(), 2);
    assert_eq!(search.call_count(), 2);
    assert!(!result.learnings.is_empty());

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|event| matches!(
        event,
        ResearchEvent::LevelPlanned {
            breadth: 4,
            queries: 2,
            ..
        }
    )));
}

#[tokio::test]
async fn total_harvest_failure_yields_empty_result() {
    let (engine, llm, search) = build_engine(ScriptedLlm::new(3), ScriptedSearch::failing());

    let result = engine
        .explore(ResearchContext::new("rust async runtimes", 2, 3))
        .await;

    assert!(result.learnings.is_empty());
    assert!(result.visited_urls.is_empty());
    assert!(search.call_count() > 0);
    // Nothing was harvested, so extraction never ran.
    assert_eq!(llm.extract_count(), 0);
}

#[tokio::test]
async fn failing_llm_yields_empty_result_without_searching() {
    let (engine, _llm, search) = build_engine(ScriptedLlm::failing(), ScriptedSearch::new());

    let result = engine
        .explore(ResearchContext::new("rust async runtimes", 2, 3))
        .await;

    assert!(result.learnings.is_empty());
    assert!(result.visited_urls.is_empty());
    assert_eq!(search.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn in_flight_external_calls_never_exceed_the_limit() {
    let gauge = Arc::new(Gauge::default());
    let llm = ScriptedLlm::new(4).with_gauge(gauge.clone(), Duration::from_millis(50));
    let search = ScriptedSearch::new().with_gauge(gauge.clone(), Duration::from_millis(50));
    let (engine, _llm, _search) = build_engine(llm, search);

    let result = engine
        .explore(ResearchContext::new("rust async runtimes", 1, 4))
        .await;

    assert!(!result.learnings.is_empty());
    assert!(gauge.peak() <= 2, "peak in-flight calls: {}", gauge.peak());
}

#[tokio::test(start_paused = true)]
async fn timed_out_harvest_is_isolated_to_its_branch() {
    let llm = Arc::new(ScriptedLlm::new(2));
    let search = Arc::new(StallingSearch {
        stall_marker: "query 0".to_string(),
        stall: Duration::from_secs(120),
    });
    let engine = ResearchEngine::new(FathomConfig::default(), llm.clone(), search);

    let result = engine
        .explore(ResearchContext::new("rust async runtimes", 0, 2))
        .await;

    // The stalled branch folds to an empty contribution; its sibling's
    // learnings and URL survive untouched.
    assert_eq!(result.learnings, vec!["learning one", "learning two"]);
    assert_eq!(result.visited_urls, vec!["https://example.com/query-1"]);
}

#[tokio::test]
async fn report_includes_body_and_sources() {
    let (engine, _llm, _search) = build_engine(ScriptedLlm::new(1), ScriptedSearch::new());

    let findings = ResearchResult {
        learnings: vec!["learning one".to_string()],
        visited_urls: vec!["https://example.com/a".to_string()],
    };
    let report = engine.write_report("rust async runtimes", &findings).await;

    assert!(report.contains("# Canned report"));
    assert!(report.contains("## Sources"));
    assert!(report.contains("- https://example.com/a"));
}

#[tokio::test]
async fn answer_returns_the_exact_answer_field() {
    let (engine, _llm, _search) = build_engine(ScriptedLlm::new(1), ScriptedSearch::new());

    let findings = ResearchResult {
        learnings: vec!["learning one".to_string()],
        visited_urls: Vec::new(),
    };
    let answer = engine.write_answer("what is the answer?", &findings).await;

    assert_eq!(answer, "42");
}

#[tokio::test]
async fn failed_synthesis_degrades_to_a_learning_listing() {
    let (engine, _llm, _search) = build_engine(ScriptedLlm::failing(), ScriptedSearch::new());

    let findings = ResearchResult {
        learnings: vec!["learning one".to_string(), "learning two".to_string()],
        visited_urls: vec!["https://example.com/a".to_string()],
    };

    let report = engine.write_report("rust async runtimes", &findings).await;
    assert!(report.contains("# Research findings"));
    assert!(report.contains("1. learning one"));
    assert!(report.contains("## Sources"));

    let answer = engine.write_answer("rust async runtimes", &findings).await;
    assert_eq!(answer, "learning one\nlearning two");
}
