//! Fathom CLI - recursive deep research from the command line
//!
//! Turns a research topic into a bounded tree of web searches, distills the
//! findings, and writes a report or short answer with sources.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use fathom_core::{init_logging, FathomConfig};
use fathom_llm::{CompletionClient, SiumaiClient};
use fathom_research::{ResearchContext, ResearchEngine, ResearchEvent, ResearchResult};
use fathom_search::{FirecrawlClient, SearchApiClient};

#[derive(Parser)]
#[command(name = "fathom")]
#[command(about = "Recursive deep research from the command line")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a topic and write a detailed report
    Research {
        /// Research topic or question
        topic: String,

        /// Recursion depth (clamped to 1-5)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Queries per level (clamped to 1-10)
        #[arg(short, long)]
        breadth: Option<usize>,

        /// Output file for the report
        #[arg(short, long, default_value = "report.md")]
        output: PathBuf,

        /// Also dump the learnings and URLs as JSON next to the report
        #[arg(long)]
        json: bool,
    },

    /// Research a topic and print a short answer
    Answer {
        /// Question to answer
        topic: String,

        /// Recursion depth (clamped to 1-5)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Queries per level (clamped to 1-10)
        #[arg(short, long)]
        breadth: Option<usize>,

        /// Output file for the answer
        #[arg(short, long, default_value = "answer.md")]
        output: PathBuf,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting fathom v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Research {
            topic,
            depth,
            breadth,
            output,
            json,
        } => {
            handle_research(topic, depth, breadth, output, json, config).await?;
        }
        Commands::Answer {
            topic,
            depth,
            breadth,
            output,
        } => {
            handle_answer(topic, depth, breadth, output, config).await?;
        }
        Commands::Config {
            show,
            init,
            validate,
        } => {
            handle_config(show, init, validate)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<FathomConfig> {
    match path {
        Some(path) => FathomConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => FathomConfig::load_default().context("Failed to load configuration"),
    }
}

async fn build_engine(config: &FathomConfig) -> anyhow::Result<ResearchEngine> {
    let llm: Arc<dyn CompletionClient> = Arc::new(
        SiumaiClient::new(config.llm.clone())
            .await
            .context("Failed to create LLM client")?,
    );
    let search: Arc<dyn SearchApiClient> = Arc::new(
        FirecrawlClient::new(config.search.clone()).context("Failed to create search client")?,
    );

    Ok(ResearchEngine::new(config.clone(), llm, search))
}

async fn handle_research(
    topic: String,
    depth: Option<usize>,
    breadth: Option<usize>,
    output: PathBuf,
    json: bool,
    config: FathomConfig,
) -> anyhow::Result<()> {
    let depth = depth.unwrap_or(config.research.default_depth).clamp(1, 5);
    let breadth = breadth
        .unwrap_or(config.research.default_breadth)
        .clamp(1, 10);

    println!("🔬 Researching: {}", topic);
    println!("🌳 Depth {}, breadth {}", depth, breadth);

    let engine = build_engine(&config).await?;
    let result = run_with_progress(&engine, ResearchContext::new(topic.clone(), depth, breadth)).await;

    println!(
        "📚 Gathered {} learnings from {} sources",
        result.learnings.len(),
        result.visited_urls.len()
    );

    let report = engine.write_report(&topic, &result).await;
    tokio::fs::write(&output, report)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("✅ Report written to {}", output.display());

    if json {
        let json_path = output.with_extension("json");
        let dump = serde_json::to_string_pretty(&result)?;
        tokio::fs::write(&json_path, dump)
            .await
            .with_context(|| format!("Failed to write {}", json_path.display()))?;
        println!("🗂 Findings written to {}", json_path.display());
    }

    Ok(())
}

async fn handle_answer(
    topic: String,
    depth: Option<usize>,
    breadth: Option<usize>,
    output: PathBuf,
    config: FathomConfig,
) -> anyhow::Result<()> {
    let depth = depth.unwrap_or(config.research.default_depth).clamp(1, 5);
    let breadth = breadth
        .unwrap_or(config.research.default_breadth)
        .clamp(1, 10);

    println!("🔬 Researching: {}", topic);

    let engine = build_engine(&config).await?;
    let result = run_with_progress(&engine, ResearchContext::new(topic.clone(), depth, breadth)).await;

    let answer = engine.write_answer(&topic, &result).await;
    println!("\n🎯 Answer:\n{}", answer);

    tokio::fs::write(&output, &answer)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("\n✅ Answer written to {}", output.display());

    Ok(())
}

/// Run a traversal while rendering its progress events as a bar
async fn run_with_progress(engine: &ResearchEngine, context: ResearchContext) -> ResearchResult {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message("Researching");

    let mut rx = engine.subscribe_to_progress();
    let bar = pb.clone();
    let drainer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                ResearchEvent::LevelPlanned { queries, .. } => {
                    bar.inc_length(queries as u64);
                }
                ResearchEvent::QueryCompleted { .. } => {
                    bar.inc(1);
                }
            }
        }
    });

    let result = engine.explore(context).await;

    drainer.abort();
    pb.finish_with_message("✅ Research complete");

    result
}

fn handle_config(show: bool, init: bool, validate: bool) -> anyhow::Result<()> {
    if init {
        let config = FathomConfig::default();
        let path = default_config_path();
        config
            .save_to_file(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✅ Configuration initialized at {}", path.display());
        println!("📝 Edit it to add API keys and tune research parameters.");
    }

    if show {
        let config = FathomConfig::load_default()?;
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if validate {
        let config = FathomConfig::load_default()?;
        config.validate()?;
        println!("✅ Configuration is valid");
    }

    if !init && !show && !validate {
        println!("Use --show, --init, or --validate");
    }

    Ok(())
}

/// Preferred location for a fresh config file
fn default_config_path() -> PathBuf {
    FathomConfig::candidate_paths()
        .into_iter()
        .next()
        .unwrap_or_else(|| PathBuf::from("fathom.toml"))
}
