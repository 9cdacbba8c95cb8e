//! # Ivy CLI Application
//!
//! Command-line interface for the crawl-and-freshness pipeline, providing
//! access to its operations through a set of subcommands.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands for pipeline operations:
//!   - `crawl`: crawl one or more school sites and bring the index up to date
//!   - `index`: re-index a single page
//!   - `search`: semantic search over indexed chunks
//!   - `status`: freshness information for one URL
//!
//! ## Features
//!
//! - Configurable crawling with depth and rate controls
//! - Hash-gated indexing; unchanged pages are skipped
//! - Progress reporting for long-running crawls
//! - Both JSON and text output formats
//!
//! Credentials come from the environment: `QDRANT_URL` and `QDRANT_API_KEY`
//! for the vector store, `OPENAI_API_KEY` for embeddings.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use url::Url;

use ivy::crawler::{ChromiumRenderer, CrawlerConfig, DomainLocks};
use ivy::embedder::OpenAiEmbedder;
use ivy::index::DEFAULT_COLLECTION;
use ivy::pipeline::{CrawlJob, PipelineDeps, run_site_batch};
use ivy::processor::ProcessorConfig;
use ivy::search::{SearchOptions, search_index};
use ivy::store::{QdrantStore, VectorStore};

#[derive(Parser)]
#[command(author, version, about = "Crawl school websites and keep a vector index fresh", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl one or more sites and index their pages
    Crawl(CrawlArgs),

    /// Re-index a single page
    Index(IndexArgs),

    /// Search the indexed content
    Search(SearchArgs),

    /// Show freshness information for a URL
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Root URLs to crawl
    #[arg(required = true)]
    urls: Vec<Url>,

    /// Crawl depth
    #[arg(short, long, default_value = "2")]
    depth: usize,

    /// Delay between page fetches in milliseconds
    #[arg(short, long, default_value = "1000")]
    rate: u64,

    /// Number of sites crawled concurrently
    #[arg(short, long, default_value = "4")]
    concurrency: usize,

    /// Skip the randomized startup delay
    #[arg(long)]
    no_jitter: bool,

    /// Collection name
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Chunk size in characters
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// Chunk overlap in characters
    #[arg(long, default_value = "100")]
    chunk_overlap: usize,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Page URL to index
    #[arg(required = true)]
    url: Url,

    /// Collection name
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: String,

    /// Limit results
    #[arg(short, long, default_value = "5")]
    limit: usize,

    /// Minimum similarity score
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Restrict results to one source URL
    #[arg(short, long)]
    url: Option<String>,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Collection name
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Page URL to inspect
    #[arg(required = true)]
    url: Url,

    /// Collection name
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ivy=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Crawl(args) => crawl_command(args).await?,
        Commands::Index(args) => index_command(args).await?,
        Commands::Search(args) => search_command(args).await?,
        Commands::Status(args) => status_command(args).await?,
    }
    Ok(())
}

fn store_from_env(collection: &str) -> anyhow::Result<QdrantStore> {
    let base_url =
        std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6333".to_string());
    let api_key = std::env::var("QDRANT_API_KEY").ok();
    QdrantStore::new(base_url, api_key.as_deref(), collection)
        .map_err(|e| anyhow!("failed to create store client: {e}"))
}

fn embedder_from_env() -> anyhow::Result<OpenAiEmbedder> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY environment variable must be set")?;
    OpenAiEmbedder::new(api_key).map_err(|e| anyhow!("failed to create embedder: {e}"))
}

async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let store = Arc::new(store_from_env(&args.collection)?);
    let embedder = Arc::new(embedder_from_env()?);
    let renderer = Arc::new(ChromiumRenderer::launch().await?);

    let processor = ProcessorConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.chunk_overlap)
        .build();
    let deps = PipelineDeps::new(renderer, store, embedder).with_processor_config(processor);

    let mut config = CrawlerConfig::builder()
        .max_depth(args.depth)
        .page_delay_ms(args.rate);
    if args.no_jitter {
        config = config.initial_delay_secs(0, 0);
    }
    let config = config.build();

    let jobs: Vec<CrawlJob> = args
        .urls
        .iter()
        .map(|url| CrawlJob::new(url.clone(), args.depth))
        .collect();

    println!("Crawling {} site(s) to depth {}...", jobs.len(), args.depth);
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {elapsed} {msg}")
            .expect("valid progress template"),
    );
    spinner.set_message("crawling");
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let outcomes = run_site_batch(&deps, &DomainLocks::default(), &config, jobs, args.concurrency)
        .await;
    spinner.finish_and_clear();

    let mut failures = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => println!(
                "{}: {} pages ({} indexed, {} unchanged, {} thin, {} failed)",
                outcome.root_url,
                report.urls_found,
                report.indexed,
                report.skipped_unchanged,
                report.skipped_insufficient,
                report.failed
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{}: crawl failed: {}", outcome.root_url, e);
            }
        }
    }

    if failures > 0 {
        Err(anyhow!("{failures} site(s) failed"))
    } else {
        Ok(())
    }
}

async fn index_command(args: IndexArgs) -> anyhow::Result<()> {
    let store = Arc::new(store_from_env(&args.collection)?);
    let embedder = Arc::new(embedder_from_env()?);
    let renderer = Arc::new(ChromiumRenderer::launch().await?);
    let deps = PipelineDeps::new(renderer, store, embedder);

    println!("Indexing {}...", args.url);
    let config = CrawlerConfig::builder().initial_delay_secs(0, 0).build();
    let job = CrawlJob::new(args.url.clone(), 0);
    let report =
        ivy::pipeline::run_crawl_job(&deps, &DomainLocks::default(), &config, job).await?;

    if report.indexed > 0 {
        println!("Indexed {}", args.url);
    } else if report.skipped_unchanged > 0 {
        println!("Unchanged, nothing to do");
    } else if report.skipped_insufficient > 0 {
        println!("Page has too little content to index");
    } else {
        return Err(anyhow!("page could not be processed"));
    }
    Ok(())
}

async fn search_command(args: SearchArgs) -> anyhow::Result<()> {
    let store = Arc::new(store_from_env(&args.collection)?);
    let embedder = Arc::new(embedder_from_env()?);

    let options = SearchOptions {
        limit: args.limit,
        score_threshold: args.threshold,
        url_filter: args.url.clone(),
    };
    let results = search_index(store, embedder, &args.query, &options).await?;

    if args.format == "json" {
        let json = serde_json::to_string_pretty(
            &results
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "text": r.text,
                        "url": r.url,
                        "chunk_index": r.chunk_index,
                        "score": r.score,
                        "updated_at": r.updated_at,
                    })
                })
                .collect::<Vec<_>>(),
        )?;
        println!("{json}");
        return Ok(());
    }

    if results.is_empty() {
        println!("No results");
        return Ok(());
    }
    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, result.score, result.url);
        println!("   {}", result.text.replace('\n', " "));
    }
    Ok(())
}

async fn status_command(args: StatusArgs) -> anyhow::Result<()> {
    let store = store_from_env(&args.collection)?;

    let url = args.url.as_str();
    let hash = store.stored_hash(url).await?;
    match hash {
        Some(hash) => {
            let count = store.count_by_url(url).await?;
            println!("{url}");
            println!("  chunks:       {count}");
            println!("  content hash: {hash}");
        }
        None => println!("{url} is not indexed"),
    }
    Ok(())
}
