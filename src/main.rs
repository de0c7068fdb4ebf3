//! Campus-Harvest main entry point
//!
//! This is the command-line interface for the Campus-Harvest institution
//! website harvester.

use anyhow::Context;
use campus_harvest::config::{load_config_with_hash, Config};
use campus_harvest::crawler::{build_http_client, user_agent, HttpRenderer};
use campus_harvest::oracle::HttpOracle;
use campus_harvest::output::{print_report, write_markdown_summary};
use campus_harvest::storage::{FsBlobStore, MemoryBlobStore, MemoryRecordStore, SqliteRecordStore};
use campus_harvest::Coordinator;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Campus-Harvest: a targeted institution website harvester
///
/// Campus-Harvest crawls one institution's website from a start URL, following
/// the links most likely to lead to course, fee and admission information, and
/// stores the pages and documents it finds.
#[derive(Parser, Debug)]
#[command(name = "campus-harvest")]
#[command(version)]
#[command(about = "A targeted institution website harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the session settings without crawling
    #[arg(long)]
    dry_run: bool,

    /// Use keyword link expansion even if the config enables the oracle
    #[arg(long)]
    no_oracle: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let use_oracle = config.crawl.enable_oracle && !cli.no_oracle;

    if cli.dry_run {
        handle_dry_run(&config, use_oracle)
    } else {
        handle_crawl(config, use_oracle).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("campus_harvest=info,warn"),
            1 => EnvFilter::new("campus_harvest=debug,info"),
            2 => EnvFilter::new("campus_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the session settings
fn handle_dry_run(config: &Config, use_oracle: bool) -> anyhow::Result<()> {
    let crawl = &config.crawl;
    let documents = &config.documents;

    // Building a coordinator against in-memory sinks checks the seed URL
    let client = build_http_client(&config.user_agent)?;
    Coordinator::new(
        config.clone(),
        client.clone(),
        Arc::new(HttpRenderer::new(client)),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(MemoryRecordStore::new()),
    )?;

    println!("=== Campus-Harvest Dry Run ===\n");

    println!("Session:");
    println!("  Start URL: {}", crawl.start_url);
    println!("  Institute ID: {}", crawl.institute_id);
    println!("  Max depth: {}", crawl.max_depth);
    println!("  Max pages: {}", crawl.max_pages);
    println!("  Concurrency limit: {}", crawl.concurrency_limit);
    println!("  Session timeout: {}s", crawl.session_timeout_secs);
    println!("  Rate limit delay: {}ms", crawl.rate_limit_delay_ms);
    println!("  Render timeout: {}ms", crawl.render_timeout_ms);

    println!("\nDocuments:");
    println!("  Expected content type: {}", documents.expected_content_type);
    println!("  Minimum size: {} bytes", documents.min_bytes);
    println!(
        "  Attempts: {} (backoff base {}ms)",
        documents.max_attempts, documents.backoff_base_ms
    );
    println!("  Request timeout: {}s", documents.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", user_agent(&config.user_agent));

    println!("\nOutput:");
    println!("  Blob directory: {}", config.output.blob_dir);
    println!("  Database: {}", config.output.database_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nLink Expansion:");
    match (&config.oracle, use_oracle) {
        (Some(oracle), true) => {
            println!("  Oracle: {} (max {} retries)", oracle.endpoint, oracle.max_retries);
            println!("  Institute name: {}", oracle.institute_name);
            println!("  Tracked fields: {}", oracle.fields.join(", "));
        }
        _ => println!("  Keyword heuristic"),
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", crawl.start_url);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, use_oracle: bool) -> anyhow::Result<()> {
    let blobs = FsBlobStore::new(Path::new(&config.output.blob_dir), &config.crawl.institute_id)
        .context("failed to open blob directory")?;
    let records = SqliteRecordStore::new(Path::new(&config.output.database_path))
        .context("failed to open record database")?;

    let client = build_http_client(&config.user_agent)?;
    let renderer = Arc::new(HttpRenderer::new(client.clone()));

    let oracle = match (&config.oracle, use_oracle) {
        (Some(oracle), true) => {
            let endpoint = Url::parse(&oracle.endpoint)
                .with_context(|| format!("invalid oracle endpoint {}", oracle.endpoint))?;
            Some(Arc::new(HttpOracle::new(
                client.clone(),
                endpoint,
                oracle.max_retries,
            )))
        }
        _ => None,
    };

    let summary_path = config.output.summary_path.clone();

    let mut coordinator = Coordinator::new(
        config,
        client,
        renderer,
        Arc::new(blobs),
        Arc::new(records),
    )?;
    if let Some(oracle) = oracle {
        coordinator = coordinator.with_oracle(oracle);
    }

    let report = coordinator.run().await;
    print_report(&report);

    if let Some(path) = summary_path {
        write_markdown_summary(&report, Path::new(&path))
            .with_context(|| format!("failed to write summary to {}", path))?;
        println!("\n✓ Summary written to: {}", path);
    }

    Ok(())
}
