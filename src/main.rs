//! Sumi-Lattice main entry point
//!
//! This is the command-line interface for the Sumi-Lattice crawl pipeline.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_lattice::config::{load_config_with_hash, Config};
use sumi_lattice::crawler::{open_storage, run_pipeline};
use sumi_lattice::output::{load_statistics, log_worker_statistics, print_statistics};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Lattice: a polite, distributed link-graph crawler
///
/// Sumi-Lattice discovers domains, expands their sitemaps, crawls pages
/// while respecting robots.txt and crawl delays, and records every link
/// between pages in a persistent graph.
#[derive(Parser, Debug)]
#[command(name = "sumi-lattice")]
#[command(version = "1.0.0")]
#[command(about = "A polite link-graph crawler", long_about = None)]
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

    /// Additional domain URL to seed (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Validate config and show what would run without starting workers
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.seeds);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &cli.seeds).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_lattice=info,warn"),
            1 => EnvFilter::new("sumi_lattice=debug,info"),
            2 => EnvFilter::new("sumi_lattice=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, extra_seeds: &[String]) {
    println!("=== Sumi-Lattice Dry Run ===\n");

    println!("User Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nDatabase: {}", config.database.path);

    println!("\nHTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Retries: {}", config.http.retries);

    println!("\nCrawl:");
    println!("  Default crawl delay: {}s", config.crawl.default_crawl_delay);
    println!("  Max crawl delay: {}s", config.crawl.max_crawl_delay);
    println!("  Max content chars: {}", config.crawl.max_content_chars);
    println!("  Max URL length: {}", config.crawl.max_url_length);
    println!("  Robots cache capacity: {}", config.crawl.robots_cache_capacity);

    let w = &config.workers;
    println!("\nWorkers:");
    println!("  Domain: {}", w.domains);
    println!("  Sitemap: {}", w.sitemaps);
    println!("  Link: {}", w.links);
    println!("  Prioritizer: {}", w.prioritizers);
    println!("  Router: {} per priority queue", w.routers);
    println!(
        "  Selector: {} pools x {} workers",
        w.selector_pools, w.selectors_per_pool
    );

    let seeds: Vec<&String> = config.seeds.iter().chain(extra_seeds).collect();
    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.database.path);

    let storage = open_storage(&config.database.path)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, extra_seeds: &[String]) -> anyhow::Result<()> {
    let token = CancellationToken::new();

    let signal_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping workers");
                signal_token.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    tracing::info!(
        "Starting pipeline with {} configured and {} extra seeds",
        config.seeds.len(),
        extra_seeds.len()
    );

    let stats = run_pipeline(config, extra_seeds, token)
        .await
        .context("pipeline failed")?;
    log_worker_statistics(&stats);

    Ok(())
}
