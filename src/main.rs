//! Gleaner main entry point
//!
//! This is the command-line interface for the Gleaner news crawler.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use gleaner::config::{load_config_with_hash, resolve_worker_count, Config};
use gleaner::crawler::{NetworkFetcher, RunSummary};
use gleaner::output::print_statistics;
use gleaner::sources::SourceRegistry;
use gleaner::storage::{open_history, HistoryStore};
use gleaner::{ConfigError, GleanError, QueueManager};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Gleaner: a resumable multi-source news crawler
///
/// Gleaner discovers article URLs from feeds and front pages, fetches and
/// extracts each article once, and keeps a session history so an
/// interrupted run picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(version)]
#[command(about = "A resumable multi-source news crawler", long_about = None)]
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

    /// Date to crawl for (YYYY-MM-DD); overrides crawler.run-date
    #[arg(long, value_name = "DATE")]
    run_date: Option<NaiveDate>,

    /// Validate config and show the sources that would be crawled
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show session history statistics and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        let run_date = cli
            .run_date
            .or(config.crawler.run_date)
            .unwrap_or_else(|| Local::now().date_naive());
        handle_crawl(&config, run_date).map(|summary| summary.log())
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gleaner=info,warn"),
            1 => EnvFilter::new("gleaner=debug,info"),
            2 => EnvFilter::new("gleaner=trace,debug"),
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

/// Maps a top-level failure to the process exit code
fn exit_code_for(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<GleanError>() {
        return e.exit_code();
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return e.exit_code();
    }
    4
}

/// Runs the three crawl phases on a runtime with one thread per worker
fn handle_crawl(config: &Config, run_date: NaiveDate) -> anyhow::Result<RunSummary> {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let workers = resolve_worker_count(config.crawler.workers, cores)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    runtime.block_on(async {
        let mut manager = QueueManager::configure(config, run_date)?;
        Ok::<_, anyhow::Error>(manager.run().await)
    })
}

/// Handles the --dry-run mode: loads every source and prints what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let fetcher = NetworkFetcher::new(&config.network).context("Failed to build HTTP client")?;
    let registry = SourceRegistry::from_config(config, Arc::new(fetcher))?;

    println!("=== Gleaner Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Recursion level: {}", config.crawler.recursion_level);
    println!("  Minimum page size: {} bytes", config.crawler.min_page_bytes);
    match config.crawler.run_date {
        Some(date) => println!("  Run date: {}", date),
        None => println!("  Run date: today"),
    }

    println!("\nNetwork:");
    println!(
        "  Retries: {} (wait {}s + {}-{}s jitter)",
        config.network.retry_count,
        config.network.retry_wait,
        config.network.min_jitter,
        config.network.max_jitter
    );
    println!(
        "  Timeouts: connect {}s, read {}s",
        config.network.connect_timeout, config.network.read_timeout
    );
    println!("  User agents: {}", config.network.user_agent_list().len());
    println!("  Proxies: {}", config.network.proxies.len());

    println!("\nSession history: {}", config.history.database_path);
    println!("Data directory: {}", config.output.data_dir);

    println!("\nSources ({}):", registry.len());
    for source in registry.iter() {
        let profile = source.engine.profile();
        println!("  - {} [{}]", source.name(), source.kind());
        if let Some(main_url) = &profile.main_url {
            println!("    main: {}", main_url);
        }
        for feed in &profile.feeds {
            println!("    feed: {}", feed);
        }
        if !profile.allowed_domains.is_empty() {
            println!("    domains: {}", profile.allowed_domains.join(", "));
        }
        println!(
            "    patterns: {} valid, {} invalid, {} id, {} date",
            profile.valid_patterns.len(),
            profile.invalid_patterns.len(),
            profile.id_patterns.len(),
            profile.date_cascade.len()
        );
        println!(
            "    recursion level {}, min content length {}",
            profile.recursion_level, profile.min_content_length
        );
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows session history statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Session history: {}\n", config.history.database_path);

    let history = open_history(Path::new(&config.history.database_path))
        .map_err(GleanError::from)
        .context("Failed to open session history")?;
    let stats = history.statistics().map_err(GleanError::from)?;

    print_statistics(&stats);

    Ok(())
}
