//! Comicios main entry point
//!
//! Command-line interface for the electoral record harvester.

use clap::Parser;
use comicios::config::load_config_with_hash;
use comicios::harvest::run_harvest;
use comicios::jobs::REFERENCE_CONFIGS;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Comicios: a task-graph harvester for electoral candidate records
///
/// Comicios bootstraps the platform environment, fetches the reference
/// datasets, and then crawls the candidate record graph with a bounded
/// worker pool, persisting every record as a JSON file under the cache
/// directory. Records already in the cache are never fetched again.
#[derive(Parser, Debug)]
#[command(name = "comicios")]
#[command(version)]
#[command(about = "A task-graph harvester for electoral candidate records", long_about = None)]
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

    /// Validate config and show the harvest plan without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let stats = run_harvest(config).await?;
    tracing::info!(
        "Harvest finished: {} jobs completed, {} duplicate discoveries dropped",
        stats.completed,
        stats.duplicates
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("comicios=info,warn"),
            1 => EnvFilter::new("comicios=debug,info"),
            2 => EnvFilter::new("comicios=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the harvest plan
fn handle_dry_run(config: &comicios::config::Config) {
    println!("=== Comicios Dry Run ===\n");

    println!("Harvest Configuration:");
    println!("  Workers: {}", config.harvest.workers);
    println!(
        "  Bootstrap parallelism: {}",
        config.harvest.bootstrap_parallelism
    );
    println!("  Cache directory: {}", config.harvest.cache_dir);
    println!("  Bootstrap URL: {}", config.harvest.bootstrap_url);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Connect timeout: {}s", config.http.connect_timeout_secs);

    println!("\nReference datasets ({}):", REFERENCE_CONFIGS.len());
    for dataset in REFERENCE_CONFIGS {
        println!("  - {}", dataset);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would bootstrap, seed listas-regio-muni jobs, and drain the graph");
}
