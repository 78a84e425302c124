//! PropCompare - property details from several data providers
//!
//! A CLI tool that fans one address lookup out to every configured
//! property-data provider, standardizes their answers into a single
//! record shape and prints them side by side.
//!
//! Exit codes:
//!   0 - Every provider answered
//!   1 - Runtime error (bad arguments, config, client setup, etc.)
//!   2 - At least one provider failed

mod aggregator;
mod cache;
mod cli;
mod config;
mod errors;
mod models;
mod provider;
mod report;
mod standardizer;

use aggregator::Aggregator;
use anyhow::{Context, Result};
use cache::ResponseCache;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::AggregateResponse;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("PropCompare v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_lookup(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Lookup failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .propcompare.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to add providers, change timeouts, or tune the cache.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a JSON result on stdout stays machine-readable.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the lookup workflow. Returns exit code (0 or 2).
async fn run_lookup(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    // Build provider clients
    let settings = config.provider_settings();
    let providers =
        provider::build_providers(&settings).context("Failed to initialize provider clients")?;
    info!(
        "Providers: {}",
        settings
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let cache = Arc::new(ResponseCache::new(config.cache_ttl()));
    let sweeper = config
        .sweep_interval()
        .map(|every| cache::spawn_sweeper(&cache, every));

    let aggregator = Aggregator::new(providers, Arc::clone(&cache), config.aggregator_options());

    // Repeated rounds share the cache
    let address = args.address();
    let mut response = aggregator.handle_request(address).await;
    for round in 2..=args.repeat {
        debug!("Lookup round {} of {}", round, args.repeat);
        response = aggregator.handle_request(address).await;
    }

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&response)?,
        OutputFormat::Markdown => report::generate_markdown_report(address, &response),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write result to {}", path.display()))?;
            info!("Result saved to {}", path.display());
        }
        None => println!("{}", output),
    }

    print_summary(&response, start_time.elapsed().as_secs_f64());

    if response.failed_count() > 0 {
        warn!(
            "{} of {} providers failed",
            response.failed_count(),
            response.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// One status line per provider, on stderr.
fn print_summary(response: &AggregateResponse, duration: f64) {
    if response.is_empty() {
        return;
    }

    eprintln!("\n📊 Lookup Summary:");
    for (name, result) in &response.providers {
        match result.error_message() {
            Some(message) => eprintln!("   ❌ {}: {}", name, message),
            None if result.is_cached() => eprintln!("   ✅ {} (cached)", name),
            None => eprintln!("   ✅ {}", name),
        }
    }
    eprintln!("   Duration: {:.1}s", duration);
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
