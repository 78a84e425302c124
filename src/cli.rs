//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including the request precondition check on the address.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// PropCompare - property details from several data providers, side by side
///
/// Looks up one address with every configured provider, standardizes
/// their answers into one shape, and prints a comparison. Providers
/// that fail are reported individually; the others still show.
///
/// Examples:
///   propcompare --address "123 Main St, Boston, MA 02101"
///   propcompare -a "123 Main St, Boston, MA 02101" --format json
///   propcompare -a "123 Main St" --timeout 5 --retries 1
///   propcompare --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Full address of the property to look up
    #[arg(short, long, value_name = "ADDRESS", required_unless_present = "init_config")]
    pub address: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .propcompare.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    ///
    /// Overrides the config file setting.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the result to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Per-provider request timeout in seconds
    ///
    /// Applies to every provider, overriding their configured timeouts.
    /// The overall per-provider deadline is raised to match if it is shorter.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// How long a provider's answer stays cached, in seconds
    ///
    /// Default: from config or 86400 (24 hours).
    #[arg(long, value_name = "SECS")]
    pub cache_ttl: Option<u64>,

    /// Extra attempts for providers failing with transient errors
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<usize>,

    /// Run the lookup this many times against the same cache
    ///
    /// Later rounds are normally served from the cache.
    #[arg(long, default_value = "1", value_name = "COUNT")]
    pub repeat: usize,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .propcompare.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown table (default)
    #[default]
    Markdown,
    /// JSON payload
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The requested address, trimmed. Empty if not set (validate first).
    pub fn address(&self) -> &str {
        self.address.as_deref().map(str::trim).unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.address().is_empty() {
            return Err("Address is required".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ttl) = self.cache_ttl {
            if ttl == 0 {
                return Err("Cache TTL must be at least 1 second".to_string());
            }
        }

        if self.repeat == 0 {
            return Err("Repeat must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
