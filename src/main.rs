//! rustlitreview - keyword-driven literature collection
//!
//! Queries an academic search provider for a list of keywords, drops
//! duplicate publications and writes everything to a single CSV.
//!
//! ## Usage
//!
//! ```bash
//! # Built-in keyword list, Google Scholar, ./papers.csv
//! rustlitreview
//!
//! # Custom keywords against OpenAlex
//! rustlitreview --source openalex --keyword "dyslexia text simplification" -o out.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rustlitreview::cookies::CookieManager;
use rustlitreview::gscholar::{GoogleScholar, ScholarOptions};
use rustlitreview::openalex::{OpenAlex, OpenAlexOptions};
use rustlitreview::pipeline::{self, PipelineConfig};
use rustlitreview::retry::{RetryPolicy, TokioDelay};
use rustlitreview::source::ScholarSource;
use rustlitreview::Schema;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Collect, deduplicate and export bibliographic records for a keyword list
#[derive(Parser)]
#[command(name = "rustlitreview")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Search keyword (repeatable; replaces the built-in list)
    #[arg(short, long = "keyword")]
    keywords: Vec<String>,

    /// File with one keyword per line (# starts a comment)
    #[arg(long, conflicts_with = "keywords")]
    keywords_file: Option<PathBuf>,

    /// Search provider
    #[arg(long, value_enum, default_value_t = SourceKind::Gscholar)]
    source: SourceKind,

    /// Maximum records per keyword
    #[arg(long, default_value_t = pipeline::DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Attempts per keyword before giving up
    #[arg(long, default_value_t = rustlitreview::retry::DEFAULT_MAX_ATTEMPTS)]
    retries: u32,

    /// Minimum backoff between attempts, in seconds
    #[arg(long, default_value_t = rustlitreview::retry::DEFAULT_BACKOFF_SECS.0)]
    backoff_min: u64,

    /// Maximum backoff between attempts, in seconds
    #[arg(long, default_value_t = rustlitreview::retry::DEFAULT_BACKOFF_SECS.1)]
    backoff_max: u64,

    /// Output CSV path
    #[arg(short, long, default_value = pipeline::DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Append aim / expected output / explainability columns
    #[arg(long)]
    extended: bool,

    /// Proxy URL for Google Scholar (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    proxy: Option<String>,

    /// Google Scholar mirror site URL
    #[arg(long)]
    mirror: Option<String>,

    /// Cookie file for Google Scholar (default: ~/.gscholar_cookies.json)
    #[arg(long)]
    cookies: Option<PathBuf>,

    /// Contact email for the OpenAlex polite pool
    #[arg(long)]
    mailto: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Gscholar,
    Openalex,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.log_json);

    let config = build_config(&cli)?;
    let source = build_source(&cli)?;

    println!(
        "Searching {} keywords via {} (max {} results each)",
        config.keywords.len(),
        source.name(),
        config.max_results
    );

    let report = pipeline::run(&config, source.as_ref(), &TokioDelay)
        .await
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    for keyword in &report.failed_keywords {
        println!("❌ No results for '{}' after {} attempts", keyword, config.retry.max_attempts);
    }
    println!(
        "\n✅ Done! {} unique papers saved to {} ({} fetched, {} duplicates skipped)",
        report.unique,
        report.output.display(),
        report.fetched,
        report.duplicates
    );
    Ok(())
}

fn init_logging(debug: bool, json: bool) {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }
}

fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let keywords = if let Some(path) = &cli.keywords_file {
        pipeline::load_keywords(path)
            .with_context(|| format!("Failed to read keywords from {}", path.display()))?
    } else if !cli.keywords.is_empty() {
        cli.keywords.clone()
    } else {
        PipelineConfig::default().keywords
    };

    let config = PipelineConfig {
        keywords,
        max_results: cli.max_results,
        retry: RetryPolicy {
            max_attempts: cli.retries,
            backoff_min_secs: cli.backoff_min,
            backoff_max_secs: cli.backoff_max,
        },
        output: cli.output.clone(),
        schema: if cli.extended {
            Schema::Extended
        } else {
            Schema::Standard
        },
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_source(cli: &Cli) -> Result<Box<dyn ScholarSource>> {
    match cli.source {
        SourceKind::Gscholar => {
            let cookies = match &cli.cookies {
                Some(path) => CookieManager::with_path(path.clone()),
                None => CookieManager::default(),
            };
            let options = ScholarOptions {
                proxy: cli.proxy.clone(),
                base_url: cli.mirror.clone(),
                ..Default::default()
            };
            let scholar = GoogleScholar::new(options, &cookies)
                .context("Failed to set up Google Scholar client")?;
            Ok(Box::new(scholar))
        }
        SourceKind::Openalex => {
            let mut options = OpenAlexOptions::default();
            if let Some(mailto) = &cli.mailto {
                options.mailto = mailto.clone();
            }
            let openalex = OpenAlex::new(options).context("Failed to set up OpenAlex client")?;
            Ok(Box::new(openalex))
        }
    }
}
