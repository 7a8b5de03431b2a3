//! Batch pipeline: query every keyword, deduplicate, write the CSV.
//!
//! Keywords are processed strictly in order, one at a time. Nothing is
//! written until every keyword has been attempted.

use crate::dedup;
use crate::error::{LitReviewError, Result};
use crate::record::Schema;
use crate::retry::{Delay, RetryPolicy};
use crate::runner;
use crate::sink;
use crate::source::ScholarSource;
use std::path::{Path, PathBuf};
use tracing::info;

/// Keywords queried when none are supplied
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "automatic text simplification dyslexia",
    "text simplification ADHD education AI",
    "Hindi text simplification accessibility",
    "cognitive accessibility sentence simplification school curriculum",
    "multilingual text simplification education technology disabilities",
    "text-to-speech cognitive accessibility",
    "AI text simplification with TTS",
    "adaptive learning accessibility NLP",
    "Indian languages educational accessibility AI",
];

/// Default number of records pulled per keyword
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Default output file
pub const DEFAULT_OUTPUT: &str = "papers.csv";

/// Everything a run needs besides the provider and the delay.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Queries, in execution order
    pub keywords: Vec<String>,
    /// Records pulled per keyword
    pub max_results: usize,
    pub retry: RetryPolicy,
    pub output: PathBuf,
    pub schema: Schema,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            max_results: DEFAULT_MAX_RESULTS,
            retry: RetryPolicy::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            schema: Schema::Standard,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() {
            return Err(LitReviewError::Config("keyword list is empty".to_string()));
        }
        self.retry.validate()
    }
}

/// Read a keyword list: one query per line, blank lines and `#` comments
/// ignored.
pub fn load_keywords(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_keywords(&content))
}

fn parse_keywords(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Records returned by the provider across all keywords
    pub fetched: usize,
    /// Records written
    pub unique: usize,
    /// Records dropped as duplicates
    pub duplicates: usize,
    /// Keywords whose retries were exhausted
    pub failed_keywords: Vec<String>,
    pub output: PathBuf,
}

/// Run the whole batch.
///
/// Provider failures only shrink the result; the output file (at least its
/// header) is always written. The only errors returned are invalid
/// configuration and output I/O failures.
pub async fn run(
    config: &PipelineConfig,
    source: &dyn ScholarSource,
    delay: &dyn Delay,
) -> Result<RunReport> {
    config.validate()?;

    let mut collected = Vec::new();
    let mut failed_keywords = Vec::new();

    for (idx, keyword) in config.keywords.iter().enumerate() {
        info!(
            keyword = %keyword,
            index = idx + 1,
            total = config.keywords.len(),
            "Searching"
        );

        let fetch = runner::fetch_keyword(
            source,
            keyword,
            config.max_results,
            &config.retry,
            delay,
        )
        .await;

        if fetch.exhausted {
            failed_keywords.push(keyword.clone());
        }
        collected.extend(fetch.records);
    }

    let fetched = collected.len();
    let outcome = dedup::dedupe(collected);

    sink::write_csv(&config.output, &outcome.unique, config.schema)?;

    let report = RunReport {
        fetched,
        unique: outcome.unique.len(),
        duplicates: outcome.duplicates.len(),
        failed_keywords,
        output: config.output.clone(),
    };

    info!(
        fetched = report.fetched,
        unique = report.unique,
        duplicates = report.duplicates,
        failed = report.failed_keywords.len(),
        output = %report.output.display(),
        "Pipeline complete"
    );

    Ok(report)
}
