//! # rustlitreview
//!
//! Keyword-driven literature collection: query an academic search provider
//! for each keyword, deduplicate across queries, export one CSV.
//!
//! ## Modules
//!
//! - [`pipeline`] - Batch entry point and configuration
//! - [`runner`] - Per-keyword fetch with bounded retry
//! - [`dedup`] - Identity keys and first-seen deduplication
//! - [`sink`] - Atomic CSV writer
//! - [`gscholar`] - Google Scholar provider
//! - [`openalex`] - OpenAlex provider
//! - [`cookies`] - Cookie persistence for Google Scholar
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustlitreview::{gscholar, pipeline, retry::TokioDelay, cookies::CookieManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = gscholar::GoogleScholar::new(Default::default(), &CookieManager::default())?;
//!     let report = pipeline::run(&Default::default(), &source, &TokioDelay).await?;
//!     println!("{} unique papers", report.unique);
//!     Ok(())
//! }
//! ```

pub mod cookies;
pub mod dedup;
pub mod error;
pub mod gscholar;
pub mod openalex;
pub mod pipeline;
pub mod record;
pub mod retry;
pub mod runner;
pub mod sink;
pub mod source;

pub use error::{LitReviewError, Result};
pub use record::{Record, Schema, NOT_AVAILABLE};
