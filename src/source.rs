//! Search provider abstraction.
//!
//! A provider turns a query string into a lazy stream of raw publications.
//! Transport, cookies and pagination stay behind this boundary, so the query
//! runner can be driven by a scripted fake in tests.

use crate::error::Result;
use crate::record::RawPublication;
use async_trait::async_trait;

/// Lazily yields publications for one search.
///
/// `Ok(None)` means the provider has nothing more; an `Err` aborts the
/// current attempt.
#[async_trait]
pub trait PublicationStream: Send {
    async fn next_publication(&mut self) -> Result<Option<RawPublication>>;
}

/// An academic search provider.
#[async_trait]
pub trait ScholarSource: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Issue a search and return a stream over its results.
    async fn search(&self, query: &str) -> Result<Box<dyn PublicationStream>>;
}
