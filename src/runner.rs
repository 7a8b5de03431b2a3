//! Query runner: fetches and normalizes the records for one keyword.
//!
//! Provider failures never escape this module. A failed attempt is logged,
//! followed by a randomized backoff, and the whole fetch starts again with an
//! empty buffer. Once the attempts are used up the caller gets whatever the
//! last attempt collected.

use crate::error::Result;
use crate::record::Record;
use crate::retry::{Delay, RetryPolicy};
use crate::source::ScholarSource;
use tracing::{debug, error, info, warn};

/// Records gathered for a single keyword.
#[derive(Debug, Clone, Default)]
pub struct KeywordFetch {
    /// Normalized records in provider order
    pub records: Vec<Record>,
    /// Attempts actually made
    pub attempts: u32,
    /// True when every attempt failed
    pub exhausted: bool,
}

/// Fetch up to `max_results` records for `keyword`.
///
/// Never returns an error: failures are retried according to `policy` and,
/// when the budget runs out, reported through the log.
pub async fn fetch_keyword(
    source: &dyn ScholarSource,
    keyword: &str,
    max_results: usize,
    policy: &RetryPolicy,
    delay: &dyn Delay,
) -> KeywordFetch {
    let max_attempts = policy.max_attempts.max(1);
    let mut records = Vec::new();

    for attempt in 1..=max_attempts {
        records.clear();

        match run_attempt(source, keyword, max_results, &mut records).await {
            Ok(()) => {
                info!(
                    keyword = keyword,
                    source = source.name(),
                    count = records.len(),
                    attempt = attempt,
                    "Keyword fetched"
                );
                return KeywordFetch {
                    records,
                    attempts: attempt,
                    exhausted: false,
                };
            }
            Err(e) if attempt < max_attempts => {
                let wait = policy.next_backoff();
                warn!(
                    keyword = keyword,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    wait_secs = wait.as_secs(),
                    error = %e,
                    "Fetch failed, retrying"
                );
                delay.wait(wait).await;
            }
            Err(e) => {
                error!(
                    keyword = keyword,
                    attempts = max_attempts,
                    partial = records.len(),
                    error = %e,
                    "Giving up on keyword"
                );
            }
        }
    }

    KeywordFetch {
        records,
        attempts: max_attempts,
        exhausted: true,
    }
}

/// One complete pass: issue the search and pull items until the limit or
/// the end of the stream.
async fn run_attempt(
    source: &dyn ScholarSource,
    keyword: &str,
    max_results: usize,
    records: &mut Vec<Record>,
) -> Result<()> {
    let mut stream = source.search(keyword).await?;

    while records.len() < max_results {
        match stream.next_publication().await? {
            Some(raw) => records.push(Record::from_raw(keyword, raw)),
            None => {
                debug!(keyword = keyword, count = records.len(), "Stream exhausted");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LitReviewError;
    use crate::record::RawPublication;
    use crate::retry::NoDelay;
    use crate::source::PublicationStream;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted outcome per `search` call.
    enum Script {
        /// `search` itself fails
        Refuse,
        /// Yields these items, then fails
        FailAfter(Vec<RawPublication>),
        /// Yields these items, then ends
        Items(Vec<RawPublication>),
    }

    struct ScriptedSource {
        scripts: Mutex<VecDeque<Script>>,
        searches: AtomicU32,
    }

    impl ScriptedSource {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                searches: AtomicU32::new(0),
            }
        }
    }

    struct ScriptedStream {
        items: VecDeque<RawPublication>,
        fail_at_end: bool,
    }

    #[async_trait]
    impl PublicationStream for ScriptedStream {
        async fn next_publication(&mut self) -> Result<Option<RawPublication>> {
            match self.items.pop_front() {
                Some(item) => Ok(Some(item)),
                None if self.fail_at_end => Err(LitReviewError::RateLimited(60)),
                None => Ok(None),
            }
        }
    }

    #[async_trait]
    impl ScholarSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn search(&self, _query: &str) -> Result<Box<dyn PublicationStream>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            let next = self
                .scripts
                .lock()
                .map_err(|_| LitReviewError::Config("poisoned".into()))?
                .pop_front()
                .unwrap_or(Script::Refuse);
            match next {
                Script::Refuse => Err(LitReviewError::Captcha),
                Script::FailAfter(items) => Ok(Box::new(ScriptedStream {
                    items: items.into(),
                    fail_at_end: true,
                })),
                Script::Items(items) => Ok(Box::new(ScriptedStream {
                    items: items.into(),
                    fail_at_end: false,
                })),
            }
        }
    }

    /// Records requested waits without sleeping.
    #[derive(Default)]
    struct RecordingDelay {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Delay for RecordingDelay {
        async fn wait(&self, duration: Duration) {
            if let Ok(mut waits) = self.waits.lock() {
                waits.push(duration);
            }
        }
    }

    fn titled(title: &str) -> RawPublication {
        RawPublication {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stops_at_max_results() {
        let items = (0..25).map(|i| titled(&format!("Paper {}", i))).collect();
        let source = ScriptedSource::new(vec![Script::Items(items)]);

        let fetch = fetch_keyword(&source, "nlp", 10, &RetryPolicy::default(), &NoDelay).await;
        assert_eq!(fetch.records.len(), 10);
        assert_eq!(fetch.records[0].title, "Paper 0");
        assert_eq!(fetch.records[9].title, "Paper 9");
        assert!(fetch.records.iter().all(|r| r.keyword == "nlp"));
        assert!(!fetch.exhausted);
    }

    #[tokio::test]
    async fn test_short_stream_is_not_an_error() {
        let source = ScriptedSource::new(vec![Script::Items(vec![titled("Only one")])]);

        let fetch = fetch_keyword(&source, "rare", 10, &RetryPolicy::default(), &NoDelay).await;
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.attempts, 1);
    }

    #[tokio::test]
    async fn test_empty_result_does_not_retry() {
        let source = ScriptedSource::new(vec![Script::Items(vec![])]);
        let delay = RecordingDelay::default();

        let fetch = fetch_keyword(&source, "nothing", 10, &RetryPolicy::default(), &delay).await;
        assert!(fetch.records.is_empty());
        assert!(!fetch.exhausted);
        assert_eq!(source.searches.load(Ordering::SeqCst), 1);
        assert!(delay.waits.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_retry_discards_partial_attempt() {
        let source = ScriptedSource::new(vec![
            Script::FailAfter(vec![titled("Half"), titled("Done")]),
            Script::Items(vec![titled("Fresh")]),
        ]);
        let delay = RecordingDelay::default();

        let fetch = fetch_keyword(&source, "kw", 10, &RetryPolicy::default(), &delay).await;
        assert_eq!(fetch.attempts, 2);
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].title, "Fresh");

        let waits = delay.waits.lock().expect("lock");
        assert_eq!(waits.len(), 1);
        assert!((5..=15).contains(&waits[0].as_secs()));
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_without_error() {
        let source = ScriptedSource::new(vec![Script::Refuse, Script::Refuse, Script::Refuse]);
        let delay = RecordingDelay::default();

        let fetch = fetch_keyword(&source, "blocked", 10, &RetryPolicy::default(), &delay).await;
        assert!(fetch.records.is_empty());
        assert!(fetch.exhausted);
        assert_eq!(fetch.attempts, 3);
        assert_eq!(source.searches.load(Ordering::SeqCst), 3);
        // No wait after the final attempt
        assert_eq!(delay.waits.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_keeps_last_partial_attempt() {
        let source = ScriptedSource::new(vec![
            Script::FailAfter(vec![titled("A"), titled("B")]),
            Script::FailAfter(vec![titled("C")]),
        ]);
        let policy = RetryPolicy {
            max_attempts: 2,
            ..Default::default()
        };

        let fetch = fetch_keyword(&source, "flaky", 10, &policy, &NoDelay).await;
        assert!(fetch.exhausted);
        assert_eq!(fetch.records.len(), 1);
        assert_eq!(fetch.records[0].title, "C");
    }
}
