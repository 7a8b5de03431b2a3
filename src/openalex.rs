//! OpenAlex provider
//!
//! Alternative to Google Scholar backed by the OpenAlex JSON API. Unlike
//! Scholar it returns DOIs, so cross-keyword deduplication can key on them.
//!
//! API notes:
//! - `mailto` puts requests in the polite pool (10 req/s vs 1 req/s)
//! - `per-page` is capped at 200

use crate::error::{LitReviewError, Result};
use crate::record::RawPublication;
use crate::source::{PublicationStream, ScholarSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

/// OpenAlex API base URL
const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Maximum results per page (OpenAlex limit)
const MAX_PER_PAGE: u32 = 200;

/// Default email for polite pool access
const POLITE_EMAIL: &str = "rustlitreview@example.com";

/// Authors listed before truncating with "..."
const MAX_AUTHORS: usize = 3;

#[derive(Debug, Clone)]
pub struct OpenAlexOptions {
    /// Results requested per page; the runner rarely needs more than one page
    pub per_page: u32,
    /// Contact address for the polite pool
    pub mailto: String,
    /// Override for the API base (used by tests and mirrors)
    pub base_url: Option<String>,
}

impl Default for OpenAlexOptions {
    fn default() -> Self {
        Self {
            per_page: 25,
            mailto: POLITE_EMAIL.to_string(),
            base_url: None,
        }
    }
}

/// OpenAlex search provider.
pub struct OpenAlex {
    client: Client,
    base_url: String,
    per_page: u32,
    mailto: String,
}

impl OpenAlex {
    pub fn new(options: OpenAlexOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("rustlitreview/0.1 (mailto:{})", options.mailto))
            .build()?;

        Ok(Self {
            client,
            base_url: options
                .base_url
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| OPENALEX_API_BASE.to_string()),
            per_page: options.per_page.clamp(1, MAX_PER_PAGE),
            mailto: options.mailto,
        })
    }
}

#[async_trait]
impl ScholarSource for OpenAlex {
    fn name(&self) -> &str {
        "openalex"
    }

    async fn search(&self, query: &str) -> Result<Box<dyn PublicationStream>> {
        info!(query = query, per_page = self.per_page, "Starting OpenAlex query");

        let mut stream = OpenAlexStream {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            mailto: self.mailto.clone(),
            per_page: self.per_page,
            query: query.to_string(),
            next_page: 1,
            buffer: VecDeque::new(),
            finished: false,
        };
        stream.fetch_next_page().await?;
        Ok(Box::new(stream))
    }
}

struct OpenAlexStream {
    client: Client,
    base_url: String,
    mailto: String,
    per_page: u32,
    query: String,
    next_page: u32,
    buffer: VecDeque<RawPublication>,
    finished: bool,
}

impl OpenAlexStream {
    async fn fetch_next_page(&mut self) -> Result<()> {
        let url = build_search_url(
            &self.base_url,
            &self.query,
            self.next_page,
            self.per_page,
            &self.mailto,
        );
        debug!(url = %url, page = self.next_page, "Fetching OpenAlex page");

        let body = fetch_page(&self.client, &url).await?;
        let works = parse_response(&body)?;
        debug!(page = self.next_page, count = works.len(), "Parsed OpenAlex results");

        if (works.len() as u32) < self.per_page {
            self.finished = true;
        }
        self.next_page += 1;
        self.buffer.extend(works);
        Ok(())
    }
}

#[async_trait]
impl PublicationStream for OpenAlexStream {
    async fn next_publication(&mut self) -> Result<Option<RawPublication>> {
        if self.buffer.is_empty() && !self.finished {
            self.fetch_next_page().await?;
        }
        Ok(self.buffer.pop_front())
    }
}

/// OpenAlex API response structures
#[derive(Debug, Deserialize)]
struct OpenAlexResponse {
    #[serde(default)]
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    title: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    doi: Option<String>,
    #[serde(rename = "abstract_inverted_index")]
    abstract_index: Option<serde_json::Value>,
    authorships: Option<Vec<OpenAlexAuthorship>>,
    primary_location: Option<OpenAlexLocation>,
    keywords: Option<Vec<OpenAlexKeyword>>,
    primary_topic: Option<OpenAlexTopic>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthorship {
    author: Option<OpenAlexAuthor>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexLocation {
    source: Option<OpenAlexSource>,
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexSource {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexKeyword {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexTopic {
    display_name: Option<String>,
}

/// Build OpenAlex API search URL
fn build_search_url(base: &str, query: &str, page: u32, per_page: u32, mailto: &str) -> String {
    format!(
        "{}/works?search={}&per-page={}&page={}&mailto={}&select=title,display_name,publication_year,doi,abstract_inverted_index,authorships,primary_location,keywords,primary_topic",
        base,
        urlencoding::encode(query),
        per_page,
        page,
        urlencoding::encode(mailto)
    )
}

/// Fetch page content from OpenAlex API
async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Err(LitReviewError::RateLimited(retry_after));
    }

    if !status.is_success() {
        return Err(LitReviewError::Api {
            code: status.as_u16() as i32,
            message: format!("OpenAlex API error: {}", status),
        });
    }

    Ok(response.text().await?)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse OpenAlex API response into raw publications
fn parse_response(json_str: &str) -> Result<Vec<RawPublication>> {
    let response: OpenAlexResponse = serde_json::from_str(json_str)
        .map_err(|e| LitReviewError::Parse(format!("Failed to parse OpenAlex response: {}", e)))?;

    let results = response
        .results
        .into_iter()
        .map(|work| {
            let authors = work.authorships.as_ref().map(|authorships| {
                let mut names: Vec<String> = authorships
                    .iter()
                    .filter_map(|a| a.author.as_ref())
                    .filter_map(|a| a.display_name.clone())
                    .take(MAX_AUTHORS)
                    .collect::<Vec<_>>();
                if authorships.len() > MAX_AUTHORS {
                    names.push("...".to_string());
                }
                names.join(", ")
            });

            let keywords = work.keywords.map(|kws| {
                kws.into_iter()
                    .filter_map(|k| k.display_name)
                    .take(5)
                    .collect::<Vec<_>>()
                    .join(", ")
            });

            let (venue, landing) = match work.primary_location {
                Some(location) => (
                    location.source.and_then(|s| s.display_name),
                    location.landing_page_url,
                ),
                None => (None, None),
            };

            RawPublication {
                title: work.display_name.or(work.title).and_then(non_empty),
                author: authors.and_then(non_empty),
                pub_year: work.publication_year.map(|y| y.to_string()),
                venue: venue.and_then(non_empty),
                // Clean format without the resolver prefix
                doi: work
                    .doi
                    .map(|d| d.trim_start_matches("https://doi.org/").to_string())
                    .and_then(non_empty),
                abstract_text: work
                    .abstract_index
                    .as_ref()
                    .map(reconstruct_abstract)
                    .and_then(non_empty),
                pub_url: landing.and_then(non_empty),
                keywords: keywords.and_then(non_empty),
                index_terms: work.primary_topic.and_then(|t| t.display_name).and_then(non_empty),
            }
        })
        .collect();

    Ok(results)
}

/// Reconstruct abstract text from the inverted index OpenAlex serves
/// (word -> positions).
fn reconstruct_abstract(inverted_index: &serde_json::Value) -> String {
    let Some(obj) = inverted_index.as_object() else {
        return String::new();
    };

    let mut words: Vec<(i64, &str)> = Vec::new();
    for (word, positions) in obj {
        if let Some(pos_array) = positions.as_array() {
            for p in pos_array.iter().filter_map(|p| p.as_i64()) {
                words.push((p, word.as_str()));
            }
        }
    }

    words.sort_by_key(|(pos, _)| *pos);
    words.iter().map(|(_, w)| *w).collect::<Vec<_>>().join(" ")
}
