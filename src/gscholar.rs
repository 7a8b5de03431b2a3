//! Google Scholar provider.
//!
//! Scrapes the HTML result pages of Google Scholar. Pages are fetched lazily,
//! ten results at a time, as the query runner pulls items from the stream.

use crate::cookies::{Cookie, CookieManager};
use crate::error::{LitReviewError, Result};
use crate::record::RawPublication;
use crate::source::{PublicationStream, ScholarSource};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// Results per Scholar result page
const PAGE_SIZE: u32 = 10;

/// Scholar serves at most 1000 results per query
const MAX_START: u32 = 1000;

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Options for the Scholar provider
#[derive(Debug, Clone)]
pub struct ScholarOptions {
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    /// Custom base URL for mirror sites
    pub base_url: Option<String>,
    /// Source data type filter (default: "0,5" for articles only)
    pub sdt: String,
    /// Random pause before each page request, in milliseconds
    pub page_jitter_ms: (u64, u64),
}

impl Default for ScholarOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            base_url: None,
            sdt: "0,5".to_string(),
            page_jitter_ms: (500, 2000),
        }
    }
}

/// Google Scholar search provider.
pub struct GoogleScholar {
    client: reqwest::Client,
    base_url: String,
    sdt: String,
    cookie_header: String,
    page_jitter_ms: (u64, u64),
}

impl GoogleScholar {
    /// Build a provider, loading cookies from `cookies`.
    pub fn new(options: ScholarOptions, cookies: &CookieManager) -> Result<Self> {
        let base_url = options
            .base_url
            .as_ref()
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SCHOLAR_URL.to_string());

        let loaded = cookies.load();
        if loaded.is_empty() {
            warn!(
                path = %cookies.path().display(),
                "No cookies loaded; Google Scholar may answer with a CAPTCHA sooner"
            );
        } else {
            info!(path = %cookies.path().display(), "Loaded {} cookies for Google Scholar", loaded.len());
        }

        Ok(Self {
            client: build_http_client(options.proxy.as_deref())?,
            base_url,
            sdt: options.sdt,
            cookie_header: build_cookie_header(&loaded),
            page_jitter_ms: options.page_jitter_ms,
        })
    }
}

#[async_trait]
impl ScholarSource for GoogleScholar {
    fn name(&self) -> &str {
        "gscholar"
    }

    async fn search(&self, query: &str) -> Result<Box<dyn PublicationStream>> {
        info!(query = query, url = %self.base_url, "Starting Google Scholar query");

        let mut stream = ScholarPageStream {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            sdt: self.sdt.clone(),
            cookie_header: self.cookie_header.clone(),
            page_jitter_ms: self.page_jitter_ms,
            query: query.to_string(),
            next_start: 0,
            buffer: VecDeque::new(),
            finished: false,
        };
        // Issuing the search means fetching the first page
        stream.fetch_next_page().await?;
        Ok(Box::new(stream))
    }
}

/// Lazily paged Scholar results.
struct ScholarPageStream {
    client: reqwest::Client,
    base_url: String,
    sdt: String,
    cookie_header: String,
    page_jitter_ms: (u64, u64),
    query: String,
    next_start: u32,
    buffer: VecDeque<RawPublication>,
    finished: bool,
}

impl ScholarPageStream {
    async fn fetch_next_page(&mut self) -> Result<()> {
        let url = build_search_url(&self.base_url, &self.query, self.next_start, &self.sdt)?;
        debug!(start = self.next_start, url = %url, "Fetching page");

        let (lo, hi) = self.page_jitter_ms;
        if hi > 0 {
            let delay = rand::thread_rng().gen_range(lo.min(hi)..=hi);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let html = fetch_page(&self.client, &url, &self.cookie_header).await?;
        if html.contains("Solving the above CAPTCHA") || html.contains("unusual traffic") {
            warn!(start = self.next_start, "CAPTCHA detected");
            return Err(LitReviewError::Captcha);
        }

        let page = parse_page(&html)?;
        self.absorb(page);
        Ok(())
    }

    /// Buffer a parsed page. Only a short page (by result entries, not by
    /// usable items) ends the stream.
    fn absorb(&mut self, page: ScholarPage) {
        debug!(
            start = self.next_start,
            entries = page.entries,
            count = page.items.len(),
            "Parsed results"
        );

        self.next_start += PAGE_SIZE;
        if (page.entries as u32) < PAGE_SIZE || self.next_start >= MAX_START {
            self.finished = true;
        }
        self.buffer.extend(page.items);
    }
}

#[async_trait]
impl PublicationStream for ScholarPageStream {
    async fn next_publication(&mut self) -> Result<Option<RawPublication>> {
        // A full page may hold no usable items; keep paging
        while self.buffer.is_empty() && !self.finished {
            self.fetch_next_page().await?;
        }
        Ok(self.buffer.pop_front())
    }
}

/// Build cookie header string from cookie list
fn build_cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .filter(|c| c.domain.contains("google"))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Build HTTP client with optional proxy
fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .cookie_store(true);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            LitReviewError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| LitReviewError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Build Google Scholar search URL
fn build_search_url(base_url: &str, query: &str, start: u32, sdt: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/scholar", base_url))
        .map_err(|e| LitReviewError::Config(format!("Invalid base URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("hl", "en-US") // English locale keeps the metadata line parseable
        .append_pair("start", &start.to_string())
        .append_pair("as_sdt", sdt);

    Ok(url)
}

/// Fetch page content with the session cookies attached
async fn fetch_page(client: &reqwest::Client, url: &Url, cookie_header: &str) -> Result<String> {
    let mut request = client
        .get(url.as_str())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache")
        .header("Upgrade-Insecure-Requests", "1");

    if !cookie_header.is_empty() {
        request = request.header("Cookie", cookie_header);
    }

    let response = request.send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(LitReviewError::RateLimited(60));
    }

    if !status.is_success() {
        return Err(LitReviewError::Api {
            code: status.as_u16() as i32,
            message: format!("HTTP error: {}", status),
        });
    }

    Ok(response.text().await?)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// One parsed Scholar result page.
#[derive(Debug, Default)]
pub struct ScholarPage {
    /// Result entries on the page, including ones without a title
    pub entries: usize,
    /// Entries that yielded a title
    pub items: Vec<RawPublication>,
}

/// Parse a Google Scholar result page.
///
/// Scholar result pages carry no DOI, so `doi` is always `None`. The result
/// snippet stands in for the abstract. Entries without a title are counted
/// but not returned.
pub fn parse_page(html: &str) -> Result<ScholarPage> {
    let document = Html::parse_document(html);

    let item_selector =
        Selector::parse("div.gs_r.gs_or.gs_scl").map_err(|e| LitReviewError::Parse(e.to_string()))?;
    let title_selector =
        Selector::parse("h3.gs_rt").map_err(|e| LitReviewError::Parse(e.to_string()))?;
    let link_selector =
        Selector::parse("h3.gs_rt a").map_err(|e| LitReviewError::Parse(e.to_string()))?;
    let meta_selector =
        Selector::parse("div.gs_a").map_err(|e| LitReviewError::Parse(e.to_string()))?;
    let snippet_selector =
        Selector::parse("div.gs_rs").map_err(|e| LitReviewError::Parse(e.to_string()))?;

    let year_regex =
        Regex::new(r"\b(19|20)\d{2}\b").map_err(|e| LitReviewError::Parse(e.to_string()))?;

    let mut page = ScholarPage::default();

    for item in document.select(&item_selector) {
        page.entries += 1;
        let mut data = RawPublication::default();

        if let Some(link) = item.select(&link_selector).next() {
            data.title = non_empty(link.text().collect::<String>().trim().to_string());
            data.pub_url = link.value().attr("href").map(str::to_string);
        } else if let Some(title_elem) = item.select(&title_selector).next() {
            // [CITATION] entries have no link
            data.title = non_empty(title_elem.text().collect::<String>().trim().to_string());
        }

        // "Authors - Venue, Year - host"
        if let Some(meta_elem) = item.select(&meta_selector).next() {
            let meta_text = meta_elem.text().collect::<String>();
            let parts: Vec<&str> = meta_text.split(" - ").collect();

            if let Some(authors) = parts.first() {
                data.author = non_empty(authors.trim().to_string());
            }

            if let Some(venue_year) = parts.get(1) {
                if let Some(year_match) = year_regex.find(venue_year) {
                    data.pub_year = Some(year_match.as_str().to_string());
                    let venue = venue_year[..year_match.start()].trim().trim_end_matches(',');
                    data.venue = non_empty(venue.trim().to_string());
                } else {
                    data.venue = non_empty(venue_year.trim().to_string());
                }
            }
        }

        if let Some(snippet_elem) = item.select(&snippet_selector).next() {
            data.abstract_text = non_empty(snippet_elem.text().collect::<String>().trim().to_string());
        }

        if data.title.is_some() {
            page.items.push(data);
        }
    }

    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"
        <html><body>
        <div class="gs_r gs_or gs_scl">
          <h3 class="gs_rt"><a href="https://example.org/paper1">Lexical simplification for dyslexia</a></h3>
          <div class="gs_a">L Rello, R Baeza-Yates - Proceedings of ASSETS, 2013 - dl.acm.org</div>
          <div class="gs_rs">We present a lexical simplification system.</div>
        </div>
        <div class="gs_r gs_or gs_scl">
          <h3 class="gs_rt"><span>[CITATION]</span> Readability of Hindi text</h3>
          <div class="gs_a">A Author - Unknown venue</div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_build_search_url() {
        let url = build_search_url("https://scholar.google.com", "text simplification", 10, "0,5")
            .expect("Failed to build URL");
        assert!(url.as_str().starts_with("https://scholar.google.com/scholar?"));
        assert!(url.as_str().contains("q=text+simplification"));
        assert!(url.as_str().contains("start=10"));
        assert!(url.as_str().contains("as_sdt=0%2C5"));
    }

    #[test]
    fn test_parse_empty_html() {
        let page = parse_page("<html><body></body></html>").expect("Parse failed");
        assert_eq!(page.entries, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_parse_page() {
        let page = parse_page(SAMPLE_PAGE).expect("Parse failed");
        assert_eq!(page.entries, 2);
        let results = page.items;
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.title.as_deref(), Some("Lexical simplification for dyslexia"));
        assert_eq!(first.author.as_deref(), Some("L Rello, R Baeza-Yates"));
        assert_eq!(first.pub_year.as_deref(), Some("2013"));
        assert_eq!(first.venue.as_deref(), Some("Proceedings of ASSETS"));
        assert_eq!(first.pub_url.as_deref(), Some("https://example.org/paper1"));
        assert_eq!(
            first.abstract_text.as_deref(),
            Some("We present a lexical simplification system.")
        );
        assert!(first.doi.is_none());

        let second = &results[1];
        assert_eq!(second.title.as_deref(), Some("[CITATION] Readability of Hindi text"));
        assert!(second.pub_url.is_none());
        assert!(second.pub_year.is_none());
        assert_eq!(second.venue.as_deref(), Some("Unknown venue"));
        assert!(second.abstract_text.is_none());
    }

    fn full_page_with_untitled_entry() -> String {
        let mut html = String::from("<html><body>");
        for i in 0..9 {
            html.push_str(&format!(
                r#"<div class="gs_r gs_or gs_scl"><h3 class="gs_rt"><a href="https://example.org/{i}">Paper {i}</a></h3></div>"#
            ));
        }
        html.push_str(r#"<div class="gs_r gs_or gs_scl"><div class="gs_a">No title here</div></div>"#);
        html.push_str("</body></html>");
        html
    }

    fn empty_stream() -> ScholarPageStream {
        ScholarPageStream {
            client: reqwest::Client::new(),
            base_url: DEFAULT_SCHOLAR_URL.to_string(),
            sdt: "0,5".to_string(),
            cookie_header: String::new(),
            page_jitter_ms: (0, 0),
            query: "accessibility".to_string(),
            next_start: 0,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    #[test]
    fn test_untitled_entry_counts_toward_full_page() {
        let page = parse_page(&full_page_with_untitled_entry()).expect("Parse failed");
        assert_eq!(page.entries, 10);
        assert_eq!(page.items.len(), 9);
    }

    #[test]
    fn test_full_page_keeps_stream_open() {
        let mut stream = empty_stream();
        stream.absorb(parse_page(&full_page_with_untitled_entry()).expect("Parse failed"));

        assert!(!stream.finished);
        assert_eq!(stream.buffer.len(), 9);
        assert_eq!(stream.next_start, 10);
    }

    #[test]
    fn test_short_page_ends_stream() {
        let mut stream = empty_stream();
        stream.absorb(parse_page(SAMPLE_PAGE).expect("Parse failed"));

        assert!(stream.finished);
        assert_eq!(stream.buffer.len(), 2);
    }

    #[test]
    fn test_stream_stops_at_result_cap() {
        let mut stream = empty_stream();
        stream.next_start = MAX_START - PAGE_SIZE;
        stream.absorb(parse_page(&full_page_with_untitled_entry()).expect("Parse failed"));

        assert!(stream.finished);
    }

    #[test]
    fn test_cookie_header_filters_domain() {
        let cookies = vec![
            Cookie {
                name: "NID".to_string(),
                value: "abc".to_string(),
                domain: ".google.com".to_string(),
                path: "/".to_string(),
                secure: true,
                http_only: true,
                expires: None,
            },
            Cookie {
                name: "other".to_string(),
                value: "x".to_string(),
                domain: ".example.com".to_string(),
                path: "/".to_string(),
                secure: false,
                http_only: false,
                expires: None,
            },
        ];
        assert_eq!(build_cookie_header(&cookies), "NID=abc");
    }
}
