//! Session cookies for the Google Scholar provider.
//!
//! Scholar throttles anonymous clients quickly. Cookies exported from a
//! browser session (Playwright/DevTools JSON format) are replayed on every
//! page request.

use crate::error::{LitReviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Cookie file name, resolved against the home directory
const COOKIE_FILE: &str = ".gscholar_cookies.json";

/// Default cookie file path: `~/.gscholar_cookies.json`
fn default_cookie_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(COOKIE_FILE))
        .ok_or_else(|| LitReviewError::Config("Cannot determine home directory".to_string()))
}

/// Cookie entry matching Playwright's cookie format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, alias = "httpOnly")]
    pub http_only: bool,
    /// Expiry as unix seconds; negative or absent means session cookie
    #[serde(default)]
    pub expires: Option<f64>,
}

impl Cookie {
    fn is_expired(&self, now_secs: f64) -> bool {
        matches!(self.expires, Some(t) if t > 0.0 && t < now_secs)
    }
}

/// Loads the cookie file
pub struct CookieManager {
    path: PathBuf,
}

impl CookieManager {
    /// Manager for the default path under the home directory
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_cookie_path()?,
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load unexpired cookies.
    ///
    /// A missing or unreadable file yields no cookies; the provider still
    /// works without them.
    pub fn load(&self) -> Vec<Cookie> {
        if !self.path.exists() {
            debug!("Cookie file not found: {:?}", self.path);
            return Vec::new();
        }

        let cookies = match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Vec<Cookie>>(&content) {
                Ok(cookies) => cookies,
                Err(e) => {
                    warn!("Failed to parse cookies: {}", e);
                    return Vec::new();
                }
            },
            Err(e) => {
                warn!("Failed to read cookie file: {}", e);
                return Vec::new();
            }
        };

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let total = cookies.len();
        let live: Vec<Cookie> = cookies.into_iter().filter(|c| !c.is_expired(now)).collect();
        if live.len() < total {
            warn!(expired = total - live.len(), "Dropped expired cookies");
        }
        info!("Loaded {} cookies from {:?}", live.len(), self.path);
        live
    }
}

impl Default for CookieManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            path: PathBuf::from(COOKIE_FILE),
        })
    }
}
