//! Fetch sources supplying raw listing documents
//!
//! This module provides:
//! - The [`ListingSource`] seam the pipeline reads listings through
//! - An HTTP source for the published listing sites
//! - A file source for listings saved to disk

use crate::Result;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Listing published in the reference deployment
pub const DEFAULT_LISTING_URL: &str = "https://free-proxy-list.net";

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Something that can hand over the raw bytes of a listing document
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Retrieve the whole document
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Configuration for HTTP listing sources
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// A site publishing a proxy table in the free-proxy-list layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSite {
    pub name: String,
    pub url: String,
}

impl ListingSite {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// Sites sharing the `#list` table layout
pub fn known_sites() -> Vec<ListingSite> {
    vec![
        ListingSite::new("free-proxy-list.net", DEFAULT_LISTING_URL),
        ListingSite::new("sslproxies", "https://www.sslproxies.org/"),
        ListingSite::new("us-proxy.org", "https://www.us-proxy.org/"),
        ListingSite::new("socks-proxy.net", "https://www.socks-proxy.net/"),
    ]
}

/// Listing fetched over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpSource {
    name: String,
    url: String,
    client: Client,
}

impl HttpSource {
    /// Create a source for `url` with default configuration
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(url, FetcherConfig::default())
    }

    /// Create a source for `url` with custom configuration
    pub fn with_config(url: &str, config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            name: url.to_string(),
            url: url.to_string(),
            client,
        })
    }

    /// Create a source for a known listing site
    pub fn for_site(site: &ListingSite, config: FetcherConfig) -> Result<Self> {
        let mut source = Self::with_config(&site.url, config)?;
        source.name = site.name.clone();
        Ok(source)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ListingSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        debug!(url = %self.url, "Fetching proxy listing");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// Listing page saved on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: path.display().to_string(),
            path,
        }
    }
}

#[async_trait]
impl ListingSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read listing from {:?}", self.path))
    }
}
