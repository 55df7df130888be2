use crate::error::{Result, ScanError};
use reqwest::Client;
use scraper::{Html, Selector};
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Capability the crawler uses to discover a page's outbound links.
///
/// Implementations return links in the order they appear on the page.
/// Filtering and deduplication are left to the crawler.
pub trait LinkFetcher: Send + Sync {
    fn fetch_links(&self, url: &Url) -> impl Future<Output = Result<Vec<Url>>> + Send;
}

/// Fetches a page over HTTP and extracts its anchors.
pub struct HttpLinkFetcher {
    client: Client,
}

impl HttpLinkFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Trailmap/0.1 (site hierarchy crawler)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

impl LinkFetcher for HttpLinkFetcher {
    async fn fetch_links(&self, url: &Url) -> Result<Vec<Url>> {
        debug!("Fetching {}", url);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Fetch(format!("{} returned {}", url, status)));
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        if !is_html {
            debug!("{} is not HTML, no links to follow", url);
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        extract_links(&body, url)
    }
}

/// Resolve every `a[href]` of an HTML document against the page URL.
pub fn extract_links(html: &str, page_url: &Url) -> Result<Vec<Url>> {
    let document = Html::parse_document(html);
    let link_selector =
        Selector::parse("a[href]").map_err(|e| ScanError::ParseError(e.to_string()))?;

    let links = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_href(page_url, href))
        .collect();

    Ok(links)
}

fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    // Skip empty, javascript:, mailto:, tel:, and in-page anchors
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}
