use crate::error::{Result, ScanError};
use crate::fetch::LinkFetcher;
use crate::site::SiteNode;
use futures::future::{BoxFuture, FutureExt, join_all};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};
use url::{Origin, Url};

/// Called with `(depth, url)` right before a page is fetched.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// A page whose links could not be retrieved. The page stays in the tree as a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFetch {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub tree: SiteNode,
    pub pages_fetched: usize,
    pub failures: Vec<FailedFetch>,
    pub cancelled: bool,
}

/// State owned by a single `crawl` call. Nothing here outlives the call.
struct CrawlState {
    origin: Origin,
    visited: Mutex<HashSet<String>>,
    failures: Mutex<Vec<FailedFetch>>,
    permits: Semaphore,
    pages_fetched: AtomicUsize,
    cut_short: AtomicBool,
}

pub struct Crawler<F> {
    fetcher: Arc<F>,
    max_depth: usize,
    workers: usize,
    fetch_timeout: Duration,
    progress_callback: Option<ProgressCallback>,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl<F: LinkFetcher> Crawler<F> {
    pub fn new(fetcher: F) -> Self {
        Self::from_shared(Arc::new(fetcher))
    }

    pub fn from_shared(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            max_depth: 1,
            workers: 10,
            fetch_timeout: Duration::from_secs(30),
            progress_callback: None,
            cancel_flag: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Upper bound on concurrent `fetch_links` calls, clamped to what a semaphore can hold.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Once the flag is set, no new page is fetched. In-flight fetches finish normally.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Crawl the site rooted at `root_url`.
    ///
    /// Per-page failures never abort the crawl; they are reported in
    /// [`CrawlReport::failures`] and the page becomes a leaf. Only an
    /// unparseable root URL is an error.
    pub async fn crawl(&self, root_url: &str) -> Result<CrawlReport> {
        let mut root = Url::parse(root_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", root_url, e)))?;
        root.set_fragment(None);

        info!(
            "Starting crawl of {} (max depth {}, {} workers)",
            root, self.max_depth, self.workers
        );

        let state = CrawlState {
            origin: root.origin(),
            visited: Mutex::new(HashSet::new()),
            failures: Mutex::new(Vec::new()),
            permits: Semaphore::new(self.workers),
            pages_fetched: AtomicUsize::new(0),
            cut_short: AtomicBool::new(false),
        };

        let tree = self.visit(&state, root, 0, Vec::new()).await;

        let report = CrawlReport {
            pages_fetched: state.pages_fetched.load(Ordering::Relaxed),
            failures: state.failures.into_inner(),
            cancelled: state.cut_short.load(Ordering::Relaxed),
            tree,
        };

        info!(
            "Crawl complete. {} pages fetched, {} nodes, {} failed fetches",
            report.pages_fetched,
            report.tree.node_count(),
            report.failures.len()
        );
        Ok(report)
    }

    fn visit<'a>(
        &'a self,
        state: &'a CrawlState,
        url: Url,
        depth: usize,
        mut lineage: Vec<String>,
    ) -> BoxFuture<'a, SiteNode> {
        async move {
            let id = url.to_string();

            if depth >= self.max_depth {
                return SiteNode::leaf(id);
            }
            if self.is_cancelled() {
                state.cut_short.store(true, Ordering::Relaxed);
                return SiteNode::leaf(id);
            }

            // Check and mark under one lock so two siblings cannot both claim a URL
            {
                let mut visited = state.visited.lock().await;
                if !visited.insert(id.clone()) {
                    debug!("{} already visited, keeping it as a leaf", id);
                    return SiteNode::leaf(id);
                }
            }

            if let Some(ref callback) = self.progress_callback {
                callback(depth, id.clone());
            }

            let links = match self.fetch(state, &url).await {
                Ok(links) => links,
                Err(e) => {
                    warn!("Crawl error for {}: {}", id, e);
                    state.failures.lock().await.push(FailedFetch {
                        url: id.clone(),
                        error: e.to_string(),
                    });
                    return SiteNode::leaf(id);
                }
            };

            lineage.push(id.clone());
            let next = select_children(links, &state.origin, &lineage);
            debug!("{} -> {} child pages at depth {}", id, next.len(), depth + 1);

            let children = join_all(
                next.into_iter()
                    .map(|child| self.visit(state, child, depth + 1, lineage.clone())),
            )
            .await;

            SiteNode::with_children(id, children)
        }
        .boxed()
    }

    async fn fetch(&self, state: &CrawlState, url: &Url) -> Result<Vec<Url>> {
        let _permit = state
            .permits
            .acquire()
            .await
            .map_err(|e| ScanError::Other(format!("Worker pool closed: {}", e)))?;

        state.pages_fetched.fetch_add(1, Ordering::Relaxed);

        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch_links(url)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::Timeout(self.fetch_timeout)),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Pick the links worth descending into: same origin as the root, first
/// occurrence only, and never an ancestor of the current page.
fn select_children(links: Vec<Url>, origin: &Origin, lineage: &[String]) -> Vec<Url> {
    let mut seen = HashSet::new();

    links
        .into_iter()
        .filter_map(|mut link| {
            if link.origin() != *origin {
                return None;
            }
            link.set_fragment(None);
            let key = link.to_string();
            if lineage.contains(&key) || !seen.insert(key) {
                return None;
            }
            Some(link)
        })
        .collect()
}
