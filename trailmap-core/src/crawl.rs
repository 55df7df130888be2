use crate::error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use trailmap_scanner::{CrawlReport, Crawler, HttpLinkFetcher, SiteNode};
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    pub max_depth: usize,
    pub workers: usize,
    pub timeout_secs: u64,
    pub show_progress_bars: bool,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_depth: 1,
            workers: 10,
            timeout_secs: 10,
            show_progress_bars: false,
            cancel_flag: None,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Crawl a site over HTTP and return its hierarchy.
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlReport> {
    let CrawlOptions {
        url,
        max_depth,
        workers,
        timeout_secs,
        show_progress_bars,
        cancel_flag,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let count_clone = processed_count.clone();
    let pb_clone = progress_bar.clone();
    let external = progress_callback.clone();
    let worker_progress: trailmap_scanner::ProgressCallback =
        Arc::new(move |depth: usize, page: String| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref pb) = pb_clone {
                pb.set_message(format!(
                    "Crawling... {} pages, depth {}: {}",
                    count,
                    depth,
                    extract_url_path(&page)
                ));
            }
            if let Some(ref callback) = external {
                callback(page);
            }
        });

    let fetcher = HttpLinkFetcher::with_timeout(timeout_secs)?;
    let mut crawler = Crawler::new(fetcher)
        .with_max_depth(max_depth)
        .with_workers(workers)
        .with_fetch_timeout(Duration::from_secs(timeout_secs))
        .with_progress_callback(worker_progress);
    if let Some(flag) = cancel_flag {
        crawler = crawler.with_cancel_flag(flag);
    }

    let report = crawler.crawl(&url).await;

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Crawl complete! {} pages processed", total));
    }

    Ok(report?)
}

/// Generate a crawl report from results
pub fn generate_crawl_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("# Summary:\n");
    out.push_str(&format!("  Root: {}\n", report.tree.id));
    out.push_str(&format!("  Pages fetched: {}\n", report.pages_fetched));
    out.push_str(&format!("  Nodes in hierarchy: {}\n", report.tree.node_count()));
    out.push_str(&format!("  Hierarchy depth: {}\n", report.tree.height()));
    out.push_str(&format!("  Failed fetches: {}\n", report.failures.len()));
    if report.cancelled {
        out.push_str("  Cancelled before completion\n");
    }
    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    out.push_str("## Hierarchy\n");
    render_tree(&report.tree, &mut out, |node| extract_url_path(&node.id));

    if !report.failures.is_empty() {
        out.push_str("\n## Failed fetches\n");
        for failure in &report.failures {
            out.push_str(&format!(
                "  \x1b[31m✗\x1b[0m {} \x1b[90m{}\x1b[0m\n",
                extract_url_path(&failure.url),
                failure.error
            ));
        }
    }

    out
}

/// Draw a tree with box-drawing guides, one node per line.
pub(crate) fn render_tree(root: &SiteNode, out: &mut String, label: impl Fn(&SiteNode) -> String) {
    out.push_str(&format!("  {}\n", label(root)));
    render_children(root, "  ", out, &label);
}

fn render_children(
    node: &SiteNode,
    prefix: &str,
    out: &mut String,
    label: &impl Fn(&SiteNode) -> String,
) {
    let last_index = node.children.len().saturating_sub(1);
    for (i, child) in node.children.iter().enumerate() {
        let (branch, indent) = if i == last_index {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(&format!("{}{}{}\n", prefix, branch, label(child)));
        render_children(child, &format!("{}{}", prefix, indent), out, label);
    }
}
