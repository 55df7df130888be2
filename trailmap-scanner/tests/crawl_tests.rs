// Tests for the bounded site crawler

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trailmap_scanner::error::Result;
use trailmap_scanner::{Crawler, LinkFetcher, ScanError, SiteNode};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// In-memory site: page URL -> outbound links.
#[derive(Default)]
struct StaticFetcher {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_on_fetch: Option<Arc<AtomicBool>>,
}

impl StaticFetcher {
    fn new(pages: &[(&str, &[&str])]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(page, links)| {
                    (
                        page.to_string(),
                        links.iter().map(|l| l.to_string()).collect(),
                    )
                })
                .collect(),
            ..Default::default()
        }
    }

    fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl LinkFetcher for StaticFetcher {
    async fn fetch_links(&self, url: &Url) -> Result<Vec<Url>> {
        self.calls.lock().unwrap().push(url.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(ref flag) = self.cancel_on_fetch {
            flag.store(true, Ordering::SeqCst);
        }

        if self.failing.contains(url.as_str()) {
            return Err(ScanError::Fetch(format!("{} is unreachable", url)));
        }

        Ok(self
            .pages
            .get(url.as_str())
            .map(|links| links.iter().map(|l| Url::parse(l).unwrap()).collect())
            .unwrap_or_default())
    }
}

fn child_ids(node: &SiteNode) -> Vec<&str> {
    node.children.iter().map(|c| c.id.as_str()).collect()
}

fn assert_no_repeats_on_paths(node: &SiteNode, path: &mut Vec<String>) {
    assert!(
        !path.contains(&node.id),
        "{} appears twice on path {:?}",
        node.id,
        path
    );
    path.push(node.id.clone());
    for child in &node.children {
        assert_no_repeats_on_paths(child, path);
    }
    path.pop();
}

// ============================================================================
// Depth Bound Tests
// ============================================================================

#[tokio::test]
async fn test_max_depth_zero_returns_single_leaf() {
    let fetcher = Arc::new(StaticFetcher::new(&[(
        "https://example.com/",
        &["https://example.com/a", "https://example.com/b"],
    )]));

    let crawler = Crawler::from_shared(fetcher.clone()).with_max_depth(0);
    let report = crawler.crawl("https://example.com/").await.unwrap();

    assert_eq!(report.tree, SiteNode::leaf("https://example.com/"));
    assert_eq!(report.pages_fetched, 0);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_no_node_deeper_than_max_depth() {
    let fetcher = StaticFetcher::new(&[
        ("https://example.com/", &["https://example.com/1"]),
        ("https://example.com/1", &["https://example.com/2"]),
        ("https://example.com/2", &["https://example.com/3"]),
        ("https://example.com/3", &["https://example.com/4"]),
    ]);

    let report = Crawler::new(fetcher)
        .with_max_depth(2)
        .crawl("https://example.com/")
        .await
        .unwrap();

    assert_eq!(report.tree.height(), 2);
    assert_eq!(report.pages_fetched, 2);
    let leaf = report.tree.find("https://example.com/2").unwrap();
    assert!(leaf.is_leaf());
}

#[tokio::test]
async fn test_root_url_is_normalized() {
    let fetcher = StaticFetcher::new(&[("https://example.com/", &["https://example.com/a"])]);

    let report = Crawler::new(fetcher)
        .with_max_depth(1)
        .crawl("https://example.com#top")
        .await
        .unwrap();

    assert_eq!(report.tree.id, "https://example.com/");
    assert_eq!(child_ids(&report.tree), vec!["https://example.com/a"]);
}

// ============================================================================
// Cycle Guard Tests
// ============================================================================

#[tokio::test]
async fn test_link_cycles_terminate_without_repeats() {
    let fetcher = StaticFetcher::new(&[
        (
            "https://example.com/",
            &[
                "https://example.com/",
                "https://example.com/a",
                "https://example.com/b",
            ],
        ),
        (
            "https://example.com/a",
            &["https://example.com/b", "https://example.com/"],
        ),
        (
            "https://example.com/b",
            &["https://example.com/a", "https://example.com/"],
        ),
    ]);

    let report = Crawler::new(fetcher)
        .with_max_depth(10)
        .crawl("https://example.com/")
        .await
        .unwrap();

    assert_no_repeats_on_paths(&report.tree, &mut Vec::new());
    assert_eq!(
        child_ids(&report.tree),
        vec!["https://example.com/a", "https://example.com/b"]
    );
    assert_eq!(report.pages_fetched, 3);
}

#[tokio::test]
async fn test_shared_page_is_fetched_once() {
    let fetcher = Arc::new(StaticFetcher::new(&[
        (
            "https://example.com/",
            &["https://example.com/a", "https://example.com/b"],
        ),
        ("https://example.com/a", &["https://example.com/shared"]),
        ("https://example.com/b", &["https://example.com/shared"]),
        ("https://example.com/shared", &["https://example.com/deep"]),
    ]));

    let report = Crawler::from_shared(fetcher.clone())
        .with_max_depth(3)
        .with_workers(4)
        .crawl("https://example.com/")
        .await
        .unwrap();

    let calls = fetcher.calls();
    let shared_fetches = calls
        .iter()
        .filter(|c| c.as_str() == "https://example.com/shared")
        .count();
    assert_eq!(shared_fetches, 1);

    // Exactly one of the two occurrences was expanded
    let expanded: usize = report
        .tree
        .children
        .iter()
        .flat_map(|c| c.children.iter())
        .filter(|n| n.id == "https://example.com/shared" && !n.is_leaf())
        .count();
    assert_eq!(expanded, 1);
}

// ============================================================================
// Fan-out Tests
// ============================================================================

#[tokio::test]
async fn test_duplicates_and_cross_origin_links_are_dropped() {
    let fetcher = StaticFetcher::new(&[(
        "https://example.com/",
        &[
            "https://example.com/b",
            "https://elsewhere.org/",
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/a#faq",
        ],
    )]);

    let report = Crawler::new(fetcher)
        .with_max_depth(1)
        .crawl("https://example.com/")
        .await
        .unwrap();

    assert_eq!(
        child_ids(&report.tree),
        vec!["https://example.com/b", "https://example.com/a"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_fetches_are_bounded_by_workers() {
    let links: Vec<String> = (1..=8).map(|i| format!("https://example.com/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    let fetcher = Arc::new(
        StaticFetcher::new(&[("https://example.com/", link_refs.as_slice())])
            .with_delay(Duration::from_millis(50)),
    );

    let report = Crawler::from_shared(fetcher.clone())
        .with_max_depth(2)
        .with_workers(2)
        .crawl("https://example.com/")
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 9);
    assert_eq!(report.tree.children.len(), 8);
    let max = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 2, "expected at most 2 fetches in flight, saw {}", max);
    assert!(max >= 1);
}

#[tokio::test]
async fn test_oversized_worker_count_is_clamped() {
    let fetcher = StaticFetcher::new(&[("https://example.com/", &["https://example.com/a"])]);

    let report = Crawler::new(fetcher)
        .with_workers(usize::MAX)
        .with_max_depth(2)
        .crawl("https://example.com/")
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(child_ids(&report.tree), vec!["https://example.com/a"]);
}

// ============================================================================
// Failure Handling Tests
// ============================================================================

#[tokio::test]
async fn test_failed_fetch_degrades_to_leaf_and_crawl_continues() {
    let fetcher = StaticFetcher::new(&[
        (
            "https://example.com/",
            &["https://example.com/broken", "https://example.com/ok"],
        ),
        ("https://example.com/broken", &["https://example.com/hidden"]),
        ("https://example.com/ok", &["https://example.com/ok/child"]),
    ])
    .failing("https://example.com/broken");

    let report = Crawler::new(fetcher)
        .with_max_depth(2)
        .crawl("https://example.com/")
        .await
        .unwrap();

    let broken = report.tree.find("https://example.com/broken").unwrap();
    assert!(broken.is_leaf());
    assert!(report.tree.find("https://example.com/hidden").is_none());

    let ok = report.tree.find("https://example.com/ok").unwrap();
    assert_eq!(child_ids(ok), vec!["https://example.com/ok/child"]);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, "https://example.com/broken");
    assert!(!report.cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_treated_as_failure() {
    let fetcher = StaticFetcher::new(&[("https://example.com/", &["https://example.com/a"])])
        .with_delay(Duration::from_secs(60));

    let report = Crawler::new(fetcher)
        .with_max_depth(3)
        .with_fetch_timeout(Duration::from_secs(1))
        .crawl("https://example.com/")
        .await
        .unwrap();

    assert!(report.tree.is_leaf());
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("timed out"));
}

#[tokio::test]
async fn test_invalid_root_url_is_an_error() {
    let crawler = Crawler::new(StaticFetcher::default());
    let result = crawler.crawl("not a url").await;

    assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[tokio::test]
async fn test_cancellation_stops_new_fetches() {
    let flag = Arc::new(AtomicBool::new(false));
    let mut fetcher = StaticFetcher::new(&[
        (
            "https://example.com/",
            &["https://example.com/a", "https://example.com/b"],
        ),
        ("https://example.com/a", &["https://example.com/a/1"]),
    ]);
    fetcher.cancel_on_fetch = Some(flag.clone());
    let fetcher = Arc::new(fetcher);

    let report = Crawler::from_shared(fetcher.clone())
        .with_max_depth(5)
        .with_cancel_flag(flag)
        .crawl("https://example.com/")
        .await
        .unwrap();

    // The root fetch completes, its children are kept as unexpanded leaves
    assert_eq!(fetcher.calls(), vec!["https://example.com/"]);
    assert_eq!(report.tree.children.len(), 2);
    assert!(report.tree.children.iter().all(SiteNode::is_leaf));
    assert!(report.cancelled);
}

#[tokio::test]
async fn test_cancel_after_last_fetch_is_not_reported() {
    let flag = Arc::new(AtomicBool::new(false));
    let mut fetcher = StaticFetcher::new(&[(
        "https://example.com/",
        &["https://example.com/a", "https://example.com/b"],
    )]);
    fetcher.cancel_on_fetch = Some(flag.clone());

    // Children sit at the depth bound, so nothing is skipped because of the flag
    let report = Crawler::new(fetcher)
        .with_max_depth(1)
        .with_cancel_flag(flag.clone())
        .crawl("https://example.com/")
        .await
        .unwrap();

    assert!(flag.load(Ordering::SeqCst));
    assert_eq!(report.tree.children.len(), 2);
    assert!(!report.cancelled);
}

// ============================================================================
// Progress Callback Tests
// ============================================================================

#[tokio::test]
async fn test_progress_callback_reports_depth_and_url() {
    let seen: Arc<Mutex<Vec<(usize, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let fetcher = StaticFetcher::new(&[("https://example.com/", &["https://example.com/a"])]);

    Crawler::new(fetcher)
        .with_max_depth(2)
        .with_progress_callback(Arc::new(move |depth, url| {
            seen_clone.lock().unwrap().push((depth, url));
        }))
        .crawl("https://example.com/")
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (0, "https://example.com/".to_string()),
            (1, "https://example.com/a".to_string()),
        ]
    );
}

// ============================================================================
// End-to-end HTTP Tests
// ============================================================================

#[tokio::test]
async fn test_http_crawl_builds_hierarchy() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let root_html = format!(
        r#"<html><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/page2">Page 2 again</a>
            <a href="https://external.example.net/">Elsewhere</a>
        </body></html>"#
    );
    let page1_html = r#"<html><body><a href="/">Home</a><a href="/page1/deep">Deep</a></body></html>"#;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(root_html.as_bytes()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_bytes(page1_html.as_bytes()),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let fetcher = trailmap_scanner::HttpLinkFetcher::with_timeout(5).unwrap();
    let report = Crawler::new(fetcher)
        .with_max_depth(2)
        .crawl(&base)
        .await
        .unwrap();

    assert_eq!(
        child_ids(&report.tree),
        vec![format!("{base}/page1"), format!("{base}/page2")]
    );

    let page1 = &report.tree.children[0];
    assert_eq!(child_ids(page1), vec![format!("{base}/page1/deep")]);
    assert!(report.tree.children[1].is_leaf());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, format!("{base}/page2"));
}
