pub mod crawler;
pub mod error;
pub mod fetch;
pub mod site;

pub use crawler::{CrawlReport, Crawler, FailedFetch, ProgressCallback};
pub use error::ScanError;
pub use fetch::{HttpLinkFetcher, LinkFetcher};
pub use site::SiteNode;
