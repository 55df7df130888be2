// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    AnalysisRun, expand_path, ingest_sessions, load_sessions_from_file, open_database,
    resolve_db_path, run_analysis, website_id_from_url,
};

// Re-export crawl functionality from trailmap-core
pub use trailmap_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path, generate_crawl_report,
};
