use colored::Colorize;

pub mod analytics;
pub mod backtrack;
pub mod canonical;
pub mod crawl;
pub mod data;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod report;
pub mod session;
pub mod weights;

pub use analytics::{AnalyticsResult, prepare};
pub use backtrack::{BacktrackAccumulator, BacktrackTable, detect_backtracking};
pub use error::AnalysisError;
pub use graph::{TransitionGraph, build_transition_graph};
pub use metrics::SessionMetrics;
pub use session::VisitorSession;
pub use weights::attach_weights;

pub fn print_banner() {
    let banner = r#"
  _             _ _
 | |_ _ __ __ _(_) |_ __ ___   __ _ _ __
 | __| '__/ _` | | | '_ ` _ \ / _` | '_ \
 | |_| | | (_| | | | | | | | | (_| | |_) |
  \__|_|  \__,_|_|_|_| |_| |_|\__,_| .__/
                                   |_|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "site hierarchy + navigation analytics".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
