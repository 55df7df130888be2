use crate::backtrack::{BacktrackTable, detect_backtracking};
use crate::error::{AnalysisError, Result};
use crate::graph::build_transition_graph;
use crate::session::VisitorSession;
use crate::weights::attach_weights;
use serde::{Deserialize, Serialize};
use tracing::info;
use trailmap_scanner::SiteNode;

/// Terminal artifact of an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub web_map: SiteNode,
    pub backtracking: BacktrackTable,
}

/// Weight a copy of `tree` with the sessions' traffic and compute backtracking.
///
/// A missing tree or a backtracking table with storage-unsafe keys fails the
/// whole run; nothing partial is returned. Malformed session entries are
/// skipped pair by pair.
pub fn prepare(sessions: &[VisitorSession], tree: Option<&SiteNode>) -> Result<AnalyticsResult> {
    let tree = tree.ok_or_else(|| {
        AnalysisError::Precondition("no site map available to attach weights to".to_string())
    })?;

    let graph = build_transition_graph(sessions);
    let mut web_map = tree.clone();
    attach_weights(&mut web_map, &graph);

    let backtracking = detect_backtracking(sessions);
    backtracking.validate().map_err(|key| {
        AnalysisError::Precondition(format!("backtracking key '{}' is not storage safe", key))
    })?;

    info!(
        "Prepared analytics from {} sessions: {} transitions over {} edges ({} skipped), {} backtrack edges",
        sessions.len(),
        graph.total_transitions(),
        graph.edge_count(),
        graph.skipped_pairs(),
        backtracking.len()
    );

    Ok(AnalyticsResult {
        web_map,
        backtracking,
    })
}
