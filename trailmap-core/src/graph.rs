//! Directed page-to-page transition counts keyed by canonical base path.

use crate::canonical::base_path;
use crate::session::VisitorSession;
use std::collections::HashMap;
use tracing::{debug, warn};

/// `from -> to -> count`. Counts are transition events, not distinct visitors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionGraph {
    edges: HashMap<String, HashMap<String, u64>>,
    skipped_pairs: usize,
}

impl TransitionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every consecutive pair of every session.
    pub fn from_sessions(sessions: &[VisitorSession]) -> Self {
        let mut graph = Self::new();
        for session in sessions {
            graph.record(session);
        }
        debug!(
            "Transition graph built: {} edges, {} transitions, {} pairs skipped",
            graph.edge_count(),
            graph.total_transitions(),
            graph.skipped_pairs
        );
        graph
    }

    /// Add one session's transitions. A pair with a malformed endpoint is
    /// skipped on its own; the rest of the session still counts.
    pub fn record(&mut self, session: &VisitorSession) {
        for (from, to) in session.transitions() {
            match (base_path(from), base_path(to)) {
                (Ok(from_key), Ok(to_key)) => self.add(from_key, to_key, 1),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(
                        "Skipping transition {} -> {} of visitor {}: {}",
                        from, to, session.visitor_id, e
                    );
                    self.skipped_pairs += 1;
                }
            }
        }
    }

    /// Sum another graph into this one. Order of merging does not matter.
    pub fn merge(&mut self, other: TransitionGraph) {
        for (from, targets) in other.edges {
            for (to, count) in targets {
                self.add(from.clone(), to, count);
            }
        }
        self.skipped_pairs += other.skipped_pairs;
    }

    fn add(&mut self, from: String, to: String, count: u64) {
        *self.edges.entry(from).or_default().entry(to).or_insert(0) += count;
    }

    /// Count for a canonical `(from, to)` pair, if any transition was seen.
    pub fn weight(&self, from: &str, to: &str) -> Option<u64> {
        self.edges.get(from).and_then(|targets| targets.get(to)).copied()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashMap::len).sum()
    }

    pub fn total_transitions(&self) -> u64 {
        self.edges.values().flat_map(HashMap::values).sum()
    }

    pub fn skipped_pairs(&self) -> usize {
        self.skipped_pairs
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.edges.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |(to, count)| (from.as_str(), to.as_str(), *count))
        })
    }
}

/// Build a fresh transition graph from a closed batch of sessions.
pub fn build_transition_graph(sessions: &[VisitorSession]) -> TransitionGraph {
    TransitionGraph::from_sessions(sessions)
}
