//! Back-button detection: a visitor landing on the page they were on two
//! steps earlier (`A -> B -> A`).

use crate::canonical::sanitize_key;
use crate::session::VisitorSession;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Storage-safe `from->to` keys mapped to the number of distinct visitors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BacktrackTable(BTreeMap<String, usize>);

impl BacktrackTable {
    pub fn get(&self, key: &str) -> Option<usize> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(key, count)| (key.as_str(), *count))
    }

    /// Returns the first key that a downstream store would reject.
    pub fn validate(&self) -> Result<(), String> {
        match self.0.keys().find(|key| key.contains('.')) {
            Some(key) => Err(key.clone()),
            None => Ok(()),
        }
    }
}

/// Visitor sets per raw `(from, to)` edge. Counts only exist after [`finalize`].
///
/// [`finalize`]: BacktrackAccumulator::finalize
#[derive(Debug, Clone, Default)]
pub struct BacktrackAccumulator {
    edges: HashMap<(String, String), HashSet<String>>,
}

impl BacktrackAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, session: &VisitorSession) {
        let path = &session.navigation_path;
        for i in 2..path.len() {
            if path[i] == path[i - 2] {
                self.edges
                    .entry((path[i - 1].clone(), path[i].clone()))
                    .or_default()
                    .insert(session.visitor_id.clone());
            }
        }
    }

    /// Union another shard's visitor sets into this one.
    pub fn merge(&mut self, other: BacktrackAccumulator) {
        for (edge, visitors) in other.edges {
            self.edges.entry(edge).or_default().extend(visitors);
        }
    }

    /// Collapse visitor sets to counts, then sanitize keys. Runs once.
    pub fn finalize(self) -> BacktrackTable {
        let counts: Vec<(String, usize)> = self
            .edges
            .into_iter()
            .map(|((from, to), visitors)| (format!("{}->{}", from, to), visitors.len()))
            .collect();

        let mut table = BTreeMap::new();
        for (key, count) in counts {
            // Distinct raw keys can sanitize to the same key
            *table.entry(sanitize_key(&key)).or_insert(0) += count;
        }
        BacktrackTable(table)
    }
}

pub fn detect_backtracking(sessions: &[VisitorSession]) -> BacktrackTable {
    let mut accumulator = BacktrackAccumulator::new();
    for session in sessions {
        accumulator.record(session);
    }
    accumulator.finalize()
}
