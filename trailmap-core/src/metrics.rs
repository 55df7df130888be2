use crate::session::VisitorSession;
use serde::{Deserialize, Serialize};

/// Event type the collector writes when a visitor leaves the site.
pub const PAGE_EXIT_EVENT: &str = "page-exit";

/// Descriptive totals and rates over a batch of sessions. Rates are percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub total_sessions: usize,
    pub unique_movements: usize,
    pub bounce_rate: f64,
    pub drop_off_rate: f64,
    pub average_time_spent: f64,
}

impl SessionMetrics {
    pub fn from_sessions(sessions: &[VisitorSession]) -> Self {
        let total = sessions.len();
        if total == 0 {
            return Self::default();
        }

        let unique_movements = sessions.iter().filter(|s| !s.is_bounce()).count();
        let bounces = total - unique_movements;
        let drop_offs = sessions
            .iter()
            .filter(|s| s.event_type.as_deref() == Some(PAGE_EXIT_EVENT))
            .count();
        let total_time: f64 = sessions.iter().filter_map(|s| s.time_spent_on_page).sum();

        Self {
            total_sessions: total,
            unique_movements,
            bounce_rate: percentage(bounces, total),
            drop_off_rate: percentage(drop_offs, total),
            average_time_spent: total_time / total as f64,
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64 * 100.0
}
