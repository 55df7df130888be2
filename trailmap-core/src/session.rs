use serde::{Deserialize, Serialize};

/// One recorded visit, as delivered by the collector.
///
/// `navigation_path` is in visit order. An empty or single-page path is a
/// bounce and contributes no transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorSession {
    pub visitor_id: String,
    #[serde(default)]
    pub navigation_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_on_page: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<i64>,
}

impl VisitorSession {
    pub fn new<I, S>(visitor_id: impl Into<String>, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            visitor_id: visitor_id.into(),
            navigation_path: path.into_iter().map(Into::into).collect(),
            event_type: None,
            time_spent_on_page: None,
            recorded_at: None,
        }
    }

    pub fn is_bounce(&self) -> bool {
        self.navigation_path.len() <= 1
    }

    /// Consecutive `(from, to)` page pairs.
    pub fn transitions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.navigation_path
            .windows(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}
