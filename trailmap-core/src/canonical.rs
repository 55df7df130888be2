//! URL keys shared by the transition graph and the site hierarchy.

use crate::error::{AnalysisError, Result};
use url::Url;

/// Reduce a URL to `scheme://host[:port]/first-segment`.
///
/// Deeper path segments, query and fragment are dropped so that deep links
/// collapse onto the top level of the hierarchy. Default ports are omitted.
pub fn base_path(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| AnalysisError::Canonicalization {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let host = url.host_str().ok_or_else(|| AnalysisError::Canonicalization {
        url: raw.to_string(),
        reason: "URL has no host".to_string(),
    })?;

    let mut key = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        key.push_str(&format!(":{}", port));
    }

    let first_segment = url
        .path_segments()
        .and_then(|mut segments| segments.find(|segment| !segment.is_empty()));
    if let Some(segment) = first_segment {
        key.push('/');
        key.push_str(segment);
    }

    Ok(key)
}

/// Make a key safe for stores that forbid `.` inside nested map keys.
pub fn sanitize_key(key: &str) -> String {
    key.replace('.', "-")
}
