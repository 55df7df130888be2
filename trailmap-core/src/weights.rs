use crate::canonical::base_path;
use crate::graph::TransitionGraph;
use trailmap_scanner::SiteNode;
use tracing::warn;

/// Project transition counts onto the tree's parent-to-child edges.
///
/// Every non-root node gets `Some(count)`, `Some(0)` when the graph has no
/// matching edge. Any weight already on the root is cleared.
pub fn attach_weights(tree: &mut SiteNode, graph: &TransitionGraph) {
    apply(tree, None, graph);
}

fn apply(node: &mut SiteNode, parent_url: Option<&str>, graph: &TransitionGraph) {
    node.weight = parent_url.map(|parent_url| edge_weight(parent_url, &node.id, graph));

    let id = node.id.clone();
    for child in &mut node.children {
        apply(child, Some(&id), graph);
    }
}

fn edge_weight(parent_url: &str, node_url: &str, graph: &TransitionGraph) -> u64 {
    match (base_path(parent_url), base_path(node_url)) {
        (Ok(from), Ok(to)) => graph.weight(&from, &to).unwrap_or(0),
        (Err(e), _) | (_, Err(e)) => {
            warn!("No weight for {} -> {}: {}", parent_url, node_url, e);
            0
        }
    }
}
