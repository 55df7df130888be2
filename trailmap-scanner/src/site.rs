use serde::{Deserialize, Serialize};

/// One page of a discovered site hierarchy.
///
/// Children are owned by value, so a tree can never hold a back-edge.
/// `weight` stays `None` until the aggregator projects traffic onto the
/// parent-to-child edge; the root never receives one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSiteNode")]
pub struct SiteNode {
    #[serde(rename = "url")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SiteNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u64>,
}

/// Wire shape accepted on input. Stored web maps carry `url` and may add a
/// display `name`; crawler output carries only `name`.
#[derive(Deserialize)]
struct RawSiteNode {
    url: Option<String>,
    name: Option<String>,
    #[serde(default)]
    children: Vec<SiteNode>,
    #[serde(default)]
    weight: Option<u64>,
}

impl TryFrom<RawSiteNode> for SiteNode {
    type Error = String;

    fn try_from(raw: RawSiteNode) -> Result<Self, Self::Error> {
        let id = raw
            .url
            .or(raw.name)
            .ok_or_else(|| "site node needs a `url` or `name`".to_string())?;
        Ok(Self {
            id,
            children: raw.children,
            weight: raw.weight,
        })
    }
}

impl SiteNode {
    pub fn leaf(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
            weight: None,
        }
    }

    pub fn with_children(id: impl Into<String>, children: Vec<SiteNode>) -> Self {
        Self {
            id: id.into(),
            children,
            weight: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes, this one included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SiteNode::node_count).sum::<usize>()
    }

    /// Length of the longest root-to-leaf path, counted in edges.
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// First node with the given id in depth-first order.
    pub fn find(&self, id: &str) -> Option<&SiteNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Depth-first pre-order walk. The visitor receives each node and its depth.
    pub fn walk<'a>(&'a self, visitor: &mut impl FnMut(&'a SiteNode, usize)) {
        self.walk_at(0, visitor);
    }

    fn walk_at<'a>(&'a self, depth: usize, visitor: &mut impl FnMut(&'a SiteNode, usize)) {
        visitor(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visitor);
        }
    }
}
