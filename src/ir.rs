use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::LayoutSettings;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Node type, e.g. `Person`.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Neighbor-link count as stored by the graph document. Computed from the
    /// relationships when absent.
    #[serde(default)]
    pub link_count: Option<usize>,
}

impl Node {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl GraphDocument {
    /// Relationships whose endpoints both resolve to a node in the document.
    /// Dangling references are dropped and logged.
    pub fn resolved_relationships(&self) -> Vec<&Relationship> {
        let ids: HashSet<&str> = self.nodes.iter().map(|node| node.id.as_str()).collect();
        self.relationships
            .iter()
            .filter(|rel| {
                let source_ok = ids.contains(rel.source_id.as_str());
                let target_ok = ids.contains(rel.target_id.as_str());
                if !source_ok || !target_ok {
                    let missing = if source_ok {
                        &rel.target_id
                    } else {
                        &rel.source_id
                    };
                    warn!(edge = %rel.id, missing = %missing, "dropping relationship with dangling endpoint");
                }
                source_ok && target_ok
            })
            .collect()
    }

    /// Per-node neighbor-link counts: the document's own value when present,
    /// otherwise the number of `resolved` relationships touching the node.
    pub fn link_counts(&self, resolved: &[&Relationship]) -> HashMap<String, usize> {
        let mut computed: HashMap<&str, usize> = HashMap::new();
        for rel in resolved {
            *computed.entry(rel.source_id.as_str()).or_default() += 1;
            if rel.target_id != rel.source_id {
                *computed.entry(rel.target_id.as_str()).or_default() += 1;
            }
        }
        self.nodes
            .iter()
            .map(|node| {
                let count = node
                    .link_count
                    .unwrap_or_else(|| computed.get(node.id.as_str()).copied().unwrap_or(0));
                (node.id.clone(), count)
            })
            .collect()
    }
}

/// Entry of the narrative (meta-community) list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaCommunity {
    pub community_id: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Community {
    pub id: String,
    pub members: Vec<String>,
    pub order: Option<i64>,
    pub title: String,
    pub summary: String,
}

impl Community {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_narrative(&self) -> bool {
        self.order.is_some()
    }
}

/// Node id -> community id.
pub type CommunityMap = BTreeMap<String, String>;

/// Builds communities from the membership map, restricted to nodes present
/// in the document. Ordered communities come first (by order, then id),
/// followed by the rest by id. Narrative entries without members still
/// produce an (empty) community.
pub fn build_communities(
    graph: &GraphDocument,
    membership: &CommunityMap,
    narrative: &[MetaCommunity],
) -> Vec<Community> {
    let present: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    let mut members: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (node_id, community_id) in membership {
        if present.contains(node_id.as_str()) {
            members
                .entry(community_id.as_str())
                .or_default()
                .push(node_id.clone());
        }
    }
    let meta: HashMap<&str, &MetaCommunity> = narrative
        .iter()
        .map(|entry| (entry.community_id.as_str(), entry))
        .collect();

    let mut ids: BTreeSet<&str> = members.keys().copied().collect();
    ids.extend(meta.keys().copied());

    let mut communities: Vec<Community> = ids
        .into_iter()
        .map(|id| {
            let mut nodes = members.remove(id).unwrap_or_default();
            nodes.sort();
            let entry = meta.get(id);
            Community {
                id: id.to_string(),
                members: nodes,
                order: entry.and_then(|e| e.order),
                title: entry.map(|e| e.title.clone()).unwrap_or_default(),
                summary: entry.map(|e| e.summary.clone()).unwrap_or_default(),
            }
        })
        .collect();
    communities.sort_by(|a, b| match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
    communities
}

/// Ids referenced by the active narrative segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSpec {
    #[serde(default)]
    pub node_ids: BTreeSet<String>,
    #[serde(default)]
    pub edge_ids: BTreeSet<String>,
}

/// Resolved focus: referenced nodes plus the endpoints of referenced edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusSet {
    pub nodes: HashSet<String>,
    pub edges: HashSet<String>,
}

impl FocusSet {
    pub fn resolve<'a>(
        spec: &FocusSpec,
        edges: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    ) -> Self {
        let mut nodes: HashSet<String> = spec.node_ids.iter().cloned().collect();
        for (id, source, target) in edges {
            if spec.edge_ids.contains(id) {
                nodes.insert(source.to_string());
                nodes.insert(target.to_string());
            }
        }
        Self {
            nodes,
            edges: spec.edge_ids.iter().cloned().collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn contains_edge(&self, id: &str, source: &str, target: &str) -> bool {
        self.edges.contains(id) || (self.nodes.contains(source) && self.nodes.contains(target))
    }
}

/// Everything one render pass consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintDocument {
    #[serde(default)]
    pub graph: GraphDocument,
    #[serde(default)]
    pub communities: CommunityMap,
    #[serde(default)]
    pub narrative: Vec<MetaCommunity>,
    #[serde(default)]
    pub settings: LayoutSettings,
    #[serde(default)]
    pub focus: FocusSpec,
}

/// Parses a print document as JSON, falling back to JSON5.
pub fn parse_document(input: &str) -> Result<PrintDocument> {
    match serde_json::from_str::<PrintDocument>(input) {
        Ok(doc) => Ok(doc),
        Err(json_err) => json5::from_str::<PrintDocument>(input).map_err(|json5_err| {
            Error::Decode(format!("{json_err}; as JSON5: {json5_err}"))
        }),
    }
}

/// Reads and parses a print document from `path`.
pub fn read_document(path: &Path) -> Result<PrintDocument> {
    let input = std::fs::read_to_string(path)?;
    parse_document(&input)
}
