//! Persisted position/size overrides and their reconciliation with fresh
//! solver output.
//!
//! Overrides are layered on top of the computed base layout and never replace
//! it: anything without an override falls back to the computed value.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::{PlacedEdge, PlacedNode, Point, ReconciledLayout, Size, SolvedLayout};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleOverride {
    pub position: Option<Point>,
    pub size: Option<Size>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionOverrides {
    /// Community id -> absolute anchor.
    pub community_positions: BTreeMap<String, Point>,
    /// Node id -> offset from its community's anchor (absolute position for
    /// nodes outside any community).
    pub node_positions: BTreeMap<String, Point>,
    /// Community id -> story-text section size.
    pub section_sizes: BTreeMap<String, Size>,
    pub workspace_title: Option<TitleOverride>,
}

impl PositionOverrides {
    pub fn is_empty(&self) -> bool {
        self.community_positions.is_empty()
            && self.node_positions.is_empty()
            && self.section_sizes.is_empty()
            && self.workspace_title.is_none()
    }

    pub fn title_position(&self) -> Option<Point> {
        self.workspace_title.and_then(|title| title.position)
    }

    pub fn title_size(&self) -> Option<Size> {
        self.workspace_title.and_then(|title| title.size)
    }

    pub fn set_title_position(&mut self, position: Point) {
        self.workspace_title.get_or_insert_with(TitleOverride::default).position = Some(position);
    }

    pub fn set_title_size(&mut self, size: Size) {
        self.workspace_title.get_or_insert_with(TitleOverride::default).size = Some(size);
    }
}

/// Transient drag/resize preview values. They win over stored overrides for
/// display and are never persisted by the store itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preview {
    pub community: Option<(String, Point)>,
    /// Absolute user-space position of the node being dragged.
    pub node: Option<(String, Point)>,
    pub section_size: Option<(String, Size)>,
    pub title_position: Option<Point>,
    pub title_size: Option<Size>,
}

impl Preview {
    pub fn is_empty(&self) -> bool {
        *self == Preview::default()
    }

    pub fn community_anchor(&self, community: &str) -> Option<Point> {
        match &self.community {
            Some((id, point)) if id == community => Some(*point),
            _ => None,
        }
    }

    pub fn node_position(&self, node: &str) -> Option<Point> {
        match &self.node {
            Some((id, point)) if id == node => Some(*point),
            _ => None,
        }
    }

    pub fn section_size(&self, community: &str) -> Option<Size> {
        match &self.section_size {
            Some((id, size)) if id == community => Some(*size),
            _ => None,
        }
    }
}

/// Converts an absolute user-space node position into the value stored in
/// `PositionOverrides::node_positions`.
pub fn node_override_value(position: Point, anchor: Option<Point>) -> Point {
    match anchor {
        Some(anchor) => Point::new(position.x - anchor.x, position.y - anchor.y),
        None => position,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AppliedAnchor {
    revision: u64,
    anchor: Point,
}

/// Layers overrides and previews on top of solver output.
///
/// The reconciler remembers, per community, the base-anchor revision and the
/// anchor it last applied. While the revision is unchanged, members are moved
/// by the delta between the new and the last applied anchor; once the solver
/// recomputes the base anchor (new revision) members are rebuilt from the
/// fresh base positions.
#[derive(Debug, Default)]
pub struct Reconciler {
    applied: BTreeMap<String, AppliedAnchor>,
    shifted: HashMap<String, Point>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconcile(
        &mut self,
        solved: &SolvedLayout,
        overrides: &PositionOverrides,
        preview: &Preview,
    ) -> ReconciledLayout {
        let mut anchors: BTreeMap<String, Point> = BTreeMap::new();
        for (id, base) in &solved.anchors {
            let target = preview
                .community_anchor(id)
                .or_else(|| overrides.community_positions.get(id).copied())
                .unwrap_or(base.point);
            anchors.insert(id.clone(), target);
        }

        let mut shifted: HashMap<String, Point> = HashMap::with_capacity(solved.nodes.len());
        let mut rebuilt = 0usize;
        for node in &solved.nodes {
            let base_pos = node.position();
            let position = match node
                .community
                .as_ref()
                .and_then(|cid| solved.anchors.get(cid).map(|base| (cid, base)))
            {
                Some((cid, base)) => {
                    let target = anchors.get(cid).copied().unwrap_or(base.point);
                    let previous = self
                        .applied
                        .get(cid)
                        .filter(|applied| applied.revision == base.revision)
                        .zip(self.shifted.get(&node.id));
                    match previous {
                        Some((applied, prev)) => {
                            prev.offset(target.x - applied.anchor.x, target.y - applied.anchor.y)
                        }
                        None => {
                            rebuilt += 1;
                            base_pos.offset(target.x - base.point.x, target.y - base.point.y)
                        }
                    }
                }
                None => base_pos,
            };
            shifted.insert(node.id.clone(), position);
        }

        let placed: Vec<PlacedNode> = solved
            .nodes
            .iter()
            .map(|node| {
                let anchor = node
                    .community
                    .as_ref()
                    .and_then(|cid| anchors.get(cid).copied());
                let position = if let Some(dragged) = preview.node_position(&node.id) {
                    dragged
                } else if let Some(stored) = overrides.node_positions.get(&node.id) {
                    match anchor {
                        Some(anchor) => anchor.offset(stored.x, stored.y),
                        None => *stored,
                    }
                } else {
                    shifted.get(&node.id).copied().unwrap_or(node.position())
                };
                PlacedNode {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    label: node.label.clone(),
                    community: node.community.clone(),
                    link_count: node.link_count,
                    x: position.x,
                    y: position.y,
                }
            })
            .collect();

        let edges: Vec<PlacedEdge> = solved
            .edges
            .iter()
            .map(|edge| PlacedEdge {
                id: edge.id.clone(),
                kind: edge.kind.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
            })
            .collect();

        self.applied = solved
            .anchors
            .iter()
            .map(|(id, base)| {
                let anchor = anchors.get(id).copied().unwrap_or(base.point);
                (
                    id.clone(),
                    AppliedAnchor {
                        revision: base.revision,
                        anchor,
                    },
                )
            })
            .collect();
        self.shifted = shifted;

        debug!(
            nodes = placed.len(),
            rebuilt,
            overrides = !overrides.is_empty(),
            preview = !preview.is_empty(),
            "reconciled layout"
        );

        ReconciledLayout {
            nodes: Arc::from(placed),
            edges: Arc::from(edges),
            anchors,
            canvas: solved.canvas,
            orientation: solved.orientation,
        }
    }
}
