use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn delta_to(self, other: Point) -> (f32, f32) {
        (other.x - self.x, other.y - self.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        let (dx, dy) = self.delta_to(other);
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in user space, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.max_x() && point.y >= self.y && point.y <= self.max_y()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }
}

/// Which axis the story advances along is derived from this flag; see
/// `Axes` for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// A node after the solver pass. `x`/`y` are the base (un-overridden)
/// coordinates and may be non-finite if the simulation blew up.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedNode {
    pub id: String,
    pub name: String,
    pub label: String,
    pub community: Option<String>,
    pub link_count: usize,
    pub x: f32,
    pub y: f32,
}

impl SolvedNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolvedEdge {
    pub id: String,
    pub kind: String,
    pub source: String,
    pub target: String,
    pub intra_community: bool,
}

/// Base anchor of a community together with the revision of the solver pass
/// that last recomputed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommunityAnchor {
    pub point: Point,
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct SolvedLayout {
    pub nodes: Vec<SolvedNode>,
    pub edges: Vec<SolvedEdge>,
    pub anchors: BTreeMap<String, CommunityAnchor>,
    /// True when anchors came from narrative order and were fed to the solver.
    pub directed: bool,
    pub iterations: usize,
    pub canvas: Size,
    pub orientation: Orientation,
}

/// A node after overrides and previews have been layered onto the solver
/// output.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub id: String,
    pub name: String,
    pub label: String,
    pub community: Option<String>,
    pub link_count: usize,
    pub x: f32,
    pub y: f32,
}

impl PlacedNode {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedEdge {
    pub id: String,
    pub kind: String,
    pub source: String,
    pub target: String,
}

/// Output of reconciliation. Node and edge collections are fresh `Arc`s on
/// every pass so consumers can detect change with `Arc::ptr_eq`.
#[derive(Debug, Clone)]
pub struct ReconciledLayout {
    pub nodes: Arc<[PlacedNode]>,
    pub edges: Arc<[PlacedEdge]>,
    pub anchors: BTreeMap<String, Point>,
    pub canvas: Size,
    pub orientation: Orientation,
}

impl ReconciledLayout {
    pub fn node(&self, id: &str) -> Option<&PlacedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn anchor(&self, community: &str) -> Option<Point> {
        self.anchors.get(community).copied()
    }

    /// Anchor of the community owning `node_id`, if any.
    pub fn anchor_of_node(&self, node_id: &str) -> Option<Point> {
        let community = self.node(node_id)?.community.as_deref()?;
        self.anchor(community)
    }
}
