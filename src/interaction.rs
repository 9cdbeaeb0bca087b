//! Pointer-driven drag and resize sessions for overlays, community anchors
//! and individual nodes.
//!
//! At most one session is active. Pointer moves only update a preview; the
//! override is produced on release through exactly one commit callback.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::bounds::OverlayLayout;
use crate::config::{CommunityDisplay, NodeSizeConfig, OverlayConfig};
use crate::error::{Error, Result};
use crate::ir::Community;
use crate::layout::{Point, Rect, ReconciledLayout, Size};
use crate::overrides::{PositionOverrides, Preview, node_override_value};

const WORKSPACE_TITLE_KEY: &str = "workspace-title";
const NODE_PREFIX: &str = "node:";
const SECTION_PREFIX: &str = "section:";

/// Receivers for the engine's commit notifications. Every method defaults to
/// a no-op.
pub trait LayoutCallbacks {
    /// Fired after every solver pass with the fresh base anchors.
    fn community_positions_calculated(&mut self, _anchors: &BTreeMap<String, Point>) {}
    fn workspace_title_position_changed(&mut self, _position: Point) {}
    fn workspace_title_size_changed(&mut self, _size: Size) {}
    fn section_size_changed(&mut self, _community: &str, _size: Size) {}
    fn community_position_changed(&mut self, _community: &str, _position: Point) {}
    /// `offset` is relative to the node's community anchor, or absolute for
    /// nodes outside any community.
    fn node_position_changed(&mut self, _node: &str, _offset: Point) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl LayoutCallbacks for NoopCallbacks {}

impl LayoutCallbacks for PositionOverrides {
    fn workspace_title_position_changed(&mut self, position: Point) {
        self.set_title_position(position);
    }

    fn workspace_title_size_changed(&mut self, size: Size) {
        self.set_title_size(size);
    }

    fn section_size_changed(&mut self, community: &str, size: Size) {
        self.section_sizes.insert(community.to_string(), size);
    }

    fn community_position_changed(&mut self, community: &str, position: Point) {
        self.community_positions.insert(community.to_string(), position);
    }

    fn node_position_changed(&mut self, node: &str, offset: Point) {
        self.node_positions.insert(node.to_string(), offset);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DragTarget {
    /// Story-text section of a community; moves the community anchor.
    Section(String),
    WorkspaceTitle,
    Community(String),
    Node(String),
}

impl DragTarget {
    /// Parses a target key: `workspace-title`, `node:<id>`, `section:<id>`,
    /// anything else is a community id.
    pub fn from_key(key: &str) -> Self {
        if key == WORKSPACE_TITLE_KEY {
            DragTarget::WorkspaceTitle
        } else if let Some(id) = key.strip_prefix(NODE_PREFIX) {
            DragTarget::Node(id.to_string())
        } else if let Some(id) = key.strip_prefix(SECTION_PREFIX) {
            DragTarget::Section(id.to_string())
        } else {
            DragTarget::Community(key.to_string())
        }
    }
}

impl fmt::Display for DragTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DragTarget::Section(id) => write!(f, "{SECTION_PREFIX}{id}"),
            DragTarget::WorkspaceTitle => f.write_str(WORKSPACE_TITLE_KEY),
            DragTarget::Community(id) => f.write_str(id),
            DragTarget::Node(id) => write!(f, "{NODE_PREFIX}{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResizeTarget {
    Section(String),
    WorkspaceTitle,
}

impl fmt::Display for ResizeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeTarget::Section(id) => write!(f, "{SECTION_PREFIX}{id}"),
            ResizeTarget::WorkspaceTitle => f.write_str(WORKSPACE_TITLE_KEY),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub target: DragTarget,
    /// Pointer minus target position at drag start, in user space.
    pub grab_offset: Point,
    pub preview: Point,
    /// Anchor the committed node offset is measured from.
    pub node_anchor: Option<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeSession {
    pub target: ResizeTarget,
    pub start_pointer: Point,
    pub start_size: Size,
    pub preview: Size,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Session {
    #[default]
    Idle,
    Dragging(DragSession),
    Resizing(ResizeSession),
}

impl Session {
    pub fn is_idle(&self) -> bool {
        matches!(self, Session::Idle)
    }

    fn describe(&self) -> String {
        match self {
            Session::Idle => "idle".to_string(),
            Session::Dragging(drag) => format!("drag {}", drag.target),
            Session::Resizing(resize) => format!("resize {}", resize.target),
        }
    }
}

/// What a released session committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    TitlePosition(Point),
    TitleSize(Size),
    SectionSize(String, Size),
    CommunityPosition(String, Point),
    NodePosition(String, Point),
}

impl Commit {
    pub fn dispatch(&self, callbacks: &mut dyn LayoutCallbacks) {
        match self {
            Commit::TitlePosition(position) => callbacks.workspace_title_position_changed(*position),
            Commit::TitleSize(size) => callbacks.workspace_title_size_changed(*size),
            Commit::SectionSize(id, size) => callbacks.section_size_changed(id, *size),
            Commit::CommunityPosition(id, position) => {
                callbacks.community_position_changed(id, *position)
            }
            Commit::NodePosition(id, offset) => callbacks.node_position_changed(id, *offset),
        }
    }
}

/// Maps client (screen) coordinates into the scene's user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub client_origin: Point,
    /// Client pixels per user-space unit.
    pub scale: f32,
    pub view_origin: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    pub const fn identity() -> Self {
        Self {
            client_origin: Point::new(0.0, 0.0),
            scale: 1.0,
            view_origin: Point::new(0.0, 0.0),
        }
    }

    /// Transform of a `view` rectangle shown inside `client`, scaled
    /// uniformly to fit and centered.
    pub fn fit(view: Rect, client: Rect) -> Self {
        let scale = (client.width / view.width).min(client.height / view.height);
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let offset_x = (client.width - view.width * scale) / 2.0;
        let offset_y = (client.height - view.height * scale) / 2.0;
        Self {
            client_origin: Point::new(client.x + offset_x, client.y + offset_y),
            scale,
            view_origin: view.origin(),
        }
    }

    fn effective_scale(&self) -> f32 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        }
    }

    pub fn to_user(&self, client: Point) -> Point {
        let scale = self.effective_scale();
        Point::new(
            self.view_origin.x + (client.x - self.client_origin.x) / scale,
            self.view_origin.y + (client.y - self.client_origin.y) / scale,
        )
    }

    pub fn to_client(&self, user: Point) -> Point {
        let scale = self.effective_scale();
        Point::new(
            self.client_origin.x + (user.x - self.view_origin.x) * scale,
            self.client_origin.y + (user.y - self.view_origin.y) * scale,
        )
    }
}

/// Current geometry a session reads its start positions from.
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext<'a> {
    pub layout: &'a ReconciledLayout,
    pub overlays: &'a OverlayLayout,
    pub communities: &'a [Community],
    pub community_display: CommunityDisplay,
}

impl InteractionContext<'_> {
    fn shows_macro_node(&self, community: &Community) -> bool {
        match self.community_display {
            CommunityDisplay::Hidden => false,
            CommunityDisplay::NarrativeOnly => community.is_narrative(),
            CommunityDisplay::All => true,
        }
    }

    /// Topmost draggable target at a user-space point: the title, then
    /// sections, then macro-nodes or detail nodes depending on the display
    /// mode.
    pub fn hit_test(&self, point: Point, sizes: &NodeSizeConfig) -> Option<DragTarget> {
        if let Some(title) = &self.overlays.title
            && title.rect.contains(point)
        {
            return Some(DragTarget::WorkspaceTitle);
        }
        if let Some(section) = self
            .overlays
            .sections
            .iter()
            .rev()
            .find(|section| section.rect.contains(point))
        {
            return Some(DragTarget::Section(section.community.clone()));
        }
        if self.community_display.shows_macro_nodes() {
            return self
                .communities
                .iter()
                .filter(|community| self.shows_macro_node(community))
                .filter_map(|community| {
                    let anchor = self.layout.anchor(&community.id)?;
                    let distance = anchor.distance(point);
                    (distance <= sizes.macro_radius(community.size()))
                        .then(|| (distance, community.id.clone()))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, id)| DragTarget::Community(id));
        }
        self.layout
            .nodes
            .iter()
            .filter(|node| node.position().is_finite())
            .filter_map(|node| {
                let distance = node.position().distance(point);
                (distance <= sizes.detail_radius(node.link_count)).then_some((distance, node))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, node)| DragTarget::Node(node.id.clone()))
    }

    /// Hit test for resize handles: the bottom-right corner of the title or
    /// a section, within `handle` user-space units.
    pub fn resize_handle_at(&self, point: Point, handle: f32) -> Option<ResizeTarget> {
        let near = |rect: &Rect| {
            (point.x - rect.max_x()).abs() <= handle && (point.y - rect.max_y()).abs() <= handle
        };
        if let Some(title) = &self.overlays.title
            && near(&title.rect)
        {
            return Some(ResizeTarget::WorkspaceTitle);
        }
        self.overlays
            .sections
            .iter()
            .rev()
            .find(|section| near(&section.rect))
            .map(|section| ResizeTarget::Section(section.community.clone()))
    }
}

fn unavailable(target: &impl fmt::Display, reason: &'static str) -> Error {
    warn!(drag_target = %target, reason, "rejected interaction target");
    Error::TargetUnavailable {
        target: target.to_string(),
        reason,
    }
}

#[derive(Debug, Clone)]
pub struct InteractionManager {
    session: Session,
    view: ViewTransform,
    min_size: Size,
}

impl Default for InteractionManager {
    fn default() -> Self {
        Self::new(ViewTransform::identity(), &OverlayConfig::default())
    }
}

impl InteractionManager {
    pub fn new(view: ViewTransform, config: &OverlayConfig) -> Self {
        Self {
            session: Session::Idle,
            view,
            min_size: Size::new(config.min_width, config.min_height),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// Updates the live view transform, e.g. after the scene was re-fitted.
    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.session.is_idle() {
            Ok(())
        } else {
            Err(Error::SessionActive {
                active: self.session.describe(),
            })
        }
    }

    pub fn begin_drag(
        &mut self,
        target: DragTarget,
        client: Point,
        ctx: &InteractionContext<'_>,
    ) -> Result<()> {
        self.ensure_idle()?;
        let pointer = self.view.to_user(client);
        let mut node_anchor = None;
        let origin = match &target {
            DragTarget::WorkspaceTitle => ctx
                .overlays
                .title
                .as_ref()
                .map(|title| title.rect.origin())
                .ok_or_else(|| unavailable(&target, "workspace title is hidden"))?,
            DragTarget::Section(id) => {
                if ctx.overlays.section(id).is_none() {
                    return Err(unavailable(&target, "no story-text section"));
                }
                ctx.layout
                    .anchor(id)
                    .ok_or_else(|| unavailable(&target, "community has no anchor"))?
            }
            DragTarget::Community(id) => {
                if !ctx.community_display.shows_macro_nodes() {
                    return Err(unavailable(&target, "macro-nodes are hidden"));
                }
                ctx.layout
                    .anchor(id)
                    .ok_or_else(|| unavailable(&target, "community has no anchor"))?
            }
            DragTarget::Node(id) => {
                if ctx.community_display.shows_macro_nodes() {
                    return Err(unavailable(&target, "macro-nodes are shown"));
                }
                let node = ctx
                    .layout
                    .node(id)
                    .filter(|node| node.position().is_finite())
                    .ok_or_else(|| unavailable(&target, "node is not placed"))?;
                node_anchor = ctx.layout.anchor_of_node(id);
                node.position()
            }
        };
        debug!(drag_target = %target, x = origin.x, y = origin.y, "drag started");
        self.session = Session::Dragging(DragSession {
            target,
            grab_offset: Point::new(pointer.x - origin.x, pointer.y - origin.y),
            preview: origin,
            node_anchor,
        });
        Ok(())
    }

    pub fn begin_resize(
        &mut self,
        target: ResizeTarget,
        client: Point,
        ctx: &InteractionContext<'_>,
    ) -> Result<()> {
        self.ensure_idle()?;
        let start_size = match &target {
            ResizeTarget::WorkspaceTitle => ctx.overlays.title.as_ref().map(|title| title.rect.size()),
            ResizeTarget::Section(id) => ctx.overlays.section(id).map(|section| section.rect.size()),
        }
        .ok_or_else(|| unavailable(&target, "overlay is hidden"))?;
        debug!(resize_target = %target, width = start_size.width, height = start_size.height, "resize started");
        self.session = Session::Resizing(ResizeSession {
            target,
            start_pointer: self.view.to_user(client),
            start_size,
            preview: start_size,
        });
        Ok(())
    }

    /// Recomputes the preview for a pointer at `client`.
    pub fn pointer_move(&mut self, client: Point) -> Result<()> {
        let pointer = self.view.to_user(client);
        let min = self.min_size;
        match &mut self.session {
            Session::Idle => return Err(Error::NoSession),
            Session::Dragging(drag) => {
                drag.preview = Point::new(
                    pointer.x - drag.grab_offset.x,
                    pointer.y - drag.grab_offset.y,
                );
            }
            Session::Resizing(resize) => {
                let width = resize.start_size.width + (pointer.x - resize.start_pointer.x);
                let height = resize.start_size.height + (pointer.y - resize.start_pointer.y);
                resize.preview = Size::new(width.max(min.width), height.max(min.height));
            }
        }
        trace!(x = pointer.x, y = pointer.y, "pointer moved");
        Ok(())
    }

    /// Ends the session at `client`, invoking exactly one commit callback.
    pub fn pointer_up(
        &mut self,
        client: Point,
        callbacks: &mut dyn LayoutCallbacks,
    ) -> Result<Commit> {
        self.pointer_move(client)?;
        let commit = match std::mem::take(&mut self.session) {
            Session::Idle => return Err(Error::NoSession),
            Session::Dragging(drag) => match drag.target {
                DragTarget::WorkspaceTitle => Commit::TitlePosition(drag.preview),
                DragTarget::Section(id) | DragTarget::Community(id) => {
                    Commit::CommunityPosition(id, drag.preview)
                }
                DragTarget::Node(id) => {
                    let offset = node_override_value(drag.preview, drag.node_anchor);
                    Commit::NodePosition(id, offset)
                }
            },
            Session::Resizing(resize) => match resize.target {
                ResizeTarget::WorkspaceTitle => Commit::TitleSize(resize.preview),
                ResizeTarget::Section(id) => Commit::SectionSize(id, resize.preview),
            },
        };
        debug!(?commit, "session committed");
        commit.dispatch(callbacks);
        Ok(commit)
    }

    /// Ends the session without committing. Returns whether one was active.
    pub fn abandon(&mut self) -> bool {
        let active = !self.session.is_idle();
        if active {
            debug!(session = %self.session.describe(), "session abandoned");
        }
        self.session = Session::Idle;
        active
    }

    /// Preview values of the active session, for display only.
    pub fn preview(&self) -> Preview {
        let mut preview = Preview::default();
        match &self.session {
            Session::Idle => {}
            Session::Dragging(drag) => match &drag.target {
                DragTarget::WorkspaceTitle => preview.title_position = Some(drag.preview),
                DragTarget::Section(id) | DragTarget::Community(id) => {
                    preview.community = Some((id.clone(), drag.preview))
                }
                DragTarget::Node(id) => preview.node = Some((id.clone(), drag.preview)),
            },
            Session::Resizing(resize) => match &resize.target {
                ResizeTarget::WorkspaceTitle => preview.title_size = Some(resize.preview),
                ResizeTarget::Section(id) => {
                    preview.section_size = Some((id.clone(), resize.preview))
                }
            },
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{SectionOverlay, TitleOverlay};
    use crate::layout::{Orientation, PlacedNode};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl LayoutCallbacks for Recorder {
        fn workspace_title_position_changed(&mut self, position: Point) {
            self.events.push(format!("title-position {} {}", position.x, position.y));
        }
        fn workspace_title_size_changed(&mut self, size: Size) {
            self.events.push(format!("title-size {} {}", size.width, size.height));
        }
        fn section_size_changed(&mut self, community: &str, size: Size) {
            self.events.push(format!("section-size {community} {} {}", size.width, size.height));
        }
        fn community_position_changed(&mut self, community: &str, position: Point) {
            self.events.push(format!("community {community} {} {}", position.x, position.y));
        }
        fn node_position_changed(&mut self, node: &str, offset: Point) {
            self.events.push(format!("node {node} {} {}", offset.x, offset.y));
        }
    }

    fn layout() -> ReconciledLayout {
        let node = |id: &str, community: Option<&str>, x: f32, y: f32| PlacedNode {
            id: id.to_string(),
            name: id.to_string(),
            label: "Person".to_string(),
            community: community.map(str::to_string),
            link_count: 1,
            x,
            y,
        };
        let mut anchors = BTreeMap::new();
        anchors.insert("c1".to_string(), Point::new(200.0, 200.0));
        ReconciledLayout {
            nodes: Arc::from(vec![
                node("a", Some("c1"), 210.0, 190.0),
                node("loner", None, 700.0, 500.0),
            ]),
            edges: Arc::from(Vec::new()),
            anchors,
            canvas: Size::new(1000.0, 600.0),
            orientation: Orientation::Vertical,
        }
    }

    fn overlays() -> OverlayLayout {
        OverlayLayout {
            sections: vec![SectionOverlay {
                community: "c1".to_string(),
                order: 1,
                title: "One".to_string(),
                summary: String::new(),
                rect: Rect::new(100.0, 40.0, 200.0, 120.0),
            }],
            title: Some(TitleOverlay {
                text: "Case".to_string(),
                rect: Rect::new(100.0, 100.0, 300.0, 56.0),
            }),
        }
    }

    fn communities() -> Vec<Community> {
        vec![Community {
            id: "c1".to_string(),
            members: vec!["a".to_string()],
            order: Some(1),
            title: "One".to_string(),
            summary: String::new(),
        }]
    }

    #[test]
    fn title_drag_commits_once() {
        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        let mut manager = InteractionManager::default();
        let mut recorder = Recorder::default();
        manager
            .begin_drag(DragTarget::WorkspaceTitle, Point::new(100.0, 100.0), &ctx)
            .expect("drag starts");
        manager.pointer_move(Point::new(130.0, 110.0)).expect("move");
        assert_eq!(manager.preview().title_position, Some(Point::new(130.0, 110.0)));
        assert!(recorder.events.is_empty());
        let commit = manager
            .pointer_up(Point::new(150.0, 120.0), &mut recorder)
            .expect("commit");
        assert_eq!(commit, Commit::TitlePosition(Point::new(150.0, 120.0)));
        assert_eq!(recorder.events, vec!["title-position 150 120"]);
        assert!(manager.session().is_idle());
        assert!(manager.preview().is_empty());
    }

    #[test]
    fn drags_are_measured_in_user_units_after_a_zoom() {
        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        let mut manager = InteractionManager::default();
        // Twice the user-space size on screen, view starting at the origin.
        manager.set_view(ViewTransform::fit(
            Rect::new(0.0, 0.0, 500.0, 500.0),
            Rect::new(0.0, 0.0, 1000.0, 1000.0),
        ));
        assert_eq!(manager.view().to_client(Point::new(100.0, 100.0)), Point::new(200.0, 200.0));
        let mut recorder = Recorder::default();
        manager
            .begin_drag(DragTarget::WorkspaceTitle, Point::new(200.0, 200.0), &ctx)
            .expect("drag starts");
        manager
            .pointer_up(Point::new(260.0, 240.0), &mut recorder)
            .expect("commit");
        assert_eq!(recorder.events, vec!["title-position 130 120"]);
    }

    #[test]
    fn node_drag_commits_offset_from_anchor() {
        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        let mut manager = InteractionManager::default();
        let mut store = PositionOverrides::default();
        manager
            .begin_drag(DragTarget::from_key("node:a"), Point::new(212.0, 192.0), &ctx)
            .expect("drag starts");
        manager
            .pointer_up(Point::new(252.0, 172.0), &mut store)
            .expect("commit");
        assert_eq!(store.node_positions["a"], Point::new(50.0, -30.0));

        manager
            .begin_drag(DragTarget::Node("loner".to_string()), Point::new(700.0, 500.0), &ctx)
            .expect("drag starts");
        manager
            .pointer_up(Point::new(710.0, 505.0), &mut store)
            .expect("commit");
        assert_eq!(store.node_positions["loner"], Point::new(710.0, 505.0));
    }

    #[test]
    fn community_drag_requires_macro_nodes() {
        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let mut ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        let mut manager = InteractionManager::default();
        let err = manager
            .begin_drag(DragTarget::Community("c1".to_string()), Point::new(200.0, 200.0), &ctx)
            .expect_err("hidden macro-nodes");
        assert!(matches!(err, Error::TargetUnavailable { .. }));
        assert!(manager.session().is_idle());

        ctx.community_display = CommunityDisplay::All;
        assert!(
            manager
                .begin_drag(DragTarget::Node("a".to_string()), Point::new(210.0, 190.0), &ctx)
                .is_err()
        );
        manager
            .begin_drag(DragTarget::Community("c1".to_string()), Point::new(205.0, 200.0), &ctx)
            .expect("drag starts");
        let mut recorder = Recorder::default();
        manager
            .pointer_up(Point::new(305.0, 250.0), &mut recorder)
            .expect("commit");
        assert_eq!(recorder.events, vec!["community c1 300 250"]);
    }

    #[test]
    fn second_session_is_rejected() {
        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        let mut manager = InteractionManager::default();
        manager
            .begin_drag(DragTarget::WorkspaceTitle, Point::new(100.0, 100.0), &ctx)
            .expect("drag starts");
        let err = manager
            .begin_resize(ResizeTarget::Section("c1".to_string()), Point::new(0.0, 0.0), &ctx)
            .expect_err("already dragging");
        assert!(matches!(err, Error::SessionActive { .. }));
        assert!(matches!(manager.session(), Session::Dragging(_)));
    }

    #[test]
    fn resize_is_floored_and_abandon_discards() {
        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        let mut manager = InteractionManager::default();
        let mut recorder = Recorder::default();
        manager
            .begin_resize(ResizeTarget::Section("c1".to_string()), Point::new(300.0, 160.0), &ctx)
            .expect("resize starts");
        manager.pointer_move(Point::new(0.0, 0.0)).expect("move");
        assert_eq!(
            manager.preview().section_size,
            Some(("c1".to_string(), Size::new(60.0, 40.0)))
        );
        assert!(manager.abandon());
        assert!(recorder.events.is_empty());
        assert!(!manager.abandon());
        assert!(matches!(
            manager.pointer_up(Point::new(0.0, 0.0), &mut recorder),
            Err(Error::NoSession)
        ));

        manager
            .begin_resize(ResizeTarget::WorkspaceTitle, Point::new(400.0, 156.0), &ctx)
            .expect("resize starts");
        manager
            .pointer_up(Point::new(420.0, 176.0), &mut recorder)
            .expect("commit");
        assert_eq!(recorder.events, vec!["title-size 320 76"]);
    }

    #[test]
    fn client_coordinates_are_mapped_through_the_view() {
        let view = ViewTransform::fit(
            Rect::new(-100.0, -100.0, 1000.0, 500.0),
            Rect::new(0.0, 0.0, 500.0, 500.0),
        );
        assert_eq!(view.scale, 0.5);
        let user = view.to_user(Point::new(250.0, 250.0));
        assert!((user.x - 400.0).abs() < 1e-3);
        assert!((user.y - 150.0).abs() < 1e-3);
        let client = view.to_client(user);
        assert!((client.x - 250.0).abs() < 1e-3 && (client.y - 250.0).abs() < 1e-3);

        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        let mut manager = InteractionManager::new(view, &OverlayConfig::default());
        let start = view.to_client(Point::new(200.0, 200.0));
        manager
            .begin_drag(DragTarget::Section("c1".to_string()), start, &ctx)
            .expect("drag starts");
        let mut store = PositionOverrides::default();
        manager
            .pointer_up(view.to_client(Point::new(260.0, 220.0)), &mut store)
            .expect("commit");
        let moved = store.community_positions["c1"];
        assert!((moved.x - 260.0).abs() < 1e-3 && (moved.y - 220.0).abs() < 1e-3);
    }

    #[test]
    fn hit_testing_follows_display_mode() {
        let layout = layout();
        let overlays = overlays();
        let communities = communities();
        let sizes = NodeSizeConfig::default();
        let mut ctx = InteractionContext {
            layout: &layout,
            overlays: &overlays,
            communities: &communities,
            community_display: CommunityDisplay::Hidden,
        };
        assert_eq!(
            ctx.hit_test(Point::new(150.0, 120.0), &sizes),
            Some(DragTarget::WorkspaceTitle)
        );
        assert_eq!(
            ctx.hit_test(Point::new(120.0, 50.0), &sizes),
            Some(DragTarget::Section("c1".to_string()))
        );
        assert_eq!(
            ctx.hit_test(Point::new(701.0, 501.0), &sizes),
            Some(DragTarget::Node("loner".to_string()))
        );
        assert_eq!(ctx.hit_test(Point::new(900.0, 50.0), &sizes), None);

        ctx.community_display = CommunityDisplay::NarrativeOnly;
        assert_eq!(
            ctx.hit_test(Point::new(200.0, 205.0), &sizes),
            Some(DragTarget::Community("c1".to_string()))
        );
        assert_eq!(ctx.resize_handle_at(Point::new(398.0, 155.0), 6.0), Some(ResizeTarget::WorkspaceTitle));
    }

    #[test]
    fn target_keys_round_trip() {
        for key in ["workspace-title", "node:n1", "section:c2", "c3"] {
            assert_eq!(DragTarget::from_key(key).to_string(), key);
        }
        assert_eq!(DragTarget::from_key("c3"), DragTarget::Community("c3".to_string()));
    }
}
