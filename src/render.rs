use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::bounds::{OverlayLayout, ViewportCalculator, circle_extent, place_overlays};
use crate::config::{
    CommunityDisplay, Config, DetailDisplay, EdgeFalloffConfig, LayoutConfig, RenderConfig,
};
use crate::interaction::NoopCallbacks;
use crate::ir::{Community, FocusSet, PrintDocument, build_communities};
use crate::layout::{LayoutEngine, PlacedNode, Point, Rect, ReconciledLayout, Size};
use crate::overrides::Preview;
use crate::text_metrics;
use crate::theme::Theme;

const MACRO_NARRATIVE_GRADIENT: &str = "macro-narrative";
const MACRO_BACKGROUND_GRADIENT: &str = "macro-background";
const PARALLEL_MARKER: &str = " …";

#[derive(Debug, Clone, PartialEq)]
pub struct EdgePrimitive {
    pub id: String,
    pub from: Point,
    pub to: Point,
    pub opacity: f32,
    pub width: f32,
    pub focused: bool,
    pub dimmed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLabel {
    pub text: String,
    pub position: Point,
    /// Rotation in degrees, kept within (-90, 90] so text reads upright.
    pub angle: f32,
    pub font_size: f32,
    pub opacity: f32,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePrimitive {
    pub id: String,
    pub label: String,
    pub center: Point,
    pub radius: f32,
    pub fill: String,
    pub opacity: f32,
    pub font_size: f32,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroNodePrimitive {
    pub community: String,
    pub label: String,
    pub center: Point,
    pub radius: f32,
    pub narrative: bool,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionPrimitive {
    pub community: String,
    pub rect: Rect,
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitlePrimitive {
    pub rect: Rect,
    pub text: String,
}

/// Drawable primitives of one print page, positioned in user space.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub view: Rect,
    pub canvas: Size,
    pub focus_active: bool,
    pub edges: Vec<EdgePrimitive>,
    pub edge_labels: Vec<EdgeLabel>,
    pub nodes: Vec<NodePrimitive>,
    pub macro_nodes: Vec<MacroNodePrimitive>,
    pub sections: Vec<SectionPrimitive>,
    pub title: Option<TitlePrimitive>,
    pub community_font_size: f32,
    pub section_title_font_size: f32,
    pub section_body_font_size: f32,
    pub title_font_size: f32,
    pub section_padding: f32,
    pub line_height: f32,
}

pub struct SceneInput<'a> {
    pub doc: &'a PrintDocument,
    pub layout: &'a ReconciledLayout,
    pub communities: &'a [Community],
    pub overlays: &'a OverlayLayout,
}

/// Opacity/width weight for an edge at normalized length `t` in `[0, 1]`.
/// A decaying term favors short edges; a bell around `bell_center` keeps
/// medium-length edges from fading out.
pub fn edge_weight(t: f32, config: &EdgeFalloffConfig) -> f32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let decay = (1.0 - t).powf(config.decay_exponent.max(0.0));
    let width = config.bell_width.max(f32::EPSILON);
    let bell = config.bell_weight * (-((t - config.bell_center).powi(2)) / (2.0 * width * width)).exp();
    (decay + bell).clamp(0.0, 1.0)
}

/// Maps `length` onto `[0, 1]` over `[min, max]`; a degenerate range counts
/// as 1.
pub fn normalize_length(length: f32, min: f32, max: f32) -> f32 {
    let range = max - min;
    let range = if range.is_finite() && range > f32::EPSILON { range } else { 1.0 };
    ((length - min) / range).clamp(0.0, 1.0)
}

/// Label shown for a group of parallel edges: the first type (focused edges
/// first), suffixed when the group carries more than one distinct type.
pub fn merged_label<'a>(kinds: impl IntoIterator<Item = (&'a str, bool)>) -> String {
    let mut focused = Vec::new();
    let mut rest = Vec::new();
    for (kind, is_focused) in kinds {
        if is_focused {
            focused.push(kind);
        } else {
            rest.push(kind);
        }
    }
    let mut distinct: Vec<&str> = Vec::new();
    for kind in focused.into_iter().chain(rest) {
        if !distinct.contains(&kind) {
            distinct.push(kind);
        }
    }
    match distinct.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, ..] => format!("{first}{PARALLEL_MARKER}"),
    }
}

fn upright_angle(from: Point, to: Point) -> f32 {
    let mut angle = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    if angle > 90.0 {
        angle -= 180.0;
    } else if angle <= -90.0 {
        angle += 180.0;
    }
    angle
}

fn shows_macro_node(display: CommunityDisplay, community: &Community) -> bool {
    match display {
        CommunityDisplay::Hidden => false,
        CommunityDisplay::NarrativeOnly => community.is_narrative(),
        CommunityDisplay::All => true,
    }
}

pub fn build_scene(
    input: &SceneInput<'_>,
    theme: &Theme,
    config: &LayoutConfig,
    viewport: &mut ViewportCalculator,
) -> Scene {
    let settings = &input.doc.settings;
    let layout = input.layout;
    let fast = config.labels.fast_text_metrics;

    let narrative: HashSet<&str> = input
        .communities
        .iter()
        .filter(|c| c.is_narrative())
        .map(|c| c.id.as_str())
        .collect();
    let community_index: HashMap<&str, usize> = input
        .communities
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.id.as_str(), idx))
        .collect();

    let visible: Vec<&PlacedNode> = layout
        .nodes
        .iter()
        .filter(|node| node.position().is_finite())
        .filter(|node| match settings.detail_display {
            DetailDisplay::All => true,
            DetailDisplay::NarrativeOnly => node
                .community
                .as_deref()
                .is_some_and(|c| narrative.contains(c)),
        })
        .collect();
    let positions: HashMap<&str, Point> = visible
        .iter()
        .map(|node| (node.id.as_str(), node.position()))
        .collect();

    let focus = FocusSet::resolve(
        &input.doc.focus,
        layout
            .edges
            .iter()
            .map(|e| (e.id.as_str(), e.source.as_str(), e.target.as_str())),
    );
    let focus_active = focus.is_active();

    let nodes: Vec<NodePrimitive> = visible
        .iter()
        .map(|node| {
            let focused = focus_active && focus.contains_node(&node.id);
            let fill = match node.community.as_deref() {
                Some(cid) => settings
                    .community_colors
                    .get(cid)
                    .cloned()
                    .or_else(|| {
                        community_index
                            .get(cid)
                            .map(|idx| theme.community_color(*idx).to_string())
                    })
                    .unwrap_or_else(|| theme.unassigned_node_color.clone()),
                None => theme.unassigned_node_color.clone(),
            };
            NodePrimitive {
                id: node.id.clone(),
                label: node.name.clone(),
                center: node.position(),
                radius: config.nodes.detail_radius(node.link_count),
                fill,
                opacity: if focus_active && !focused {
                    config.nodes.unfocused_opacity
                } else {
                    1.0
                },
                font_size: if focused {
                    settings.font_sizes.node_label * config.nodes.focus_label_scale
                } else {
                    settings.font_sizes.node_label
                },
                bold: focused,
            }
        })
        .collect();

    struct Segment<'e> {
        id: &'e str,
        kind: &'e str,
        from: Point,
        to: Point,
        length: f32,
        focused: bool,
        pair: (&'e str, &'e str),
    }
    let segments: Vec<Segment<'_>> = layout
        .edges
        .iter()
        .filter(|edge| edge.source != edge.target)
        .filter_map(|edge| {
            let from = *positions.get(edge.source.as_str())?;
            let to = *positions.get(edge.target.as_str())?;
            let pair = if edge.source <= edge.target {
                (edge.source.as_str(), edge.target.as_str())
            } else {
                (edge.target.as_str(), edge.source.as_str())
            };
            Some(Segment {
                id: edge.id.as_str(),
                kind: edge.kind.as_str(),
                from,
                to,
                length: from.distance(to),
                focused: focus_active
                    && focus.contains_edge(&edge.id, &edge.source, &edge.target),
                pair,
            })
        })
        .collect();

    let (min_len, max_len) = segments
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.length), hi.max(s.length))
        });
    let falloff = &config.edges;
    let edges: Vec<EdgePrimitive> = segments
        .iter()
        .map(|segment| {
            let (opacity, width) = if focus_active {
                if segment.focused {
                    (falloff.focus_opacity, falloff.focus_width)
                } else {
                    (falloff.dimmed_opacity, falloff.dimmed_width)
                }
            } else {
                let weight = edge_weight(normalize_length(segment.length, min_len, max_len), falloff);
                (
                    falloff.min_opacity + (falloff.max_opacity - falloff.min_opacity) * weight,
                    falloff.min_width + (falloff.max_width - falloff.min_width) * weight,
                )
            };
            EdgePrimitive {
                id: segment.id.to_string(),
                from: segment.from,
                to: segment.to,
                opacity,
                width,
                focused: segment.focused,
                dimmed: focus_active && !segment.focused,
            }
        })
        .collect();

    let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
    for (idx, segment) in segments.iter().enumerate() {
        groups.entry(segment.pair).or_default().push(idx);
    }
    let labels_cfg = &config.labels;
    let edge_labels: Vec<EdgeLabel> = groups
        .values()
        .filter_map(|members| {
            let first = &segments[*members.first()?];
            let text = merged_label(
                members
                    .iter()
                    .map(|idx| (segments[*idx].kind, segments[*idx].focused)),
            );
            if text.trim().is_empty() {
                return None;
            }
            let unit = text_metrics::text_width(&text, 1.0, &theme.font_family, fast);
            let available = first.length * labels_cfg.edge_fill_ratio;
            let font_size = if unit > 0.0 {
                (available / unit).clamp(labels_cfg.edge_min_font, labels_cfg.edge_max_font)
            } else {
                labels_cfg.edge_min_font
            };
            let bold = members.iter().any(|idx| segments[*idx].focused);
            let opacity = members
                .iter()
                .map(|idx| edges[*idx].opacity)
                .fold(0.0f32, f32::max);
            Some(EdgeLabel {
                text,
                position: Point::new(
                    (first.from.x + first.to.x) / 2.0,
                    (first.from.y + first.to.y) / 2.0,
                ),
                angle: upright_angle(first.from, first.to),
                font_size,
                opacity,
                bold,
            })
        })
        .collect();

    let macro_nodes: Vec<MacroNodePrimitive> = input
        .communities
        .iter()
        .filter(|community| shows_macro_node(settings.community_display, community))
        .filter_map(|community| {
            let center = layout.anchor(&community.id).filter(Point::is_finite)?;
            let any_focused = community.members.iter().any(|m| focus.contains_node(m));
            Some(MacroNodePrimitive {
                community: community.id.clone(),
                label: if community.title.trim().is_empty() {
                    community.id.clone()
                } else {
                    community.title.clone()
                },
                center,
                radius: config.nodes.macro_radius(community.size()),
                narrative: community.is_narrative(),
                opacity: if focus_active && !any_focused {
                    config.nodes.unfocused_opacity
                } else {
                    1.0
                },
            })
        })
        .collect();

    let padding = config.overlays.text_padding;
    let fonts = &settings.font_sizes;
    let sections: Vec<SectionPrimitive> = input
        .overlays
        .sections
        .iter()
        .map(|section| {
            let inner_width = (section.rect.width - padding * 2.0).max(1.0);
            let title = text_metrics::truncate_to_width(
                &section.title,
                inner_width,
                fonts.section_title,
                &theme.font_family,
                fast,
            );
            let line_height = fonts.section_body * labels_cfg.label_line_height;
            let body_height = section.rect.height
                - padding * 2.0
                - fonts.section_title * labels_cfg.label_line_height;
            let max_lines = if line_height > 0.0 {
                (body_height / line_height).floor().max(0.0) as usize
            } else {
                0
            };
            let mut lines = text_metrics::wrap_text(
                &section.summary,
                inner_width,
                fonts.section_body,
                &theme.font_family,
                fast,
            );
            if lines.len() > max_lines {
                lines.truncate(max_lines);
                if let Some(last) = lines.last_mut() {
                    *last = text_metrics::truncate_to_width(
                        &format!("{last}…"),
                        inner_width,
                        fonts.section_body,
                        &theme.font_family,
                        fast,
                    );
                }
            }
            SectionPrimitive {
                community: section.community.clone(),
                rect: section.rect,
                title,
                lines,
            }
        })
        .collect();

    let title = input.overlays.title.as_ref().map(|title| TitlePrimitive {
        rect: title.rect,
        text: title.text.clone(),
    });

    let detail_radius = config.nodes.max_radius;
    let content = circle_extent(
        nodes
            .iter()
            .map(|node| (node.center, detail_radius.max(node.radius)))
            .chain(macro_nodes.iter().map(|m| (m.center, m.radius))),
    );
    let view = viewport.view_rect(content, input.overlays, layout.canvas, &config.overlays);

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        labels = edge_labels.len(),
        macro_nodes = macro_nodes.len(),
        sections = sections.len(),
        focus_active,
        "scene built"
    );

    Scene {
        view,
        canvas: layout.canvas,
        focus_active,
        edges,
        edge_labels,
        nodes,
        macro_nodes,
        sections,
        title,
        community_font_size: fonts.community_label,
        section_title_font_size: fonts.section_title,
        section_body_font_size: fonts.section_body,
        title_font_size: fonts.workspace_title,
        section_padding: padding,
        line_height: labels_cfg.label_line_height,
    }
}

/// Full pass for a standalone document: solve, reconcile with the stored
/// overrides, place overlays and build the scene.
pub fn compute_scene(doc: &PrintDocument, config: &Config) -> Scene {
    let canvas = Size::new(config.render.width, config.render.height);
    let mut engine = LayoutEngine::new(config.layout.clone());
    let preview = Preview::default();
    let layout = engine.layout(doc, canvas, &preview, &mut NoopCallbacks);
    let communities = build_communities(&doc.graph, &doc.communities, &doc.narrative);
    let overlays = place_overlays(
        &layout,
        &communities,
        &doc.settings,
        &preview,
        &config.layout.overlays,
    );
    let mut viewport = ViewportCalculator::new();
    build_scene(
        &SceneInput {
            doc,
            layout: &layout,
            communities: &communities,
            overlays: &overlays,
        },
        &config.theme,
        &config.layout,
        &mut viewport,
    )
}

pub fn render_svg(scene: &Scene, theme: &Theme) -> String {
    let view = scene.view;
    let width = view.width.max(1.0);
    let height = view.height.max(1.0);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"{:.2} {:.2} {width:.2} {height:.2}\">",
        view.x, view.y
    ));

    svg.push_str("<defs>");
    for (id, (inner, outer)) in [
        (MACRO_NARRATIVE_GRADIENT, &theme.narrative_gradient),
        (MACRO_BACKGROUND_GRADIENT, &theme.background_gradient),
    ] {
        svg.push_str(&format!(
            "<radialGradient id=\"{id}\" cx=\"50%\" cy=\"50%\" r=\"50%\"><stop offset=\"0%\" stop-color=\"{inner}\"/><stop offset=\"100%\" stop-color=\"{outer}\"/></radialGradient>",
        ));
    }
    svg.push_str("</defs>");

    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\"/>",
        view.x, view.y, theme.background
    ));

    svg.push_str("<g class=\"edges\">");
    for edge in &scene.edges {
        let color = if edge.focused {
            &theme.focus_line_color
        } else if edge.dimmed {
            &theme.dimmed_line_color
        } else {
            &theme.line_color
        };
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{color}\" stroke-width=\"{:.2}\" stroke-opacity=\"{:.3}\" stroke-linecap=\"round\"/>",
            edge.from.x, edge.from.y, edge.to.x, edge.to.y, edge.width, edge.opacity
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"edge-labels\">");
    for label in &scene.edge_labels {
        let weight = if label.bold { "bold" } else { "normal" };
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" transform=\"rotate({:.2} {x:.2} {y:.2})\" dy=\"-2\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"{weight}\" fill=\"{}\" fill-opacity=\"{:.3}\" stroke=\"{}\" stroke-width=\"2\" paint-order=\"stroke\">{}</text>",
            label.angle,
            escape_xml(&theme.font_family),
            label.font_size,
            theme.muted_text_color,
            label.opacity.max(0.3),
            theme.background,
            escape_xml(&label.text),
            x = label.position.x,
            y = label.position.y,
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for node in &scene.nodes {
        let weight = if node.bold { "bold" } else { "normal" };
        svg.push_str(&format!(
            "<g opacity=\"{:.3}\"><circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/><text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"{weight}\" fill=\"{}\">{}</text></g>",
            node.opacity,
            node.center.x,
            node.center.y,
            node.radius,
            node.fill,
            theme.node_stroke,
            node.center.x,
            node.center.y + node.radius + node.font_size,
            escape_xml(&theme.font_family),
            node.font_size,
            theme.text_color,
            escape_xml(&node.label),
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"communities\">");
    for node in &scene.macro_nodes {
        let gradient = if node.narrative {
            MACRO_NARRATIVE_GRADIENT
        } else {
            MACRO_BACKGROUND_GRADIENT
        };
        svg.push_str(&format!(
            "<g opacity=\"{:.3}\"><circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"url(#{gradient})\" stroke=\"{}\" stroke-width=\"1.5\"/><text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"bold\" fill=\"{}\">{}</text></g>",
            node.opacity,
            node.center.x,
            node.center.y,
            node.radius,
            theme.section_border,
            node.center.x,
            node.center.y,
            escape_xml(&theme.font_family),
            scene.community_font_size,
            theme.text_color,
            escape_xml(&node.label),
        ));
    }
    svg.push_str("</g>");

    for section in &scene.sections {
        svg.push_str(&section_svg(section, scene, theme));
    }

    if let Some(title) = &scene.title {
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            title.rect.x,
            title.rect.y + title.rect.height / 2.0,
            escape_xml(&theme.font_family),
            scene.title_font_size,
            theme.title_color,
            escape_xml(&title.text),
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn section_svg(section: &SectionPrimitive, scene: &Scene, theme: &Theme) -> String {
    let rect = section.rect;
    let pad = scene.section_padding;
    let mut out = String::new();
    out.push_str(&format!(
        "<g class=\"section\"><rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
        rect.x, rect.y, rect.width, rect.height, theme.section_background, theme.section_border
    ));
    let x = rect.x + pad;
    let mut y = rect.y + pad + scene.section_title_font_size;
    out.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{:.2}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        scene.section_title_font_size,
        theme.text_color,
        escape_xml(&section.title),
    ));
    if !section.lines.is_empty() {
        let line_height = scene.section_body_font_size * scene.line_height;
        y += line_height;
        out.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{:.2}\" fill=\"{}\">",
            escape_xml(&theme.font_family),
            scene.section_body_font_size,
            theme.muted_text_color,
        ));
        for (idx, line) in section.lines.iter().enumerate() {
            let dy = if idx == 0 { 0.0 } else { line_height };
            out.push_str(&format!(
                "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
                escape_xml(line)
            ));
        }
        out.push_str("</text>");
    }
    out.push_str("</g>");
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{svg}");
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    if let Some(family) = theme.font_family.split(',').next() {
        opt.font_family = family.trim().trim_matches('"').to_string();
    }
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeSizeConfig;
    use crate::ir::{FocusSpec, Node, Relationship};
    use crate::layout::{Orientation, PlacedEdge};
    use std::sync::Arc;

    fn placed(id: &str, community: Option<&str>, x: f32, y: f32) -> PlacedNode {
        PlacedNode {
            id: id.to_string(),
            name: id.to_uppercase(),
            label: "Person".to_string(),
            community: community.map(str::to_string),
            link_count: 2,
            x,
            y,
        }
    }

    fn edge(id: &str, kind: &str, source: &str, target: &str) -> PlacedEdge {
        PlacedEdge {
            id: id.to_string(),
            kind: kind.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    fn fixture() -> (PrintDocument, ReconciledLayout, Vec<Community>) {
        let mut doc = PrintDocument::default();
        doc.settings.show_story_text = false;
        let layout = ReconciledLayout {
            nodes: Arc::from(vec![
                placed("a", Some("c1"), 100.0, 100.0),
                placed("b", Some("c1"), 200.0, 100.0),
                placed("c", None, 500.0, 400.0),
                placed("ghost", Some("c1"), f32::NAN, 0.0),
            ]),
            edges: Arc::from(vec![
                edge("r1", "FRIEND", "a", "b"),
                edge("r2", "COLLEAGUE", "b", "a"),
                edge("r3", "KNOWS", "b", "c"),
                edge("r4", "KNOWS", "a", "ghost"),
            ]),
            anchors: [("c1".to_string(), Point::new(150.0, 100.0))].into_iter().collect(),
            canvas: Size::new(800.0, 600.0),
            orientation: Orientation::Vertical,
        };
        let communities = vec![Community {
            id: "c1".to_string(),
            members: vec!["a".to_string(), "b".to_string(), "ghost".to_string()],
            order: Some(1),
            title: "Crew".to_string(),
            summary: String::new(),
        }];
        (doc, layout, communities)
    }

    fn scene_for(doc: &PrintDocument, layout: &ReconciledLayout, communities: &[Community]) -> Scene {
        let mut config = LayoutConfig::default();
        config.labels.fast_text_metrics = true;
        let overlays = place_overlays(layout, communities, &doc.settings, &Preview::default(), &config.overlays);
        build_scene(
            &SceneInput {
                doc,
                layout,
                communities,
                overlays: &overlays,
            },
            &Theme::classic(),
            &config,
            &mut ViewportCalculator::new(),
        )
    }

    #[test]
    fn bell_keeps_medium_edges_visible() {
        let cfg = EdgeFalloffConfig::default();
        assert_eq!(edge_weight(0.0, &cfg), 1.0);
        let medium = edge_weight(0.5, &cfg);
        let pure_decay = 0.5f32.powf(cfg.decay_exponent);
        assert!(medium > pure_decay);
        assert!(edge_weight(1.0, &cfg) < medium);
        assert_eq!(normalize_length(5.0, 5.0, 5.0), 0.0);
        assert_eq!(normalize_length(7.0, 5.0, 9.0), 0.5);
    }

    #[test]
    fn merged_label_policy() {
        assert_eq!(merged_label([("FRIEND", false), ("COLLEAGUE", false)]), "FRIEND …");
        assert_eq!(merged_label([("FRIEND", false), ("COLLEAGUE", true)]), "COLLEAGUE …");
        assert_eq!(merged_label([("KNOWS", false), ("KNOWS", false)]), "KNOWS");
    }

    #[test]
    fn parallel_edges_share_one_label() {
        let (doc, layout, communities) = fixture();
        let scene = scene_for(&doc, &layout, &communities);
        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.edges.len(), 3);
        let texts: Vec<&str> = scene.edge_labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts.contains(&"FRIEND …"));
        assert!(texts.contains(&"KNOWS"));
        for label in &scene.edge_labels {
            assert!(label.font_size >= 5.0 && label.font_size <= 11.0);
        }
    }

    #[test]
    fn focus_dims_everything_else() {
        let (mut doc, layout, communities) = fixture();
        doc.focus = FocusSpec {
            node_ids: Default::default(),
            edge_ids: ["r3".to_string()].into_iter().collect(),
        };
        let scene = scene_for(&doc, &layout, &communities);
        assert!(scene.focus_active);
        let node = |id: &str| scene.nodes.iter().find(|n| n.id == id).expect("node");
        assert!(node("b").bold && node("c").bold);
        assert!(!node("a").bold);
        assert_eq!(node("a").opacity, NodeSizeConfig::default().unfocused_opacity);
        let r3 = scene.edges.iter().find(|e| e.id == "r3").expect("r3");
        assert!(r3.focused && !r3.dimmed);
        let r1 = scene.edges.iter().find(|e| e.id == "r1").expect("r1");
        assert!(r1.dimmed);
        assert_eq!(r1.opacity, EdgeFalloffConfig::default().dimmed_opacity);
    }

    #[test]
    fn view_contains_nodes_and_macro_nodes() {
        let (mut doc, layout, communities) = fixture();
        doc.settings.community_display = CommunityDisplay::All;
        let scene = scene_for(&doc, &layout, &communities);
        assert_eq!(scene.macro_nodes.len(), 1);
        assert!(scene.macro_nodes[0].narrative);
        for node in &scene.nodes {
            let r = node.radius;
            assert!(scene.view.contains(Point::new(node.center.x - r, node.center.y - r)));
            assert!(scene.view.contains(Point::new(node.center.x + r, node.center.y + r)));
        }
    }

    #[test]
    fn narrative_only_detail_hides_outsiders() {
        let (mut doc, layout, communities) = fixture();
        doc.settings.detail_display = DetailDisplay::NarrativeOnly;
        let scene = scene_for(&doc, &layout, &communities);
        assert!(scene.nodes.iter().all(|n| n.id != "c"));
        assert!(scene.edges.iter().all(|e| e.id != "r3"));
    }

    #[test]
    fn svg_uses_the_view_rect() {
        let mut config = Config::default();
        config.layout.solver.seed = Some(11);
        config.layout.labels.fast_text_metrics = true;
        let mut doc = PrintDocument::default();
        for id in ["a", "b"] {
            doc.graph.nodes.push(Node {
                id: id.to_string(),
                name: format!("<{id}>"),
                label: "Person".to_string(),
                properties: Default::default(),
                link_count: None,
            });
        }
        doc.graph.relationships.push(Relationship {
            id: "r".to_string(),
            kind: "FRIEND".to_string(),
            source_id: "a".to_string(),
            target_id: "b".to_string(),
            properties: Default::default(),
        });
        doc.settings.workspace_title = "Case & file".to_string();
        let scene = compute_scene(&doc, &config);
        let svg = render_svg(&scene, &config.theme);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(&format!(
            "viewBox=\"{:.2} {:.2} {:.2} {:.2}\"",
            scene.view.x, scene.view.y, scene.view.width, scene.view.height
        )));
        assert!(svg.contains("&lt;a&gt;"));
        assert!(svg.contains("Case &amp; file"));
        assert!(svg.contains("FRIEND"));
    }
}
