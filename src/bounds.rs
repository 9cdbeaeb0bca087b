//! Overlay placement and the view rectangle of the print scene.

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{LayoutSettings, OverlayConfig};
use crate::ir::Community;
use crate::layout::{Axes, Orientation, Point, Rect, ReconciledLayout, Size};
use crate::overrides::Preview;
use crate::text_metrics;

/// Story-text box attached to a narrative community.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionOverlay {
    pub community: String,
    pub order: i64,
    pub title: String,
    pub summary: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleOverlay {
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayLayout {
    pub sections: Vec<SectionOverlay>,
    pub title: Option<TitleOverlay>,
}

impl OverlayLayout {
    pub fn section(&self, community: &str) -> Option<&SectionOverlay> {
        self.sections.iter().find(|section| section.community == community)
    }

    pub fn rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.sections
            .iter()
            .map(|section| section.rect)
            .chain(self.title.iter().map(|title| title.rect))
    }
}

pub fn default_section_size(canvas: Size, config: &OverlayConfig) -> Size {
    let width = (canvas.width * config.section_width_fraction).max(config.min_width);
    let height = (width * config.section_aspect).max(config.min_height);
    Size::new(width, height)
}

/// Places a section of `size` next to `anchor`, on the side of the cross
/// axis facing away from the story spine.
pub fn section_rect(
    anchor: Point,
    size: Size,
    orientation: Orientation,
    canvas: Size,
    gap: f32,
) -> Rect {
    let axes = Axes::for_orientation(orientation);
    let (primary_extent, cross_extent) = match orientation {
        Orientation::Vertical => (size.width, size.height),
        Orientation::Horizontal => (size.height, size.width),
    };
    let primary = axes.primary(anchor) - primary_extent / 2.0;
    let cross_anchor = axes.cross(anchor);
    let cross = if cross_anchor <= axes.cross_span(canvas) / 2.0 {
        cross_anchor - gap - cross_extent
    } else {
        cross_anchor + gap
    };
    Rect::from_origin_size(axes.point(primary, cross), size)
}

pub fn default_title_rect(canvas: Size, config: &OverlayConfig) -> Rect {
    let margin = canvas.width.min(canvas.height) * config.title_margin_fraction;
    let width = (canvas.width * config.title_width_fraction).max(config.min_width);
    Rect::new(margin, margin, width, config.title_height.max(config.min_height))
}

/// Resolves every visible overlay's rectangle. Sizes and positions follow
/// preview, then stored override, then default.
pub fn place_overlays(
    layout: &ReconciledLayout,
    communities: &[Community],
    settings: &LayoutSettings,
    preview: &Preview,
    config: &OverlayConfig,
) -> OverlayLayout {
    let overrides = &settings.overrides;
    let mut sections = Vec::new();
    if settings.show_story_text {
        for community in communities {
            let Some(order) = community.order else {
                continue;
            };
            let Some(anchor) = layout.anchor(&community.id).filter(Point::is_finite) else {
                continue;
            };
            let size = preview
                .section_size(&community.id)
                .or_else(|| overrides.section_sizes.get(&community.id).copied())
                .unwrap_or_else(|| default_section_size(layout.canvas, config));
            sections.push(SectionOverlay {
                community: community.id.clone(),
                order,
                title: community.title.clone(),
                summary: text_metrics::plain_text(&community.summary),
                rect: section_rect(
                    anchor,
                    size,
                    layout.orientation,
                    layout.canvas,
                    config.section_gap,
                ),
            });
        }
    }

    let title = (settings.show_workspace_title && !settings.workspace_title.trim().is_empty())
        .then(|| {
            let fallback = default_title_rect(layout.canvas, config);
            let position = preview
                .title_position
                .or_else(|| overrides.title_position())
                .unwrap_or(fallback.origin());
            let size = preview
                .title_size
                .or_else(|| overrides.title_size())
                .unwrap_or(fallback.size());
            TitleOverlay {
                text: settings.workspace_title.clone(),
                rect: Rect::from_origin_size(position, size),
            }
        });

    OverlayLayout { sections, title }
}

/// Bounding rectangle of `(center, radius)` circles, skipping non-finite
/// entries.
pub fn circle_extent(circles: impl IntoIterator<Item = (Point, f32)>) -> Option<Rect> {
    let mut extent: Option<Rect> = None;
    for (center, radius) in circles {
        if !center.is_finite() || !radius.is_finite() {
            continue;
        }
        let rect = Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0);
        extent = Some(union(extent, rect));
    }
    extent
}

fn union(current: Option<Rect>, rect: Rect) -> Rect {
    match current {
        None => rect,
        Some(cur) => {
            let min_x = cur.x.min(rect.x);
            let min_y = cur.y.min(rect.y);
            let max_x = cur.max_x().max(rect.max_x());
            let max_y = cur.max_y().max(rect.max_y());
            Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
        }
    }
}

#[derive(Serialize)]
struct ViewportKey {
    content: Option<Rect>,
    overlays: Vec<Rect>,
    canvas: Size,
    padding: f32,
}

/// Computes the scene's view rectangle and skips the work when none of its
/// inputs changed since the last call.
#[derive(Debug, Default)]
pub struct ViewportCalculator {
    key: Option<String>,
    view: Option<Rect>,
    recomputations: usize,
}

impl ViewportCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    pub fn view_rect(
        &mut self,
        content: Option<Rect>,
        overlays: &OverlayLayout,
        canvas: Size,
        config: &OverlayConfig,
    ) -> Rect {
        let padding = canvas.width.max(canvas.height) * config.padding_fraction;
        let overlay_rects: Vec<Rect> = overlays
            .rects()
            .filter(|rect| rect.origin().is_finite() && rect.width.is_finite() && rect.height.is_finite())
            .collect();
        let key = serde_json::to_string(&ViewportKey {
            content,
            overlays: overlay_rects.clone(),
            canvas,
            padding,
        })
        .ok();
        if let (Some(key), Some(previous), Some(view)) = (&key, &self.key, self.view)
            && key == previous
        {
            trace!("viewport unchanged");
            return view;
        }

        let mut extent = content;
        for rect in overlay_rects {
            extent = Some(union(extent, rect));
        }
        let extent = extent.unwrap_or_else(|| Rect::new(0.0, 0.0, canvas.width, canvas.height));
        let view = Rect::new(
            extent.x - padding,
            extent.y - padding,
            extent.width + padding * 2.0,
            extent.height + padding * 2.0,
        );
        self.recomputations += 1;
        debug!(
            x = view.x,
            y = view.y,
            width = view.width,
            height = view.height,
            "viewport recomputed"
        );
        self.key = key;
        self.view = Some(view);
        view
    }
}
