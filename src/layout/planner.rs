use std::collections::{BTreeMap, HashMap};

use crate::config::PlannerConfig;
use crate::ir::Community;

use super::{Orientation, Point, Size};

/// Maps an orientation onto the story axis. `Vertical` stacks the
/// alternating communities above and below the spine, so the story advances
/// along x; `Horizontal` alternates left/right and advances along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Axes {
    primary_is_x: bool,
}

impl Axes {
    pub(crate) fn for_orientation(orientation: Orientation) -> Self {
        Self {
            primary_is_x: orientation == Orientation::Vertical,
        }
    }

    pub(crate) fn primary_span(self, canvas: Size) -> f32 {
        if self.primary_is_x {
            canvas.width
        } else {
            canvas.height
        }
    }

    pub(crate) fn cross_span(self, canvas: Size) -> f32 {
        if self.primary_is_x {
            canvas.height
        } else {
            canvas.width
        }
    }

    pub(crate) fn point(self, primary: f32, cross: f32) -> Point {
        if self.primary_is_x {
            Point::new(primary, cross)
        } else {
            Point::new(cross, primary)
        }
    }

    pub(crate) fn primary(self, point: Point) -> f32 {
        if self.primary_is_x { point.x } else { point.y }
    }

    pub(crate) fn cross(self, point: Point) -> f32 {
        if self.primary_is_x { point.y } else { point.x }
    }
}

/// Estimated radius of a community on the canvas.
fn estimated_radius(size: usize) -> f32 {
    (size as f32).sqrt()
}

/// Spacing inserted after a community of `size` members.
pub fn spacing_after(size: usize, config: &PlannerConfig) -> f32 {
    let reference = config.spacing_reference_size.max(f32::EPSILON);
    let scaled = config.base_spacing * (size as f32 / reference).sqrt();
    scaled.clamp(config.min_spacing, config.max_spacing.max(config.min_spacing))
}

fn side_fraction(order: i64, config: &PlannerConfig) -> f32 {
    if order.rem_euclid(2) == 1 {
        config.cross_fraction
    } else {
        1.0 - config.cross_fraction
    }
}

/// Plans anchors from narrative order. Returns `None` when no community has
/// an order, in which case callers fall back to centroids.
pub fn plan_anchors(
    communities: &[Community],
    canvas: Size,
    orientation: Orientation,
    config: &PlannerConfig,
) -> Option<BTreeMap<String, Point>> {
    let mut ordered: Vec<&Community> = communities.iter().filter(|c| c.order.is_some()).collect();
    if ordered.is_empty() {
        return None;
    }
    ordered.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

    let axes = Axes::for_orientation(orientation);
    let primary_span = axes.primary_span(canvas);
    let cross_span = axes.cross_span(canvas);

    let mut anchors = BTreeMap::new();
    let mut primary = primary_span * config.start_fraction;
    let mut previous: Option<&Community> = None;
    for community in &ordered {
        if let Some(prev) = previous {
            primary += estimated_radius(prev.size())
                + spacing_after(prev.size(), config)
                + estimated_radius(community.size()) / 4.0;
        }
        let order = community.order.unwrap_or_default();
        let cross = cross_span * side_fraction(order, config);
        anchors.insert(community.id.clone(), axes.point(primary, cross));
        previous = Some(community);
    }

    let first = primary_span * config.start_fraction;
    // A lone ordered community spans nothing; spread the rest over the page.
    let last = if (primary - first).abs() <= f32::EPSILON {
        primary_span * (1.0 - config.start_fraction)
    } else {
        primary
    };
    let unordered: Vec<&Community> = communities.iter().filter(|c| c.order.is_none()).collect();
    let slots = unordered.len() as f32 + 1.0;
    for (idx, community) in unordered.iter().enumerate() {
        let primary = first + (last - first) * (idx as f32 + 1.0) / slots;
        let fraction = if idx % 2 == 0 {
            config.outer_cross_fraction
        } else {
            1.0 - config.outer_cross_fraction
        };
        anchors.insert(community.id.clone(), axes.point(primary, cross_span * fraction));
    }

    Some(anchors)
}

/// Centroid of each community's members. Communities without members or
/// with no finite member position are skipped.
pub fn centroid_anchors(
    communities: &[Community],
    positions: &HashMap<String, Point>,
) -> BTreeMap<String, Point> {
    let mut anchors = BTreeMap::new();
    for community in communities {
        let (mut sum_x, mut sum_y, mut count) = (0.0f32, 0.0f32, 0usize);
        for member in &community.members {
            if let Some(pos) = positions.get(member).filter(|p| p.is_finite()) {
                sum_x += pos.x;
                sum_y += pos.y;
                count += 1;
            }
        }
        if count == 0 {
            continue;
        }
        anchors.insert(
            community.id.clone(),
            Point::new(sum_x / count as f32, sum_y / count as f32),
        );
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn community(id: &str, size: usize, order: Option<i64>) -> Community {
        Community {
            id: id.to_string(),
            members: (0..size).map(|i| format!("{id}-{i}")).collect(),
            order,
            title: String::new(),
            summary: String::new(),
        }
    }

    #[test]
    fn two_ordered_communities_vertical() {
        let canvas = Size::new(1000.0, 600.0);
        let communities = vec![community("one", 5, Some(1)), community("two", 3, Some(2))];
        let anchors = plan_anchors(
            &communities,
            canvas,
            Orientation::Vertical,
            &PlannerConfig::default(),
        )
        .expect("ordered communities plan anchors");
        let one = anchors["one"];
        let two = anchors["two"];
        assert!((one.y - 600.0 * 0.2).abs() < 1e-3);
        assert!((two.y - 600.0 * 0.8).abs() < 1e-3);
        assert!(two.x > one.x);
    }

    #[test]
    fn horizontal_swaps_axes() {
        let canvas = Size::new(1000.0, 600.0);
        let communities = vec![community("one", 5, Some(1)), community("two", 3, Some(2))];
        let anchors = plan_anchors(
            &communities,
            canvas,
            Orientation::Horizontal,
            &PlannerConfig::default(),
        )
        .expect("anchors");
        assert!((anchors["one"].x - 200.0).abs() < 1e-3);
        assert!((anchors["two"].x - 800.0).abs() < 1e-3);
        assert!(anchors["two"].y > anchors["one"].y);
    }

    #[test]
    fn anchors_increase_with_order_and_alternate_sides() {
        let canvas = Size::new(1200.0, 800.0);
        let config = PlannerConfig::default();
        let communities: Vec<Community> = (1..=6)
            .rev()
            .map(|order| community(&format!("c{order}"), order as usize * 3, Some(order)))
            .collect();
        let anchors =
            plan_anchors(&communities, canvas, Orientation::Vertical, &config).expect("anchors");
        let axes = Axes::for_orientation(Orientation::Vertical);
        let mut last = f32::MIN;
        for order in 1..=6 {
            let anchor = anchors[&format!("c{order}")];
            assert!(axes.primary(anchor) > last);
            last = axes.primary(anchor);
            let expected = if order % 2 == 1 { 0.2 } else { 0.8 };
            assert!((axes.cross(anchor) - 800.0 * expected).abs() < 1e-3);
        }
    }

    #[test]
    fn spacing_grows_with_size_within_bounds() {
        let config = PlannerConfig::default();
        let small = spacing_after(1, &config);
        let medium = spacing_after(10, &config);
        let large = spacing_after(1000, &config);
        assert!(small <= medium && medium <= large);
        for value in [small, medium, large] {
            assert!(value >= config.min_spacing && value <= config.max_spacing);
        }
        assert_eq!(small, config.min_spacing);
        assert_eq!(large, config.max_spacing);
    }

    #[test]
    fn larger_predecessor_pushes_next_anchor_further() {
        let canvas = Size::new(1000.0, 600.0);
        let config = PlannerConfig::default();
        let gap = |size: usize| {
            let communities = vec![community("a", size, Some(1)), community("b", 4, Some(2))];
            let anchors =
                plan_anchors(&communities, canvas, Orientation::Vertical, &config).expect("anchors");
            anchors["b"].x - anchors["a"].x
        };
        assert!(gap(1) < gap(10));
        assert!(gap(10) < gap(1000));
    }

    #[test]
    fn unordered_communities_fill_the_spine() {
        let canvas = Size::new(1000.0, 600.0);
        let communities = vec![
            community("a", 4, Some(1)),
            community("b", 4, Some(2)),
            community("c", 4, Some(3)),
            community("x", 2, None),
            community("y", 2, None),
        ];
        let config = PlannerConfig::default();
        let anchors =
            plan_anchors(&communities, canvas, Orientation::Vertical, &config).expect("anchors");
        let (first, last) = (anchors["a"].x, anchors["c"].x);
        for id in ["x", "y"] {
            assert!(anchors[id].x > first && anchors[id].x < last);
        }
        assert!(anchors["x"].x < anchors["y"].x);
        assert!((anchors["x"].y - 600.0 * config.outer_cross_fraction).abs() < 1e-3);
        assert!((anchors["y"].y - 600.0 * (1.0 - config.outer_cross_fraction)).abs() < 1e-3);
    }

    #[test]
    fn single_ordered_community_still_separates_the_rest() {
        let canvas = Size::new(1000.0, 600.0);
        let communities = vec![
            community("a", 4, Some(1)),
            community("x", 2, None),
            community("y", 2, None),
            community("z", 2, None),
        ];
        let config = PlannerConfig::default();
        let anchors =
            plan_anchors(&communities, canvas, Orientation::Vertical, &config).expect("anchors");
        let points: Vec<Point> = anchors.values().copied().collect();
        for (i, p) in points.iter().enumerate() {
            for q in &points[i + 1..] {
                assert!(p.distance(*q) > 1.0, "{p:?} and {q:?} coincide");
            }
        }
        assert!(anchors["x"].x < anchors["y"].x && anchors["y"].x < anchors["z"].x);
        assert!(anchors["z"].x <= 1000.0 * (1.0 - config.start_fraction));
    }

    #[test]
    fn no_order_means_no_plan() {
        let communities = vec![community("a", 3, None)];
        assert!(
            plan_anchors(
                &communities,
                Size::new(10.0, 10.0),
                Orientation::Vertical,
                &PlannerConfig::default()
            )
            .is_none()
        );
    }

    #[test]
    fn centroid_skips_empty_and_non_finite() {
        let communities = vec![community("a", 2, None), community("empty", 0, None)];
        let positions: HashMap<String, Point> = [
            ("a-0".to_string(), Point::new(0.0, 0.0)),
            ("a-1".to_string(), Point::new(10.0, 20.0)),
        ]
        .into_iter()
        .collect();
        let anchors = centroid_anchors(&communities, &positions);
        assert_eq!(anchors["a"], Point::new(5.0, 10.0));
        assert!(!anchors.contains_key("empty"));
    }
}
