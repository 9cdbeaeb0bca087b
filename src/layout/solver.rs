//! Force-directed solver for the full detail graph.
//!
//! A blocking velocity-Verlet simulation with the usual force set: links,
//! many-body repulsion, collision, a weak centering force and, when a
//! narrative plan exists, per-axis attraction towards community anchors.
//! The loop runs until alpha drops below `alpha_min` or the iteration cap is
//! hit; it is never driven per frame.

use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::SolverConfig;
use crate::ir::{CommunityMap, GraphDocument};

use super::{Point, Size, SolvedEdge, SolvedNode};

#[derive(Debug, Clone, Copy)]
struct Body {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    /// Per-axis attraction target and strength.
    target: Option<(Point, f32)>,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    strength: f32,
    bias: f32,
}

pub struct SolverInput<'a> {
    pub graph: &'a GraphDocument,
    pub membership: &'a CommunityMap,
    pub canvas: Size,
    /// Planned community anchors; `None` disables the anchor forces.
    pub anchors: Option<&'a BTreeMap<String, Point>>,
}

#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub nodes: Vec<SolvedNode>,
    pub edges: Vec<SolvedEdge>,
    pub iterations: usize,
    pub alpha: f32,
}

struct Simulation<'c> {
    bodies: Vec<Body>,
    links: Vec<Link>,
    center: Point,
    alpha: f32,
    config: &'c SolverConfig,
    rng: StdRng,
}

impl<'c> Simulation<'c> {
    /// Tiny nonzero offset used to separate coincident bodies.
    fn jiggle(&mut self) -> f32 {
        let value = (self.rng.r#gen::<f32>() - 0.5) * 1e-6;
        if value == 0.0 { 1e-7 } else { value }
    }

    fn tick(&mut self) {
        self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_collision();
        self.apply_center();
        self.apply_anchor_attraction();

        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            body.vx *= keep;
            body.vy *= keep;
            body.x += body.vx;
            body.y += body.vy;
        }
    }

    fn apply_links(&mut self) {
        let distance = self.config.link_distance;
        for idx in 0..self.links.len() {
            let link = self.links[idx];
            let (s, t) = (self.bodies[link.source], self.bodies[link.target]);
            let mut x = t.x + t.vx - s.x - s.vx;
            let mut y = t.y + t.vy - s.y - s.vy;
            if x == 0.0 {
                x = self.jiggle();
            }
            if y == 0.0 {
                y = self.jiggle();
            }
            let len = (x * x + y * y).sqrt();
            let k = (len - distance) / len * self.alpha * link.strength;
            x *= k;
            y *= k;
            let target = &mut self.bodies[link.target];
            target.vx -= x * link.bias;
            target.vy -= y * link.bias;
            let source = &mut self.bodies[link.source];
            source.vx += x * (1.0 - link.bias);
            source.vy += y * (1.0 - link.bias);
        }
    }

    fn apply_charge(&mut self) {
        let strength = self.config.charge_strength * self.alpha;
        let min2 = self.config.charge_distance_min * self.config.charge_distance_min;
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = self.bodies[j].x - self.bodies[i].x;
                let mut dy = self.bodies[j].y - self.bodies[i].y;
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                let mut l = dx * dx + dy * dy;
                if l < min2 {
                    l = (min2 * l).sqrt();
                }
                let f = strength / l;
                self.bodies[i].vx += dx * f;
                self.bodies[i].vy += dy * f;
                self.bodies[j].vx -= dx * f;
                self.bodies[j].vy -= dy * f;
            }
        }
    }

    fn apply_collision(&mut self) {
        let reach = self.config.collide_radius * 2.0;
        let reach2 = reach * reach;
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.bodies[i], self.bodies[j]);
                let mut x = (a.x + a.vx) - (b.x + b.vx);
                let mut y = (a.y + a.vy) - (b.y + b.vy);
                let mut l = x * x + y * y;
                if l >= reach2 {
                    continue;
                }
                if x == 0.0 {
                    x = self.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = self.jiggle();
                    l += y * y;
                }
                let len = l.sqrt();
                let k = (reach - len) / len * self.config.collide_strength;
                x *= k;
                y *= k;
                // equal radii split the correction evenly
                self.bodies[i].vx += x * 0.5;
                self.bodies[i].vy += y * 0.5;
                self.bodies[j].vx -= x * 0.5;
                self.bodies[j].vy -= y * 0.5;
            }
        }
    }

    fn apply_center(&mut self) {
        if self.bodies.is_empty() {
            return;
        }
        let n = self.bodies.len() as f32;
        let (sum_x, sum_y) = self
            .bodies
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), body| (sx + body.x, sy + body.y));
        let shift_x = (sum_x / n - self.center.x) * self.config.center_strength;
        let shift_y = (sum_y / n - self.center.y) * self.config.center_strength;
        for body in &mut self.bodies {
            body.x -= shift_x;
            body.y -= shift_y;
        }
    }

    fn apply_anchor_attraction(&mut self) {
        let alpha = self.alpha;
        for body in &mut self.bodies {
            if let Some((target, strength)) = body.target {
                body.vx += (target.x - body.x) * strength * alpha;
                body.vy += (target.y - body.y) * strength * alpha;
            }
        }
    }
}

/// Runs the simulation to convergence (or the iteration cap) and returns the
/// nodes with their base coordinates. Relationships with a missing endpoint
/// are skipped.
pub fn solve(input: &SolverInput<'_>, config: &SolverConfig) -> SolverOutput {
    let graph = input.graph;
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let center = Point::new(input.canvas.width / 2.0, input.canvas.height / 2.0);

    let index: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let membership = input.membership;

    let mut sim = Simulation {
        bodies: Vec::with_capacity(graph.nodes.len()),
        links: Vec::new(),
        center,
        alpha: 1.0,
        config,
        rng,
    };

    let jitter = config.initial_jitter.max(0.0);
    for node in &graph.nodes {
        let (dx, dy) = if jitter > 0.0 {
            (
                sim.rng.gen_range(-jitter..=jitter),
                sim.rng.gen_range(-jitter..=jitter),
            )
        } else {
            (0.0, 0.0)
        };
        let target = input.anchors.map(|anchors| {
            match membership.get(node.id.as_str()).and_then(|cid| anchors.get(cid)) {
                Some(anchor) => (*anchor, config.anchor_strength),
                None => (center, config.unanchored_strength),
            }
        });
        sim.bodies.push(Body {
            x: center.x + dx,
            y: center.y + dy,
            vx: 0.0,
            vy: 0.0,
            target,
        });
    }

    let relationships = graph.resolved_relationships();
    let link_counts = graph.link_counts(&relationships);
    let mut degree = vec![0usize; graph.nodes.len()];
    let mut edges = Vec::with_capacity(relationships.len());
    let mut pending = Vec::with_capacity(relationships.len());
    for rel in relationships {
        let (Some(&source), Some(&target)) = (
            index.get(rel.source_id.as_str()),
            index.get(rel.target_id.as_str()),
        ) else {
            continue;
        };
        let intra = match (
            membership.get(rel.source_id.as_str()),
            membership.get(rel.target_id.as_str()),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        degree[source] += 1;
        degree[target] += 1;
        pending.push((source, target, intra));
        edges.push(SolvedEdge {
            id: rel.id.clone(),
            kind: rel.kind.clone(),
            source: rel.source_id.clone(),
            target: rel.target_id.clone(),
            intra_community: intra,
        });
    }
    sim.links = pending
        .into_iter()
        .filter(|(source, target, _)| source != target)
        .map(|(source, target, intra)| Link {
            source,
            target,
            strength: if intra {
                config.intra_link_strength
            } else {
                config.inter_link_strength
            },
            bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
        })
        .collect();

    let mut iterations = 0usize;
    if !sim.bodies.is_empty() {
        while iterations < config.max_iterations && sim.alpha >= config.alpha_min {
            sim.tick();
            iterations += 1;
        }
    }
    debug!(
        nodes = sim.bodies.len(),
        links = sim.links.len(),
        iterations,
        alpha = sim.alpha,
        anchored = input.anchors.is_some(),
        "solver converged"
    );

    let nodes = graph
        .nodes
        .iter()
        .zip(&sim.bodies)
        .map(|(node, body)| SolvedNode {
            id: node.id.clone(),
            name: node.display_name().to_string(),
            label: node.label.clone(),
            community: membership.get(node.id.as_str()).cloned(),
            link_count: link_counts.get(&node.id).copied().unwrap_or(0),
            x: body.x,
            y: body.y,
        })
        .collect();

    SolverOutput {
        nodes,
        edges,
        iterations,
        alpha: sim.alpha,
    }
}
