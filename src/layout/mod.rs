mod planner;
mod solver;
pub(crate) mod types;

pub use planner::{centroid_anchors, plan_anchors, spacing_after};
pub(crate) use planner::Axes;
pub use solver::{SolverInput, SolverOutput, solve};
pub use types::*;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hasher;
use std::io;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::{LayoutConfig, PlannerConfig, SolverConfig};
use crate::interaction::LayoutCallbacks;
use crate::ir::{CommunityMap, GraphDocument, PrintDocument, build_communities};
use crate::overrides::{PositionOverrides, Preview, Reconciler};

/// Inputs that force a new solver pass when they change. Titles, summaries,
/// display modes and overrides are deliberately absent.
#[derive(Serialize)]
struct SolveKey<'a> {
    graph: &'a GraphDocument,
    communities: &'a CommunityMap,
    order: Vec<(&'a str, Option<i64>)>,
    canvas: Size,
    orientation: Orientation,
    solver: &'a SolverConfig,
    planner: &'a PlannerConfig,
}

/// Feeds serialized bytes straight into a hasher, so fingerprinting never
/// materializes the document as text.
struct HashWriter(DefaultHasher);

impl io::Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn solve_key(doc: &PrintDocument, canvas: Size, config: &LayoutConfig) -> Option<u64> {
    let key = SolveKey {
        graph: &doc.graph,
        communities: &doc.communities,
        order: doc
            .narrative
            .iter()
            .map(|entry| (entry.community_id.as_str(), entry.order))
            .collect(),
        canvas,
        orientation: doc.settings.orientation,
        solver: &config.solver,
        planner: &config.planner,
    };
    let mut writer = HashWriter(DefaultHasher::new());
    serde_json::to_writer(&mut writer, &key).ok()?;
    Some(writer.0.finish())
}

/// Runs Planner -> Solver once per significant input change and layers
/// overrides on top of the cached result.
#[derive(Debug)]
pub struct LayoutEngine {
    config: LayoutConfig,
    key: Option<u64>,
    /// Caller revision and canvas the cached layout was last confirmed for.
    revision: Option<(u64, Size)>,
    solved: Option<Arc<SolvedLayout>>,
    revisions: BTreeMap<String, u64>,
    reconciler: Reconciler,
    solver_runs: usize,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            key: None,
            revision: None,
            solved: None,
            revisions: BTreeMap::new(),
            reconciler: Reconciler::new(),
            solver_runs: 0,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Number of solver passes run so far.
    pub fn solver_runs(&self) -> usize {
        self.solver_runs
    }

    pub fn solved(&self) -> Option<&Arc<SolvedLayout>> {
        self.solved.as_ref()
    }

    /// Returns the solved base layout, re-running the solver only when the
    /// graph, membership, narrative order, canvas, orientation or solver
    /// tunables changed. Each actual pass fires
    /// `community_positions_calculated`.
    pub fn solve(
        &mut self,
        doc: &PrintDocument,
        canvas: Size,
        callbacks: &mut dyn LayoutCallbacks,
    ) -> Arc<SolvedLayout> {
        self.revision = None;
        let key = solve_key(doc, canvas, &self.config);
        if let (Some(solved), Some(key), Some(previous)) = (&self.solved, &key, &self.key)
            && key == previous
        {
            debug!("solver inputs unchanged; reusing layout");
            return Arc::clone(solved);
        }

        let solved = Arc::new(self.run_solver(doc, canvas));
        self.key = key;
        self.solved = Some(Arc::clone(&solved));
        self.solver_runs += 1;

        let anchors: BTreeMap<String, Point> = solved
            .anchors
            .iter()
            .map(|(id, anchor)| (id.clone(), anchor.point))
            .collect();
        callbacks.community_positions_calculated(&anchors);
        solved
    }

    /// Like `solve`, but trusts the caller's document `revision`: while it and
    /// the canvas match the last call, the cached layout is returned without
    /// fingerprinting the document. Callers must bump `revision` on every
    /// document edit.
    pub fn solve_revision(
        &mut self,
        doc: &PrintDocument,
        revision: u64,
        canvas: Size,
        callbacks: &mut dyn LayoutCallbacks,
    ) -> Arc<SolvedLayout> {
        if let Some(solved) = &self.solved
            && self.revision == Some((revision, canvas))
        {
            return Arc::clone(solved);
        }
        let solved = self.solve(doc, canvas, callbacks);
        self.revision = Some((revision, canvas));
        solved
    }

    fn run_solver(&mut self, doc: &PrintDocument, canvas: Size) -> SolvedLayout {
        let orientation = doc.settings.orientation;
        let communities = build_communities(&doc.graph, &doc.communities, &doc.narrative);
        let planned = plan_anchors(&communities, canvas, orientation, &self.config.planner);

        let output = solve(
            &SolverInput {
                graph: &doc.graph,
                membership: &doc.communities,
                canvas,
                anchors: planned.as_ref(),
            },
            &self.config.solver,
        );

        let directed = planned.is_some();
        let anchor_points = match planned {
            Some(anchors) => anchors,
            None => {
                let positions: HashMap<String, Point> = output
                    .nodes
                    .iter()
                    .map(|node| (node.id.clone(), node.position()))
                    .collect();
                centroid_anchors(&communities, &positions)
            }
        };

        let mut anchors = BTreeMap::new();
        for (id, point) in anchor_points {
            let revision = self.revisions.entry(id.clone()).or_insert(0);
            *revision += 1;
            anchors.insert(
                id,
                CommunityAnchor {
                    point,
                    revision: *revision,
                },
            );
        }

        debug!(
            communities = communities.len(),
            anchors = anchors.len(),
            directed,
            iterations = output.iterations,
            "layout pass complete"
        );

        SolvedLayout {
            nodes: output.nodes,
            edges: output.edges,
            anchors,
            directed,
            iterations: output.iterations,
            canvas,
            orientation,
        }
    }

    /// Layers `overrides` and `preview` onto the cached solver output.
    /// Returns `None` before the first `solve`.
    pub fn reconcile(
        &mut self,
        overrides: &PositionOverrides,
        preview: &Preview,
    ) -> Option<ReconciledLayout> {
        let solved = self.solved.as_ref()?;
        Some(self.reconciler.reconcile(solved, overrides, preview))
    }

    /// `solve` followed by `reconcile` with the document's stored overrides.
    pub fn layout(
        &mut self,
        doc: &PrintDocument,
        canvas: Size,
        preview: &Preview,
        callbacks: &mut dyn LayoutCallbacks,
    ) -> ReconciledLayout {
        let solved = self.solve(doc, canvas, callbacks);
        self.reconciler
            .reconcile(&solved, &doc.settings.overrides, preview)
    }

    /// `solve_revision` followed by `reconcile`; the per-frame entry point
    /// while dragging.
    pub fn layout_revision(
        &mut self,
        doc: &PrintDocument,
        revision: u64,
        canvas: Size,
        preview: &Preview,
        callbacks: &mut dyn LayoutCallbacks,
    ) -> ReconciledLayout {
        let solved = self.solve_revision(doc, revision, canvas, callbacks);
        self.reconciler
            .reconcile(&solved, &doc.settings.overrides, preview)
    }
}
