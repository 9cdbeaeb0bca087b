use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeMap;
use std::hint::black_box;
use story_print_layout::config::Config;
use story_print_layout::interaction::NoopCallbacks;
use story_print_layout::ir::{MetaCommunity, Node, PrintDocument, Relationship};
use story_print_layout::layout::{LayoutEngine, Point, Size, SolverInput, solve};
use story_print_layout::overrides::Preview;
use story_print_layout::{compute_scene, render_svg};

fn push_relationship(doc: &mut PrintDocument, source: usize, target: usize) {
    let idx = doc.graph.relationships.len();
    doc.graph.relationships.push(Relationship {
        id: format!("r{idx}"),
        kind: if idx % 3 == 0 { "KNOWS" } else { "MEETS" }.to_string(),
        source_id: format!("n{source}"),
        target_id: format!("n{target}"),
        properties: BTreeMap::new(),
    });
}

/// `nodes` nodes split into `communities` chapters. Each node links to its
/// successor inside its chapter plus `extra_edges` cross-chapter shortcuts.
fn story_document(nodes: usize, communities: usize, extra_edges: usize) -> PrintDocument {
    let mut doc = PrintDocument::default();
    let communities = communities.max(1);
    for i in 0..nodes {
        let id = format!("n{i}");
        doc.graph.nodes.push(Node {
            id: id.clone(),
            name: format!("Character {i}"),
            label: "Person".to_string(),
            properties: BTreeMap::new(),
            link_count: None,
        });
        doc.communities.insert(id, format!("c{}", i % communities));
    }
    for i in 0..nodes {
        let next = i + communities;
        if next < nodes {
            push_relationship(&mut doc, i, next);
        }
    }
    for k in 0..extra_edges.min(nodes) {
        push_relationship(&mut doc, k, (k * 7 + 1) % nodes);
    }
    doc.narrative = (0..communities)
        .map(|c| MetaCommunity {
            community_id: format!("c{c}"),
            order: Some(c as i64 + 1),
            title: format!("Chapter {}", c + 1),
            summary: "The plot thickens as old acquaintances meet again.".to_string(),
        })
        .collect();
    doc.settings.workspace_title = "Benchmark casebook".to_string();
    doc
}

fn bench_config() -> Config {
    let mut config = Config::default();
    config.layout.solver.seed = Some(7);
    config.layout.labels.fast_text_metrics = true;
    config
}

const SIZES: [(&str, usize, usize, usize); 3] = [
    ("small", 30, 3, 10),
    ("medium", 120, 6, 60),
    ("large", 400, 10, 200),
];

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");
    group.sample_size(10);
    let config = bench_config();
    for (name, nodes, communities, extra) in SIZES {
        let doc = story_document(nodes, communities, extra);
        group.bench_with_input(BenchmarkId::from_parameter(name), &doc, |b, data| {
            b.iter(|| {
                let output = solve(
                    &SolverInput {
                        graph: &data.graph,
                        membership: &data.communities,
                        canvas: Size::new(1200.0, 800.0),
                        anchors: None,
                    },
                    &config.layout.solver,
                );
                black_box(output.iterations);
            });
        });
    }
    group.finish();
}

fn bench_drag_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("drag_reconcile");
    let config = bench_config();
    for (name, nodes, communities, extra) in SIZES {
        let doc = story_document(nodes, communities, extra);
        let mut engine = LayoutEngine::new(config.layout.clone());
        let base = engine.layout(
            &doc,
            Size::new(1200.0, 800.0),
            &Preview::default(),
            &mut NoopCallbacks,
        );
        let anchor = base.anchor("c0").unwrap_or(Point::new(0.0, 0.0));
        group.bench_with_input(BenchmarkId::from_parameter(name), &doc, |b, data| {
            let mut step = 0.0f32;
            b.iter(|| {
                step += 1.0;
                let preview = Preview {
                    community: Some(("c0".to_string(), anchor.offset(step % 50.0, 0.0))),
                    ..Preview::default()
                };
                let layout = engine.reconcile(&data.settings.overrides, &preview);
                black_box(layout.map(|l| l.nodes.len()));
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(10);
    let config = bench_config();
    for (name, nodes, communities, extra) in SIZES {
        let doc = story_document(nodes, communities, extra);
        group.bench_with_input(BenchmarkId::from_parameter(name), &doc, |b, data| {
            b.iter(|| {
                let scene = compute_scene(black_box(data), &config);
                let svg = render_svg(&scene, &config.theme);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solver, bench_drag_reconcile, bench_end_to_end);
criterion_main!(benches);
