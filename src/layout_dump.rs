use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::layout::{Orientation, Point, Rect, ReconciledLayout, Size};
use crate::render::Scene;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub canvas: Size,
    pub view: Rect,
    pub orientation: Orientation,
    pub anchors: BTreeMap<String, Point>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub sections: Vec<SectionDump>,
    pub title: Option<Rect>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub community: Option<String>,
    pub x: f32,
    pub y: f32,
    /// `None` when the node is not drawn (non-finite position or filtered by
    /// the detail display mode).
    pub radius: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub target: String,
    pub opacity: Option<f32>,
    pub width: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDump {
    pub community: String,
    pub rect: Rect,
}

impl LayoutDump {
    pub fn from_scene(layout: &ReconciledLayout, scene: &Scene) -> Self {
        let radii: BTreeMap<&str, f32> = scene
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), node.radius))
            .collect();
        let strokes: BTreeMap<&str, (f32, f32)> = scene
            .edges
            .iter()
            .map(|edge| (edge.id.as_str(), (edge.opacity, edge.width)))
            .collect();

        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                community: node.community.clone(),
                x: node.x,
                y: node.y,
                radius: radii.get(node.id.as_str()).copied(),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| {
                let stroke = strokes.get(edge.id.as_str());
                EdgeDump {
                    id: edge.id.clone(),
                    kind: edge.kind.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    opacity: stroke.map(|s| s.0),
                    width: stroke.map(|s| s.1),
                }
            })
            .collect();

        let sections = scene
            .sections
            .iter()
            .map(|section| SectionDump {
                community: section.community.clone(),
                rect: section.rect,
            })
            .collect();

        LayoutDump {
            canvas: layout.canvas,
            view: scene.view,
            orientation: layout.orientation,
            anchors: layout.anchors.clone(),
            nodes,
            edges,
            sections,
            title: scene.title.as_ref().map(|title| title.rect),
        }
    }
}

pub fn write_layout_dump(
    output: Option<&Path>,
    layout: &ReconciledLayout,
    scene: &Scene,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_scene(layout, scene);
    match output {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, &dump)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}
