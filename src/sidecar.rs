//! The JSON sidecar stored next to each annotated image.
//!
//! Nodes are written as a forest nested under `components`, each child in
//! its parent's `node` list. Reading is tolerant: the older top-level
//! `node` key, missing ids, coords, colors and directions are all accepted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PlacementSettings;
use crate::geometry::Rect;
use crate::model::{fresh_id, Connection, ConnectionKind, Node, Rgb};

/// Extensions tried, in order, when looking for the image of a sidecar.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

pub fn sidecar_path(image_path: &Path) -> PathBuf {
    image_path.with_extension("json")
}

/// Finds `<stem>.<ext>` next to the sidecar for the first extension that exists.
pub fn find_sibling_image(json_path: &Path) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| json_path.with_extension(ext))
        .find(|p| p.is_file())
}

// ── Export ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DocumentOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a Value>,
    file_name: &'a str,
    node_count: usize,
    connection_count: usize,
    components: Vec<ComponentOut<'a>>,
    connections: &'a [Connection],
}

#[derive(Serialize)]
struct ComponentOut<'a> {
    id: &'a str,
    coords: Rect,
    text: &'a str,
    node: Vec<ComponentOut<'a>>,
}

fn build_component<'a>(
    nodes: &'a [Node],
    children: &[Vec<usize>],
    visited: &mut [bool],
    index: usize,
) -> ComponentOut<'a> {
    visited[index] = true;
    let node = &nodes[index];
    let mut out = ComponentOut {
        id: &node.id,
        coords: node.coords,
        text: &node.text,
        node: Vec::new(),
    };
    for &child in &children[index] {
        if !visited[child] {
            out.node.push(build_component(nodes, children, visited, child));
        }
    }
    out
}

/// Groups nodes under their parents. Nodes whose parent is missing become roots.
fn build_forest(nodes: &[Node]) -> Vec<ComponentOut<'_>> {
    let mut children = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        let parent = node
            .parent_id
            .as_deref()
            .and_then(|pid| nodes.iter().position(|n| n.id == pid))
            .filter(|&p| p != i);
        match parent {
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    let mut visited = vec![false; nodes.len()];
    let mut forest: Vec<_> = roots
        .into_iter()
        .map(|i| build_component(nodes, &children, &mut visited, i))
        .collect();
    // Anything unreachable sits on a parent cycle; keep it rather than lose it.
    for i in 0..nodes.len() {
        if !visited[i] {
            forest.push(build_component(nodes, &children, &mut visited, i));
        }
    }
    forest
}

/// Serializes nodes and connections into the sidecar format.
///
/// `summary`, when given, is emitted ahead of the generated fields.
pub fn to_json(
    nodes: &[Node],
    connections: &[Connection],
    file_name: &str,
    summary: Option<&Value>,
) -> serde_json::Result<String> {
    let doc = DocumentOut {
        summary,
        file_name,
        node_count: nodes.len(),
        connection_count: connections.len(),
        components: build_forest(nodes),
        connections,
    };
    serde_json::to_string_pretty(&doc)
}

/// The `summary` field of an existing sidecar, if it has one.
pub fn read_summary(json: &str) -> Option<Value> {
    let mut value: Value = serde_json::from_str(json).ok()?;
    value.as_object_mut()?.remove("summary")
}

// ── Import ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DocumentIn {
    #[serde(default)]
    summary: Option<Value>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    components: Option<Vec<ComponentIn>>,
    #[serde(default)]
    node: Option<Vec<ComponentIn>>,
    #[serde(default)]
    connections: Vec<ConnectionIn>,
}

#[derive(Deserialize)]
struct ComponentIn {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    coords: Option<Rect>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "children")]
    node: Vec<ComponentIn>,
}

#[derive(Deserialize)]
struct ConnectionIn {
    #[serde(default)]
    id: Option<String>,
    from: String,
    to: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<ConnectionKind>,
    #[serde(default)]
    direction: Option<bool>,
    #[serde(default)]
    color: Option<Rgb>,
}

/// A fully parsed sidecar, ready to be swapped into a scene.
#[derive(Debug, Default)]
pub struct Imported {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub file_name: Option<String>,
    pub summary: Option<Value>,
}

struct Flattened {
    node: Node,
    has_coords: bool,
    id: Option<String>,
}

fn flatten(
    components: Vec<ComponentIn>,
    parent: Option<usize>,
    out: &mut Vec<(Flattened, Option<usize>)>,
) {
    for c in components {
        let index = out.len();
        let coords = c.coords.unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        out.push((
            Flattened {
                node: Node::new(String::new(), coords, c.text.unwrap_or_default()),
                has_coords: c.coords.is_some(),
                id: c.id,
            },
            parent,
        ));
        flatten(c.node, Some(index), out);
    }
}

/// Grid rows searched for gaps between existing nodes before giving up and
/// stacking placements below everything else.
const MAX_SCAN_ROWS: usize = 256;

/// Places each rectangle-less node in the first free slot of a left-to-right grid.
///
/// Only rows reaching into the existing nodes' extent are searched for gaps;
/// past those rows every slot is free.
fn place_missing(nodes: &mut [Node], missing: &[usize], placement: &PlacementSettings) {
    let mut occupied: Vec<Rect> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| !missing.contains(i))
        .map(|(_, n)| n.coords.normalized())
        .collect();

    let (w, h, gap) = (placement.slot_width, placement.slot_height, placement.gap);
    let columns = (((placement.row_width - gap) / (w + gap)).floor() as usize).max(1);
    let bottom = occupied.iter().map(|r| r.y2).fold(0.0f32, f32::max);
    let scan_rows = (((bottom - gap) / (h + gap)).ceil().max(0.0) as usize).min(MAX_SCAN_ROWS);
    let below = (bottom + gap).max(gap + scan_rows as f32 * (h + gap));

    let slot_rect = |slot: usize| {
        let (col, row) = (slot % columns, slot / columns);
        let x = gap + col as f32 * (w + gap);
        let y = if row < scan_rows {
            gap + row as f32 * (h + gap)
        } else {
            below + (row - scan_rows) as f32 * (h + gap)
        };
        Rect::new(x, y, x + w, y + h)
    };

    let mut slot = 0usize;
    for &i in missing {
        loop {
            let rect = slot_rect(slot);
            slot += 1;
            if !occupied.iter().any(|r| r.overlaps(&rect)) {
                tracing::debug!(id = %nodes[i].id, ?rect, "placed node without coords");
                nodes[i].coords = rect;
                occupied.push(rect);
                break;
            }
        }
    }
}

/// Parses a sidecar document.
///
/// Parent links are taken from the nesting; callers normally re-derive them
/// from geometry afterwards.
pub fn from_json(json: &str, placement: &PlacementSettings) -> serde_json::Result<Imported> {
    let doc: DocumentIn = serde_json::from_str(json)?;
    let components = doc.components.or(doc.node).unwrap_or_default();

    let mut flat = Vec::new();
    flatten(components, None, &mut flat);

    let mut taken: HashSet<String> = flat.iter().filter_map(|(f, _)| f.id.clone()).collect();
    taken.extend(doc.connections.iter().filter_map(|c| c.id.clone()));
    // Explicit ids keep their first owner; repeats are re-identified.
    let mut seen: HashSet<String> = HashSet::new();
    let mut assign = |id: Option<String>, what: &str| {
        match id {
            Some(id) if seen.insert(id.clone()) => return id,
            Some(dup) => tracing::warn!(id = %dup, "duplicate {what} id, assigning a new one"),
            None => {}
        }
        let id = fresh_id(|candidate| taken.contains(candidate));
        tracing::debug!(%id, "generated {what} id");
        taken.insert(id.clone());
        seen.insert(id.clone());
        id
    };

    let mut missing = Vec::new();
    let mut nodes = Vec::with_capacity(flat.len());
    let mut parents = Vec::with_capacity(flat.len());
    for (i, (f, parent)) in flat.into_iter().enumerate() {
        let mut node = f.node;
        node.id = assign(f.id, "node");
        if !f.has_coords {
            missing.push(i);
        }
        nodes.push(node);
        parents.push(parent);
    }
    for (i, parent) in parents.into_iter().enumerate() {
        nodes[i].parent_id = parent.map(|p| nodes[p].id.clone());
    }
    place_missing(&mut nodes, &missing, placement);

    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut connections = Vec::with_capacity(doc.connections.len());
    for c in doc.connections {
        if !node_ids.contains(c.from.as_str()) || !node_ids.contains(c.to.as_str()) {
            tracing::warn!(from = %c.from, to = %c.to, "dropping connection to unknown node");
            continue;
        }
        connections.push(Connection {
            id: assign(c.id, "connection"),
            from: c.from,
            to: c.to,
            text: c.text,
            kind: c.kind.unwrap_or_default(),
            direction: c.direction.unwrap_or(true),
            color: c.color.unwrap_or_default(),
        });
    }

    Ok(Imported {
        nodes,
        connections,
        file_name: doc.file_name,
        summary: doc.summary,
    })
}
