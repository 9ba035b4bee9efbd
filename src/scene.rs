//! The in-memory scene: nodes, connections, view and selection.
//!
//! Everything here is UI-free. Input handlers translate device events into
//! calls on [`Scene`]; the renderer reads it back every frame.

use egui::{Pos2, Vec2};

use crate::config::{EditorSettings, ParentRule};
use crate::error::{Error, Result};
use crate::geometry::{point_to_segment_dist, Rect};
use crate::model::{fresh_id, Connection, ConnectionKind, ConnectionStyle, Node, Rgb};
use crate::view::ViewState;

/// The single active item for edit, delete and style operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    Node(usize),
    Connection(usize),
}

/// Result of picking a node while connecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectPick {
    /// First endpoint recorded; waiting for the second.
    First(usize),
    /// Two distinct nodes picked. Pending picks are cleared.
    Pair { from: usize, to: usize },
    /// The same node was picked twice. Pending picks are cleared.
    SelfLoop,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub view: ViewState,
    pub selection: Option<Selection>,
    /// Defaults applied to the next connection created.
    pub style: ConnectionStyle,
    pending: Vec<usize>,
    settings: EditorSettings,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Scene {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            view: ViewState::new(&settings),
            selection: None,
            style: ConnectionStyle::default(),
            pending: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Drops all nodes, connections and selection state. The view is kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.selection = None;
        self.pending.clear();
    }

    /// Replaces nodes and connections wholesale, then re-derives parents.
    pub fn replace_contents(&mut self, nodes: Vec<Node>, connections: Vec<Connection>) {
        self.clear();
        self.nodes = nodes;
        self.connections = connections;
        self.infer_hierarchy();
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn id_taken(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id) || self.connections.iter().any(|c| c.id == id)
    }

    fn new_id(&self) -> String {
        fresh_id(|id| self.id_taken(id))
    }

    // ── Hit testing ─────────────────────────────────────────────────────────

    /// First node, in insertion order, whose rectangle contains the screen point.
    ///
    /// Later nodes drawn over earlier ones are not preferred.
    pub fn node_at(&self, screen: Pos2) -> Option<usize> {
        let p = self.view.to_image(screen);
        self.nodes.iter().position(|n| n.coords.contains_point(p))
    }

    /// Image-space centers of both endpoints, if both nodes exist.
    pub fn endpoints(&self, conn: &Connection) -> Option<(Pos2, Pos2)> {
        let from = self.node_by_id(&conn.from)?;
        let to = self.node_by_id(&conn.to)?;
        Some((from.coords.center(), to.coords.center()))
    }

    /// First connection whose segment passes within the tolerance of the point.
    pub fn connection_at(&self, screen: Pos2) -> Option<usize> {
        let p = self.view.to_image(screen);
        let tolerance = self.view.to_image_len(self.settings.connection_tolerance);
        self.connections.iter().position(|c| {
            self.endpoints(c)
                .is_some_and(|(a, b)| point_to_segment_dist(p, a, b) <= tolerance)
        })
    }

    /// Nodes win over connections when both are under the point.
    pub fn item_at(&self, screen: Pos2) -> Option<Selection> {
        self.node_at(screen)
            .map(Selection::Node)
            .or_else(|| self.connection_at(screen).map(Selection::Connection))
    }

    /// True when the screen point is on the resize handle of node `index`.
    pub fn on_resize_handle(&self, index: usize, screen: Pos2) -> bool {
        self.nodes.get(index).is_some_and(|n| {
            let corner = self.view.to_screen(n.coords.end_corner());
            (corner - screen).length() <= self.settings.resize_handle
        })
    }

    /// Node whose resize handle is under the screen point. Nodes drawn later
    /// sit on top, so they are checked first.
    pub fn resize_handle_at(&self, screen: Pos2) -> Option<usize> {
        (0..self.nodes.len())
            .rev()
            .find(|&i| self.on_resize_handle(i, screen))
    }

    // ── Hierarchy ───────────────────────────────────────────────────────────

    /// Recomputes every node's `parent_id` from rectangle containment.
    ///
    /// Full O(n²) pass. A node whose rectangle equals another's can only be
    /// parented by the earlier of the two, so links never form a cycle.
    pub fn infer_hierarchy(&mut self) {
        let rule = self.settings.parent_rule;
        let parents: Vec<Option<String>> = (0..self.nodes.len())
            .map(|ci| {
                let child = self.nodes[ci].coords;
                let mut best: Option<usize> = None;
                for (pi, parent) in self.nodes.iter().enumerate() {
                    if pi == ci || !parent.coords.contains_rect(&child) {
                        continue;
                    }
                    if pi > ci && parent.coords.normalized() == child.normalized() {
                        continue;
                    }
                    match rule {
                        ParentRule::First => {
                            best = Some(pi);
                            break;
                        }
                        ParentRule::Smallest => {
                            let smaller = best.map_or(true, |b| {
                                parent.coords.area() < self.nodes[b].coords.area()
                            });
                            if smaller {
                                best = Some(pi);
                            }
                        }
                    }
                }
                best.map(|b| self.nodes[b].id.clone())
            })
            .collect();
        for (node, parent) in self.nodes.iter_mut().zip(parents) {
            node.parent_id = parent;
        }
    }

    // ── Nodes ───────────────────────────────────────────────────────────────

    /// Whether a drag between two screen points is large enough to draw a node.
    pub fn draw_extent_ok(&self, start: Pos2, end: Pos2) -> bool {
        let d = end - start;
        d.x.abs() > self.settings.min_drag && d.y.abs() > self.settings.min_drag
    }

    /// Creates a node from a completed draw gesture in screen space.
    pub fn create_node(&mut self, start: Pos2, end: Pos2, text: &str) -> Result<String> {
        if !self.draw_extent_ok(start, end) {
            let d = end - start;
            tracing::debug!(width = d.x.abs(), height = d.y.abs(), "drag too small for a node");
            return Err(Error::DragTooSmall {
                width: d.x.abs(),
                height: d.y.abs(),
            });
        }
        let coords = Rect::from_corners(self.view.to_image(start), self.view.to_image(end));
        self.add_node(coords, text)
    }

    /// Adds a node with image-space coordinates.
    pub fn add_node(&mut self, coords: Rect, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        let id = self.new_id();
        tracing::debug!(%id, ?coords, "node created");
        self.nodes.push(Node::new(id.clone(), coords, text));
        self.infer_hierarchy();
        Ok(id)
    }

    /// Moves node `index` by an image-space delta.
    pub fn translate_node(&mut self, index: usize, delta: Vec2) -> Result<()> {
        let node = self.nodes.get_mut(index).ok_or(Error::OutOfRange(index))?;
        node.coords = node.coords.translated(delta.x, delta.y);
        self.infer_hierarchy();
        Ok(())
    }

    /// Moves the end corner (`x2`, `y2`) of node `index` to an image-space point.
    pub fn resize_node(&mut self, index: usize, corner: Pos2) -> Result<()> {
        let node = self.nodes.get_mut(index).ok_or(Error::OutOfRange(index))?;
        node.coords.x2 = corner.x;
        node.coords.y2 = corner.y;
        self.infer_hierarchy();
        Ok(())
    }

    /// Removes a node and every connection that mentions it.
    pub fn delete_node(&mut self, index: usize) -> Result<Node> {
        if index >= self.nodes.len() {
            return Err(Error::OutOfRange(index));
        }
        let node = self.nodes.remove(index);
        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(&node.id));
        tracing::debug!(
            id = %node.id,
            cascaded = before - self.connections.len(),
            "node deleted"
        );
        self.selection = None;
        self.pending.clear();
        self.infer_hierarchy();
        Ok(node)
    }

    // ── Connections ─────────────────────────────────────────────────────────

    pub fn pending(&self) -> &[usize] {
        &self.pending
    }

    pub fn cancel_connect(&mut self) {
        self.pending.clear();
    }

    /// Records node `index` as a connection endpoint.
    pub fn pick_for_connection(&mut self, index: usize) -> Result<ConnectPick> {
        if index >= self.nodes.len() {
            return Err(Error::OutOfRange(index));
        }
        self.pending.push(index);
        if self.pending.len() < 2 {
            return Ok(ConnectPick::First(index));
        }
        let (from, to) = (self.pending[0], self.pending[1]);
        self.pending.clear();
        if from == to {
            tracing::debug!(node = %self.nodes[from].id, "ignoring self-loop");
            return Ok(ConnectPick::SelfLoop);
        }
        Ok(ConnectPick::Pair { from, to })
    }

    /// Connects two distinct nodes using the current [`ConnectionStyle`].
    pub fn create_connection(
        &mut self,
        from: usize,
        to: usize,
        text: Option<String>,
    ) -> Result<String> {
        if from == to {
            return Err(Error::SelfLoop);
        }
        let from_id = self.nodes.get(from).ok_or(Error::OutOfRange(from))?.id.clone();
        let to_id = self.nodes.get(to).ok_or(Error::OutOfRange(to))?.id.clone();
        let id = self.new_id();
        tracing::debug!(%id, from = %from_id, to = %to_id, "connection created");
        self.connections.push(Connection {
            id: id.clone(),
            from: from_id,
            to: to_id,
            text: text.filter(|t| !t.is_empty()),
            kind: self.style.kind,
            direction: self.style.direction,
            color: self.style.color,
        });
        Ok(id)
    }

    pub fn delete_connection(&mut self, index: usize) -> Result<Connection> {
        if index >= self.connections.len() {
            return Err(Error::OutOfRange(index));
        }
        self.selection = None;
        Ok(self.connections.remove(index))
    }

    fn selected_connection_mut(&mut self) -> Result<&mut Connection> {
        match self.selection {
            Some(Selection::Connection(i)) => {
                self.connections.get_mut(i).ok_or(Error::OutOfRange(i))
            }
            Some(Selection::Node(_)) => Err(Error::NotAConnection),
            None => Err(Error::NothingSelected),
        }
    }

    /// Flips the direction of the selected connection and returns the new value.
    pub fn toggle_direction(&mut self) -> Result<bool> {
        let conn = self.selected_connection_mut()?;
        conn.direction = !conn.direction;
        Ok(conn.direction)
    }

    pub fn set_connection_kind(&mut self, kind: ConnectionKind) -> Result<()> {
        self.selected_connection_mut()?.kind = kind;
        Ok(())
    }

    pub fn set_connection_color(&mut self, color: Rgb) -> Result<()> {
        self.selected_connection_mut()?.color = color;
        Ok(())
    }

    // ── Selection ───────────────────────────────────────────────────────────

    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection.filter(|s| match *s {
            Selection::Node(i) => i < self.nodes.len(),
            Selection::Connection(i) => i < self.connections.len(),
        });
    }

    /// Current text of the selected item.
    pub fn selected_text(&self) -> Option<&str> {
        match self.selection? {
            Selection::Node(i) => self.nodes.get(i).map(|n| n.text.as_str()),
            Selection::Connection(i) => self
                .connections
                .get(i)
                .map(|c| c.text.as_deref().unwrap_or("")),
        }
    }

    /// Replaces the selected item's text. Blank input leaves it unchanged.
    ///
    /// Returns whether anything changed.
    pub fn edit_text(&mut self, text: &str) -> Result<bool> {
        let selection = self.selection.ok_or(Error::NothingSelected)?;
        if text.trim().is_empty() {
            return Ok(false);
        }
        match selection {
            Selection::Node(i) => {
                self.nodes.get_mut(i).ok_or(Error::OutOfRange(i))?.text = text.to_string();
            }
            Selection::Connection(i) => {
                self.connections.get_mut(i).ok_or(Error::OutOfRange(i))?.text =
                    Some(text.to_string());
            }
        }
        Ok(true)
    }

    pub fn delete_selected(&mut self) -> Result<()> {
        match self.selection.ok_or(Error::NothingSelected)? {
            Selection::Node(i) => self.delete_node(i).map(|_| ()),
            Selection::Connection(i) => self.delete_connection(i).map(|_| ()),
        }
    }

    /// Entries for the side list: nodes first, then connections.
    pub fn list_entries(&self) -> Vec<(Selection, String)> {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (Selection::Node(i), n.list_label()));
        let conns = self
            .connections
            .iter()
            .enumerate()
            .map(|(i, c)| (Selection::Connection(i), c.list_label()));
        nodes.chain(conns).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    fn scene_with(rects: &[(f32, f32, f32, f32)]) -> Scene {
        let mut scene = Scene::default();
        for (i, &(x1, y1, x2, y2)) in rects.iter().enumerate() {
            scene
                .add_node(Rect::new(x1, y1, x2, y2), &format!("n{i}"))
                .unwrap();
        }
        scene
    }

    fn connect(scene: &mut Scene, from: usize, to: usize) -> String {
        scene.create_connection(from, to, None).unwrap()
    }

    #[test]
    fn node_hit_test() {
        let mut scene = scene_with(&[(10.0, 10.0, 50.0, 50.0)]);
        assert_eq!(scene.node_at(pos2(30.0, 30.0)), Some(0));
        assert_eq!(scene.node_at(pos2(60.0, 60.0)), None);

        scene.view.scale_factor = 2.0;
        // Image-space (2.5, 2.5) is outside the node.
        assert_eq!(scene.node_at(pos2(5.0, 5.0)), None);
        assert_eq!(scene.node_at(pos2(60.0, 60.0)), Some(0));
    }

    #[test]
    fn hit_test_handles_reversed_rects_and_pan() {
        let mut scene = scene_with(&[(50.0, 50.0, 10.0, 10.0)]);
        scene.view.offset = vec2(100.0, 0.0);
        assert_eq!(scene.node_at(pos2(130.0, 30.0)), Some(0));
        assert_eq!(scene.node_at(pos2(30.0, 30.0)), None);
    }

    #[test]
    fn overlapping_nodes_resolve_to_earliest() {
        let scene = scene_with(&[(0.0, 0.0, 100.0, 100.0), (20.0, 20.0, 40.0, 40.0)]);
        assert_eq!(scene.node_at(pos2(30.0, 30.0)), Some(0));
    }

    #[test]
    fn connection_hit_test_uses_segment_distance() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (100.0, 0.0, 110.0, 10.0)]);
        connect(&mut scene, 0, 1);
        // Centers are (5,5) and (105,5).
        assert_eq!(scene.connection_at(pos2(50.0, 8.0)), Some(0));
        assert_eq!(scene.connection_at(pos2(50.0, 12.0)), None);
        // Past the end of the segment.
        assert_eq!(scene.connection_at(pos2(115.0, 5.0)), None);
    }

    #[test]
    fn connection_tolerance_is_in_screen_pixels() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (100.0, 0.0, 110.0, 10.0)]);
        connect(&mut scene, 0, 1);
        scene.view.scale_factor = 2.0;
        // Segment at screen y=10; 4 px away is a hit, 6 px is not.
        assert_eq!(scene.connection_at(pos2(100.0, 14.0)), Some(0));
        assert_eq!(scene.connection_at(pos2(100.0, 16.0)), None);
    }

    #[test]
    fn containment_assigns_parent() {
        let scene = scene_with(&[
            (0.0, 0.0, 100.0, 100.0),
            (10.0, 10.0, 20.0, 20.0),
            (200.0, 200.0, 210.0, 210.0),
        ]);
        let a = scene.nodes[0].id.clone();
        assert_eq!(scene.nodes[0].parent_id, None);
        assert_eq!(scene.nodes[1].parent_id, Some(a));
        assert_eq!(scene.nodes[2].parent_id, None);
    }

    #[test]
    fn containment_with_reversed_parent_rect() {
        let scene = scene_with(&[(100.0, 100.0, 0.0, 0.0), (10.0, 10.0, 20.0, 20.0)]);
        assert_eq!(scene.nodes[1].parent_id.as_deref(), Some(scene.nodes[0].id.as_str()));
    }

    #[test]
    fn parent_rule_smallest_vs_first() {
        let rects = [
            (0.0, 0.0, 100.0, 100.0),
            (5.0, 5.0, 50.0, 50.0),
            (10.0, 10.0, 20.0, 20.0),
        ];
        let smallest = scene_with(&rects);
        assert_eq!(smallest.nodes[2].parent_id, Some(smallest.nodes[1].id.clone()));

        let mut first = Scene::new(EditorSettings {
            parent_rule: ParentRule::First,
            ..EditorSettings::default()
        });
        for &(x1, y1, x2, y2) in &rects {
            first.add_node(Rect::new(x1, y1, x2, y2), "n").unwrap();
        }
        assert_eq!(first.nodes[2].parent_id, Some(first.nodes[0].id.clone()));
    }

    #[test]
    fn identical_rects_do_not_form_a_cycle() {
        let scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (10.0, 10.0, 0.0, 0.0)]);
        assert_eq!(scene.nodes[0].parent_id, None);
        assert_eq!(scene.nodes[1].parent_id, Some(scene.nodes[0].id.clone()));
    }

    #[test]
    fn moving_a_node_recomputes_parents() {
        let mut scene = scene_with(&[(0.0, 0.0, 100.0, 100.0), (10.0, 10.0, 20.0, 20.0)]);
        assert!(scene.nodes[1].parent_id.is_some());
        scene.translate_node(1, vec2(300.0, 0.0)).unwrap();
        assert_eq!(scene.nodes[1].coords, Rect::new(310.0, 10.0, 320.0, 20.0));
        assert_eq!(scene.nodes[1].parent_id, None);
    }

    #[test]
    fn resizing_moves_end_corner_and_recomputes_parents() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 20.0, 30.0, 30.0)]);
        assert_eq!(scene.nodes[1].parent_id, None);
        scene.resize_node(0, pos2(50.0, 50.0)).unwrap();
        assert_eq!(scene.nodes[0].coords, Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(scene.nodes[1].parent_id, Some(scene.nodes[0].id.clone()));
    }

    #[test]
    fn nested_node_handle_wins_over_enclosing_node() {
        let mut scene = scene_with(&[(0.0, 0.0, 100.0, 100.0), (10.0, 10.0, 40.0, 40.0)]);
        let corner = pos2(40.0, 40.0);
        assert_eq!(scene.node_at(corner), Some(0));
        assert_eq!(scene.resize_handle_at(corner), Some(1));
        assert_eq!(scene.resize_handle_at(pos2(99.0, 99.0)), Some(0));
        assert_eq!(scene.resize_handle_at(pos2(60.0, 20.0)), None);

        scene.resize_node(1, pos2(50.0, 60.0)).unwrap();
        assert_eq!(scene.nodes[1].coords, Rect::new(10.0, 10.0, 50.0, 60.0));
        assert_eq!(scene.nodes[0].coords, Rect::new(0.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn resize_handle_is_near_end_corner() {
        let mut scene = scene_with(&[(0.0, 0.0, 40.0, 40.0)]);
        scene.view.scale_factor = 2.0;
        assert!(scene.on_resize_handle(0, pos2(78.0, 79.0)));
        assert!(!scene.on_resize_handle(0, pos2(40.0, 40.0)));
        assert!(!scene.on_resize_handle(5, pos2(80.0, 80.0)));
    }

    #[test]
    fn create_node_requires_extent_and_text() {
        let mut scene = Scene::default();
        assert!(matches!(
            scene.create_node(pos2(0.0, 0.0), pos2(4.0, 100.0), "x"),
            Err(Error::DragTooSmall { .. })
        ));
        assert!(matches!(
            scene.create_node(pos2(0.0, 0.0), pos2(40.0, 40.0), "  "),
            Err(Error::EmptyText)
        ));
        assert!(scene.nodes.is_empty());

        scene.view.scale_factor = 2.0;
        scene.view.offset = vec2(10.0, 10.0);
        let id = scene
            .create_node(pos2(50.0, 30.0), pos2(10.0, 70.0), "line one\nline two")
            .unwrap();
        let node = &scene.nodes[0];
        assert_eq!(node.id, id);
        // Stored in gesture order, in image space.
        assert_eq!(node.coords, Rect::new(20.0, 10.0, 0.0, 30.0));
        assert_eq!(node.text, "line one\nline two");
    }

    #[test]
    fn node_ids_are_unique() {
        let mut scene = Scene::default();
        for i in 0..50 {
            let x = i as f32 * 20.0;
            scene.add_node(Rect::new(x, 0.0, x + 10.0, 10.0), "n").unwrap();
        }
        let mut ids: Vec<_> = scene.nodes.iter().map(|n| n.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn picking_two_nodes_yields_a_pair() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        assert_eq!(scene.pick_for_connection(0).unwrap(), ConnectPick::First(0));
        assert_eq!(scene.pending(), &[0]);
        assert_eq!(
            scene.pick_for_connection(1).unwrap(),
            ConnectPick::Pair { from: 0, to: 1 }
        );
        assert!(scene.pending().is_empty());
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0)]);
        scene.pick_for_connection(0).unwrap();
        assert_eq!(scene.pick_for_connection(0).unwrap(), ConnectPick::SelfLoop);
        assert!(scene.pending().is_empty());
        assert!(scene.connections.is_empty());
        assert!(matches!(
            scene.create_connection(0, 0, None),
            Err(Error::SelfLoop)
        ));
        assert!(scene.connections.is_empty());
    }

    #[test]
    fn new_connections_take_tool_style() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        scene.style = ConnectionStyle {
            kind: ConnectionKind::Dashed,
            color: Rgb::new(0, 0, 255),
            direction: false,
        };
        scene.create_connection(0, 1, Some(String::new())).unwrap();
        let c = &scene.connections[0];
        assert_eq!(c.from, scene.nodes[0].id);
        assert_eq!(c.to, scene.nodes[1].id);
        assert_eq!(c.kind, ConnectionKind::Dashed);
        assert_eq!(c.color, Rgb::new(0, 0, 255));
        assert!(!c.direction);
        assert_eq!(c.text, None);
    }

    #[test]
    fn deleting_a_node_cascades_to_its_connections_only() {
        let mut scene = scene_with(&[
            (0.0, 0.0, 10.0, 10.0),
            (20.0, 0.0, 30.0, 10.0),
            (40.0, 0.0, 50.0, 10.0),
        ]);
        connect(&mut scene, 0, 1);
        connect(&mut scene, 1, 2);
        let keep = connect(&mut scene, 2, 0);
        let removed_id = scene.nodes[1].id.clone();

        scene.select(Some(Selection::Node(1)));
        scene.delete_selected().unwrap();

        assert_eq!(scene.nodes.len(), 2);
        assert!(scene.connections.iter().all(|c| !c.touches(&removed_id)));
        assert_eq!(scene.connections.len(), 1);
        assert_eq!(scene.connections[0].id, keep);
        assert_eq!(scene.selection, None);
    }

    #[test]
    fn deleting_a_connection_is_local() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        connect(&mut scene, 0, 1);
        scene.select(Some(Selection::Connection(0)));
        scene.delete_selected().unwrap();
        assert!(scene.connections.is_empty());
        assert_eq!(scene.nodes.len(), 2);
    }

    #[test]
    fn operations_without_selection_are_refused() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0)]);
        assert!(matches!(scene.delete_selected(), Err(Error::NothingSelected)));
        assert!(matches!(scene.edit_text("x"), Err(Error::NothingSelected)));
        assert!(matches!(scene.toggle_direction(), Err(Error::NothingSelected)));
        assert_eq!(scene.nodes.len(), 1);
    }

    #[test]
    fn toggle_direction_twice_is_identity() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        connect(&mut scene, 0, 1);
        scene.select(Some(Selection::Connection(0)));
        let original = scene.connections[0].direction;
        assert_eq!(scene.toggle_direction().unwrap(), !original);
        assert_eq!(scene.toggle_direction().unwrap(), original);
        assert_eq!(scene.connections[0].direction, original);
    }

    #[test]
    fn toggle_direction_on_node_is_refused() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0)]);
        scene.select(Some(Selection::Node(0)));
        assert!(matches!(scene.toggle_direction(), Err(Error::NotAConnection)));
        assert!(matches!(
            scene.set_connection_kind(ConnectionKind::Dotted),
            Err(Error::NotAConnection)
        ));
    }

    #[test]
    fn style_edits_apply_to_selected_connection() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        connect(&mut scene, 0, 1);
        scene.select(Some(Selection::Connection(0)));
        scene.set_connection_kind(ConnectionKind::Dotted).unwrap();
        scene.set_connection_color(Rgb::new(9, 8, 7)).unwrap();
        assert_eq!(scene.connections[0].kind, ConnectionKind::Dotted);
        assert_eq!(scene.connections[0].color, Rgb::new(9, 8, 7));
    }

    #[test]
    fn blank_edit_keeps_text() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        connect(&mut scene, 0, 1);

        scene.select(Some(Selection::Node(0)));
        assert!(!scene.edit_text("").unwrap());
        assert!(!scene.edit_text("  \n ").unwrap());
        assert_eq!(scene.nodes[0].text, "n0");
        assert!(scene.edit_text("renamed").unwrap());
        assert_eq!(scene.selected_text(), Some("renamed"));

        scene.select(Some(Selection::Connection(0)));
        assert_eq!(scene.selected_text(), Some(""));
        assert!(scene.edit_text("uses").unwrap());
        assert_eq!(scene.connections[0].text.as_deref(), Some("uses"));
    }

    #[test]
    fn select_ignores_stale_indices() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0)]);
        scene.select(Some(Selection::Node(3)));
        assert_eq!(scene.selection, None);
        scene.select(Some(Selection::Connection(0)));
        assert_eq!(scene.selection, None);
    }

    #[test]
    fn list_entries_put_nodes_first() {
        let mut scene = scene_with(&[(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        connect(&mut scene, 0, 1);
        let entries = scene.list_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, Selection::Node(0));
        assert_eq!(entries[2].0, Selection::Connection(0));
        assert!(entries[2].1.starts_with("Connection("));
    }
}
