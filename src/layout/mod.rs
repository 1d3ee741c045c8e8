//! Force-directed tree view.
//!
//! [`GraphLayoutEngine`] turns the task store into layout nodes and edges,
//! feeds them to a [`ForceSimulation`], and owns selection highlighting and
//! drag-to-pin. Physics is supplied by the simulation.

pub mod simulation;

pub use simulation::{ForceDirected, ForceParams, ForceSimulation, NodePosition};

use crate::status::TaskStatus;
use crate::store::TaskStore;
use crate::models::Task;

pub const BASE_RADIUS: f64 = 30.0;
pub const MAX_CHILD_BONUS: f64 = 15.0;
const CHILD_BONUS: f64 = 3.0;

/// Zoom limits of the tree view
pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingKind {
    Selection,
    NextStatus(TaskStatus),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub kind: RingKind,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub parent_count: usize,
    pub children_count: usize,
    pub next_status_highlight: Option<TaskStatus>,
    pub radius: f64,
    pub selected: bool,
}

/// `30 + min(3 * children, 15)`
pub fn node_radius(children_count: usize) -> f64 {
    BASE_RADIUS + (CHILD_BONUS * children_count as f64).min(MAX_CHILD_BONUS)
}

impl LayoutNode {
    pub fn from_task(task: &Task, selected: bool) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
            progress: task.progress,
            parent_count: task.parent_ids.len(),
            children_count: task.child_ids.len(),
            next_status_highlight: task.next_status_highlight,
            radius: node_radius(task.child_ids.len()),
            selected,
        }
    }

    /// Progress label is only shown for partially done work
    pub fn show_progress(&self) -> bool {
        self.progress > 0 && self.progress < 100
    }

    /// Outer rings, drawn outside-in
    pub fn rings(&self) -> Vec<Ring> {
        let mut rings = Vec::new();
        if let Some(next) = self.next_status_highlight {
            rings.push(Ring {
                kind: RingKind::NextStatus(next),
                radius: self.radius + 3.0,
            });
        }
        if self.selected {
            rings.push(Ring {
                kind: RingKind::Selection,
                radius: self.radius + 2.0,
            });
        }
        rings
    }

    /// Title broken into lines that fit inside the circle
    pub fn label_lines(&self) -> Vec<String> {
        let char_width = if self.radius > 35.0 { 7.0 } else { 6.0 };
        let max_width = self.radius * 1.4;

        let mut lines = Vec::new();
        let mut line = String::new();
        for (i, word) in self.title.split(' ').enumerate() {
            let candidate = format!("{}{} ", line, word);
            if candidate.chars().count() as f64 * char_width > max_width && i > 0 {
                lines.push(line.trim().to_string());
                line = format!("{} ", word);
            } else {
                line = candidate;
            }
        }
        if !line.trim().is_empty() {
            lines.push(line.trim().to_string());
        }
        lines
    }
}

/// Directed parent -> child edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEdge {
    pub source: i64,
    pub target: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1200.0, 800.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Transform {
    pub fn apply(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.translate_x,
            point.y * self.scale + self.translate_y,
        )
    }
}

/// Initial zoom that fits `bounds` into the viewport, never enlarging
pub fn fit_transform(bounds: Bounds, viewport: Viewport) -> Transform {
    let ratio = |available: f64, used: f64| {
        if used > 0.0 {
            available / used
        } else {
            f64::INFINITY
        }
    };
    let scale = (ratio(viewport.width, bounds.width)
        .min(ratio(viewport.height, bounds.height))
        .min(1.0)
        * 0.8)
        .clamp(MIN_SCALE, MAX_SCALE);

    Transform {
        scale,
        translate_x: (viewport.width - bounds.width * scale) / 2.0 - bounds.x * scale,
        translate_y: (viewport.height - bounds.height * scale) / 2.0 - bounds.y * scale,
    }
}

pub struct GraphLayoutEngine<S: ForceSimulation> {
    simulation: S,
    viewport: Viewport,
    nodes: Vec<LayoutNode>,
    edges: Vec<LayoutEdge>,
    selected: Option<i64>,
    dragging: Option<i64>,
}

impl<S: ForceSimulation> GraphLayoutEngine<S> {
    pub fn new(simulation: S, viewport: Viewport) -> Self {
        Self {
            simulation,
            viewport,
            nodes: Vec::new(),
            edges: Vec::new(),
            selected: None,
            dragging: None,
        }
    }

    /// Rebuild nodes and edges from the store and reload the simulation
    pub fn rebuild(&mut self, store: &TaskStore) {
        self.simulation.stop();
        self.dragging = None;

        self.nodes = store
            .tasks()
            .iter()
            .map(|task| LayoutNode::from_task(task, self.selected == Some(task.id)))
            .collect();

        self.edges = store
            .tasks()
            .iter()
            .flat_map(|task| {
                task.parent_ids
                    .iter()
                    .filter(|parent| store.contains(**parent))
                    .map(move |&parent| LayoutEdge {
                        source: parent,
                        target: task.id,
                    })
            })
            .collect();

        let params = ForceParams::centered(self.viewport.width, self.viewport.height);
        self.simulation.load(&self.nodes, &self.edges, &params);
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "Layout rebuilt"
        );
    }

    /// Move the highlight without touching the simulation
    pub fn select(&mut self, id: Option<i64>) {
        self.selected = id;
        for node in &mut self.nodes {
            node.selected = Some(node.id) == id;
        }
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[LayoutEdge] {
        &self.edges
    }

    pub fn node(&self, id: i64) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn tick(&mut self) -> Vec<NodePosition> {
        self.simulation.tick()
    }

    pub fn position(&self, id: i64) -> Option<Point> {
        self.simulation.position(id)
    }

    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.simulation
    }

    pub fn drag_start(&mut self, id: i64) {
        let Some(at) = self.simulation.position(id) else {
            return;
        };
        self.simulation.set_alpha_target(0.3);
        self.simulation.restart();
        self.simulation.pin(id, at);
        self.dragging = Some(id);
    }

    pub fn drag_move(&mut self, id: i64, to: Point) {
        if self.dragging == Some(id) {
            self.simulation.pin(id, to);
        }
    }

    pub fn drag_end(&mut self, id: i64) {
        if self.dragging != Some(id) {
            return;
        }
        self.simulation.set_alpha_target(0.0);
        self.simulation.unpin(id);
        self.dragging = None;
    }

    pub fn dragging(&self) -> Option<i64> {
        self.dragging
    }

    /// Bounding box of all nodes including their radius
    pub fn bounds(&self) -> Option<Bounds> {
        let mut extent: Option<(f64, f64, f64, f64)> = None;
        for node in &self.nodes {
            let Some(p) = self.simulation.position(node.id) else {
                continue;
            };
            let r = node.radius;
            extent = Some(match extent {
                None => (p.x - r, p.y - r, p.x + r, p.y + r),
                Some((x0, y0, x1, y1)) => {
                    (x0.min(p.x - r), y0.min(p.y - r), x1.max(p.x + r), y1.max(p.y + r))
                },
            });
        }
        extent.map(|(x0, y0, x1, y1)| Bounds {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    pub fn fit(&self) -> Option<Transform> {
        self.bounds().map(|bounds| fit_transform(bounds, self.viewport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{graph, task};

    /// Records the calls the engine makes
    #[derive(Default)]
    struct RecordingSimulation {
        calls: Vec<String>,
        loaded: Vec<i64>,
        pinned: Option<(i64, Point)>,
        alpha_target: f64,
    }

    impl ForceSimulation for RecordingSimulation {
        fn load(&mut self, nodes: &[LayoutNode], _edges: &[LayoutEdge], _params: &ForceParams) {
            self.calls.push("load".into());
            self.loaded = nodes.iter().map(|n| n.id).collect();
        }

        fn tick(&mut self) -> Vec<NodePosition> {
            Vec::new()
        }

        fn set_alpha_target(&mut self, target: f64) {
            self.calls.push(format!("alpha_target {}", target));
            self.alpha_target = target;
        }

        fn restart(&mut self) {
            self.calls.push("restart".into());
        }

        fn pin(&mut self, id: i64, at: Point) {
            self.calls.push(format!("pin {}", id));
            self.pinned = Some((id, at));
        }

        fn unpin(&mut self, id: i64) {
            self.calls.push(format!("unpin {}", id));
            self.pinned = None;
        }

        fn position(&self, id: i64) -> Option<Point> {
            self.loaded
                .contains(&id)
                .then(|| Point::new(id as f64, id as f64))
        }

        fn stop(&mut self) {
            self.calls.push("stop".into());
        }

        fn is_running(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_node_radius() {
        assert_eq!(node_radius(0), 30.0);
        assert_eq!(node_radius(2), 36.0);
        assert_eq!(node_radius(5), 45.0);
        assert_eq!(node_radius(40), 45.0);
    }

    #[test]
    fn test_rings_and_progress() {
        let mut t = task(1, "Inventory");
        t.progress = 50;
        t.next_status_highlight = Some(TaskStatus::Started);
        let node = LayoutNode::from_task(&t, true);

        assert!(node.show_progress());
        let rings = node.rings();
        assert_eq!(rings.len(), 2);
        assert!(rings.contains(&Ring {
            kind: RingKind::Selection,
            radius: 32.0
        }));
        assert!(rings.contains(&Ring {
            kind: RingKind::NextStatus(TaskStatus::Started),
            radius: 33.0
        }));

        t.progress = 100;
        assert!(!LayoutNode::from_task(&t, false).show_progress());
    }

    #[test]
    fn test_label_lines_wrap() {
        let node = LayoutNode::from_task(&task(1, "Procedural dungeon generator"), false);
        let lines = node.label_lines();
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "Procedural dungeon generator");
    }

    #[test]
    fn test_rebuild_builds_edges_parent_to_child() {
        let mut tasks = graph(&[1, 2, 3], &[(2, 1), (3, 1)]);
        tasks[1].parent_ids.insert(42);
        let store = TaskStore::from_tasks(tasks);

        let mut engine = GraphLayoutEngine::new(RecordingSimulation::default(), Viewport::default());
        engine.rebuild(&store);

        assert_eq!(engine.nodes().len(), 3);
        assert_eq!(engine.edges().len(), 2);
        assert!(engine.edges().contains(&LayoutEdge { source: 1, target: 2 }));
        assert_eq!(engine.node(1).unwrap().radius, 36.0);
        assert_eq!(engine.simulation().calls[..2], ["stop".to_string(), "load".to_string()]);
    }

    #[test]
    fn test_select_updates_highlight_without_reload() {
        let store = TaskStore::from_tasks(graph(&[1, 2], &[]));
        let mut engine = GraphLayoutEngine::new(RecordingSimulation::default(), Viewport::default());
        engine.rebuild(&store);
        let calls_before = engine.simulation().calls.len();

        engine.select(Some(2));
        assert!(engine.node(2).unwrap().selected);
        assert!(!engine.node(1).unwrap().selected);
        assert_eq!(engine.simulation().calls.len(), calls_before);

        engine.rebuild(&store);
        assert!(engine.node(2).unwrap().selected);
    }

    #[test]
    fn test_drag_pins_then_releases() {
        let store = TaskStore::from_tasks(graph(&[1, 2], &[(2, 1)]));
        let mut engine = GraphLayoutEngine::new(RecordingSimulation::default(), Viewport::default());
        engine.rebuild(&store);

        engine.drag_start(2);
        assert_eq!(engine.simulation().alpha_target, 0.3);
        assert_eq!(engine.simulation().pinned, Some((2, Point::new(2.0, 2.0))));

        engine.drag_move(2, Point::new(50.0, 60.0));
        assert_eq!(engine.simulation().pinned, Some((2, Point::new(50.0, 60.0))));

        engine.drag_end(2);
        assert_eq!(engine.simulation().alpha_target, 0.0);
        assert_eq!(engine.simulation().pinned, None);
        assert_eq!(engine.dragging(), None);
    }

    #[test]
    fn test_fit_transform_never_enlarges() {
        let small = Bounds {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        let transform = fit_transform(small, Viewport::new(1000.0, 800.0));
        assert!((transform.scale - 0.8).abs() < 1e-9);
        // centred
        let centre = transform.apply(Point::new(50.0, 50.0));
        assert!((centre.x - 500.0).abs() < 1e-9);
        assert!((centre.y - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_transform_shrinks_large_graphs() {
        let large = Bounds {
            x: -1000.0,
            y: -500.0,
            width: 4000.0,
            height: 1000.0,
        };
        let transform = fit_transform(large, Viewport::new(1000.0, 800.0));
        assert!((transform.scale - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_engine_with_reference_simulation() {
        let store = TaskStore::from_tasks(graph(&[1, 2, 3], &[(2, 1), (3, 1)]));
        let mut engine = GraphLayoutEngine::new(ForceDirected::new(), Viewport::new(800.0, 600.0));
        engine.rebuild(&store);
        let positions = engine.simulation_mut().settle(500);

        assert_eq!(positions.len(), 3);
        assert!(positions.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert!(engine.fit().is_some());
    }
}
