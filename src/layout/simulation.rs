//! Force simulation capability and the bundled reference implementation.
//!
//! The layout engine never integrates physics itself. It hands nodes and edges
//! to a [`ForceSimulation`] and reads positions back one tick at a time.

use std::collections::HashMap;

use super::{LayoutEdge, LayoutNode, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

impl NodePosition {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForceParams {
    pub link_distance: f64,
    /// Negative values repel
    pub charge: f64,
    pub collision_radius: f64,
    pub center: Point,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            link_distance: 120.0,
            charge: -800.0,
            collision_radius: 50.0,
            center: Point::new(0.0, 0.0),
        }
    }
}

impl ForceParams {
    pub fn centered(width: f64, height: f64) -> Self {
        Self {
            center: Point::new(width / 2.0, height / 2.0),
            ..Self::default()
        }
    }
}

/// Tick-based positioning of a node/edge set
pub trait ForceSimulation {
    /// Replace the node and edge set. Starts the simulation.
    fn load(&mut self, nodes: &[LayoutNode], edges: &[LayoutEdge], params: &ForceParams);

    /// Advance one step and report every node position
    fn tick(&mut self) -> Vec<NodePosition>;

    fn set_alpha_target(&mut self, target: f64);

    /// Resume ticking after `stop` or after cooling down
    fn restart(&mut self);

    /// Hold a node at a fixed point until unpinned
    fn pin(&mut self, id: i64, at: Point);

    fn unpin(&mut self, id: i64);

    fn position(&self, id: i64) -> Option<Point>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

const ALPHA_MIN: f64 = 0.001;
const VELOCITY_DECAY: f64 = 0.4;
const INITIAL_RADIUS: f64 = 10.0;

#[derive(Debug, Clone)]
struct Body {
    id: i64,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    fixed: Option<Point>,
}

/// Velocity-Verlet simulation with link, many-body, centre and collision forces.
///
/// Alpha starts at 1 and decays toward the alpha target; the simulation stops
/// by itself once alpha falls below 0.001 with a zero target. Node seeding is
/// a phyllotaxis spiral around the centre, so runs are reproducible.
#[derive(Debug, Clone)]
pub struct ForceDirected {
    bodies: Vec<Body>,
    index: HashMap<i64, usize>,
    links: Vec<(usize, usize)>,
    params: ForceParams,
    alpha: f64,
    alpha_target: f64,
    alpha_decay: f64,
    running: bool,
}

impl Default for ForceDirected {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceDirected {
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            index: HashMap::new(),
            links: Vec::new(),
            params: ForceParams::default(),
            alpha: 1.0,
            alpha_target: 0.0,
            // Cools from 1 to ALPHA_MIN in about 300 ticks
            alpha_decay: 1.0 - ALPHA_MIN.powf(1.0 / 300.0),
            running: false,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Tick until cooled down or `max_ticks` is reached
    pub fn settle(&mut self, max_ticks: usize) -> Vec<NodePosition> {
        for _ in 0..max_ticks {
            if !self.running {
                break;
            }
            self.step();
        }
        self.positions()
    }

    fn positions(&self) -> Vec<NodePosition> {
        self.bodies
            .iter()
            .map(|b| NodePosition {
                id: b.id,
                x: b.x,
                y: b.y,
            })
            .collect()
    }

    fn seed(&self, i: usize) -> Point {
        let angle = i as f64 * std::f64::consts::PI * (3.0 - 5f64.sqrt());
        let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
        Point::new(
            self.params.center.x + radius * angle.cos(),
            self.params.center.y + radius * angle.sin(),
        )
    }

    fn apply_links(&mut self) {
        let mut degree = vec![0usize; self.bodies.len()];
        for &(s, t) in &self.links {
            degree[s] += 1;
            degree[t] += 1;
        }
        for &(s, t) in &self.links {
            let (source, target) = (&self.bodies[s], &self.bodies[t]);
            let mut dx = target.x + target.vx - source.x - source.vx;
            let mut dy = target.y + target.vy - source.y - source.vy;
            if dx == 0.0 && dy == 0.0 {
                dx = 1e-6;
                dy = 1e-6;
            }
            let length = (dx * dx + dy * dy).sqrt();
            let strength = 1.0 / degree[s].min(degree[t]) as f64;
            let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;
            let k = (length - self.params.link_distance) / length * self.alpha * strength;
            let (fx, fy) = (dx * k, dy * k);

            self.bodies[t].vx -= fx * bias;
            self.bodies[t].vy -= fy * bias;
            self.bodies[s].vx += fx * (1.0 - bias);
            self.bodies[s].vy += fy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self) {
        let n = self.bodies.len();
        for i in 0..n {
            let (mut ax, mut ay) = (0.0, 0.0);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = self.bodies[j].x - self.bodies[i].x;
                let dy = self.bodies[j].y - self.bodies[i].y;
                let distance_sq = (dx * dx + dy * dy).max(1.0);
                let w = self.params.charge * self.alpha / distance_sq;
                ax += dx * w;
                ay += dy * w;
            }
            self.bodies[i].vx += ax;
            self.bodies[i].vy += ay;
        }
    }

    fn apply_collision(&mut self) {
        let min_distance = self.params.collision_radius * 2.0;
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let mut dx = (self.bodies[j].x + self.bodies[j].vx)
                    - (self.bodies[i].x + self.bodies[i].vx);
                let mut dy = (self.bodies[j].y + self.bodies[j].vy)
                    - (self.bodies[i].y + self.bodies[i].vy);
                if dx == 0.0 && dy == 0.0 {
                    dx = 1e-6 * (j - i) as f64;
                    dy = 1e-6;
                }
                let distance = (dx * dx + dy * dy).sqrt();
                if distance >= min_distance {
                    continue;
                }
                let push = (min_distance - distance) / distance * 0.5;
                self.bodies[i].vx -= dx * push;
                self.bodies[i].vy -= dy * push;
                self.bodies[j].vx += dx * push;
                self.bodies[j].vy += dy * push;
            }
        }
    }

    fn apply_center(&mut self) {
        if self.bodies.is_empty() {
            return;
        }
        let n = self.bodies.len() as f64;
        let mean_x = self.bodies.iter().map(|b| b.x).sum::<f64>() / n;
        let mean_y = self.bodies.iter().map(|b| b.y).sum::<f64>() / n;
        let (shift_x, shift_y) = (mean_x - self.params.center.x, mean_y - self.params.center.y);
        for body in &mut self.bodies {
            body.x -= shift_x;
            body.y -= shift_y;
        }
    }

    fn step(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_center();
        self.apply_collision();

        for body in &mut self.bodies {
            match body.fixed {
                Some(point) => {
                    body.x = point.x;
                    body.y = point.y;
                    body.vx = 0.0;
                    body.vy = 0.0;
                },
                None => {
                    body.vx *= 1.0 - VELOCITY_DECAY;
                    body.vy *= 1.0 - VELOCITY_DECAY;
                    body.x += body.vx;
                    body.y += body.vy;
                },
            }
        }

        if self.alpha < ALPHA_MIN && self.alpha_target < ALPHA_MIN {
            self.running = false;
        }
    }
}

impl ForceSimulation for ForceDirected {
    fn load(&mut self, nodes: &[LayoutNode], edges: &[LayoutEdge], params: &ForceParams) {
        self.params = params.clone();

        // Nodes that survive a reload keep their position
        let previous: HashMap<i64, Body> = self.bodies.drain(..).map(|b| (b.id, b)).collect();
        self.index.clear();
        for (i, node) in nodes.iter().enumerate() {
            let body = match previous.get(&node.id) {
                Some(old) => Body {
                    fixed: None,
                    ..old.clone()
                },
                None => {
                    let seed = self.seed(i);
                    Body {
                        id: node.id,
                        x: seed.x,
                        y: seed.y,
                        vx: 0.0,
                        vy: 0.0,
                        fixed: None,
                    }
                },
            };
            self.index.insert(node.id, self.bodies.len());
            self.bodies.push(body);
        }

        self.links = edges
            .iter()
            .filter_map(|edge| {
                let source = *self.index.get(&edge.source)?;
                let target = *self.index.get(&edge.target)?;
                Some((source, target))
            })
            .collect();

        self.alpha = 1.0;
        self.alpha_target = 0.0;
        self.running = true;
    }

    fn tick(&mut self) -> Vec<NodePosition> {
        if self.running {
            self.step();
        }
        self.positions()
    }

    fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    fn restart(&mut self) {
        self.running = true;
    }

    fn pin(&mut self, id: i64, at: Point) {
        if let Some(&i) = self.index.get(&id) {
            self.bodies[i].fixed = Some(at);
        }
    }

    fn unpin(&mut self, id: i64) {
        if let Some(&i) = self.index.get(&id) {
            self.bodies[i].fixed = None;
        }
    }

    fn position(&self, id: i64) -> Option<Point> {
        self.index
            .get(&id)
            .map(|&i| Point::new(self.bodies[i].x, self.bodies[i].y))
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
