use super::{
    build_graph, canvas_size, forces, link_distance, truncate_label, GraphEdge, GraphNode, Point,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const JIGGLE_SEED: u64 = 0x5EED_F00D;
/// Golden angle, used to spread initial positions.
const INITIAL_ANGLE: f64 = std::f64::consts::PI * 0.763_932_022_500_210_3;
const INITIAL_RADIUS: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub alpha_decay: f64,
    pub alpha_min: f64,
    pub velocity_decay: f64,
    pub link_strength: f64,
    pub charge_strength: f64,
    pub charge_distance_max: f64,
    pub collide_strength: f64,
    pub padding: f64,
    pub drag_alpha_target: f64,
    pub release_alpha_target: f64,
    /// Ticks after release before the target drops to zero.
    pub release_delay_ticks: u32,
    /// Minimum alpha after a resize or an explicit reheat.
    pub nudge_alpha: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            alpha_decay: 0.06,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            link_strength: 1.0,
            charge_strength: -300.0,
            charge_distance_max: 150.0,
            collide_strength: 0.7,
            padding: 30.0,
            drag_alpha_target: 0.3,
            release_alpha_target: 0.1,
            release_delay_ticks: 18,
            nudge_alpha: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// What the caller should do with the originating input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerResponse {
    pub handled: bool,
    /// Stop the platform default (scrolling) for touch drags.
    pub suppress_default: bool,
}

impl PointerResponse {
    fn handled(kind: PointerKind) -> Self {
        Self {
            handled: true,
            suppress_default: kind == PointerKind::Touch,
        }
    }
}

/// Alpha-driven force simulation over one path graph.
///
/// Ticking is driven from outside (the TUI's frame timer). Once alpha falls
/// below `alpha_min` the simulation stops and [`Simulation::tick`] does
/// nothing until something restarts it.
pub struct Simulation {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    params: SimulationParams,
    width: f64,
    height: f64,
    link_distance: f64,
    alpha: f64,
    alpha_target: f64,
    running: bool,
    dragging: Option<usize>,
    hovered: Option<usize>,
    release_countdown: Option<u32>,
    rng: StdRng,
}

impl Simulation {
    pub fn new(path: &[String], container_width: f64) -> Self {
        Self::with_params(path, container_width, SimulationParams::default())
    }

    pub fn with_params(path: &[String], container_width: f64, params: SimulationParams) -> Self {
        let (nodes, edges) = build_graph(path);
        let (width, height) = canvas_size(container_width, nodes.len(), params.padding);
        let link_distance = link_distance(&nodes);
        let mut sim = Self {
            nodes,
            edges,
            params,
            width,
            height,
            link_distance,
            alpha: 1.0,
            alpha_target: 0.0,
            running: true,
            dragging: None,
            hovered: None,
            release_countdown: None,
            rng: StdRng::seed_from_u64(JIGGLE_SEED),
        };
        sim.place_initial();
        sim.clamp_positions();
        sim.refresh_labels();
        sim
    }

    /// Replace the whole model with a new path.
    pub fn rebuild(&mut self, path: &[String], container_width: f64) {
        *self = Self::with_params(path, container_width, self.params.clone());
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn padding(&self) -> f64 {
        self.params.padding
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[cfg(test)]
    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// Advance one step. Returns false (and changes nothing) once cooled.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }

        if let Some(left) = self.release_countdown {
            if left <= 1 {
                self.alpha_target = 0.0;
                self.release_countdown = None;
            } else {
                self.release_countdown = Some(left - 1);
            }
        }

        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
        let alpha = self.alpha;
        let c = self.center();
        let p = &self.params;

        forces::link(
            &mut self.nodes,
            &self.edges,
            self.link_distance,
            p.link_strength,
            alpha,
            &mut self.rng,
        );
        forces::charge(
            &mut self.nodes,
            p.charge_strength,
            p.charge_distance_max,
            alpha,
            &mut self.rng,
        );
        forces::center(&mut self.nodes, c.x, c.y);
        forces::collide(&mut self.nodes, p.collide_strength, &mut self.rng);

        let keep = 1.0 - p.velocity_decay;
        for node in &mut self.nodes {
            match node.pinned {
                Some(at) => {
                    node.x = at.x;
                    node.y = at.y;
                    node.vx = 0.0;
                    node.vy = 0.0;
                }
                None => {
                    node.vx *= keep;
                    node.vy *= keep;
                    node.x += node.vx;
                    node.y += node.vy;
                }
            }
        }

        self.clamp_positions();
        self.refresh_labels();

        if self.alpha < self.params.alpha_min {
            self.running = false;
        }
        true
    }

    /// Bring a cooled or cooling layout back to life.
    pub fn nudge(&mut self) {
        self.alpha = self.alpha.max(self.params.nudge_alpha);
        self.running = true;
    }

    /// Recompute canvas-dependent values for a new container width. Nodes
    /// and edges are kept.
    pub fn resize(&mut self, container_width: f64) {
        let (width, height) = canvas_size(container_width, self.nodes.len(), self.params.padding);
        self.width = width;
        self.height = height;
        self.link_distance = link_distance(&self.nodes);
        self.clamp_positions();
        self.refresh_labels();
        self.nudge();
    }

    /// Nearest node whose label disc contains `point`.
    pub fn node_at(&self, point: Point) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i, n.position().distance(point), n.label_radius()))
            .filter(|(_, d, r)| d <= r)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _, _)| i)
    }

    pub fn pointer_down(&mut self, node: usize, kind: PointerKind) -> PointerResponse {
        let Some(n) = self.nodes.get_mut(node) else {
            return PointerResponse::default();
        };
        n.pinned = Some(Point::new(n.x, n.y));
        self.dragging = Some(node);
        self.release_countdown = None;
        self.alpha_target = self.params.drag_alpha_target;
        self.running = true;
        PointerResponse::handled(kind)
    }

    pub fn pointer_move(&mut self, point: Point, kind: PointerKind) -> PointerResponse {
        let Some(i) = self.dragging else {
            return PointerResponse::default();
        };
        let clamped = self.clamp_point(point);
        if let Some(n) = self.nodes.get_mut(i) {
            n.pinned = Some(clamped);
        }
        PointerResponse::handled(kind)
    }

    pub fn pointer_up(&mut self, kind: PointerKind) -> PointerResponse {
        let Some(i) = self.dragging.take() else {
            return PointerResponse::default();
        };
        if let Some(n) = self.nodes.get_mut(i) {
            n.pinned = None;
        }
        self.alpha_target = self.params.release_alpha_target;
        self.release_countdown = Some(self.params.release_delay_ticks);
        self.running = true;
        PointerResponse::handled(kind)
    }

    /// Free a pinned node.
    pub fn double_activate(&mut self, node: usize) -> bool {
        let Some(n) = self.nodes.get_mut(node) else {
            return false;
        };
        let was_pinned = n.pinned.take().is_some();
        if self.dragging == Some(node) {
            self.dragging = None;
        }
        if was_pinned {
            self.nudge();
        }
        was_pinned
    }

    /// Highlight a node (or none). Touch input never hovers.
    pub fn hover(&mut self, node: Option<usize>, kind: PointerKind) -> bool {
        if kind == PointerKind::Touch {
            return false;
        }
        let node = node.filter(|i| *i < self.nodes.len());
        let changed = self.hovered != node;
        self.hovered = node;
        changed
    }

    fn place_initial(&mut self) {
        let c = self.center();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
            let angle = i as f64 * INITIAL_ANGLE;
            node.x = c.x + radius * angle.cos();
            node.y = c.y + radius * angle.sin();
        }
    }

    fn clamp_point(&self, p: Point) -> Point {
        let pad = self.params.padding;
        Point::new(
            p.x.clamp(pad, (self.width - pad).max(pad)),
            p.y.clamp(pad, (self.height - pad).max(pad)),
        )
    }

    fn clamp_positions(&mut self) {
        let pad = self.params.padding;
        let (max_x, max_y) = ((self.width - pad).max(pad), (self.height - pad).max(pad));
        for node in &mut self.nodes {
            node.x = node.x.clamp(pad, max_x);
            node.y = node.y.clamp(pad, max_y);
            if let Some(at) = node.pinned.as_mut() {
                at.x = at.x.clamp(pad, max_x);
                at.y = at.y.clamp(pad, max_y);
            }
        }
    }

    /// Spacing is the distance to the nearest path neighbour, capped at the
    /// link distance.
    fn refresh_labels(&mut self) {
        let positions: Vec<Point> = self.nodes.iter().map(GraphNode::position).collect();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            let prev = i.checked_sub(1).map(|j| positions[i].distance(positions[j]));
            let next = positions.get(i + 1).map(|p| positions[i].distance(*p));
            let spacing = match (prev, next) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => self.link_distance,
            }
            .min(self.link_distance);
            node.display_label = truncate_label(&node.title, spacing);
        }
    }
}
