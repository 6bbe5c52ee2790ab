//! Forces applied once per tick. Each one reads positions and adjusts
//! velocities (or, for centering, positions) of the given nodes.

use super::{GraphEdge, GraphNode};
use rand::Rng;

/// Tiny random offset used when two points coincide.
fn jiggle(rng: &mut impl Rng) -> f64 {
    (rng.gen::<f64>() - 0.5) * 1e-6
}

/// Springs along edges, pulling linked nodes toward `distance` apart.
/// The correction is split by degree so path endpoints move more.
pub(super) fn link(
    nodes: &mut [GraphNode],
    edges: &[GraphEdge],
    distance: f64,
    strength: f64,
    alpha: f64,
    rng: &mut impl Rng,
) {
    let n = nodes.len();
    let mut degree = vec![0usize; n];
    for e in edges.iter().filter(|e| e.source < n && e.target < n) {
        degree[e.source] += 1;
        degree[e.target] += 1;
    }

    for e in edges {
        let (s, t) = (e.source, e.target);
        if s == t || s >= n || t >= n {
            continue;
        }
        let mut dx = nodes[t].x + nodes[t].vx - nodes[s].x - nodes[s].vx;
        let mut dy = nodes[t].y + nodes[t].vy - nodes[s].y - nodes[s].vy;
        if dx == 0.0 {
            dx = jiggle(rng);
        }
        if dy == 0.0 {
            dy = jiggle(rng);
        }
        let len = dx.hypot(dy);
        let k = (len - distance) / len * alpha * strength;
        dx *= k;
        dy *= k;

        let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;
        nodes[t].vx -= dx * bias;
        nodes[t].vy -= dy * bias;
        nodes[s].vx += dx * (1.0 - bias);
        nodes[s].vy += dy * (1.0 - bias);
    }
}

/// Pairwise repulsion (negative `strength`), ignored beyond `distance_max`.
pub(super) fn charge(
    nodes: &mut [GraphNode],
    strength: f64,
    distance_max: f64,
    alpha: f64,
    rng: &mut impl Rng,
) {
    const DISTANCE_MIN_SQ: f64 = 1.0;
    let max_sq = distance_max * distance_max;
    let positions: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();

    for (i, node) in nodes.iter_mut().enumerate() {
        for (j, &(ox, oy)) in positions.iter().enumerate() {
            if i == j {
                continue;
            }
            let mut dx = ox - positions[i].0;
            let mut dy = oy - positions[i].1;
            let mut l = dx * dx + dy * dy;
            if l >= max_sq {
                continue;
            }
            if dx == 0.0 {
                dx = jiggle(rng);
                l += dx * dx;
            }
            if dy == 0.0 {
                dy = jiggle(rng);
                l += dy * dy;
            }
            if l < DISTANCE_MIN_SQ {
                l = (DISTANCE_MIN_SQ * l).sqrt();
            }
            let w = strength * alpha / l;
            node.vx += dx * w;
            node.vy += dy * w;
        }
    }
}

/// Shift every node so the layout's mean sits on `(cx, cy)`.
pub(super) fn center(nodes: &mut [GraphNode], cx: f64, cy: f64) {
    if nodes.is_empty() {
        return;
    }
    let count = nodes.len() as f64;
    let (sx, sy) = nodes
        .iter()
        .fold((0.0, 0.0), |(sx, sy), n| (sx + n.x, sy + n.y));
    let (ox, oy) = (sx / count - cx, sy / count - cy);
    for n in nodes.iter_mut() {
        n.x -= ox;
        n.y -= oy;
    }
}

/// Push apart nodes whose label discs overlap. Not scaled by alpha.
pub(super) fn collide(nodes: &mut [GraphNode], strength: f64, rng: &mut impl Rng) {
    let n = nodes.len();
    for i in 0..n {
        let ri = nodes[i].label_radius();
        for j in (i + 1)..n {
            let rj = nodes[j].label_radius();
            let r = ri + rj;
            let mut x = (nodes[i].x + nodes[i].vx) - (nodes[j].x + nodes[j].vx);
            let mut y = (nodes[i].y + nodes[i].vy) - (nodes[j].y + nodes[j].vy);
            let mut l = x * x + y * y;
            if l >= r * r {
                continue;
            }
            if x == 0.0 {
                x = jiggle(rng);
                l += x * x;
            }
            if y == 0.0 {
                y = jiggle(rng);
                l += y * y;
            }
            let d = l.sqrt();
            let k = (r - d) / d * strength;
            x *= k;
            y *= k;
            let share = (rj * rj) / (ri * ri + rj * rj);
            nodes[i].vx += x * share;
            nodes[i].vy += y * share;
            nodes[j].vx -= x * (1.0 - share);
            nodes[j].vy -= y * (1.0 - share);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::build_graph;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pair(ax: f64, bx: f64) -> Vec<GraphNode> {
        let (mut nodes, _) = build_graph(&["A".to_string(), "B".to_string()]);
        nodes[0].x = ax;
        nodes[1].x = bx;
        nodes
    }

    #[test]
    fn link_pulls_distant_nodes_together() {
        let mut nodes = pair(0.0, 300.0);
        let edges = [GraphEdge {
            source: 0,
            target: 1,
        }];
        let mut rng = StdRng::seed_from_u64(1);
        link(&mut nodes, &edges, 100.0, 1.0, 1.0, &mut rng);
        assert!(nodes[0].vx > 0.0);
        assert!(nodes[1].vx < 0.0);
    }

    #[test]
    fn link_pushes_close_nodes_apart() {
        let mut nodes = pair(0.0, 20.0);
        let edges = [GraphEdge {
            source: 0,
            target: 1,
        }];
        let mut rng = StdRng::seed_from_u64(1);
        link(&mut nodes, &edges, 100.0, 1.0, 1.0, &mut rng);
        assert!(nodes[0].vx < 0.0);
        assert!(nodes[1].vx > 0.0);
    }

    #[test]
    fn charge_repels_within_range_only() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut near = pair(0.0, 50.0);
        charge(&mut near, -300.0, 150.0, 1.0, &mut rng);
        assert!(near[0].vx < 0.0);
        assert!(near[1].vx > 0.0);

        let mut far = pair(0.0, 200.0);
        charge(&mut far, -300.0, 150.0, 1.0, &mut rng);
        assert_eq!(far[0].vx, 0.0);
        assert_eq!(far[1].vx, 0.0);
    }

    #[test]
    fn center_moves_mean_to_target() {
        let mut nodes = pair(0.0, 100.0);
        center(&mut nodes, 500.0, 200.0);
        assert_eq!(nodes[0].x + nodes[1].x, 1000.0);
        assert_eq!(nodes[0].y, 200.0);
    }

    #[test]
    fn collide_separates_coincident_nodes() {
        let mut nodes = pair(10.0, 10.0);
        let mut rng = StdRng::seed_from_u64(7);
        collide(&mut nodes, 0.7, &mut rng);
        assert!(nodes[0].vx != 0.0 || nodes[0].vy != 0.0);
        assert!((nodes[0].vx + nodes[1].vx).abs() < 1e-6);
    }
}
