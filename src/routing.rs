//! Connector routing between parent and child departments.
//!
//! Paths are orthogonal when both anchors face the same axis family
//! (vertical-horizontal-vertical or horizontal-vertical-horizontal) and bend
//! once through the midpoint otherwise. The middle segment of the orthogonal
//! shapes is pushed out of the way of unrelated nodes in a single greedy pass.
//! A third node may still be crossed after that push.

use crate::constants;
use crate::geometry::{anchor_point, NodeMetrics, Point, Rect};
use crate::types::{Direction, Node, NodeId};
use std::collections::HashMap;
use std::fmt::Write;

/// Routing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteConfig {
    /// Clearance kept between a pushed midline and the obstacle
    pub margin: f32,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            margin: constants::ROUTE_MARGIN,
        }
    }
}

/// A routed parent-to-child connector.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub parent_id: NodeId,
    pub child_id: NodeId,
    /// Polyline from the parent anchor to the child anchor
    pub points: Vec<Point>,
}

impl Connector {
    /// SVG path data (`M x y L x y ...`) for the polyline.
    pub fn svg_path(&self) -> String {
        let mut d = String::new();
        for (i, p) in self.points.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            if !d.is_empty() {
                d.push(' ');
            }
            let _ = write!(d, "{} {} {}", cmd, p.x, p.y);
        }
        d
    }
}

/// Routes one connector.
///
/// # Arguments
///
/// * `start` - Anchor point on the parent
/// * `end` - Anchor point on the child
/// * `start_dir` - Side of the parent the anchor sits on
/// * `end_dir` - Side of the child the anchor sits on
/// * `obstacles` - Rectangles of every node except the two endpoints
/// * `margin` - Clearance used when the midline is pushed
///
/// # Returns
///
/// The polyline from `start` to `end`
pub fn route(
    start: Point,
    end: Point,
    start_dir: Direction,
    end_dir: Direction,
    obstacles: &[Rect],
    margin: f32,
) -> Vec<Point> {
    match (start_dir.is_vertical(), end_dir.is_vertical()) {
        (true, true) => {
            let mid_y = clear_horizontal_midline((start.y + end.y) / 2.0, start.x, end.x, obstacles, margin);
            vec![
                start,
                Point::new(start.x, mid_y),
                Point::new(end.x, mid_y),
                end,
            ]
        }
        (false, false) => {
            let mid_x = clear_vertical_midline((start.x + end.x) / 2.0, start.y, end.y, obstacles, margin);
            vec![
                start,
                Point::new(mid_x, start.y),
                Point::new(mid_x, end.y),
                end,
            ]
        }
        _ => vec![start, start.midpoint(end), end],
    }
}

/// Pushes a horizontal midline at `mid_y`, spanning `x1..x2`, off obstacles.
fn clear_horizontal_midline(mut mid_y: f32, x1: f32, x2: f32, obstacles: &[Rect], margin: f32) -> f32 {
    let (lo, hi) = (x1.min(x2), x1.max(x2));
    for obstacle in obstacles {
        let padded = obstacle.padded(margin);
        let spans = hi >= padded.left() && lo <= padded.right();
        if spans && mid_y >= padded.top() && mid_y <= padded.bottom() {
            let above = obstacle.top() - margin;
            let below = obstacle.bottom() + margin;
            mid_y = if (mid_y - above).abs() <= (below - mid_y).abs() { above } else { below };
        }
    }
    mid_y
}

/// Pushes a vertical midline at `mid_x`, spanning `y1..y2`, off obstacles.
fn clear_vertical_midline(mut mid_x: f32, y1: f32, y2: f32, obstacles: &[Rect], margin: f32) -> f32 {
    let (lo, hi) = (y1.min(y2), y1.max(y2));
    for obstacle in obstacles {
        let padded = obstacle.padded(margin);
        let spans = hi >= padded.top() && lo <= padded.bottom();
        if spans && mid_x >= padded.left() && mid_x <= padded.right() {
            let left = obstacle.left() - margin;
            let right = obstacle.right() + margin;
            mid_x = if (mid_x - left).abs() <= (right - mid_x).abs() { left } else { right };
        }
    }
    mid_x
}

/// Routes every parent/child connector in the chart.
///
/// Nodes without a parent, with a dangling parent reference, or where either
/// end is independent get no connector.
pub fn route_all(nodes: &[Node], metrics: &dyn NodeMetrics, config: &RouteConfig) -> Vec<Connector> {
    let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let rects: Vec<(&str, Rect)> = nodes.iter().map(|n| (n.id.as_str(), metrics.rect_of(n))).collect();

    let mut connectors = Vec::new();
    for child in nodes {
        if child.is_independent {
            continue;
        }
        let Some(parent) = child.parent_id.as_deref().and_then(|p| by_id.get(p)) else {
            continue;
        };
        if parent.is_independent {
            continue;
        }

        let start = anchor_point(parent.position(), metrics.size_of(parent), child.connection_start);
        let end = anchor_point(child.position(), metrics.size_of(child), child.connection_end);
        let obstacles: Vec<Rect> = rects
            .iter()
            .filter(|(id, _)| *id != parent.id && *id != child.id)
            .map(|(_, r)| *r)
            .collect();

        connectors.push(Connector {
            parent_id: parent.id.clone(),
            child_id: child.id.clone(),
            points: route(
                start,
                end,
                child.connection_start,
                child.connection_end,
                &obstacles,
                config.margin,
            ),
        });
    }
    connectors
}
