//! Collision detection and resolution for dropped nodes.
//!
//! Resolution is best effort: when no free spot turns up within the search
//! bound the proposed position is kept and the overlap stays.

use crate::constants;
use crate::geometry::{Point, Rect, Size};
use log::{debug, warn};

/// Search parameters for [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionConfig {
    /// Padding added around every rectangle before testing overlap
    pub margin: f32,
    /// Distance added per search ring
    pub step: f32,
    /// Number of rings tried before giving up
    pub max_steps: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            margin: constants::COLLISION_MARGIN,
            step: constants::COLLISION_STEP,
            max_steps: constants::COLLISION_MAX_STEPS,
        }
    }
}

/// Unit offsets tried on every ring: up, down, left, right, then diagonals.
const SEARCH_DIRECTIONS: [(f32, f32); 8] = [
    (0.0, -1.0),
    (0.0, 1.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (-1.0, -1.0),
    (1.0, -1.0),
    (-1.0, 1.0),
    (1.0, 1.0),
];

/// True if the two rectangles overlap once both are padded by `margin`.
pub fn overlaps(a: &Rect, b: &Rect, margin: f32) -> bool {
    a.padded(margin).intersects(&b.padded(margin))
}

/// True if a rectangle at `origin` with `size` hits any of `others`.
pub fn collides(origin: Point, size: Size, others: &[Rect], margin: f32) -> bool {
    let candidate = Rect::from_origin(origin, size);
    others.iter().any(|other| overlaps(&candidate, other, margin))
}

/// Finds a free position for a node near `proposed`.
///
/// # Arguments
///
/// * `proposed` - Where the node was dropped (top-left corner)
/// * `size` - Rendered size of the node
/// * `others` - Rectangles of every other node
/// * `config` - Margin and search bounds
///
/// # Returns
///
/// `proposed` if it is already free, otherwise the first free candidate of
/// the ring search, falling back to `proposed` when the search is exhausted.
pub fn resolve(proposed: Point, size: Size, others: &[Rect], config: &CollisionConfig) -> Point {
    if !collides(proposed, size, others, config.margin) {
        return proposed;
    }

    for ring in 1..=config.max_steps {
        let distance = ring as f32 * config.step;
        for (dx, dy) in SEARCH_DIRECTIONS {
            let candidate = Point::new(proposed.x + dx * distance, proposed.y + dy * distance);
            if candidate.x < 0.0 || candidate.y < 0.0 {
                continue;
            }
            if !collides(candidate, size, others, config.margin) {
                debug!(
                    "Collision resolved at ({:.0}, {:.0}) after {} ring(s)",
                    candidate.x, candidate.y, ring
                );
                return candidate;
            }
        }
    }

    warn!(
        "No free position within {} steps of ({:.0}, {:.0}); keeping overlap",
        config.max_steps, proposed.x, proposed.y
    );
    proposed
}
