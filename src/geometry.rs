//! Plane geometry shared by layout, collision and routing.
//!
//! Node sizes are supplied by whichever surface draws the chart. The engine
//! only asks a [`NodeMetrics`] implementation for them and falls back to a
//! text-length estimate for nodes nobody has measured yet.

use crate::constants;
use crate::types::{Direction, LayoutDirection, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Point halfway between `self` and `other`.
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Width and height of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle at `origin` with the given size.
    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// The rectangle grown by `margin` on every side.
    pub fn padded(&self, margin: f32) -> Rect {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.width + 2.0 * margin,
            self.height + 2.0 * margin,
        )
    }

    /// Overlap test where touching edges count as overlapping.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() < other.left()
            || self.left() > other.right()
            || self.bottom() < other.top()
            || self.top() > other.bottom())
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }
}

/// Attachment point on one side of a node rectangle.
///
/// # Arguments
///
/// * `origin` - Top-left corner of the node
/// * `size` - Rendered size of the node
/// * `direction` - Side to attach to
///
/// # Returns
///
/// The middle of the requested edge
pub fn anchor_point(origin: Point, size: Size, direction: Direction) -> Point {
    match direction {
        Direction::Top => Point::new(origin.x + size.width / 2.0, origin.y),
        Direction::Bottom => Point::new(origin.x + size.width / 2.0, origin.y + size.height),
        Direction::Left => Point::new(origin.x, origin.y + size.height / 2.0),
        Direction::Right => Point::new(origin.x + size.width, origin.y + size.height / 2.0),
    }
}

/// Source of rendered node sizes.
pub trait NodeMetrics {
    /// Rendered size of `node`.
    fn size_of(&self, node: &Node) -> Size;

    /// Screen rectangle occupied by `node`.
    fn rect_of(&self, node: &Node) -> Rect {
        Rect::from_origin(node.position(), self.size_of(node))
    }
}

/// Sizes reported by a rendering surface, with an estimate for unmeasured nodes.
#[derive(Debug, Clone, Default)]
pub struct MeasuredSizes {
    sizes: HashMap<NodeId, Size>,
    member_gap: f32,
}

impl MeasuredSizes {
    pub fn new(member_gap: f32) -> Self {
        Self {
            sizes: HashMap::new(),
            member_gap,
        }
    }

    /// Records a measured size. Returns true when it differs from the stored one.
    pub fn set(&mut self, id: &str, size: Size) -> bool {
        match self.sizes.get(id) {
            Some(existing) if *existing == size => false,
            _ => {
                self.sizes.insert(id.to_string(), size);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Size> {
        self.sizes.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) {
        self.sizes.remove(id);
    }

    /// Drops every recorded size, e.g. after a document load.
    pub fn clear(&mut self) {
        self.sizes.clear();
    }

    pub fn set_member_gap(&mut self, member_gap: f32) {
        self.member_gap = member_gap;
    }
}

impl NodeMetrics for MeasuredSizes {
    fn size_of(&self, node: &Node) -> Size {
        self.get(&node.id)
            .unwrap_or_else(|| estimate_node_size(node, self.member_gap))
    }
}

/// Every node has the same size. Handy for headless layout runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct UniformSize(pub Size);

impl NodeMetrics for UniformSize {
    fn size_of(&self, _node: &Node) -> Size {
        self.0
    }
}

impl NodeMetrics for HashMap<NodeId, Size> {
    fn size_of(&self, node: &Node) -> Size {
        self.get(&node.id)
            .copied()
            .unwrap_or_else(|| estimate_node_size(node, constants::DEFAULT_MEMBER_GAP))
    }
}

/// Text shown on one member row.
pub fn member_label(position: &str, name: &str) -> String {
    match (position.is_empty(), name.is_empty()) {
        (false, false) => format!("{position} {name}"),
        (false, true) => position.to_string(),
        _ => name.to_string(),
    }
}

/// Estimates a node's rendered size from its text when no measurement exists.
///
/// # Arguments
///
/// * `node` - Node to estimate
/// * `member_gap` - Vertical padding of each member row
pub fn estimate_node_size(node: &Node, member_gap: f32) -> Size {
    let text_width = |s: &str| s.chars().count() as f32 * constants::ESTIMATED_CHAR_WIDTH;
    let header = text_width(&node.dept_name) + 2.0 * constants::NODE_PADDING_X;
    let row_height = constants::MEMBER_ROW_HEIGHT + member_gap;

    let member_widths = node
        .members
        .iter()
        .map(|m| text_width(&member_label(&m.position, &m.name)) + 2.0 * constants::NODE_PADDING_X);

    let (body_width, body_height) = match node.layout_direction {
        LayoutDirection::Vertical => (
            member_widths.fold(0.0_f32, f32::max),
            node.members.len() as f32 * row_height,
        ),
        LayoutDirection::Horizontal => (
            member_widths.sum::<f32>(),
            if node.members.is_empty() { 0.0 } else { row_height },
        ),
    };

    Size::new(
        header.max(body_width).max(constants::NODE_MIN_WIDTH),
        constants::NODE_HEADER_HEIGHT + body_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Member, MemberType, NodeFields};

    #[test]
    fn test_anchor_points() {
        let origin = Point::new(10.0, 20.0);
        let size = Size::new(100.0, 40.0);
        assert_eq!(anchor_point(origin, size, Direction::Right), Point::new(110.0, 40.0));
        assert_eq!(anchor_point(origin, size, Direction::Bottom), Point::new(60.0, 60.0));
        assert_eq!(anchor_point(origin, size, Direction::Top), Point::new(60.0, 20.0));
        assert_eq!(anchor_point(origin, size, Direction::Left), Point::new(10.0, 40.0));
    }

    #[test]
    fn test_unknown_direction_anchors_on_top() {
        let origin = Point::new(0.0, 0.0);
        let size = Size::new(50.0, 30.0);
        let dir = Direction::from_name("nowhere");
        assert_eq!(anchor_point(origin, size, dir), Point::new(25.0, 0.0));
    }

    #[test]
    fn test_rect_touching_edges_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(10.5, 0.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_estimate_grows_with_members() {
        let empty = Node::new("node-1".into(), NodeFields::named("A"), None, 0.0, 0.0);
        let fields = NodeFields::named("A")
            .with_member(Member::new(MemberType::Staff, "Manager", "Park"))
            .with_member(Member::new(MemberType::Faculty, "Professor", "Choi"));
        let full = Node::new("node-2".into(), fields, None, 0.0, 0.0);

        let small = estimate_node_size(&empty, 8.0);
        let big = estimate_node_size(&full, 8.0);
        assert_eq!(small.width, constants::NODE_MIN_WIDTH);
        assert_eq!(small.height, constants::NODE_HEADER_HEIGHT);
        assert_eq!(big.height, constants::NODE_HEADER_HEIGHT + 2.0 * (constants::MEMBER_ROW_HEIGHT + 8.0));
    }

    #[test]
    fn test_measured_sizes_prefer_measurement() {
        let node = Node::new("node-1".into(), NodeFields::named("A"), None, 0.0, 0.0);
        let mut sizes = MeasuredSizes::new(8.0);
        assert!(sizes.set("node-1", Size::new(200.0, 80.0)));
        assert!(!sizes.set("node-1", Size::new(200.0, 80.0)));
        assert_eq!(sizes.size_of(&node), Size::new(200.0, 80.0));
    }
}
