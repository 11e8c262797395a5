//! Core data types for the organization chart.
//!
//! This module defines the department nodes, their members, groups and the
//! chart-wide header and spacing settings. All types serialize to the JSON
//! document shape shared by the editor, the viewer and exported files.

use crate::constants;
use crate::geometry::Point;
use serde::{Deserialize, Deserializer, Serialize};

/// Unique identifier for department nodes (`node-<n>`).
pub type NodeId = String;

/// Unique identifier for node groups (`group-<n>`).
pub type GroupId = String;

/// Kind of member listed inside a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    /// Teaching or research staff
    Faculty,
    /// Administrative staff
    #[default]
    Staff,
}

/// A person listed in a department box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Member {
    /// Faculty or staff
    #[serde(rename = "type", default)]
    pub member_type: MemberType,
    /// Job title shown before the name
    #[serde(default)]
    pub position: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form remark
    #[serde(default)]
    pub note: String,
}

impl Member {
    /// Creates a member with an empty note.
    pub fn new(member_type: MemberType, position: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            member_type,
            position: position.into(),
            name: name.into(),
            note: String::new(),
        }
    }
}

/// How the member list is arranged inside a node. Does not affect tree layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Members stacked top to bottom
    #[default]
    Vertical,
    /// Members placed side by side
    Horizontal,
}

/// One of the four attachment sides of a node rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Middle of the top edge
    Top,
    /// Middle of the bottom edge
    Bottom,
    /// Middle of the left edge
    Left,
    /// Middle of the right edge
    Right,
}

impl Direction {
    /// All directions in display order.
    pub const ALL: [Direction; 4] = [Direction::Top, Direction::Bottom, Direction::Left, Direction::Right];

    /// Parses a direction name; anything unknown falls back to `Top`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "bottom" => Direction::Bottom,
            "left" => Direction::Left,
            "right" => Direction::Right,
            _ => Direction::Top,
        }
    }

    /// Lowercase name as stored in documents.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// True for `Top` and `Bottom`.
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Top | Direction::Bottom)
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Direction::from_name(&name))
    }
}

/// A department box in the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "NodeRecord")]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Department name shown in the header
    pub dept_name: String,
    /// Members in display order
    pub members: Vec<Member>,
    /// Parent department, if any
    pub parent_id: Option<NodeId>,
    /// Excluded from connectors and automatic layout
    pub is_independent: bool,
    /// Member list arrangement
    pub layout_direction: LayoutDirection,
    /// Position frozen against automatic layout
    pub locked: bool,
    /// Anchor on the parent used by the incoming connector
    pub connection_start: Direction,
    /// Anchor on this node used by the incoming connector
    pub connection_end: Direction,
    /// Left edge in canvas coordinates
    pub x: f32,
    /// Top edge in canvas coordinates
    pub y: f32,
}

impl Node {
    /// Creates a node from editable fields at the given position.
    pub fn new(id: NodeId, fields: NodeFields, parent_id: Option<NodeId>, x: f32, y: f32) -> Self {
        let mut node = Self {
            id,
            dept_name: String::new(),
            members: Vec::new(),
            parent_id,
            is_independent: false,
            layout_direction: LayoutDirection::Vertical,
            locked: false,
            connection_start: Direction::Bottom,
            connection_end: Direction::Top,
            x,
            y,
        };
        node.apply_fields(fields);
        node
    }

    /// Replaces the form-editable fields, leaving identity, tree linkage,
    /// position and lock state untouched.
    pub fn apply_fields(&mut self, fields: NodeFields) {
        self.dept_name = if fields.dept_name.trim().is_empty() {
            constants::DEFAULT_DEPT_NAME.to_string()
        } else {
            fields.dept_name.trim().to_string()
        };
        self.members = fields.members;
        self.layout_direction = fields.layout_direction;
        self.is_independent = fields.is_independent;
        self.connection_start = fields.connection_start;
        self.connection_end = fields.connection_end;
    }

    /// The form-editable fields of this node.
    pub fn fields(&self) -> NodeFields {
        NodeFields {
            dept_name: self.dept_name.clone(),
            members: self.members.clone(),
            layout_direction: self.layout_direction,
            is_independent: self.is_independent,
            connection_start: self.connection_start,
            connection_end: self.connection_end,
        }
    }

    /// Top-left corner as a point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// The subset of node fields edited through the node form.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFields {
    /// Department name; blank names become the default name
    pub dept_name: String,
    /// Members in display order
    pub members: Vec<Member>,
    /// Member list arrangement
    pub layout_direction: LayoutDirection,
    /// Excluded from connectors and layout
    pub is_independent: bool,
    /// Parent-side anchor
    pub connection_start: Direction,
    /// Child-side anchor
    pub connection_end: Direction,
}

impl Default for NodeFields {
    fn default() -> Self {
        Self {
            dept_name: constants::DEFAULT_DEPT_NAME.to_string(),
            members: Vec::new(),
            layout_direction: LayoutDirection::Vertical,
            is_independent: false,
            connection_start: Direction::Bottom,
            connection_end: Direction::Top,
        }
    }
}

impl NodeFields {
    /// Fields for a department with the given name and no members.
    pub fn named(dept_name: impl Into<String>) -> Self {
        Self {
            dept_name: dept_name.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper appending a member.
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }
}

/// Stored node shape, tolerant of older documents.
///
/// Documents written before member lists existed carry a single
/// `position`/`personName` pair instead of `members`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    id: NodeId,
    #[serde(default)]
    dept_name: String,
    #[serde(default)]
    members: Option<Vec<Member>>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    person_name: Option<String>,
    #[serde(default)]
    parent_id: Option<NodeId>,
    #[serde(default)]
    is_independent: bool,
    #[serde(default)]
    layout_direction: LayoutDirection,
    #[serde(default)]
    locked: bool,
    #[serde(default = "default_connection_start")]
    connection_start: Direction,
    #[serde(default = "default_connection_end")]
    connection_end: Direction,
    #[serde(default)]
    x: Option<f32>,
    #[serde(default)]
    y: Option<f32>,
}

fn default_connection_start() -> Direction {
    Direction::Bottom
}

fn default_connection_end() -> Direction {
    Direction::Top
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let mut members = record.members.unwrap_or_default();
        let position = record.position.unwrap_or_default();
        let person_name = record.person_name.unwrap_or_default();
        if members.is_empty() && (!position.is_empty() || !person_name.is_empty()) {
            members.push(Member::new(MemberType::default(), position, person_name));
        }
        let dept_name = if record.dept_name.is_empty() {
            constants::DEFAULT_DEPT_NAME.to_string()
        } else {
            record.dept_name
        };
        // An empty-string parent reference is treated like no parent at all.
        let parent_id = record.parent_id.filter(|p| !p.is_empty());
        Self {
            id: record.id,
            dept_name,
            members,
            parent_id,
            is_independent: record.is_independent,
            layout_direction: record.layout_direction,
            locked: record.locked,
            connection_start: record.connection_start,
            connection_end: record.connection_end,
            x: record.x.unwrap_or(constants::DEFAULT_NODE_POSITION.0),
            y: record.y.unwrap_or(constants::DEFAULT_NODE_POSITION.1),
        }
    }
}

/// Offset of one group member from the group's base node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativePosition {
    /// Member node
    pub node_id: NodeId,
    /// Horizontal offset from the base node
    pub offset_x: f32,
    /// Vertical offset from the base node
    pub offset_y: f32,
}

/// A set of nodes that keep their relative offsets during automatic layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Unique identifier
    pub id: GroupId,
    /// Members in selection order
    pub node_ids: Vec<NodeId>,
    /// Offsets captured at creation time
    #[serde(default)]
    pub relative_positions: Vec<RelativePosition>,
    /// Member whose movement drags the others along
    pub base_node_id: NodeId,
}

impl Group {
    /// Stored offset of `node_id` from the base node.
    pub fn offset_of(&self, node_id: &str) -> Option<(f32, f32)> {
        self.relative_positions
            .iter()
            .find(|r| r.node_id == node_id)
            .map(|r| (r.offset_x, r.offset_y))
    }

    /// True if the node belongs to this group.
    pub fn contains(&self, node_id: &str) -> bool {
        self.node_ids.iter().any(|id| id == node_id)
    }
}

/// Position of the date label; `x == None` means right-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatePosition {
    /// Left edge, or `None` to align to the right side of the canvas
    pub x: Option<f32>,
    /// Top edge
    pub y: f32,
}

impl Default for DatePosition {
    fn default() -> Self {
        Self { x: None, y: 20.0 }
    }
}

/// Title and date shown above the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartHeader {
    /// Chart title
    pub title: String,
    /// Free-form date label
    pub date: String,
    /// Top-left corner of the title
    pub title_pos: Point,
    /// Placement of the date label
    pub date_pos: DatePosition,
}

impl Default for ChartHeader {
    fn default() -> Self {
        Self {
            title: constants::DEFAULT_CHART_TITLE.to_string(),
            date: String::new(),
            title_pos: Point::new(100.0, 20.0),
            date_pos: DatePosition::default(),
        }
    }
}

/// Spacing parameters persisted with the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSettings {
    /// Gap between sibling subtrees
    pub horizontal_spacing: f32,
    /// Distance between tree levels
    pub vertical_spacing: f32,
    /// Vertical padding of member rows
    pub member_gap: f32,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            horizontal_spacing: constants::DEFAULT_HORIZONTAL_SPACING,
            vertical_spacing: constants::DEFAULT_VERTICAL_SPACING,
            member_gap: constants::DEFAULT_MEMBER_GAP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direction_unknown_falls_back_to_top() {
        let dir: Direction = serde_json::from_value(json!("diagonal")).unwrap();
        assert_eq!(dir, Direction::Top);
        let dir: Direction = serde_json::from_value(json!("right")).unwrap();
        assert_eq!(dir, Direction::Right);
    }

    #[test]
    fn test_node_defaults_when_fields_missing() {
        let node: Node = serde_json::from_value(json!({
            "id": "node-1",
            "deptName": "Finance",
            "x": 10.0,
            "y": 20.0
        }))
        .unwrap();

        assert_eq!(node.layout_direction, LayoutDirection::Vertical);
        assert_eq!(node.connection_start, Direction::Bottom);
        assert_eq!(node.connection_end, Direction::Top);
        assert!(!node.locked);
        assert!(!node.is_independent);
        assert!(node.parent_id.is_none());
        assert!(node.members.is_empty());
    }

    #[test]
    fn test_legacy_position_and_person_name_upgrade() {
        let node: Node = serde_json::from_value(json!({
            "id": "node-2",
            "deptName": "Library",
            "position": "Director",
            "personName": "Kim",
            "parentId": "node-1",
            "x": 0.0,
            "y": 0.0
        }))
        .unwrap();

        assert_eq!(node.members.len(), 1);
        assert_eq!(node.members[0].position, "Director");
        assert_eq!(node.members[0].name, "Kim");
        assert_eq!(node.parent_id.as_deref(), Some("node-1"));
    }

    #[test]
    fn test_legacy_fields_ignored_when_members_present() {
        let node: Node = serde_json::from_value(json!({
            "id": "node-3",
            "deptName": "Office",
            "position": "Old",
            "personName": "Old Name",
            "members": [{"type": "faculty", "position": "Dean", "name": "Lee", "note": ""}]
        }))
        .unwrap();

        assert_eq!(node.members.len(), 1);
        assert_eq!(node.members[0].member_type, MemberType::Faculty);
        assert_eq!(node.members[0].name, "Lee");
        assert_eq!((node.x, node.y), constants::DEFAULT_NODE_POSITION);
    }

    #[test]
    fn test_node_serializes_camel_case() {
        let node = Node::new("node-1".into(), NodeFields::named("HR"), None, 1.0, 2.0);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["deptName"], "HR");
        assert_eq!(value["connectionStart"], "bottom");
        assert_eq!(value["connectionEnd"], "top");
        assert_eq!(value["layoutDirection"], "vertical");
        assert!(value["parentId"].is_null());
    }

    #[test]
    fn test_apply_fields_keeps_position_and_lock() {
        let mut node = Node::new("node-1".into(), NodeFields::named("HR"), None, 5.0, 6.0);
        node.locked = true;
        node.apply_fields(NodeFields::named("   "));
        assert_eq!(node.dept_name, constants::DEFAULT_DEPT_NAME);
        assert!(node.locked);
        assert_eq!((node.x, node.y), (5.0, 6.0));
    }
}
