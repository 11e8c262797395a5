//! Canonical node table of an organization chart.
//!
//! [`OrgChart`] owns the nodes (in insertion order), the groups, the id
//! counters and the chart-wide header and spacing settings. Children are
//! derived by scanning `parent_id`, never cached.
//!
//! The store only mutates data. Pairing each mutation with a connector redraw
//! and a history snapshot is the job of [`crate::editor::ChartEditor`].

use crate::constants;
use crate::error::ChartError;
use crate::geometry::NodeMetrics;
use crate::history::Snapshot;
use crate::layout::{self, LayoutConfig, LayoutOutcome};
use crate::types::*;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What happens to the children of a deleted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletionPolicy {
    /// Children move up to the deleted node's parent
    #[default]
    Promote,
    /// The whole subtree is deleted
    Cascade,
}

impl DeletionPolicy {
    pub fn label(self) -> &'static str {
        match self {
            DeletionPolicy::Promote => "Promote children",
            DeletionPolicy::Cascade => "Delete subtree",
        }
    }
}

/// The chart: nodes, groups, header and settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgChart {
    nodes: Vec<Node>,
    next_id: u64,
    groups: Vec<Group>,
    next_group_id: u64,
    /// Title and date labels
    pub header: ChartHeader,
    /// Spacing settings
    pub settings: ChartSettings,
}

impl Default for OrgChart {
    fn default() -> Self {
        Self::new()
    }
}

impl OrgChart {
    /// Creates an empty chart.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 1,
            groups: Vec::new(),
            next_group_id: 1,
            header: ChartHeader::default(),
            settings: ChartSettings::default(),
        }
    }

    /// Assembles a chart from loaded parts. Counters are bumped past any
    /// numeric suffix already in use.
    pub fn from_parts(
        nodes: Vec<Node>,
        next_id: u64,
        groups: Vec<Group>,
        next_group_id: u64,
        header: ChartHeader,
        settings: ChartSettings,
    ) -> Self {
        let next_id = nodes
            .iter()
            .filter_map(|n| numeric_suffix(&n.id, "node-"))
            .map(|n| n + 1)
            .fold(next_id.max(1), u64::max);
        let next_group_id = groups
            .iter()
            .filter_map(|g| numeric_suffix(&g.id, "group-"))
            .map(|n| n + 1)
            .fold(next_group_id.max(1), u64::max);
        Self {
            nodes,
            next_id,
            groups,
            next_group_id,
            header,
            settings,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn next_group_id(&self) -> u64 {
        self.next_group_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Node, ChartError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ChartError::NodeNotFound(id.to_string()))
    }

    fn require(&self, id: &str) -> Result<&Node, ChartError> {
        self.get(id).ok_or_else(|| ChartError::NodeNotFound(id.to_string()))
    }

    /// Direct children of `id` in insertion order.
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(id))
            .collect()
    }

    /// Nodes with no parent or a dangling parent reference.
    pub fn roots(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| match n.parent_id.as_deref() {
                None => true,
                Some(p) => self.get(p).is_none(),
            })
            .collect()
    }

    /// The group containing `node_id`, if any.
    pub fn group_of(&self, node_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.contains(node_id))
    }

    fn allocate_id(&mut self) -> NodeId {
        loop {
            let id = format!("node-{}", self.next_id);
            self.next_id += 1;
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Adds a top-level department to the right of the existing roots.
    pub fn create_root(&mut self, fields: NodeFields) -> NodeId {
        let root_count = self.roots().len() as f32;
        let (x0, y0) = constants::DEFAULT_NODE_POSITION;
        let id = self.allocate_id();
        self.nodes.push(Node::new(
            id.clone(),
            fields,
            None,
            x0 + root_count * constants::NEW_ROOT_STEP_X,
            y0,
        ));
        id
    }

    /// Adds a department below `parent_id`, right of its existing children.
    pub fn create_child(&mut self, parent_id: &str, fields: NodeFields) -> Result<NodeId, ChartError> {
        let parent = self.require(parent_id)?;
        let sibling_count = self.children(parent_id).len() as f32;
        let x = parent.x + sibling_count * constants::NEW_CHILD_STEP_X;
        let y = parent.y + constants::NEW_CHILD_OFFSET_Y;
        let id = self.allocate_id();
        self.nodes
            .push(Node::new(id.clone(), fields, Some(parent_id.to_string()), x, y));
        Ok(id)
    }

    /// Adds a department sharing the parent of `sibling_of`.
    pub fn create_sibling(&mut self, sibling_of: &str, fields: NodeFields) -> Result<NodeId, ChartError> {
        let parent = self
            .require(sibling_of)?
            .parent_id
            .clone()
            .filter(|p| self.get(p).is_some());
        match parent {
            Some(p) => self.create_child(&p, fields),
            None => Ok(self.create_root(fields)),
        }
    }

    /// Replaces the form fields of a node. Position, lock, parent and group
    /// membership are kept.
    pub fn update(&mut self, id: &str, fields: NodeFields) -> Result<(), ChartError> {
        self.get_mut(id)?.apply_fields(fields);
        Ok(())
    }

    /// Re-parents `child_id`. Rejects parents that are the child itself or
    /// one of its descendants.
    pub fn set_parent(&mut self, child_id: &str, parent_id: Option<&str>) -> Result<(), ChartError> {
        self.require(child_id)?;
        if let Some(parent) = parent_id {
            self.require(parent)?;
            if self.is_ancestor_or_self(child_id, parent)? {
                return Err(ChartError::InvalidParent {
                    child: child_id.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        self.get_mut(child_id)?.parent_id = parent_id.map(String::from);
        Ok(())
    }

    /// True if `ancestor` is `node` or appears on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: &str, node: &str) -> Result<bool, ChartError> {
        let mut seen = HashSet::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            if !seen.insert(id) {
                return Err(ChartError::CycleDetected(id.to_string()));
            }
            current = self.get(id).and_then(|n| n.parent_id.as_deref());
        }
        Ok(false)
    }

    /// Moves a node's top-left corner.
    pub fn move_node(&mut self, id: &str, x: f32, y: f32) -> Result<(), ChartError> {
        let node = self.get_mut(id)?;
        node.x = x;
        node.y = y;
        Ok(())
    }

    pub fn set_locked(&mut self, id: &str, locked: bool) -> Result<(), ChartError> {
        self.get_mut(id)?.locked = locked;
        Ok(())
    }

    pub fn set_independent(&mut self, id: &str, independent: bool) -> Result<(), ChartError> {
        self.get_mut(id)?.is_independent = independent;
        Ok(())
    }

    /// Deletes a node in one step.
    ///
    /// # Arguments
    ///
    /// * `id` - Node to delete
    /// * `policy` - Whether children are promoted or deleted along with it
    ///
    /// # Returns
    ///
    /// Ids of every removed node, or an error with the chart untouched
    pub fn delete(&mut self, id: &str, policy: DeletionPolicy) -> Result<Vec<NodeId>, ChartError> {
        let grandparent = self.require(id)?.parent_id.clone();

        let removed = match policy {
            DeletionPolicy::Promote => {
                for node in self.nodes.iter_mut() {
                    if node.parent_id.as_deref() == Some(id) {
                        // A child on a cycle through `id` must not become its own parent.
                        node.parent_id = grandparent.clone().filter(|p| *p != node.id);
                    }
                }
                vec![id.to_string()]
            }
            DeletionPolicy::Cascade => self.subtree_ids(id)?,
        };

        let gone: HashSet<&str> = removed.iter().map(String::as_str).collect();
        self.nodes.retain(|n| !gone.contains(n.id.as_str()));
        self.groups.retain_mut(|group| {
            if gone.contains(group.base_node_id.as_str()) {
                return false;
            }
            group.node_ids.retain(|n| !gone.contains(n.as_str()));
            group.relative_positions.retain(|r| !gone.contains(r.node_id.as_str()));
            group.node_ids.len() >= 2
        });
        Ok(removed)
    }

    /// `id` followed by all of its descendants.
    fn subtree_ids(&self, id: &str) -> Result<Vec<NodeId>, ChartError> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                warn!("Cascade delete found a parent cycle at {current}");
                return Err(ChartError::CycleDetected(current));
            }
            stack.extend(self.children(&current).into_iter().map(|c| c.id.clone()));
            out.push(current);
        }
        Ok(out)
    }

    /// Groups the given nodes. The first one becomes the base node and every
    /// member's offset from it is recorded.
    pub fn create_group(&mut self, node_ids: &[NodeId]) -> Result<GroupId, ChartError> {
        let mut unique: Vec<NodeId> = Vec::new();
        for id in node_ids {
            self.require(id)?;
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        if unique.len() < 2 {
            return Err(ChartError::GroupTooSmall);
        }

        let base = self.require(&unique[0])?.position();
        let relative_positions = unique
            .iter()
            .filter_map(|id| self.get(id))
            .map(|n| RelativePosition {
                node_id: n.id.clone(),
                offset_x: n.x - base.x,
                offset_y: n.y - base.y,
            })
            .collect();

        // A node belongs to at most one group.
        self.groups.retain_mut(|g| {
            g.node_ids.retain(|n| !unique.contains(n));
            g.relative_positions.retain(|r| !unique.contains(&r.node_id));
            g.node_ids.len() >= 2 && g.contains(&g.base_node_id)
        });

        let id = format!("group-{}", self.next_group_id);
        self.next_group_id += 1;
        self.groups.push(Group {
            id: id.clone(),
            base_node_id: unique[0].clone(),
            node_ids: unique,
            relative_positions,
        });
        Ok(id)
    }

    /// Dissolves a group. Its nodes stay where they are.
    pub fn ungroup(&mut self, group_id: &str) -> Result<(), ChartError> {
        let before = self.groups.len();
        self.groups.retain(|g| g.id != group_id);
        if self.groups.len() == before {
            return Err(ChartError::GroupNotFound(group_id.to_string()));
        }
        Ok(())
    }

    /// Runs the automatic tree layout with the chart's spacing settings.
    pub fn auto_layout(&mut self, metrics: &dyn NodeMetrics) -> Result<LayoutOutcome, ChartError> {
        let config = LayoutConfig::from_settings(&self.settings);
        layout::layout(&mut self.nodes, &self.groups, metrics, &config)
    }

    /// Deep copy of the structural state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.nodes.clone(),
            next_id: self.next_id,
            groups: self.groups.clone(),
            next_group_id: self.next_group_id,
        }
    }

    /// Replaces the structural state with a copy of `snapshot`.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.nodes = snapshot.nodes.clone();
        self.next_id = snapshot.next_id;
        self.groups = snapshot.groups.clone();
        self.next_group_id = snapshot.next_group_id;
    }
}

fn numeric_suffix(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)?.parse().ok()
}
