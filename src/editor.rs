//! Editing session over an [`OrgChart`].
//!
//! Every committed mutation goes through [`ChartEditor`], which reroutes all
//! connectors and pushes a history snapshot as one unit. Drag previews only
//! reroute; the snapshot is taken when the drag ends.

use crate::collision::{self, CollisionConfig};
use crate::error::ChartError;
use crate::geometry::{MeasuredSizes, NodeMetrics, Point, Rect, Size};
use crate::history::History;
use crate::layout::LayoutOutcome;
use crate::routing::{self, Connector, RouteConfig};
use crate::store::{DeletionPolicy, OrgChart};
use crate::types::*;
use log::{debug, info};

/// A chart plus its connectors, measured sizes and undo history.
#[derive(Debug, Clone)]
pub struct ChartEditor {
    chart: OrgChart,
    history: History,
    connectors: Vec<Connector>,
    sizes: MeasuredSizes,
    /// Policy applied by [`ChartEditor::delete_node`]
    pub deletion_policy: DeletionPolicy,
    collision: CollisionConfig,
    routing: RouteConfig,
    revision: u64,
}

impl Default for ChartEditor {
    fn default() -> Self {
        Self::new(OrgChart::new())
    }
}

impl ChartEditor {
    /// Starts a session on `chart`; its current state becomes the undo floor.
    pub fn new(chart: OrgChart) -> Self {
        let mut editor = Self {
            sizes: MeasuredSizes::new(chart.settings.member_gap),
            history: History::new(),
            connectors: Vec::new(),
            deletion_policy: DeletionPolicy::default(),
            collision: CollisionConfig::default(),
            routing: RouteConfig::default(),
            revision: 0,
            chart,
        };
        editor.history.reset(editor.chart.snapshot());
        editor.redraw();
        editor
    }

    pub fn chart(&self) -> &OrgChart {
        &self.chart
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Sizes used for layout, routing and collision.
    pub fn metrics(&self) -> &MeasuredSizes {
        &self.sizes
    }

    /// Bumped whenever the persisted document changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Rendered size of a node as the editor sees it.
    pub fn node_size(&self, node: &Node) -> Size {
        self.sizes.size_of(node)
    }

    fn redraw(&mut self) {
        self.connectors = routing::route_all(self.chart.nodes(), &self.sizes, &self.routing);
    }

    fn commit(&mut self) {
        self.redraw();
        self.history.commit(self.chart.snapshot());
        self.revision += 1;
    }

    /// Replaces the whole chart, e.g. after loading a document. History
    /// restarts from the loaded state.
    pub fn load(&mut self, chart: OrgChart) {
        self.chart = chart;
        self.sizes.clear();
        self.sizes.set_member_gap(self.chart.settings.member_gap);
        self.history.reset(self.chart.snapshot());
        self.redraw();
        self.revision += 1;
        info!("Loaded chart with {} node(s)", self.chart.len());
    }

    pub fn add_root(&mut self, fields: NodeFields) -> NodeId {
        let id = self.chart.create_root(fields);
        self.commit();
        id
    }

    pub fn add_child(&mut self, parent_id: &str, fields: NodeFields) -> Result<NodeId, ChartError> {
        let id = self.chart.create_child(parent_id, fields)?;
        self.commit();
        Ok(id)
    }

    pub fn add_sibling(&mut self, sibling_of: &str, fields: NodeFields) -> Result<NodeId, ChartError> {
        let id = self.chart.create_sibling(sibling_of, fields)?;
        self.commit();
        Ok(id)
    }

    pub fn update_node(&mut self, id: &str, fields: NodeFields) -> Result<(), ChartError> {
        self.chart.update(id, fields)?;
        self.commit();
        Ok(())
    }

    /// Makes `parent_id` the parent of `child_id`.
    pub fn set_parent(&mut self, child_id: &str, parent_id: Option<&str>) -> Result<(), ChartError> {
        self.chart.set_parent(child_id, parent_id)?;
        self.commit();
        Ok(())
    }

    /// Deletes a node using the session's deletion policy.
    pub fn delete_node(&mut self, id: &str) -> Result<Vec<NodeId>, ChartError> {
        let removed = self.chart.delete(id, self.deletion_policy)?;
        for gone in &removed {
            self.sizes.remove(gone);
        }
        self.commit();
        debug!("Deleted {} node(s) with {:?}", removed.len(), self.deletion_policy);
        Ok(removed)
    }

    /// Flips the lock flag. Returns the new value.
    pub fn toggle_lock(&mut self, id: &str) -> Result<bool, ChartError> {
        let locked = !self.require(id)?.locked;
        self.chart.set_locked(id, locked)?;
        self.commit();
        Ok(locked)
    }

    /// Flips the independent flag. Returns the new value.
    pub fn toggle_independent(&mut self, id: &str) -> Result<bool, ChartError> {
        let independent = !self.require(id)?.is_independent;
        self.chart.set_independent(id, independent)?;
        self.commit();
        Ok(independent)
    }

    /// Moves a node and commits without collision handling.
    pub fn move_node(&mut self, id: &str, x: f32, y: f32) -> Result<(), ChartError> {
        self.chart.move_node(id, x, y)?;
        self.commit();
        Ok(())
    }

    /// Moves a node while it is being dragged. Nothing is committed.
    ///
    /// The position is clamped to the canvas origin.
    pub fn preview_move(&mut self, id: &str, x: f32, y: f32) -> Result<(), ChartError> {
        self.chart.move_node(id, x.max(0.0), y.max(0.0))?;
        self.redraw();
        Ok(())
    }

    /// Puts a dragged node back where the drag started.
    pub fn cancel_drag(&mut self, id: &str, origin: Point) -> Result<(), ChartError> {
        self.preview_move(id, origin.x, origin.y)
    }

    /// Finishes a drag: the node is nudged off any overlap, then committed.
    ///
    /// # Returns
    ///
    /// The final position of the node
    pub fn end_drag(&mut self, id: &str) -> Result<Point, ChartError> {
        let node = self.require(id)?;
        let proposed = node.position();
        let size = self.sizes.size_of(node);
        let others: Vec<Rect> = self
            .chart
            .nodes()
            .iter()
            .filter(|n| n.id != id)
            .map(|n| self.sizes.rect_of(n))
            .collect();

        let resolved = collision::resolve(proposed, size, &others, &self.collision);
        self.chart.move_node(id, resolved.x, resolved.y)?;
        self.commit();
        Ok(resolved)
    }

    /// Runs the automatic layout and commits the result.
    pub fn auto_layout(&mut self) -> Result<LayoutOutcome, ChartError> {
        let outcome = self.chart.auto_layout(&self.sizes)?;
        self.commit();
        Ok(outcome)
    }

    pub fn group(&mut self, node_ids: &[NodeId]) -> Result<GroupId, ChartError> {
        let id = self.chart.create_group(node_ids)?;
        self.commit();
        Ok(id)
    }

    pub fn ungroup(&mut self, group_id: &str) -> Result<(), ChartError> {
        self.chart.ungroup(group_id)?;
        self.commit();
        Ok(())
    }

    /// Restores the previous commit. Returns false at the floor.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.chart.restore(snapshot);
        self.redraw();
        self.revision += 1;
        true
    }

    /// Re-applies an undone commit. Returns false when there is none.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.chart.restore(snapshot);
        self.redraw();
        self.revision += 1;
        true
    }

    /// Replaces the spacing settings. Takes effect on the next layout run.
    pub fn set_settings(&mut self, settings: ChartSettings) {
        if self.chart.settings == settings {
            return;
        }
        self.chart.settings = settings;
        self.sizes.set_member_gap(settings.member_gap);
        self.redraw();
        self.revision += 1;
    }

    pub fn set_header(&mut self, header: ChartHeader) {
        if self.chart.header == header {
            return;
        }
        self.chart.header = header;
        self.revision += 1;
    }

    /// Records a size reported by the renderer, rerouting if it changed.
    pub fn set_measured_size(&mut self, id: &str, size: Size) {
        if self.sizes.set(id, size) {
            self.redraw();
        }
    }

    fn require(&self, id: &str) -> Result<&Node, ChartError> {
        self.chart
            .get(id)
            .ok_or_else(|| ChartError::NodeNotFound(id.to_string()))
    }
}
