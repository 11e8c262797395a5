//! Canvas interaction and navigation functionality.
//!
//! This module translates pointer input into gestures: panning, zooming,
//! node dragging, connector drawing (re-parenting) and marquee selection.
//! Only one gesture is active at a time, see [`Gesture`].

use super::state::{Gesture, OrgChartApp};
use crate::constants;
use crate::error::ChartError;
use crate::geometry::{NodeMetrics, Point, Rect};
use crate::types::*;
use eframe::egui;
use log::{debug, warn};

/// Net zoom steps from Ctrl+wheel events this frame, one per notch.
pub(super) fn wheel_zoom_steps(ui: &egui::Ui) -> i32 {
    ui.input(|i| {
        i.events
            .iter()
            .filter_map(|event| match event {
                egui::Event::MouseWheel { delta, modifiers, .. } if modifiers.command => {
                    if delta.y > 0.0 {
                        Some(1)
                    } else if delta.y < 0.0 {
                        Some(-1)
                    } else {
                        None
                    }
                }
                _ => None,
            })
            .sum()
    })
}

impl OrgChartApp {
    /// Finds the topmost node under a world position.
    ///
    /// Nodes drawn later are on top, so the search runs back to front.
    pub fn find_node_at_position(&self, world_pos: egui::Pos2) -> Option<NodeId> {
        let p = Point::new(world_pos.x, world_pos.y);
        let metrics = self.editor.metrics();
        self.editor
            .chart()
            .nodes()
            .iter()
            .rev()
            .find(|node| metrics.rect_of(node).contains(p))
            .map(|node| node.id.clone())
    }

    /// Selects a single node and loads it into the properties panel.
    pub fn select_node(&mut self, node_id: &str) {
        self.interaction.select_only(node_id.to_string());
        if let Some(node) = self.editor.chart().get(node_id) {
            self.form.open(super::state::FormTarget::Edit(node.id.clone()), node.fields());
        }
    }

    /// Clears the selection, closing the form if it was editing a node.
    pub fn clear_selection(&mut self) {
        self.interaction.clear_selection();
        if matches!(self.form.target, Some(super::state::FormTarget::Edit(_))) {
            self.form.close();
        }
    }

    /// Handles middle-click or Cmd/Ctrl+left-click canvas panning, and
    /// plain scrolling.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The response from the canvas widget
    pub fn handle_canvas_panning(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let should_pan = ui.input(|i| {
            i.pointer.middle_down() || (i.pointer.primary_down() && i.modifiers.command)
        });

        match (&self.interaction.gesture, should_pan) {
            (Gesture::Idle, true) => {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.interaction.gesture = Gesture::Panning { last: pos };
                }
            }
            (Gesture::Panning { last }, true) => {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.canvas.offset += pos - *last;
                    self.interaction.gesture = Gesture::Panning { last: pos };
                }
            }
            (Gesture::Panning { .. }, false) => self.interaction.gesture = Gesture::Idle,
            _ => {}
        }

        // Ctrl+wheel is zoom, see handle_canvas_zoom
        if response.hovered() {
            let (scroll, command) = ui.input(|i| (i.smooth_scroll_delta, i.modifiers.command));
            if !command && scroll != egui::Vec2::ZERO {
                self.canvas.offset += scroll;
            }
        }
    }

    /// Handles Ctrl+wheel zooming in fixed steps around the cursor.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The response from the canvas widget
    pub fn handle_canvas_zoom(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let steps = wheel_zoom_steps(ui);
        if steps == 0 {
            return;
        }

        let Some(mouse_pos) = ui
            .input(|i| i.pointer.hover_pos())
            .filter(|pos| response.rect.contains(*pos))
        else {
            return;
        };
        if self.canvas.zoom_by_steps(steps, mouse_pos) {
            debug!("Zoom set to {:.1}", self.canvas.zoom_factor);
        }
    }

    /// Handles node dragging and shift-drag connector drawing with the left
    /// mouse button.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The response from the canvas widget
    pub fn handle_node_dragging(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        if matches!(
            self.interaction.gesture,
            Gesture::Panning { .. } | Gesture::Selecting { .. }
        ) {
            return;
        }

        if !ui.input(|i| i.pointer.primary_down()) {
            self.finish_node_gesture();
            return;
        }
        let Some(current_pos) = response.interact_pointer_pos() else {
            return;
        };
        let world_pos = self.canvas.screen_to_world(current_pos);

        match self.interaction.gesture.clone() {
            Gesture::Idle => {
                let Some(node_id) = self.find_node_at_position(world_pos) else {
                    return;
                };
                if ui.input(|i| i.modifiers.shift) {
                    // Deferred until the pointer moves past the click threshold;
                    // a plain shift-click toggles selection instead.
                    self.interaction.gesture = Gesture::PendingConnect {
                        from: node_id,
                        start: current_pos,
                    };
                } else {
                    self.start_node_drag(node_id, world_pos);
                }
            }
            Gesture::DraggingNode {
                node_id,
                grab_offset,
                ..
            } => {
                let target = world_pos - grab_offset;
                if let Err(e) = self.editor.preview_move(&node_id, target.x, target.y) {
                    warn!("Drag target vanished: {e}");
                    self.interaction.gesture = Gesture::Idle;
                }
            }
            Gesture::PendingConnect { from, start } => {
                let start_world = self.canvas.screen_to_world(start);
                if (world_pos - start_world).length() >= constants::CLICK_THRESHOLD {
                    self.interaction.gesture = Gesture::Connecting {
                        from,
                        pos: current_pos,
                    };
                }
            }
            Gesture::Connecting { from, .. } => {
                self.interaction.gesture = Gesture::Connecting {
                    from,
                    pos: current_pos,
                };
            }
            Gesture::Panning { .. } | Gesture::Selecting { .. } => {}
        }
    }

    fn start_node_drag(&mut self, node_id: NodeId, world_pos: egui::Pos2) {
        let Some(node) = self.editor.chart().get(&node_id) else {
            return;
        };
        let origin = node.position();
        if !self.interaction.is_selected(&node_id) {
            self.select_node(&node_id);
        }
        self.interaction.gesture = Gesture::DraggingNode {
            grab_offset: world_pos - egui::pos2(origin.x, origin.y),
            node_id,
            origin,
        };
    }

    /// Completes a node gesture after the mouse button is released.
    fn finish_node_gesture(&mut self) {
        match std::mem::take(&mut self.interaction.gesture) {
            Gesture::DraggingNode {
                node_id, origin, ..
            } => {
                let moved = self
                    .editor
                    .chart()
                    .get(&node_id)
                    .is_some_and(|n| n.position() != origin);
                if moved {
                    match self.editor.end_drag(&node_id) {
                        Ok(landed) => debug!("Dropped {node_id} at ({}, {})", landed.x, landed.y),
                        Err(e) => warn!("Could not finish drag: {e}"),
                    }
                }
            }
            Gesture::PendingConnect { from, .. } => {
                self.interaction.toggle_selected(from);
            }
            Gesture::Connecting { from, pos } => {
                let world = self.canvas.screen_to_world(pos);
                if let Some(target) = self.find_node_at_position(world) {
                    if target != from {
                        self.reparent(&target, &from);
                    }
                }
            }
            other => self.interaction.gesture = other,
        }
    }

    /// Makes `parent` the parent of `child`, alerting when it would form a cycle.
    pub fn reparent(&mut self, child: &str, parent: &str) {
        match self.editor.set_parent(child, Some(parent)) {
            Ok(()) => debug!("{child} now reports to {parent}"),
            Err(ChartError::InvalidParent { .. }) => {
                self.alert("A department cannot report to one of its own sub-departments.");
            }
            Err(e) => warn!("Re-parenting failed: {e}"),
        }
    }

    /// Handles marquee selection and the right-click context menu.
    ///
    /// # Arguments
    ///
    /// * `ui` - The egui UI context
    /// * `response` - The canvas response
    pub fn handle_canvas_interactions(&mut self, ui: &mut egui::Ui, response: &egui::Response) {
        let (primary_down, shift) = ui.input(|i| (i.pointer.primary_down(), i.modifiers.shift));

        if primary_down {
            if let Some(pos) = response.interact_pointer_pos() {
                if let Gesture::Selecting { end, .. } = &mut self.interaction.gesture {
                    *end = pos;
                } else if self.interaction.gesture.is_idle() {
                    let world_pos = self.canvas.screen_to_world(pos);
                    if self.find_node_at_position(world_pos).is_none() {
                        if !shift {
                            self.clear_selection();
                        }
                        self.interaction.gesture = Gesture::Selecting {
                            start: pos,
                            end: pos,
                            additive: shift,
                        };
                    }
                }
            }
        } else if let Gesture::Selecting { start, end, .. } = self.interaction.gesture {
            self.interaction.gesture = Gesture::Idle;
            self.finish_marquee(start, end);
        }

        if response.secondary_clicked() && self.interaction.gesture.is_idle() {
            if let Some(screen_pos) = response.interact_pointer_pos() {
                let world_pos = self.canvas.screen_to_world(screen_pos);
                let target = self.find_node_at_position(world_pos);
                if let Some(id) = &target {
                    if !self.interaction.is_selected(id) {
                        self.select_node(id);
                    }
                }
                self.context_menu.screen_pos = screen_pos;
                self.context_menu.world_pos = world_pos;
                self.context_menu.target = target;
                self.context_menu.show = true;
                self.context_menu.just_opened = true;
            }
        }
    }

    /// Selects every node whose center lies inside the marquee.
    fn finish_marquee(&mut self, start: egui::Pos2, end: egui::Pos2) {
        let min = self.canvas.screen_to_world(start.min(end));
        let max = self.canvas.screen_to_world(start.max(end));
        let area = Rect::new(min.x, min.y, max.x - min.x, max.y - min.y);
        if area.width <= 0.0 && area.height <= 0.0 {
            return;
        }

        let metrics = self.editor.metrics();
        let hits: Vec<NodeId> = self
            .editor
            .chart()
            .nodes()
            .iter()
            .filter(|node| {
                let r = metrics.rect_of(node);
                area.contains(Point::new(r.x + r.width / 2.0, r.y + r.height / 2.0))
            })
            .map(|node| node.id.clone())
            .collect();

        for id in hits {
            if !self.interaction.is_selected(&id) {
                self.interaction.selected_nodes.push(id);
            }
        }
        if let Some(only) = self.interaction.single_selection().cloned() {
            self.select_node(&only);
        }
    }

    /// Aborts the gesture in progress. A dragged node returns to where the
    /// drag started; committed changes are left alone.
    pub fn cancel_gesture(&mut self) {
        if let Gesture::DraggingNode {
            node_id, origin, ..
        } = std::mem::take(&mut self.interaction.gesture)
        {
            if let Err(e) = self.editor.cancel_drag(&node_id, origin) {
                warn!("Could not cancel drag: {e}");
            }
        }
    }
}
