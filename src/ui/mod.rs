//! User interface for the org chart editor.
//!
//! The UI is a projection of the [`ChartEditor`](crate::editor::ChartEditor)
//! state plus event translation: every change to the chart goes through the
//! editor, which keeps connectors and history in step.

mod canvas;
mod export;
mod file_ops;
mod properties;
mod rendering;
mod state;
#[cfg(test)]
mod tests;
mod viewer;

pub use export::ExportSnapshot;
pub use state::OrgChartApp;
pub use viewer::ViewerApp;

use crate::constants;
use crate::error::ChartError;
use crate::samples;
use crate::store::DeletionPolicy;
use eframe::egui;
use file_ops::EframeStore;
use log::{debug, warn};
use state::{FormTarget, Modal};

/// Storage key for UI preferences.
const APP_STATE_KEY: &str = "app_state";

/// True if `key` was pressed with Cmd/Ctrl this frame.
///
/// Raw events carry their own modifiers, which also works for synthetic
/// input in headless tests.
fn command_key_pressed(i: &egui::InputState, key: egui::Key, shift: bool) -> bool {
    i.events.iter().any(|ev| match ev {
        egui::Event::Key {
            key: k,
            pressed: true,
            modifiers,
            ..
        } => *k == key && (modifiers.command || modifiers.ctrl) && modifiers.shift == shift,
        _ => false,
    })
}

impl eframe::App for OrgChartApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.to_json() {
            Ok(json) => storage.set_string(APP_STATE_KEY, json),
            Err(e) => warn!("Could not serialize UI preferences: {e}"),
        }
        self.persist_chart(&mut EframeStore(storage));
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let visuals = if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        };
        ctx.set_visuals(visuals);
        self.editor.deletion_policy = self.deletion_policy;

        self.handle_pending_operations(ctx);
        self.handle_keyboard_shortcuts(ctx);

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        egui::SidePanel::right("properties_panel")
            .resizable(true)
            .default_width(self.properties_panel_width.clamp(180.0, 600.0))
            .show(ctx, |ui| {
                self.properties_panel_width = ui.available_width().max(180.0);
                self.draw_properties_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });

        self.draw_modal(ctx);

        // The chart document is mirrored to storage after every change.
        if let Some(storage) = frame.storage_mut() {
            if self.persist_chart(&mut EframeStore(&mut *storage)) {
                storage.flush();
            }
        }
    }
}

impl OrgChartApp {
    /// Builds the app, restoring preferences and the last chart from storage.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Ctrl+Plus/Minus zoom the chart, not the whole UI
        cc.egui_ctx.options_mut(|o| o.zoom_with_keyboard = false);
        let Some(storage) = cc.storage else {
            return Self::default();
        };
        let mut app = storage
            .get_string(APP_STATE_KEY)
            .and_then(|json| {
                Self::from_json(&json)
                    .inspect_err(|e| warn!("Ignoring stored UI preferences: {e}"))
                    .ok()
            })
            .unwrap_or_default();
        app.restore_stored_chart(storage);
        app
    }

    /// Handles all keyboard shortcuts for the current frame.
    ///
    /// While a modal is open only Escape is honoured. Shortcuts other than
    /// Escape are ignored while a text field has focus. Undo and redo wait
    /// until no gesture is in progress.
    fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.handle_escape();
            return;
        }
        if self.modal.is_open() || ctx.wants_keyboard_input() {
            return;
        }

        let (undo, redo, group, save, save_as, open, zoom_in, zoom_out, zoom_reset, delete) =
            ctx.input(|i| {
                (
                    command_key_pressed(i, egui::Key::Z, false),
                    command_key_pressed(i, egui::Key::Z, true) || command_key_pressed(i, egui::Key::Y, false),
                    command_key_pressed(i, egui::Key::G, false),
                    command_key_pressed(i, egui::Key::S, false),
                    command_key_pressed(i, egui::Key::S, true),
                    command_key_pressed(i, egui::Key::O, false),
                    command_key_pressed(i, egui::Key::Plus, false)
                        || command_key_pressed(i, egui::Key::Equals, false)
                        || command_key_pressed(i, egui::Key::Plus, true)
                        || command_key_pressed(i, egui::Key::Equals, true),
                    command_key_pressed(i, egui::Key::Minus, false),
                    command_key_pressed(i, egui::Key::Num0, false),
                    i.key_pressed(egui::Key::Delete),
                )
            });

        if self.interaction.gesture.is_idle() {
            if undo {
                self.perform_undo();
            } else if redo {
                self.perform_redo();
            }
        }
        if group {
            self.group_selection();
        }
        if save_as {
            self.save_as_chart();
        } else if save {
            self.save_chart();
        }
        if open {
            self.open_chart();
        }

        let anchor = self.canvas.center();
        if zoom_in {
            self.canvas.zoom_by_steps(1, anchor);
        }
        if zoom_out {
            self.canvas.zoom_by_steps(-1, anchor);
        }
        if zoom_reset {
            self.canvas.zoom_to(1.0, anchor);
        }

        if delete {
            if let Some(id) = self.interaction.single_selection().cloned() {
                self.modal = Modal::ConfirmDelete(id);
            }
        }
    }

    /// Escape closes whatever is open and aborts the gesture in progress.
    /// Committed changes stay.
    fn handle_escape(&mut self) {
        self.cancel_gesture();
        self.context_menu.show = false;
        self.modal = Modal::None;
        self.form.close();
        self.interaction.clear_selection();
    }

    /// Performs an undo operation.
    fn perform_undo(&mut self) {
        if self.editor.undo() {
            self.after_history_jump();
        }
    }

    /// Performs a redo operation.
    fn perform_redo(&mut self) {
        if self.editor.redo() {
            self.after_history_jump();
        }
    }

    /// Drops selection and form state that may point at nodes that no
    /// longer exist.
    fn after_history_jump(&mut self) {
        let chart = self.editor.chart();
        self.interaction
            .selected_nodes
            .retain(|id| chart.get(id).is_some());
        let stale = match &self.form.target {
            Some(FormTarget::Edit(id) | FormTarget::NewChild(id) | FormTarget::NewSibling(id)) => {
                chart.get(id).is_none()
            }
            _ => false,
        };
        if stale {
            self.form.close();
        } else if let Some(FormTarget::Edit(id)) = self.form.target.clone() {
            if let Some(node) = chart.get(&id) {
                self.form.fields = node.fields();
            }
        }
    }

    /// Groups the selected nodes.
    fn group_selection(&mut self) {
        let selection = self.interaction.selected_nodes.clone();
        match self.editor.group(&selection) {
            Ok(group_id) => debug!("Created {group_id} from {} node(s)", selection.len()),
            Err(ChartError::GroupTooSmall) => self.alert("Select at least two departments to group them."),
            Err(e) => warn!("Grouping failed: {e}"),
        }
    }

    /// Runs the automatic tree layout.
    fn run_auto_layout(&mut self) {
        match self.editor.auto_layout() {
            Ok(outcome) => debug!("Layout moved {} node(s)", outcome.moved.len()),
            Err(e @ ChartError::CycleDetected(_)) => {
                warn!("{e}");
                self.alert("The chart contains a reporting cycle and cannot be laid out.");
            }
            Err(e) => warn!("Layout failed: {e}"),
        }
    }

    /// Deletes a node with the current deletion policy.
    fn delete_node(&mut self, node_id: &str) {
        match self.editor.delete_node(node_id) {
            Ok(removed) => {
                self.interaction
                    .selected_nodes
                    .retain(|id| !removed.contains(id));
                self.after_history_jump();
            }
            Err(e @ ChartError::CycleDetected(_)) => {
                warn!("{e}");
                self.alert("The subtree contains a reporting cycle and was not deleted.");
            }
            Err(e) => warn!("Delete failed: {e}"),
        }
    }

    /// Renders the top toolbar.
    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("New").clicked() {
                self.new_chart();
            }
            if ui.button("Open").clicked() {
                self.open_chart();
            }
            if ui.button("Save").clicked() {
                self.save_chart();
            }
            if ui.button("Save As").clicked() {
                self.save_as_chart();
            }

            ui.separator();

            ui.add_enabled_ui(self.editor.can_undo(), |ui| {
                if ui.button("⟲ Undo").clicked() {
                    self.perform_undo();
                }
            });
            ui.add_enabled_ui(self.editor.can_redo(), |ui| {
                if ui.button("⟳ Redo").clicked() {
                    self.perform_redo();
                }
            });

            ui.separator();

            if ui.button("Add Root").clicked() {
                self.start_new_root();
            }
            if ui.button("Auto Layout").clicked() {
                self.run_auto_layout();
            }
            ui.add_enabled_ui(self.interaction.selected_nodes.len() >= 2, |ui| {
                if ui.button("Group").clicked() {
                    self.group_selection();
                }
            });

            egui::ComboBox::from_id_salt("deletion_policy_combo")
                .selected_text(self.deletion_policy.label())
                .show_ui(ui, |ui| {
                    for policy in [DeletionPolicy::Promote, DeletionPolicy::Cascade] {
                        ui.selectable_value(&mut self.deletion_policy, policy, policy.label());
                    }
                });

            let mut chosen_sample = None;
            egui::ComboBox::from_id_salt("sample_combo")
                .selected_text("Samples")
                .show_ui(ui, |ui| {
                    for info in samples::all_samples() {
                        if ui.selectable_label(false, info.name).clicked() {
                            chosen_sample = Some(info.kind);
                        }
                    }
                });
            if let Some(kind) = chosen_sample {
                self.load_sample(kind);
            }

            ui.separator();

            if ui.button("Export SVG").clicked() {
                self.export_svg(ui.ctx());
            }
            if ui.button("Export PNG").clicked() {
                self.export_png(ui.ctx());
            }

            ui.separator();

            ui.checkbox(&mut self.canvas.show_grid, "Show Grid");
            ui.checkbox(&mut self.dark_mode, "Dark Mode");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let dirty = if self.has_unsaved_changes() { "*" } else { "" };
                match &self.file.current_path {
                    Some(path) => ui.label(format!("{path}{dirty}")),
                    None => ui.label(format!("Untitled{dirty}")),
                };
                ui.label(format!("Zoom: {:.0}%", self.canvas.zoom_factor * 100.0));
            });
        });
    }

    /// Draws the canvas and handles its interactions.
    fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());

        // Put the world origin at the canvas corner on the first frame
        if self.canvas.viewport.is_none() {
            self.canvas.offset = response.rect.min.to_vec2();
        }
        self.canvas.viewport = Some(response.rect);

        // Sizes first so hit-testing uses what is drawn
        rendering::measure_nodes(&painter, &mut self.editor);

        self.handle_canvas_panning(ui, &response);
        self.handle_canvas_zoom(ui, &response);
        self.handle_canvas_interactions(ui, &response);
        self.handle_node_dragging(ui, &response);

        self.render_chart_elements(&painter, response.rect);

        if self.context_menu.show {
            self.draw_context_menu(ui);
        }
    }

    /// Draws the right-click menu for a node or the empty canvas.
    fn draw_context_menu(&mut self, ui: &mut egui::Ui) {
        let target = self.context_menu.target.clone();
        let node = target.as_deref().and_then(|id| self.editor.chart().get(id)).cloned();
        let group_id = target
            .as_deref()
            .and_then(|id| self.editor.chart().group_of(id))
            .map(|g| g.id.clone());
        let can_group = self.interaction.selected_nodes.len() >= 2;

        let area_response = egui::Area::new(egui::Id::new("context_menu"))
            .fixed_pos(self.context_menu.screen_pos)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.vertical(|ui| {
                        if let Some(node) = &node {
                            ui.label(&node.dept_name);
                            ui.separator();
                            if ui.button("Add Child").clicked() {
                                self.form.open(FormTarget::NewChild(node.id.clone()), Default::default());
                                self.context_menu.show = false;
                            }
                            if ui.button("Add Sibling").clicked() {
                                self.form.open(FormTarget::NewSibling(node.id.clone()), Default::default());
                                self.context_menu.show = false;
                            }
                            if ui.button("Edit").clicked() {
                                self.select_node(&node.id);
                                self.context_menu.show = false;
                            }
                            let lock_label = if node.locked { "Unlock Position" } else { "Lock Position" };
                            if ui.button(lock_label).clicked() {
                                if let Err(e) = self.editor.toggle_lock(&node.id) {
                                    warn!("Lock toggle failed: {e}");
                                }
                                self.context_menu.show = false;
                            }
                            let independent_label = if node.is_independent {
                                "Attach to Tree"
                            } else {
                                "Make Independent"
                            };
                            if ui.button(independent_label).clicked() {
                                match self.editor.toggle_independent(&node.id) {
                                    Ok(_) => self.after_history_jump(),
                                    Err(e) => warn!("Independent toggle failed: {e}"),
                                }
                                self.context_menu.show = false;
                            }
                            if can_group && ui.button("Group Selection").clicked() {
                                self.group_selection();
                                self.context_menu.show = false;
                            }
                            if let Some(group_id) = &group_id {
                                if ui.button("Ungroup").clicked() {
                                    if let Err(e) = self.editor.ungroup(group_id) {
                                        warn!("Ungroup failed: {e}");
                                    }
                                    self.context_menu.show = false;
                                }
                            }
                            ui.separator();
                            if ui.button("Delete").clicked() {
                                self.modal = Modal::ConfirmDelete(node.id.clone());
                                self.context_menu.show = false;
                            }
                        } else {
                            if ui.button("Add Root").clicked() {
                                self.start_new_root();
                                self.context_menu.show = false;
                            }
                            if ui.button("Auto Layout").clicked() {
                                self.run_auto_layout();
                                self.context_menu.show = false;
                            }
                        }
                        ui.separator();
                        if ui.button("Cancel").clicked() {
                            self.context_menu.show = false;
                        }
                    });
                })
            });

        // Click-outside-to-close after the first frame
        if !self.context_menu.just_opened && ui.input(|i| i.pointer.any_click()) {
            let inside = ui
                .input(|i| i.pointer.interact_pos())
                .is_some_and(|pos| area_response.response.rect.contains(pos));
            if !inside {
                self.context_menu.show = false;
            }
        }
        self.context_menu.just_opened = false;
    }

    /// Draws the open modal dialog, if any.
    fn draw_modal(&mut self, ctx: &egui::Context) {
        match self.modal.clone() {
            Modal::None => {}
            Modal::Alert(message) => {
                egui::Window::new("Notice")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                    .show(ctx, |ui| {
                        ui.label(message);
                        if ui.button("OK").clicked() {
                            self.modal = Modal::None;
                        }
                    });
            }
            Modal::ConfirmDelete(node_id) => {
                let Some(name) = self.editor.chart().get(&node_id).map(|n| n.dept_name.clone()) else {
                    self.modal = Modal::None;
                    return;
                };
                let detail = match self.deletion_policy {
                    DeletionPolicy::Promote => "Its sub-departments will move up one level.",
                    DeletionPolicy::Cascade => "All of its sub-departments will be deleted too.",
                };
                egui::Window::new("Delete Department?")
                    .collapsible(false)
                    .resizable(false)
                    .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                    .show(ctx, |ui| {
                        ui.label(format!("Delete \"{name}\"? {detail}"));
                        ui.horizontal(|ui| {
                            if ui.button("Delete").clicked() {
                                self.modal = Modal::None;
                                self.delete_node(&node_id);
                            }
                            if ui.button("Cancel").clicked() {
                                self.modal = Modal::None;
                            }
                        });
                    });
            }
        }
    }
}

/// Runs the editor window.
pub fn run_editor() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_app_id(constants::APP_ID)
            .with_title("Org Chart Editor")
            .with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Org Chart Editor",
        options,
        Box::new(|cc| Ok(Box::new(OrgChartApp::new(cc)))),
    )
}

/// Runs the read-only viewer window.
pub fn run_viewer() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_app_id(constants::APP_ID)
            .with_title("Org Chart Viewer")
            .with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Org Chart Viewer",
        options,
        Box::new(|cc| Ok(Box::new(ViewerApp::new(cc)))),
    )
}
