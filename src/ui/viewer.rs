//! Read-only chart viewer.
//!
//! Shows the chart document the editor keeps in storage, or one opened from a
//! file, with pan, zoom and export. Nothing here changes the chart; the
//! [`ChartEditor`] is only used for its connectors and measured sizes.

use super::canvas::wheel_zoom_steps;
use super::export::{self, ExportSnapshot};
use super::file_ops::{self, spawn_open_dialog};
use super::rendering::{self, Palette};
use super::state::{CanvasState, FileOperationResult, FileState, Modal};
use crate::document;
use crate::editor::ChartEditor;
use crate::error::DocumentError;
use crate::store::OrgChart;
use eframe::egui;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Storage key for viewer preferences, separate from the editor's.
const VIEWER_STATE_KEY: &str = "viewer_state";

/// The viewer application.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerApp {
    #[serde(skip)]
    pub editor: ChartEditor,
    pub canvas: CanvasState,
    pub dark_mode: bool,
    /// Where the chart came from, shown in the toolbar
    #[serde(skip)]
    pub source: Option<String>,
    #[serde(skip)]
    pub file: FileState,
    #[serde(skip)]
    pub modal: Modal,
    /// Reload from storage on the next frame
    #[serde(skip)]
    reload_requested: bool,
    #[serde(skip)]
    panning: Option<egui::Pos2>,
}

impl Default for ViewerApp {
    fn default() -> Self {
        Self {
            editor: ChartEditor::default(),
            canvas: CanvasState::default(),
            dark_mode: false,
            source: None,
            file: FileState::default(),
            modal: Modal::None,
            reload_requested: false,
            panning: None,
        }
    }
}

impl ViewerApp {
    /// Builds the viewer and loads the stored chart.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut app: Self = cc
            .storage
            .and_then(|s| s.get_string(VIEWER_STATE_KEY))
            .and_then(|json| {
                serde_json::from_str(&json)
                    .inspect_err(|e| warn!("Ignoring stored viewer preferences: {e}"))
                    .ok()
            })
            .unwrap_or_default();
        app.load_from_storage(cc.storage);
        app
    }

    /// Loads the chart the editor last stored.
    ///
    /// Shows an alert when there is nothing to show.
    pub fn load_from_storage(&mut self, storage: Option<&dyn eframe::Storage>) {
        let result = storage
            .ok_or(DocumentError::NotFound)
            .and_then(file_ops::stored_chart);
        match result {
            Ok(chart) => {
                self.show_chart(chart);
                self.source = Some("Local storage".to_string());
            }
            Err(DocumentError::NotFound) => {
                self.modal = Modal::Alert("No saved chart found. Create one in the editor or open a file.".into());
            }
            Err(e) => {
                warn!("Stored chart is unreadable: {e}");
                self.modal = Modal::Alert(format!("The saved chart could not be read: {e}"));
            }
        }
    }

    fn show_chart(&mut self, chart: OrgChart) {
        info!("Showing chart with {} departments", chart.len());
        self.editor.load(chart);
    }

    fn apply_file_result(&mut self, result: FileOperationResult) {
        match result {
            FileOperationResult::LoadCompleted(path, content) => match document::chart_from_json(&content) {
                Ok(chart) => {
                    self.show_chart(chart);
                    self.source = Some(path);
                }
                Err(e) => {
                    warn!("Rejected {path}: {e}");
                    self.modal = Modal::Alert(format!("Could not open {path}: {e}"));
                }
            },
            FileOperationResult::ExportCompleted(path) => info!("Exported {path}"),
            FileOperationResult::OperationFailed(message) => self.modal = Modal::Alert(message),
            FileOperationResult::SaveCompleted(..) => {}
        }
    }

    fn drain_file_results(&mut self) {
        let mut results = Vec::new();
        if let Some(receiver) = &self.file.file_operation_receiver {
            while let Ok(result) = receiver.try_recv() {
                results.push(result);
            }
        }
        for result in results {
            self.apply_file_result(result);
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Reload").clicked() {
                self.reload_requested = true;
            }
            if ui.button("Open").clicked() {
                spawn_open_dialog(self.file.file_operation_sender.clone(), ui.ctx().clone());
            }
            ui.separator();
            if ui.button("Export SVG").clicked() {
                export::spawn_svg_export(
                    ExportSnapshot::capture(&self.editor),
                    self.file.file_operation_sender.clone(),
                    ui.ctx().clone(),
                );
            }
            if ui.button("Export PNG").clicked() {
                export::spawn_png_export(
                    ExportSnapshot::capture(&self.editor),
                    self.file.file_operation_sender.clone(),
                    ui.ctx().clone(),
                );
            }
            ui.separator();
            ui.checkbox(&mut self.canvas.show_grid, "Show Grid");
            ui.checkbox(&mut self.dark_mode, "Dark Mode");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(self.source.as_deref().unwrap_or("No chart"));
                ui.label(format!("Zoom: {:.0}%", self.canvas.zoom_factor * 100.0));
            });
        });
    }

    /// Draws the chart with drag-to-pan and Ctrl+wheel zoom.
    pub fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        if self.canvas.viewport.is_none() {
            self.canvas.offset = response.rect.min.to_vec2();
        }
        self.canvas.viewport = Some(response.rect);

        rendering::measure_nodes(&painter, &mut self.editor);

        // Any button pans; there is nothing to drag
        let down = ui.input(|i| i.pointer.any_down());
        match (self.panning, down, response.interact_pointer_pos()) {
            (None, true, Some(pos)) => self.panning = Some(pos),
            (Some(last), true, Some(pos)) => {
                self.canvas.offset += pos - last;
                self.panning = Some(pos);
            }
            (_, false, _) => self.panning = None,
            _ => {}
        }

        if response.hovered() {
            let (scroll, command) = ui.input(|i| (i.smooth_scroll_delta, i.modifiers.command));
            if !command && scroll != egui::Vec2::ZERO {
                self.canvas.offset += scroll;
            }
        }
        let steps = wheel_zoom_steps(ui);
        if steps != 0 {
            if let Some(pos) = ui.input(|i| i.pointer.hover_pos()) {
                self.canvas.zoom_by_steps(steps, pos);
            }
        }

        let palette = Palette::new(self.dark_mode);
        if self.canvas.show_grid {
            rendering::draw_grid(&painter, &self.canvas, response.rect);
        }
        rendering::draw_page(&painter, &self.canvas, &palette);
        rendering::draw_groups(&painter, &self.canvas, &self.editor);
        rendering::draw_connectors(&painter, &self.canvas, self.editor.connectors(), &palette);
        rendering::draw_nodes(&painter, &self.canvas, &self.editor, &palette, &|_: &str| false);
        rendering::draw_header(&painter, &self.canvas, &self.editor.chart().header, &palette);
    }

    fn draw_modal(&mut self, ctx: &egui::Context) {
        if let Modal::Alert(message) = self.modal.clone() {
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
    }
}

impl eframe::App for ViewerApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match serde_json::to_string(self) {
            Ok(json) => storage.set_string(VIEWER_STATE_KEY, json),
            Err(e) => warn!("Could not serialize viewer preferences: {e}"),
        }
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        ctx.set_visuals(if self.dark_mode {
            egui::Visuals::dark()
        } else {
            egui::Visuals::light()
        });

        self.drain_file_results();
        if std::mem::take(&mut self.reload_requested) {
            self.load_from_storage(frame.storage());
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.modal = Modal::None;
        }

        egui::TopBottomPanel::top("viewer_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_canvas(ui);
        });
        self.draw_modal(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeFields;

    #[test]
    fn test_missing_storage_alerts() {
        let mut viewer = ViewerApp::default();
        viewer.load_from_storage(None);
        assert!(viewer.modal.is_open());
        assert!(viewer.editor.chart().is_empty());
    }

    #[test]
    fn test_loaded_file_is_shown_without_history() {
        let mut chart = OrgChart::new();
        let root = chart.create_root(NodeFields::named("Board"));
        chart.create_child(&root, NodeFields::named("Finance")).unwrap();
        let json = document::chart_to_json(&chart).unwrap();

        let mut viewer = ViewerApp::default();
        viewer.apply_file_result(FileOperationResult::LoadCompleted("chart.json".into(), json));
        assert_eq!(viewer.editor.chart().len(), 2);
        assert_eq!(viewer.editor.connectors().len(), 1);
        assert!(!viewer.editor.can_undo());
        assert_eq!(viewer.source.as_deref(), Some("chart.json"));
    }

    #[test]
    fn test_malformed_file_keeps_current_chart() {
        let mut viewer = ViewerApp::default();
        viewer.apply_file_result(FileOperationResult::LoadCompleted("x.json".into(), "not json".into()));
        assert!(viewer.modal.is_open());
        assert!(viewer.source.is_none());
    }

    #[test]
    fn test_drag_pans_without_moving_nodes() {
        let mut viewer = ViewerApp::default();
        let mut chart = OrgChart::new();
        chart.create_root(NodeFields::named("Board"));
        viewer.show_chart(chart);
        let before = viewer.editor.chart().nodes()[0].position();

        let ctx = egui::Context::default();
        let frames = [
            vec![egui::Event::PointerMoved(egui::pos2(150.0, 120.0))],
            vec![egui::Event::PointerButton {
                pos: egui::pos2(150.0, 120.0),
                button: egui::PointerButton::Primary,
                pressed: true,
                modifiers: egui::Modifiers::NONE,
            }],
            vec![egui::Event::PointerMoved(egui::pos2(250.0, 170.0))],
            vec![egui::Event::PointerButton {
                pos: egui::pos2(250.0, 170.0),
                button: egui::PointerButton::Primary,
                pressed: false,
                modifiers: egui::Modifiers::NONE,
            }],
        ];
        let mut offsets = Vec::new();
        for events in frames {
            let raw = egui::RawInput {
                screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1200.0, 800.0))),
                events,
                ..Default::default()
            };
            let _ = ctx.run(raw, |ctx| {
                egui::CentralPanel::default().show(ctx, |ui| viewer.draw_canvas(ui));
            });
            offsets.push(viewer.canvas.offset);
        }

        assert_eq!(viewer.editor.chart().nodes()[0].position(), before);
        let moved = offsets[3] - offsets[0];
        assert!((moved.x - 100.0).abs() < 1.0 && (moved.y - 50.0).abs() < 1.0, "{moved:?}");
    }
}
