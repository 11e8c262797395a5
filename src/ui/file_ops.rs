//! File operations and local persistence.
//!
//! Native file dialogs run on the tokio runtime and report back over the
//! channel in [`super::state::FileState`]. The chart document is also mirrored
//! into the eframe key-value storage after every change.

use super::export::{self, ExportSnapshot};
use super::state::{
    FileOperationResult, FormTarget, Gesture, OrgChartApp, PendingLoadOperation, PendingSaveOperation,
};
use crate::constants;
use crate::document::{self, KeyValueStore};
use crate::error::DocumentError;
use crate::samples::{self, SampleKind};
use crate::store::OrgChart;
use eframe::egui;
use log::{error, info, warn};
use std::sync::mpsc::Sender;

/// Adapter exposing eframe's storage as a [`KeyValueStore`].
pub struct EframeStore<'a>(pub &'a mut dyn eframe::Storage);

impl KeyValueStore for EframeStore<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get_string(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.0.set_string(key, value);
    }
}

/// Reads the chart document kept in eframe storage.
pub fn stored_chart(storage: &dyn eframe::Storage) -> Result<OrgChart, DocumentError> {
    let json = storage
        .get_string(constants::STORAGE_KEY)
        .ok_or(DocumentError::NotFound)?;
    document::chart_from_json(&json)
}

/// Asks for a chart file and sends its contents back as
/// [`FileOperationResult::LoadCompleted`]. Parsing is left to the receiver.
pub fn spawn_open_dialog(sender: Option<Sender<FileOperationResult>>, ctx: egui::Context) {
    tokio::spawn(async move {
        if let Some(handle) = rfd::AsyncFileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
            .await
        {
            let path = handle.path();
            let result = match std::fs::read_to_string(path) {
                Ok(json) => FileOperationResult::LoadCompleted(path.display().to_string(), json),
                Err(e) => FileOperationResult::OperationFailed(format!("Failed to read file: {e}")),
            };
            if let Some(tx) = sender {
                let _ = tx.send(result);
            }
        }
        ctx.request_repaint();
    });
}

impl OrgChartApp {
    /// Handles pending file operations.
    ///
    /// Completed operations are drained from the channel first, then any
    /// requested dialog is started.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context for requesting repaints
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        let mut results = Vec::new();
        if let Some(receiver) = &self.file.file_operation_receiver {
            while let Ok(result) = receiver.try_recv() {
                results.push(result);
            }
        }
        for result in results {
            self.apply_file_result(result);
        }

        if let Some(save_op) = self.file.pending_save_operation.take() {
            let ctx = ctx.clone();
            // Copied now so later edits do not end up in this save
            let chart = self.editor.chart().clone();
            let revision = self.editor.revision();
            let sender = self.file.file_operation_sender.clone();

            match (save_op, self.file.current_path.clone()) {
                (PendingSaveOperation::Save, Some(path)) => {
                    tokio::spawn(async move {
                        let result = match document::write_file(std::path::Path::new(&path), &chart) {
                            Ok(()) => FileOperationResult::SaveCompleted(path, revision),
                            Err(e) => FileOperationResult::OperationFailed(format!("Failed to save file: {e}")),
                        };
                        if let Some(tx) = sender {
                            let _ = tx.send(result);
                        }
                        ctx.request_repaint();
                    });
                }
                _ => {
                    tokio::spawn(async move {
                        if let Some(handle) = rfd::AsyncFileDialog::new()
                            .add_filter("JSON", &["json"])
                            .set_file_name("orgchart.json")
                            .save_file()
                            .await
                        {
                            let path = handle.path();
                            let result = match document::write_file(path, &chart) {
                                Ok(()) => FileOperationResult::SaveCompleted(path.display().to_string(), revision),
                                Err(e) => {
                                    FileOperationResult::OperationFailed(format!("Failed to save file: {e}"))
                                }
                            };
                            if let Some(tx) = sender {
                                let _ = tx.send(result);
                            }
                        }
                        ctx.request_repaint();
                    });
                }
            }
        }

        if let Some(PendingLoadOperation::Load) = self.file.pending_load_operation.take() {
            spawn_open_dialog(self.file.file_operation_sender.clone(), ctx.clone());
        }
    }

    /// Applies the outcome of an async file operation.
    pub fn apply_file_result(&mut self, result: FileOperationResult) {
        match result {
            FileOperationResult::SaveCompleted(path, revision) => {
                info!("Chart saved to {path}");
                self.file.current_path = Some(path);
                self.file.saved_revision = revision;
            }
            FileOperationResult::LoadCompleted(path, content) => match document::chart_from_json(&content) {
                Ok(chart) => {
                    self.replace_chart(chart);
                    self.file.current_path = Some(path);
                    self.file.saved_revision = self.editor.revision();
                }
                Err(e) => {
                    warn!("Rejected {path}: {e}");
                    self.alert(format!("Could not open {path}: {e}"));
                }
            },
            FileOperationResult::ExportCompleted(path) => info!("Exported {path}"),
            FileOperationResult::OperationFailed(message) => {
                error!("File operation failed: {message}");
                self.alert(message);
            }
        }
    }

    /// Swaps in a new chart and resets everything that pointed into the old one.
    pub fn replace_chart(&mut self, chart: OrgChart) {
        self.editor.load(chart);
        self.interaction.clear_selection();
        self.interaction.gesture = Gesture::Idle;
        self.context_menu.show = false;
        self.form.close();
    }

    /// Opens a file dialog to save the chart with a new name.
    pub fn save_as_chart(&mut self) {
        self.file.pending_save_operation = Some(PendingSaveOperation::SaveAs);
    }

    /// Saves the chart to the current file path, or triggers "Save As" if no path is set.
    pub fn save_chart(&mut self) {
        if self.file.current_path.is_some() {
            self.file.pending_save_operation = Some(PendingSaveOperation::Save);
        } else {
            self.save_as_chart();
        }
    }

    /// Opens a file dialog to load a chart from disk.
    pub fn open_chart(&mut self) {
        self.file.pending_load_operation = Some(PendingLoadOperation::Load);
    }

    /// Starts an empty chart.
    pub fn new_chart(&mut self) {
        self.replace_chart(OrgChart::new());
        self.file.current_path = None;
        self.file.saved_revision = self.editor.revision();
    }

    /// Replaces the chart with a built-in sample.
    pub fn load_sample(&mut self, kind: SampleKind) {
        match samples::build_sample(kind) {
            Ok(chart) => {
                self.replace_chart(chart);
                self.file.current_path = None;
            }
            Err(e) => error!("Sample failed to build: {e}"),
        }
    }

    /// Starts a new empty root from the toolbar.
    pub fn start_new_root(&mut self) {
        self.form.open(FormTarget::NewRoot, Default::default());
    }

    /// Writes the chart to `store` if it changed since the last write.
    ///
    /// # Returns
    ///
    /// True if a write happened
    pub fn persist_chart(&mut self, store: &mut dyn KeyValueStore) -> bool {
        if self.file.stored_revision == self.editor.revision() {
            return false;
        }
        match document::save_to_store(store, self.editor.chart()) {
            Ok(()) => {
                self.file.stored_revision = self.editor.revision();
                true
            }
            Err(e) => {
                error!("Could not store chart: {e}");
                false
            }
        }
    }

    /// Loads the chart last written to eframe storage, if any.
    pub fn restore_stored_chart(&mut self, storage: &dyn eframe::Storage) {
        match stored_chart(storage) {
            Ok(chart) => {
                self.replace_chart(chart);
                self.file.stored_revision = self.editor.revision();
                self.file.saved_revision = self.editor.revision();
            }
            Err(DocumentError::NotFound) => {}
            Err(e) => warn!("Ignoring stored chart: {e}"),
        }
    }

    /// Exports the current chart as SVG.
    pub fn export_svg(&self, ctx: &egui::Context) {
        export::spawn_svg_export(
            ExportSnapshot::capture(&self.editor),
            self.file.file_operation_sender.clone(),
            ctx.clone(),
        );
    }

    /// Exports the current chart as PNG.
    pub fn export_png(&self, ctx: &egui::Context) {
        export::spawn_png_export(
            ExportSnapshot::capture(&self.editor),
            self.file.file_operation_sender.clone(),
            ctx.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryStore;
    use crate::types::NodeFields;

    #[test]
    fn test_persist_only_when_revision_changes() {
        let mut app = OrgChartApp::default();
        let mut store = MemoryStore::default();
        assert!(!app.persist_chart(&mut store));

        app.editor.add_root(NodeFields::named("Board"));
        assert!(app.persist_chart(&mut store));
        assert!(!app.persist_chart(&mut store));
        assert_eq!(document::load_from_store(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_load_keeps_chart_and_alerts() {
        let mut app = OrgChartApp::default();
        app.editor.add_root(NodeFields::named("Board"));
        let before = app.editor.chart().clone();

        app.apply_file_result(FileOperationResult::LoadCompleted("bad.json".into(), "{\"x\": 1}".into()));
        assert_eq!(app.editor.chart(), &before);
        assert!(matches!(app.modal, super::super::state::Modal::Alert(_)));
    }

    #[test]
    fn test_load_replaces_chart_and_clears_selection() {
        let mut app = OrgChartApp::default();
        let root = app.editor.add_root(NodeFields::named("Old"));
        app.select_node(&root);

        let json = r#"{"nodes": [{"id": "node-3", "deptName": "New"}], "nextId": 4}"#;
        app.apply_file_result(FileOperationResult::LoadCompleted("new.json".into(), json.into()));
        assert_eq!(app.editor.chart().nodes()[0].dept_name, "New");
        assert!(app.interaction.selected_nodes.is_empty());
        assert!(!app.form.is_open());
        assert!(!app.editor.can_undo());
        assert!(!app.has_unsaved_changes());
    }

    #[test]
    fn test_save_completion_tracks_revision() {
        let mut app = OrgChartApp::default();
        app.editor.add_root(NodeFields::named("Board"));
        assert!(app.has_unsaved_changes());
        let revision = app.editor.revision();
        app.apply_file_result(FileOperationResult::SaveCompleted("chart.json".into(), revision));
        assert!(!app.has_unsaved_changes());
        assert_eq!(app.file.current_path.as_deref(), Some("chart.json"));
    }

    #[test]
    fn test_eframe_store_adapter() {
        #[derive(Default)]
        struct Mem(std::collections::HashMap<String, String>);
        impl eframe::Storage for Mem {
            fn get_string(&self, key: &str) -> Option<String> {
                self.0.get(key).cloned()
            }
            fn set_string(&mut self, key: &str, value: String) {
                self.0.insert(key.to_string(), value);
            }
            fn flush(&mut self) {}
        }

        let mut storage = Mem::default();
        let mut app = OrgChartApp::default();
        app.editor.add_root(NodeFields::named("Board"));
        app.persist_chart(&mut EframeStore(&mut storage));

        let mut restored = OrgChartApp::default();
        restored.restore_stored_chart(&storage);
        assert_eq!(restored.editor.chart(), app.editor.chart());
    }
}
