//! # Org Chart Tool
//!
//! Layout and geometry engine of an organization chart editor, with an egui
//! front end. Departments are boxes listing their members; reporting lines
//! are drawn as orthogonal connectors between configurable anchor sides.
//!
//! ## Features
//! - Tree store with promote or cascade deletion and cycle-safe re-parenting
//! - Automatic forest layout that respects locked and independent nodes
//! - Connector routing with obstacle avoidance
//! - Collision nudging when a dragged node is dropped
//! - Node groups that move with their base node during layout
//! - Snapshot undo/redo
//! - JSON documents in local storage or files, SVG and PNG export
//! - An editor and a read-only viewer

#![deny(unsafe_code)]

pub mod collision;
pub mod constants;
pub mod document;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod history;
pub mod layout;
pub mod routing;
pub mod samples;
pub mod store;
pub mod types;
#[cfg(not(target_arch = "wasm32"))]
mod ui;

pub use editor::ChartEditor;
pub use error::{ChartError, DocumentError};
pub use store::{DeletionPolicy, OrgChart};
pub use types::*;
#[cfg(not(target_arch = "wasm32"))]
pub use ui::{ExportSnapshot, OrgChartApp, ViewerApp};

/// Runs the chart editor.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// fn main() -> Result<(), eframe::Error> {
///     let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
///     let _guard = rt.enter();
///     orgchart_tool::run_app()
/// }
/// ```
#[cfg(not(target_arch = "wasm32"))]
pub fn run_app() -> Result<(), eframe::Error> {
    ui::run_editor()
}

/// Runs the read-only viewer.
#[cfg(not(target_arch = "wasm32"))]
pub fn run_viewer() -> Result<(), eframe::Error> {
    ui::run_viewer()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_default() {
        let chart = OrgChart::default();
        assert!(chart.is_empty());
        assert!(chart.groups().is_empty());
        assert_eq!(chart.settings, ChartSettings::default());
    }

    #[test]
    fn test_editor_round_trip_through_document() {
        let mut editor = ChartEditor::default();
        let root = editor.add_root(NodeFields::named("Board"));
        editor.add_child(&root, NodeFields::named("Finance")).unwrap();

        let json = document::chart_to_json(editor.chart()).unwrap();
        let restored = document::chart_from_json(&json).unwrap();
        assert_eq!(&restored, editor.chart());
    }
}
