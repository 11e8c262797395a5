//! Application state management structures.
//!
//! This module contains the state the editor keeps between frames: canvas
//! navigation, the active pointer gesture, the context menu, the node form and
//! file operations. Chart data itself lives in the [`ChartEditor`].

use crate::editor::ChartEditor;
use crate::geometry::Point;
use crate::store::DeletionPolicy;
use crate::types::*;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{channel, Receiver, Sender};

/// State related to canvas navigation and display.
///
/// Tracks the current pan offset, zoom level, and display options for the canvas.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasState {
    /// Current canvas pan offset for navigation (in screen space)
    #[serde(skip)]
    pub offset: egui::Vec2,
    /// Current zoom level (1.0 = normal, 2.0 = 2x zoom, 0.5 = 50% zoom)
    pub zoom_factor: f32,
    /// Whether the grid should be displayed on the canvas
    pub show_grid: bool,
    /// Screen rectangle of the canvas in the last frame
    #[serde(skip)]
    pub viewport: Option<egui::Rect>,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            offset: egui::Vec2::ZERO,
            zoom_factor: 1.0,
            show_grid: true,
            viewport: None,
        }
    }
}

impl CanvasState {
    /// Converts screen coordinates to world coordinates accounting for zoom and pan.
    pub fn screen_to_world(&self, screen_pos: egui::Pos2) -> egui::Pos2 {
        egui::pos2(
            (screen_pos.x - self.offset.x) / self.zoom_factor,
            (screen_pos.y - self.offset.y) / self.zoom_factor,
        )
    }

    /// Converts world coordinates to screen coordinates accounting for zoom and pan.
    pub fn world_to_screen(&self, world_pos: egui::Pos2) -> egui::Pos2 {
        egui::pos2(
            world_pos.x * self.zoom_factor + self.offset.x,
            world_pos.y * self.zoom_factor + self.offset.y,
        )
    }

    /// Screen position of a chart point.
    pub fn point_to_screen(&self, p: Point) -> egui::Pos2 {
        self.world_to_screen(egui::pos2(p.x, p.y))
    }

    /// Sets the zoom level while keeping `anchor` (in screen space) fixed.
    ///
    /// The zoom is clamped to the allowed range and rounded to one decimal so
    /// repeated steps never drift.
    ///
    /// # Returns
    ///
    /// True if the zoom level changed
    pub fn zoom_to(&mut self, zoom: f32, anchor: egui::Pos2) -> bool {
        use crate::constants::{MAX_ZOOM, MIN_ZOOM};

        let new_zoom = ((zoom * 10.0).round() / 10.0).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom_factor).abs() <= f32::EPSILON {
            return false;
        }
        let world = self.screen_to_world(anchor);
        self.zoom_factor = new_zoom;
        let moved = self.world_to_screen(world);
        self.offset += anchor - moved;
        true
    }

    /// Zooms one step in (`steps > 0`) or out (`steps < 0`) around `anchor`.
    pub fn zoom_by_steps(&mut self, steps: i32, anchor: egui::Pos2) -> bool {
        let target = self.zoom_factor + steps as f32 * crate::constants::ZOOM_STEP;
        self.zoom_to(target, anchor)
    }

    /// Center of the canvas on screen, used as the anchor for keyboard zoom.
    pub fn center(&self) -> egui::Pos2 {
        self.viewport.map_or(egui::Pos2::ZERO, |r| r.center())
    }
}

/// The pointer gesture currently in progress.
///
/// Only one gesture can be active at a time; starting one requires
/// [`Gesture::Idle`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// Nothing in progress
    #[default]
    Idle,
    /// A node follows the pointer
    DraggingNode {
        node_id: NodeId,
        /// Position before the drag, restored on cancel
        origin: Point,
        /// Pointer position relative to the node's top-left corner (world space)
        grab_offset: egui::Vec2,
    },
    /// The canvas follows the pointer
    Panning { last: egui::Pos2 },
    /// Shift was pressed on a node; becomes [`Gesture::Connecting`] once the
    /// pointer travels far enough
    PendingConnect { from: NodeId, start: egui::Pos2 },
    /// A connector preview is drawn from a node to the pointer
    Connecting { from: NodeId, pos: egui::Pos2 },
    /// Marquee selection rectangle (screen space)
    Selecting {
        start: egui::Pos2,
        end: egui::Pos2,
        additive: bool,
    },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

/// State related to user interactions with nodes and canvas.
#[derive(Default)]
pub struct InteractionState {
    /// Selected nodes in selection order; the first one feeds the properties panel
    pub selected_nodes: Vec<NodeId>,
    /// Active pointer gesture
    pub gesture: Gesture,
}

impl InteractionState {
    pub fn is_selected(&self, node_id: &str) -> bool {
        self.selected_nodes.iter().any(|id| id == node_id)
    }

    /// The single selected node, if exactly one is selected.
    pub fn single_selection(&self) -> Option<&NodeId> {
        match self.selected_nodes.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn select_only(&mut self, node_id: NodeId) {
        self.selected_nodes.clear();
        self.selected_nodes.push(node_id);
    }

    /// Adds the node to the selection, or removes it if already selected.
    pub fn toggle_selected(&mut self, node_id: NodeId) {
        if let Some(idx) = self.selected_nodes.iter().position(|id| *id == node_id) {
            self.selected_nodes.remove(idx);
        } else {
            self.selected_nodes.push(node_id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_nodes.clear();
    }
}

/// State related to context menu display and interaction.
///
/// The menu targets the node under the pointer, or the empty canvas.
#[derive(Default)]
pub struct ContextMenuState {
    /// Whether the context menu is currently visible
    pub show: bool,
    /// Screen position where the context menu should appear
    pub screen_pos: egui::Pos2,
    /// World position under the pointer when the menu opened
    pub world_pos: egui::Pos2,
    /// Node the menu was opened on, if any
    pub target: Option<NodeId>,
    /// Flag to prevent context menu from closing immediately after opening
    pub just_opened: bool,
}

/// What the node form will do when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormTarget {
    /// Edit an existing node in place
    Edit(NodeId),
    /// Create a new root
    NewRoot,
    /// Create a child of the given node
    NewChild(NodeId),
    /// Create a sibling of the given node
    NewSibling(NodeId),
}

impl FormTarget {
    pub fn title(&self) -> &'static str {
        match self {
            FormTarget::Edit(_) => "Edit Department",
            FormTarget::NewRoot => "New Root Department",
            FormTarget::NewChild(_) => "New Child Department",
            FormTarget::NewSibling(_) => "New Sibling Department",
        }
    }
}

/// Draft of the node form shown in the properties panel.
#[derive(Default)]
pub struct NodeFormState {
    /// Open form, or None when the panel shows the chart settings
    pub target: Option<FormTarget>,
    /// Values being edited
    pub fields: NodeFields,
}

impl NodeFormState {
    /// Opens the form with `fields` as the starting values.
    pub fn open(&mut self, target: FormTarget, fields: NodeFields) {
        self.target = Some(target);
        self.fields = fields;
    }

    pub fn close(&mut self) {
        self.target = None;
    }

    pub fn is_open(&self) -> bool {
        self.target.is_some()
    }

    /// True if the form edits the given node.
    pub fn is_editing(&self, node_id: &str) -> bool {
        matches!(&self.target, Some(FormTarget::Edit(id)) if id == node_id)
    }
}

/// State related to file operations and persistence.
///
/// Manages file paths and async file operations.
pub struct FileState {
    /// Current file path for save/load operations
    pub current_path: Option<String>,
    /// Revision of the chart last written to a file
    pub saved_revision: u64,
    /// Revision of the chart last written to the key-value store
    pub stored_revision: u64,
    pub pending_save_operation: Option<PendingSaveOperation>,
    pub pending_load_operation: Option<PendingLoadOperation>,
    /// Channel for receiving file operation results from async contexts
    pub file_operation_sender: Option<Sender<FileOperationResult>>,
    pub file_operation_receiver: Option<Receiver<FileOperationResult>>,
}

impl Default for FileState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            current_path: None,
            saved_revision: 0,
            stored_revision: 0,
            pending_save_operation: None,
            pending_load_operation: None,
            file_operation_sender: Some(sender),
            file_operation_receiver: Some(receiver),
        }
    }
}

/// Represents a pending save operation type.
#[derive(Debug)]
pub enum PendingSaveOperation {
    /// Save with a new file path (show file picker)
    SaveAs,
    /// Save to the existing file path
    Save,
}

/// Represents a pending load operation type.
#[derive(Debug)]
pub enum PendingLoadOperation {
    /// Load from a file (show file picker)
    Load,
}

/// Messages sent from async file operations back to the main app.
#[derive(Debug)]
pub enum FileOperationResult {
    /// Save operation completed with the given path and the saved revision
    SaveCompleted(String, u64),
    /// Load operation completed successfully with path and content
    LoadCompleted(String, String),
    /// Export finished writing the given path
    ExportCompleted(String),
    /// Operation failed with an error message
    OperationFailed(String),
}

/// Modal dialogs that block the canvas until dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    None,
    /// A message with a single OK button
    Alert(String),
    /// Asks before deleting a node
    ConfirmDelete(NodeId),
}

impl Modal {
    pub fn is_open(&self) -> bool {
        !matches!(self, Modal::None)
    }
}

/// The main application structure containing UI state and the chart editor.
///
/// This struct implements the `eframe::App` trait. Only UI preferences are
/// persisted under `app_state`; the chart itself is stored separately as a
/// chart document.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct OrgChartApp {
    /// The editing session over the current chart
    #[serde(skip)]
    pub editor: ChartEditor,
    /// Canvas navigation and display state
    pub canvas: CanvasState,
    /// User interaction state
    #[serde(skip)]
    pub interaction: InteractionState,
    /// Context menu state
    #[serde(skip)]
    pub context_menu: ContextMenuState,
    /// Node form draft
    #[serde(skip)]
    pub form: NodeFormState,
    /// File operations state
    #[serde(skip)]
    pub file: FileState,
    /// Open modal dialog
    #[serde(skip)]
    pub modal: Modal,
    /// Deletion policy offered in the toolbar
    pub deletion_policy: DeletionPolicy,
    /// Whether dark mode visuals are enabled
    pub dark_mode: bool,
    /// Remembered width of the properties panel across sessions
    pub properties_panel_width: f32,
}

impl Default for OrgChartApp {
    fn default() -> Self {
        Self {
            editor: ChartEditor::default(),
            canvas: CanvasState::default(),
            interaction: InteractionState::default(),
            context_menu: ContextMenuState::default(),
            form: NodeFormState::default(),
            file: FileState::default(),
            modal: Modal::None,
            deletion_policy: DeletionPolicy::default(),
            dark_mode: false,
            properties_panel_width: 300.0,
        }
    }
}

impl OrgChartApp {
    /// Serializes the UI preferences to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Restores UI preferences from JSON. The chart starts empty.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut app: Self = serde_json::from_str(json)?;
        app.editor.deletion_policy = app.deletion_policy;
        Ok(app)
    }

    /// Shows a blocking alert with an OK button.
    pub fn alert(&mut self, message: impl Into<String>) {
        self.modal = Modal::Alert(message.into());
    }

    /// True if the chart changed since it was last saved to a file.
    pub fn has_unsaved_changes(&self) -> bool {
        self.editor.revision() != self.file.saved_revision
    }
}
