//! Shared application-wide constants.
//! Centralizes tweakable values used by the layout engine, the canvas and exports.

// Node dimensions
/// Minimum rendered node width in world units.
pub const NODE_MIN_WIDTH: f32 = 150.0;
/// Height of the department header strip.
pub const NODE_HEADER_HEIGHT: f32 = 36.0;
/// Height of a single member row before the member gap is applied.
pub const MEMBER_ROW_HEIGHT: f32 = 18.0;
/// Horizontal padding inside a node.
pub const NODE_PADDING_X: f32 = 12.0;
/// Approximate advance of one character at the base font size, used when a
/// node has not been measured by a rendering surface yet.
pub const ESTIMATED_CHAR_WIDTH: f32 = 8.0;
/// Base font size for department names.
pub const HEADER_FONT_SIZE: f32 = 14.0;
/// Base font size for member rows.
pub const MEMBER_FONT_SIZE: f32 = 12.0;

// Chart settings defaults
/// Default horizontal gap between sibling subtrees.
pub const DEFAULT_HORIZONTAL_SPACING: f32 = 40.0;
/// Default distance between tree levels.
pub const DEFAULT_VERTICAL_SPACING: f32 = 150.0;
/// Default vertical padding of member rows.
pub const DEFAULT_MEMBER_GAP: f32 = 8.0;
/// Default chart title.
pub const DEFAULT_CHART_TITLE: &str = "Organization Chart";

// Node creation
/// Name given to departments created without one.
pub const DEFAULT_DEPT_NAME: &str = "New Department";
/// Default position for nodes with no stored coordinates.
pub const DEFAULT_NODE_POSITION: (f32, f32) = (100.0, 100.0);
/// Horizontal advance between consecutive new roots.
pub const NEW_ROOT_STEP_X: f32 = 200.0;
/// Horizontal advance between consecutive new children of one parent.
pub const NEW_CHILD_STEP_X: f32 = 180.0;
/// Vertical offset of a new child below its parent.
pub const NEW_CHILD_OFFSET_Y: f32 = 150.0;

// Tree layout
/// Y coordinate of the root level.
pub const LAYOUT_BASE_Y: f32 = 100.0;
/// Multiple of the horizontal spacing inserted between root trees.
pub const TREE_GAP_FACTOR: f32 = 2.0;
/// Smallest x a laid-out forest may start at.
pub const LAYOUT_MIN_LEFT: f32 = 50.0;

// Nominal canvas
/// Nominal canvas width used to center layouts and for exports.
pub const CANVAS_WIDTH: f32 = 2100.0;
/// Nominal canvas height used for exports.
pub const CANVAS_HEIGHT: f32 = 1500.0;

// Collision
/// Padding added around every rectangle before overlap tests.
pub const COLLISION_MARGIN: f32 = 10.0;
/// Distance added per search ring.
pub const COLLISION_STEP: f32 = 20.0;
/// Number of search rings tried before giving up.
pub const COLLISION_MAX_STEPS: usize = 20;

// Routing
/// Clearance kept between a connector midline and an obstacle.
pub const ROUTE_MARGIN: f32 = 15.0;

// Groups
/// Padding (in world units) added around the union of member nodes when drawing a group.
pub const GROUP_PADDING: f32 = 16.0;
/// Corner radius for group rectangles (in screen pixels after transform).
pub const GROUP_CORNER_RADIUS: f32 = 8.0;
/// Stroke width for group rectangle outlines (in screen pixels).
pub const GROUP_STROKE_WIDTH: f32 = 1.5;

// Grid/drawing
/// Grid cell size in world units.
pub const GRID_SIZE: f32 = 20.0;

// Canvas interactions
/// Drag distance in world units that turns a shift-press into a connector draw.
pub const CLICK_THRESHOLD: f32 = 10.0;
/// Smallest zoom factor.
pub const MIN_ZOOM: f32 = 0.25;
/// Largest zoom factor.
pub const MAX_ZOOM: f32 = 2.0;
/// Zoom increment for wheel and keyboard zooming.
pub const ZOOM_STEP: f32 = 0.1;

// Undo/redo
/// Maximum number of history snapshots to retain.
pub const MAX_HISTORY_SIZE: usize = 50;

// Persistence/export
/// Key under which the chart document lives in the key-value store.
pub const STORAGE_KEY: &str = "orgChartData";
/// Raster scale used for PNG exports.
pub const EXPORT_SCALE: f32 = 2.0;
/// Application id shared by the editor and viewer, so both see the same storage.
pub const APP_ID: &str = "orgchart_tool";
