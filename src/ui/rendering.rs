//! Canvas rendering for nodes, connectors, groups and the chart header.
//!
//! Drawing is done by free functions over a [`CanvasState`] so the editor and
//! the read-only viewer share them. Text is measured here too: the sizes fed
//! back to the editor are what layout, routing and collision work with.

use super::state::{CanvasState, Gesture, OrgChartApp};
use crate::constants;
use crate::editor::ChartEditor;
use crate::geometry::{self, NodeMetrics, Point, Rect, Size};
use crate::routing::Connector;
use crate::types::*;
use eframe::egui;
use eframe::epaint::StrokeKind;

/// Colors used on the canvas.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub node_fill: egui::Color32,
    pub header_fill: egui::Color32,
    pub header_text: egui::Color32,
    pub faculty_text: egui::Color32,
    pub staff_text: egui::Color32,
    pub border: egui::Color32,
    pub selected: egui::Color32,
    pub locked: egui::Color32,
    pub connector: egui::Color32,
    pub title: egui::Color32,
    pub page: egui::Color32,
}

impl Palette {
    pub fn new(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                node_fill: egui::Color32::from_gray(40),
                header_fill: egui::Color32::from_rgb(52, 84, 140),
                header_text: egui::Color32::WHITE,
                faculty_text: egui::Color32::from_rgb(150, 190, 255),
                staff_text: egui::Color32::from_gray(220),
                border: egui::Color32::from_gray(110),
                selected: egui::Color32::from_rgb(100, 150, 255),
                locked: egui::Color32::from_rgb(230, 160, 60),
                connector: egui::Color32::from_gray(170),
                title: egui::Color32::from_gray(230),
                page: egui::Color32::from_rgba_unmultiplied(200, 200, 200, 40),
            }
        } else {
            Self {
                node_fill: egui::Color32::WHITE,
                header_fill: egui::Color32::from_rgb(44, 82, 150),
                header_text: egui::Color32::WHITE,
                faculty_text: egui::Color32::from_rgb(30, 70, 160),
                staff_text: egui::Color32::from_gray(40),
                border: egui::Color32::from_gray(120),
                selected: egui::Color32::from_rgb(100, 150, 255),
                locked: egui::Color32::from_rgb(200, 120, 20),
                connector: egui::Color32::from_gray(90),
                title: egui::Color32::from_gray(20),
                page: egui::Color32::from_rgba_unmultiplied(80, 80, 80, 40),
            }
        }
    }

    pub fn member_text(&self, member_type: MemberType) -> egui::Color32 {
        match member_type {
            MemberType::Faculty => self.faculty_text,
            MemberType::Staff => self.staff_text,
        }
    }
}

/// World rectangles of the member slots inside a node.
///
/// Vertical nodes stack one row per member. Horizontal nodes split one row
/// into columns sized by label length.
pub fn member_slots(node: &Node, rect: Rect, member_gap: f32) -> Vec<Rect> {
    let row_height = constants::MEMBER_ROW_HEIGHT + member_gap;
    let top = rect.y + constants::NODE_HEADER_HEIGHT;

    match node.layout_direction {
        LayoutDirection::Vertical => (0..node.members.len())
            .map(|i| Rect::new(rect.x, top + i as f32 * row_height, rect.width, row_height))
            .collect(),
        LayoutDirection::Horizontal => {
            let weights: Vec<f32> = node
                .members
                .iter()
                .map(|m| geometry::member_label(&m.position, &m.name).chars().count().max(1) as f32)
                .collect();
            let total: f32 = weights.iter().sum();
            let mut x = rect.x;
            weights
                .iter()
                .map(|w| {
                    let width = rect.width * w / total;
                    let slot = Rect::new(x, top, width, row_height);
                    x += width;
                    slot
                })
                .collect()
        }
    }
}

/// Measures a node's size in world units from its rendered text.
pub fn measure_node(painter: &egui::Painter, node: &Node, member_gap: f32) -> Size {
    let text_width = |text: String, size: f32| {
        painter
            .layout_no_wrap(text, egui::FontId::proportional(size), egui::Color32::PLACEHOLDER)
            .size()
            .x
    };
    let padding = 2.0 * constants::NODE_PADDING_X;
    let header = text_width(node.dept_name.clone(), constants::HEADER_FONT_SIZE) + padding;
    let row_height = constants::MEMBER_ROW_HEIGHT + member_gap;

    let widths = node.members.iter().map(|m| {
        text_width(
            geometry::member_label(&m.position, &m.name),
            constants::MEMBER_FONT_SIZE,
        ) + padding
    });
    let (body_width, body_height) = match node.layout_direction {
        LayoutDirection::Vertical => (
            widths.fold(0.0_f32, f32::max),
            node.members.len() as f32 * row_height,
        ),
        LayoutDirection::Horizontal => (
            widths.sum::<f32>(),
            if node.members.is_empty() { 0.0 } else { row_height },
        ),
    };

    Size::new(
        header.max(body_width).max(constants::NODE_MIN_WIDTH).ceil(),
        constants::NODE_HEADER_HEIGHT + body_height,
    )
}

/// Measures every node and reports the sizes to the editor.
pub fn measure_nodes(painter: &egui::Painter, editor: &mut ChartEditor) {
    let member_gap = editor.chart().settings.member_gap;
    let sizes: Vec<(NodeId, Size)> = editor
        .chart()
        .nodes()
        .iter()
        .map(|node| (node.id.clone(), measure_node(painter, node, member_gap)))
        .collect();
    for (id, size) in sizes {
        editor.set_measured_size(&id, size);
    }
}

fn to_screen_rect(canvas: &CanvasState, rect: Rect) -> egui::Rect {
    egui::Rect::from_min_max(
        canvas.world_to_screen(egui::pos2(rect.left(), rect.top())),
        canvas.world_to_screen(egui::pos2(rect.right(), rect.bottom())),
    )
}

/// Draws a zoom-aware grid on the canvas for visual reference.
pub fn draw_grid(painter: &egui::Painter, canvas: &CanvasState, canvas_rect: egui::Rect) {
    let grid_size = constants::GRID_SIZE;
    let screen_grid_size = grid_size * canvas.zoom_factor;
    if screen_grid_size < 4.0 {
        return;
    }
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_rgba_unmultiplied(128, 128, 128, 32));

    let top_left = canvas.screen_to_world(canvas_rect.min);
    let bottom_right = canvas.screen_to_world(canvas_rect.max);

    let mut x = (top_left.x / grid_size).floor() * grid_size;
    while x <= bottom_right.x {
        let screen_x = canvas.world_to_screen(egui::pos2(x, 0.0)).x;
        painter.line_segment(
            [
                egui::pos2(screen_x, canvas_rect.min.y),
                egui::pos2(screen_x, canvas_rect.max.y),
            ],
            stroke,
        );
        x += grid_size;
    }

    let mut y = (top_left.y / grid_size).floor() * grid_size;
    while y <= bottom_right.y {
        let screen_y = canvas.world_to_screen(egui::pos2(0.0, y)).y;
        painter.line_segment(
            [
                egui::pos2(canvas_rect.min.x, screen_y),
                egui::pos2(canvas_rect.max.x, screen_y),
            ],
            stroke,
        );
        y += grid_size;
    }
}

/// Outlines the nominal canvas that exports cover.
pub fn draw_page(painter: &egui::Painter, canvas: &CanvasState, palette: &Palette) {
    let page = Rect::new(0.0, 0.0, constants::CANVAS_WIDTH, constants::CANVAS_HEIGHT);
    painter.rect_stroke(
        to_screen_rect(canvas, page),
        0.0,
        egui::Stroke::new(1.0, palette.page),
        StrokeKind::Inside,
    );
}

/// World rectangle drawn around a group: the padded union of its members.
pub fn group_world_rect(editor: &ChartEditor, group: &Group) -> Option<Rect> {
    let metrics = editor.metrics();
    group
        .node_ids
        .iter()
        .filter_map(|id| editor.chart().get(id))
        .map(|node| metrics.rect_of(node))
        .reduce(|acc, r| acc.union(&r))
        .map(|r| r.padded(constants::GROUP_PADDING))
}

/// Draws groups as faint rounded rectangles behind their members.
pub fn draw_groups(painter: &egui::Painter, canvas: &CanvasState, editor: &ChartEditor) {
    let fill = egui::Color32::from_rgba_unmultiplied(128, 128, 128, 20);
    let stroke = egui::Stroke::new(
        constants::GROUP_STROKE_WIDTH,
        egui::Color32::from_rgba_unmultiplied(128, 128, 128, 128),
    );
    for group in editor.chart().groups() {
        if let Some(world_rect) = group_world_rect(editor, group) {
            let screen_rect = to_screen_rect(canvas, world_rect);
            painter.rect_filled(screen_rect, constants::GROUP_CORNER_RADIUS, fill);
            painter.rect_stroke(
                screen_rect,
                constants::GROUP_CORNER_RADIUS,
                stroke,
                StrokeKind::Inside,
            );
        }
    }
}

/// Draws connector polylines.
pub fn draw_connectors(
    painter: &egui::Painter,
    canvas: &CanvasState,
    connectors: &[Connector],
    palette: &Palette,
) {
    let stroke = egui::Stroke::new((1.5 * canvas.zoom_factor).max(1.0), palette.connector);
    for connector in connectors {
        let points: Vec<egui::Pos2> = connector
            .points
            .iter()
            .map(|p| canvas.point_to_screen(*p))
            .collect();
        painter.add(egui::Shape::line(points, stroke));
    }
}

/// Draws every node with its header and members.
///
/// # Arguments
///
/// * `painter` - The egui painter for drawing operations
/// * `canvas` - Current pan and zoom
/// * `editor` - Chart and measured sizes
/// * `palette` - Colors to use
/// * `is_selected` - Whether a node should be highlighted
pub fn draw_nodes(
    painter: &egui::Painter,
    canvas: &CanvasState,
    editor: &ChartEditor,
    palette: &Palette,
    is_selected: &dyn Fn(&str) -> bool,
) {
    let metrics = editor.metrics();
    let member_gap = editor.chart().settings.member_gap;
    let zoom = canvas.zoom_factor;

    for node in editor.chart().nodes() {
        let world_rect = metrics.rect_of(node);
        let screen_rect = to_screen_rect(canvas, world_rect);
        painter.rect_filled(screen_rect, 0.0, palette.node_fill);

        let header_rect = egui::Rect::from_min_max(
            screen_rect.min,
            egui::pos2(
                screen_rect.max.x,
                screen_rect.min.y + constants::NODE_HEADER_HEIGHT * zoom,
            ),
        );
        painter.rect_filled(header_rect, 0.0, palette.header_fill);
        painter.text(
            header_rect.center(),
            egui::Align2::CENTER_CENTER,
            &node.dept_name,
            egui::FontId::proportional(constants::HEADER_FONT_SIZE * zoom),
            palette.header_text,
        );

        let font = egui::FontId::proportional(constants::MEMBER_FONT_SIZE * zoom);
        for (member, slot) in node
            .members
            .iter()
            .zip(member_slots(node, world_rect, member_gap))
        {
            let slot = to_screen_rect(canvas, slot);
            let label = geometry::member_label(&member.position, &member.name);
            let color = palette.member_text(member.member_type);
            match node.layout_direction {
                LayoutDirection::Vertical => painter.text(
                    egui::pos2(slot.min.x + constants::NODE_PADDING_X * zoom, slot.center().y),
                    egui::Align2::LEFT_CENTER,
                    label,
                    font.clone(),
                    color,
                ),
                LayoutDirection::Horizontal => {
                    painter.text(slot.center(), egui::Align2::CENTER_CENTER, label, font.clone(), color)
                }
            };
        }

        let stroke = if is_selected(&node.id) {
            egui::Stroke::new(2.5, palette.selected)
        } else if node.locked {
            egui::Stroke::new(2.0, palette.locked)
        } else {
            egui::Stroke::new(1.0, palette.border)
        };
        if node.is_independent {
            let corners = [
                screen_rect.left_top(),
                screen_rect.right_top(),
                screen_rect.right_bottom(),
                screen_rect.left_bottom(),
                screen_rect.left_top(),
            ];
            painter.extend(egui::Shape::dashed_line(&corners, stroke, 6.0, 4.0));
        } else {
            painter.rect_stroke(screen_rect, 0.0, stroke, StrokeKind::Inside);
        }

        if node.locked {
            let marker = egui::pos2(screen_rect.max.x - 6.0 * zoom, screen_rect.min.y + 6.0 * zoom);
            painter.circle_filled(marker, 3.5 * zoom, palette.locked);
        }
    }
}

/// Canvas position of the date label's anchor and its alignment.
pub fn date_anchor(header: &ChartHeader) -> (Point, egui::Align2) {
    match header.date_pos.x {
        Some(x) => (Point::new(x, header.date_pos.y), egui::Align2::LEFT_TOP),
        None => (
            Point::new(constants::CANVAS_WIDTH - 100.0, header.date_pos.y),
            egui::Align2::RIGHT_TOP,
        ),
    }
}

/// Draws the chart title and date.
pub fn draw_header(painter: &egui::Painter, canvas: &CanvasState, header: &ChartHeader, palette: &Palette) {
    let zoom = canvas.zoom_factor;
    if !header.title.is_empty() {
        painter.text(
            canvas.point_to_screen(header.title_pos),
            egui::Align2::LEFT_TOP,
            &header.title,
            egui::FontId::proportional(24.0 * zoom),
            palette.title,
        );
    }
    if !header.date.is_empty() {
        let (anchor, align) = date_anchor(header);
        painter.text(
            canvas.point_to_screen(anchor),
            align,
            &header.date,
            egui::FontId::proportional(14.0 * zoom),
            palette.title,
        );
    }
}

impl OrgChartApp {
    /// Renders all chart elements on the canvas.
    ///
    /// Elements are drawn in layers: grid, page outline, groups, connectors,
    /// nodes, header and finally the gesture overlays.
    ///
    /// # Arguments
    ///
    /// * `painter` - The egui painter for drawing operations
    /// * `canvas_rect` - The screen-space rectangle of the canvas area
    pub fn render_chart_elements(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let palette = Palette::new(self.dark_mode);
        if self.canvas.show_grid {
            draw_grid(painter, &self.canvas, canvas_rect);
        }
        draw_page(painter, &self.canvas, &palette);
        draw_groups(painter, &self.canvas, &self.editor);
        draw_connectors(painter, &self.canvas, self.editor.connectors(), &palette);
        draw_nodes(painter, &self.canvas, &self.editor, &palette, &|id| {
            self.interaction.is_selected(id)
        });
        draw_header(painter, &self.canvas, &self.editor.chart().header, &palette);

        match &self.interaction.gesture {
            Gesture::Connecting { from, pos } => self.draw_connection_preview(painter, from, *pos),
            Gesture::Selecting { start, end, .. } => {
                let rect = egui::Rect::from_two_pos(*start, *end);
                painter.rect_filled(rect, 0.0, egui::Color32::from_rgba_unmultiplied(100, 150, 255, 40));
                painter.rect_stroke(
                    rect,
                    0.0,
                    egui::Stroke::new(1.5, egui::Color32::from_rgb(100, 150, 255)),
                    StrokeKind::Inside,
                );
            }
            _ => {}
        }
    }

    /// Draws the connector being dragged out of a node.
    ///
    /// Red when the node under the pointer cannot take the source as its parent.
    fn draw_connection_preview(&self, painter: &egui::Painter, from: &str, to_screen: egui::Pos2) {
        let Some(node) = self.editor.chart().get(from) else {
            return;
        };
        let start = geometry::anchor_point(node.position(), self.editor.node_size(node), Direction::Bottom);

        let target = self.find_node_at_position(self.canvas.screen_to_world(to_screen));
        let valid = match target.as_deref() {
            Some(id) if id != from => !self
                .editor
                .chart()
                .is_ancestor_or_self(id, from)
                .unwrap_or(true),
            _ => true,
        };
        let color = if valid {
            egui::Color32::from_rgb(100, 150, 255)
        } else {
            egui::Color32::from_rgb(220, 60, 60)
        };
        painter.line_segment(
            [self.canvas.point_to_screen(start), to_screen],
            egui::Stroke::new(2.0, color),
        );
    }
}
