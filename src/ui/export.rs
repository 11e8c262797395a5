//! Export utilities: render the chart to SVG and PNG.
//!
//! Exports always cover the nominal canvas. The state to export is copied
//! into an [`ExportSnapshot`] before any file dialog is awaited, so edits made
//! while a dialog is open do not leak into the file.

use super::rendering::{date_anchor, member_slots};
use super::state::FileOperationResult;
use crate::constants;
use crate::editor::ChartEditor;
use crate::geometry::{self, NodeMetrics, Rect};
use crate::routing::Connector;
use crate::types::*;
use log::error;
use std::fmt::Write as _;
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Everything needed to draw an export, detached from the live editor.
#[derive(Debug, Clone)]
pub struct ExportSnapshot {
    /// Nodes with their rendered rectangles
    pub nodes: Vec<(Node, Rect)>,
    pub connectors: Vec<Connector>,
    pub header: ChartHeader,
    pub member_gap: f32,
}

impl ExportSnapshot {
    /// Copies the current state of the editor.
    pub fn capture(editor: &ChartEditor) -> Self {
        let metrics = editor.metrics();
        Self {
            nodes: editor
                .chart()
                .nodes()
                .iter()
                .map(|node| (node.clone(), metrics.rect_of(node)))
                .collect(),
            connectors: editor.connectors().to_vec(),
            header: editor.chart().header.clone(),
            member_gap: editor.chart().settings.member_gap,
        }
    }

    /// Builds the SVG document for the nominal canvas.
    pub fn to_svg(&self) -> String {
        let width = constants::CANVAS_WIDTH;
        let height = constants::CANVAS_HEIGHT;
        let mut out = String::new();

        let _ = writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\" font-family=\"sans-serif\">"
        );
        let _ = writeln!(out, "<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\" fill=\"#ffffff\" />");

        let _ = writeln!(out, "<g fill=\"none\" stroke=\"#5a5a5a\" stroke-width=\"1.5\">");
        for connector in &self.connectors {
            let _ = writeln!(out, "  <path d=\"{}\" />", connector.svg_path());
        }
        let _ = writeln!(out, "</g>");

        for (node, rect) in &self.nodes {
            self.write_node(&mut out, node, *rect);
        }

        if !self.header.title.is_empty() {
            let _ = writeln!(
                out,
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"24\" fill=\"#141414\" dominant-baseline=\"hanging\">{}</text>",
                self.header.title_pos.x,
                self.header.title_pos.y,
                escape_xml(&self.header.title)
            );
        }
        if !self.header.date.is_empty() {
            let (anchor, align) = date_anchor(&self.header);
            let text_anchor = if align == eframe::egui::Align2::RIGHT_TOP { "end" } else { "start" };
            let _ = writeln!(
                out,
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"14\" fill=\"#141414\" text-anchor=\"{text_anchor}\" dominant-baseline=\"hanging\">{}</text>",
                anchor.x,
                anchor.y,
                escape_xml(&self.header.date)
            );
        }

        let _ = writeln!(out, "</svg>");
        out
    }

    fn write_node(&self, out: &mut String, node: &Node, rect: Rect) {
        let dash = if node.is_independent { " stroke-dasharray=\"6 4\"" } else { "" };
        let _ = writeln!(
            out,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#ffffff\" stroke=\"#787878\"{dash} />",
            rect.x, rect.y, rect.width, rect.height
        );
        let _ = writeln!(
            out,
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#2c5296\" />",
            rect.x,
            rect.y,
            rect.width,
            constants::NODE_HEADER_HEIGHT
        );
        let _ = writeln!(
            out,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{}\" fill=\"#ffffff\" text-anchor=\"middle\" dominant-baseline=\"central\">{}</text>",
            rect.x + rect.width / 2.0,
            rect.y + constants::NODE_HEADER_HEIGHT / 2.0,
            constants::HEADER_FONT_SIZE,
            escape_xml(&node.dept_name)
        );

        for (member, slot) in node.members.iter().zip(member_slots(node, rect, self.member_gap)) {
            let fill = match member.member_type {
                MemberType::Faculty => "#1e46a0",
                MemberType::Staff => "#282828",
            };
            let (x, anchor) = match node.layout_direction {
                LayoutDirection::Vertical => (slot.x + constants::NODE_PADDING_X, "start"),
                LayoutDirection::Horizontal => (slot.x + slot.width / 2.0, "middle"),
            };
            let _ = writeln!(
                out,
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{}\" fill=\"{fill}\" text-anchor=\"{anchor}\" dominant-baseline=\"central\">{}</text>",
                x,
                slot.y + slot.height / 2.0,
                constants::MEMBER_FONT_SIZE,
                escape_xml(&geometry::member_label(&member.position, &member.name))
            );
        }
    }
}

/// Rasterizes an SVG document at the given scale.
pub fn rasterize(svg: &str, scale: f32) -> Result<tiny_skia::Pixmap, String> {
    let mut opt = usvg::Options::default();
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    opt.fontdb = Arc::new(db);

    let tree = usvg::Tree::from_data(svg.as_bytes(), &opt)
        .map_err(|e| format!("Failed to parse SVG for PNG export: {e}"))?;

    let size = tree.size();
    let out_w = (size.width() * scale).round().max(1.0) as u32;
    let out_h = (size.height() * scale).round().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(out_w, out_h)
        .ok_or_else(|| format!("Failed to create pixmap {out_w}x{out_h}"))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    Ok(pixmap)
}

fn report(sender: &Option<Sender<FileOperationResult>>, result: FileOperationResult) {
    if let Some(tx) = sender {
        let _ = tx.send(result);
    }
}

/// Asks for a path and writes the snapshot as SVG.
pub fn spawn_svg_export(
    snapshot: ExportSnapshot,
    sender: Option<Sender<FileOperationResult>>,
    ctx: eframe::egui::Context,
) {
    let svg = snapshot.to_svg();
    tokio::spawn(async move {
        if let Some(handle) = rfd::AsyncFileDialog::new()
            .add_filter("SVG", &["svg"])
            .set_file_name("orgchart.svg")
            .save_file()
            .await
        {
            let path = handle.path();
            match std::fs::write(path, svg.as_bytes()) {
                Ok(()) => report(&sender, FileOperationResult::ExportCompleted(path.display().to_string())),
                Err(e) => {
                    error!("Failed to save SVG: {e}");
                    report(&sender, FileOperationResult::OperationFailed(format!("Failed to save SVG: {e}")));
                }
            }
        }
        ctx.request_repaint();
    });
}

/// Asks for a path and writes the snapshot as PNG at [`constants::EXPORT_SCALE`].
pub fn spawn_png_export(
    snapshot: ExportSnapshot,
    sender: Option<Sender<FileOperationResult>>,
    ctx: eframe::egui::Context,
) {
    let svg = snapshot.to_svg();
    tokio::spawn(async move {
        let Some(handle) = rfd::AsyncFileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name("orgchart.png")
            .save_file()
            .await
        else {
            return;
        };
        let path = handle.path().to_path_buf();
        let result = rasterize(&svg, constants::EXPORT_SCALE)
            .and_then(|pixmap| pixmap.save_png(&path).map_err(|e| format!("Failed to save PNG: {e}")));
        match result {
            Ok(()) => report(&sender, FileOperationResult::ExportCompleted(path.display().to_string())),
            Err(message) => {
                error!("{message}");
                report(&sender, FileOperationResult::OperationFailed(message));
            }
        }
        ctx.request_repaint();
    });
}

/// Escapes text for use inside SVG elements.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
