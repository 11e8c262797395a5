//! Properties panel: the node form and the chart-wide settings.

use super::state::{FormTarget, OrgChartApp};
use crate::error::ChartError;
use crate::types::*;
use eframe::egui;
use log::warn;

impl OrgChartApp {
    /// Renders the properties panel.
    ///
    /// Shows the node form while one is open, otherwise the chart header and
    /// spacing settings.
    pub(super) fn draw_properties_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.vertical(|ui| {
                ui.heading("Properties");
                ui.separator();

                match self.form.target.clone() {
                    Some(target) => self.draw_node_form(ui, target),
                    None => {
                        self.draw_chart_settings(ui);
                        ui.separator();
                        self.draw_no_selection_info(ui);
                    }
                }
            });
        });
    }

    fn draw_node_form(&mut self, ui: &mut egui::Ui, target: FormTarget) {
        ui.label(egui::RichText::new(target.title()).strong());
        if let FormTarget::Edit(id) = &target {
            if let Some(node) = self.editor.chart().get(id) {
                let parent = node
                    .parent_id
                    .as_deref()
                    .and_then(|p| self.editor.chart().get(p))
                    .map_or("None".to_string(), |p| p.dept_name.clone());
                ui.label(format!("Reports to: {parent}"));
                ui.label(format!("Position: ({:.0}, {:.0})", node.x, node.y));
                if node.locked {
                    ui.label("Position locked");
                }
            }
        }
        ui.add_space(4.0);

        let fields = &mut self.form.fields;
        ui.label("Department name:");
        ui.text_edit_singleline(&mut fields.dept_name);

        ui.horizontal(|ui| {
            ui.label("Members:");
            ui.radio_value(&mut fields.layout_direction, LayoutDirection::Vertical, "Vertical");
            ui.radio_value(&mut fields.layout_direction, LayoutDirection::Horizontal, "Horizontal");
        });
        ui.checkbox(&mut fields.is_independent, "Independent (no connector)");

        ui.horizontal(|ui| {
            ui.label("Line from parent:");
            direction_combo(ui, "connection_start_combo", &mut fields.connection_start);
        });
        ui.horizontal(|ui| {
            ui.label("Line into node:");
            direction_combo(ui, "connection_end_combo", &mut fields.connection_end);
        });

        ui.separator();
        ui.label(format!("Members ({})", fields.members.len()));

        let mut remove = None;
        for (idx, member) in fields.members.iter_mut().enumerate() {
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    egui::ComboBox::from_id_salt(("member_type", idx))
                        .selected_text(member_type_label(member.member_type))
                        .width(80.0)
                        .show_ui(ui, |ui| {
                            for kind in [MemberType::Faculty, MemberType::Staff] {
                                ui.selectable_value(&mut member.member_type, kind, member_type_label(kind));
                            }
                        });
                    if ui.small_button("🗑").on_hover_text("Remove member").clicked() {
                        remove = Some(idx);
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("Position:");
                    ui.text_edit_singleline(&mut member.position);
                });
                ui.horizontal(|ui| {
                    ui.label("Name:");
                    ui.text_edit_singleline(&mut member.name);
                });
                ui.horizontal(|ui| {
                    ui.label("Note:");
                    ui.text_edit_singleline(&mut member.note);
                });
            });
        }
        if let Some(idx) = remove {
            fields.members.remove(idx);
        }
        if ui.button("➕ Add member").clicked() {
            fields.members.push(Member::default());
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                self.apply_node_form(target.clone());
            }
            if ui.button("Cancel").clicked() {
                self.cancel_node_form();
            }
        });
    }

    /// Commits the open node form.
    ///
    /// Editing keeps the form open on the same node; creating a node selects
    /// the new node and switches the form to edit it.
    pub(super) fn apply_node_form(&mut self, target: FormTarget) {
        let fields = self.form.fields.clone();
        let result = match &target {
            FormTarget::Edit(id) => self.editor.update_node(id, fields).map(|()| id.clone()),
            FormTarget::NewRoot => Ok(self.editor.add_root(fields)),
            FormTarget::NewChild(parent) => self.editor.add_child(parent, fields),
            FormTarget::NewSibling(sibling) => self.editor.add_sibling(sibling, fields),
        };
        match result {
            Ok(id) => self.select_node(&id),
            Err(ChartError::NodeNotFound(id)) => {
                warn!("Form target {id} no longer exists");
                self.form.close();
                self.alert("The department no longer exists.");
            }
            Err(e) => {
                warn!("Applying form failed: {e}");
                self.alert(e.to_string());
            }
        }
    }

    /// Discards the draft. An edit form falls back to the stored values.
    fn cancel_node_form(&mut self) {
        match self.form.target.clone() {
            Some(FormTarget::Edit(id)) => match self.editor.chart().get(&id) {
                Some(node) => self.form.fields = node.fields(),
                None => self.form.close(),
            },
            _ => self.form.close(),
        }
    }

    fn draw_chart_settings(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Chart").strong());

        let mut header = self.editor.chart().header.clone();
        ui.label("Title:");
        ui.text_edit_singleline(&mut header.title);
        ui.horizontal(|ui| {
            ui.label("Title at");
            ui.add(egui::DragValue::new(&mut header.title_pos.x).prefix("x: "));
            ui.add(egui::DragValue::new(&mut header.title_pos.y).prefix("y: "));
        });
        ui.label("Date:");
        ui.text_edit_singleline(&mut header.date);
        ui.horizontal(|ui| {
            let mut right_aligned = header.date_pos.x.is_none();
            if ui.checkbox(&mut right_aligned, "Right-aligned").changed() {
                header.date_pos.x = if right_aligned {
                    None
                } else {
                    Some(crate::constants::CANVAS_WIDTH - 300.0)
                };
            }
            if let Some(x) = header.date_pos.x.as_mut() {
                ui.add(egui::DragValue::new(x).prefix("x: "));
            }
            ui.add(egui::DragValue::new(&mut header.date_pos.y).prefix("y: "));
        });
        if header != self.editor.chart().header {
            self.editor.set_header(header);
        }

        ui.add_space(6.0);
        ui.label(egui::RichText::new("Spacing").strong());
        let mut settings = self.editor.chart().settings;
        egui::Grid::new("spacing_grid").num_columns(2).show(ui, |ui| {
            ui.label("Horizontal:");
            ui.add(egui::DragValue::new(&mut settings.horizontal_spacing).range(0.0..=400.0));
            ui.end_row();
            ui.label("Vertical:");
            ui.add(egui::DragValue::new(&mut settings.vertical_spacing).range(40.0..=600.0));
            ui.end_row();
            ui.label("Member gap:");
            ui.add(egui::DragValue::new(&mut settings.member_gap).range(0.0..=40.0));
            ui.end_row();
        });
        if settings != self.editor.chart().settings {
            self.editor.set_settings(settings);
        }
    }

    fn draw_no_selection_info(&self, ui: &mut egui::Ui) {
        ui.label(format!("{} departments", self.editor.chart().len()));
        ui.add_space(4.0);
        ui.label("Click a department to edit it.");
        ui.label("Right-click for more actions.");
        ui.label("Shift-drag from one department to another to make it the parent.");
        ui.label("Drag on empty space to select several departments.");
    }
}

fn member_type_label(kind: MemberType) -> &'static str {
    match kind {
        MemberType::Faculty => "Faculty",
        MemberType::Staff => "Staff",
    }
}

fn direction_combo(ui: &mut egui::Ui, id_salt: &str, value: &mut Direction) {
    egui::ComboBox::from_id_salt(id_salt)
        .selected_text(value.name())
        .show_ui(ui, |ui| {
            for dir in Direction::ALL {
                ui.selectable_value(value, dir, dir.name());
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_child_form_creates_and_selects() {
        let mut app = OrgChartApp::default();
        let root = app.editor.add_root(NodeFields::named("Board"));
        app.form.open(FormTarget::NewChild(root.clone()), NodeFields::named("Finance"));

        app.apply_node_form(FormTarget::NewChild(root.clone()));

        let child = app.interaction.single_selection().cloned().unwrap();
        let node = app.editor.chart().get(&child).unwrap();
        assert_eq!(node.dept_name, "Finance");
        assert_eq!(node.parent_id.as_deref(), Some(root.as_str()));
        assert!(app.form.is_editing(&child));
    }

    #[test]
    fn test_edit_form_updates_node() {
        let mut app = OrgChartApp::default();
        let root = app.editor.add_root(NodeFields::named("Board"));
        app.select_node(&root);
        app.form
            .fields
            .members
            .push(Member::new(MemberType::Faculty, "Dean", "Lee"));

        app.apply_node_form(FormTarget::Edit(root.clone()));
        assert_eq!(app.editor.chart().get(&root).unwrap().members.len(), 1);
        assert!(app.editor.can_undo());
    }

    #[test]
    fn test_form_for_deleted_target_alerts() {
        let mut app = OrgChartApp::default();
        let root = app.editor.add_root(NodeFields::named("Board"));
        app.editor.delete_node(&root).unwrap();

        app.apply_node_form(FormTarget::NewChild(root));
        assert!(app.modal.is_open());
        assert!(!app.form.is_open());
    }

    #[test]
    fn test_cancel_edit_restores_stored_fields() {
        let mut app = OrgChartApp::default();
        let root = app.editor.add_root(NodeFields::named("Board"));
        app.select_node(&root);
        app.form.fields.dept_name = "Draft".into();
        app.cancel_node_form();
        assert_eq!(app.form.fields.dept_name, "Board");
    }
}
