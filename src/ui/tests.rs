use super::state::{Gesture, Modal};
use super::*;
use crate::geometry::NodeMetrics;
use crate::types::NodeFields;
use eframe::egui;

const SCREEN: egui::Vec2 = egui::vec2(1200.0, 800.0);

/// App whose canvas maps screen coordinates 1:1 to world coordinates.
fn app_with_identity_canvas() -> OrgChartApp {
    let mut app = OrgChartApp::default();
    app.canvas.offset = egui::Vec2::ZERO;
    app.canvas.zoom_factor = 1.0;
    // A known viewport keeps draw_canvas from re-centering on the first frame
    app.canvas.viewport = Some(egui::Rect::from_min_size(egui::Pos2::ZERO, SCREEN));
    app
}

/// Drives frames on one context, one event batch per frame, with the given
/// held modifiers. Shortcuts run before the canvas as in the real app.
fn run_frames(app: &mut OrgChartApp, modifiers: egui::Modifiers, frames: Vec<Vec<egui::Event>>) {
    run_frames_with(app, frames.into_iter().map(|events| (modifiers, events)).collect());
}

/// Like [`run_frames`], with the held modifiers given per frame.
fn run_frames_with(app: &mut OrgChartApp, frames: Vec<(egui::Modifiers, Vec<egui::Event>)>) {
    let ctx = egui::Context::default();
    ctx.options_mut(|o| o.zoom_with_keyboard = false);
    for (modifiers, events) in frames {
        let raw = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, SCREEN)),
            modifiers,
            events,
            ..Default::default()
        };
        let _ = ctx.run(raw, |ctx| {
            app.handle_keyboard_shortcuts(ctx);
            egui::CentralPanel::default().show(ctx, |ui| {
                app.draw_canvas(ui);
            });
        });
    }
}

fn press(pos: egui::Pos2, button: egui::PointerButton) -> egui::Event {
    egui::Event::PointerButton {
        pos,
        button,
        pressed: true,
        modifiers: egui::Modifiers::NONE,
    }
}

fn release(pos: egui::Pos2, button: egui::PointerButton) -> egui::Event {
    egui::Event::PointerButton {
        pos,
        button,
        pressed: false,
        modifiers: egui::Modifiers::NONE,
    }
}

fn key(key: egui::Key, modifiers: egui::Modifiers) -> egui::Event {
    egui::Event::Key {
        key,
        physical_key: None,
        pressed: true,
        repeat: false,
        modifiers,
    }
}

/// Press at `from`, move to `to`, release.
fn drag_frames(from: egui::Pos2, to: egui::Pos2) -> Vec<Vec<egui::Event>> {
    use egui::PointerButton::Primary;
    vec![
        vec![egui::Event::PointerMoved(from)],
        vec![press(from, Primary)],
        vec![egui::Event::PointerMoved(to)],
        vec![release(to, Primary)],
    ]
}

#[test]
fn dragging_a_node_commits_once_on_release() {
    let mut app = app_with_identity_canvas();
    let id = app.editor.add_root(NodeFields::named("Board"));

    run_frames(
        &mut app,
        egui::Modifiers::NONE,
        drag_frames(egui::pos2(120.0, 110.0), egui::pos2(420.0, 410.0)),
    );

    let node = app.editor.chart().get(&id).unwrap();
    assert_eq!((node.x, node.y), (400.0, 400.0));
    assert!(app.interaction.gesture.is_idle());
    assert!(app.interaction.is_selected(&id));

    // One undo step takes the node back to where the drag started
    app.perform_undo();
    let node = app.editor.chart().get(&id).unwrap();
    assert_eq!((node.x, node.y), (100.0, 100.0));
}

#[test]
fn dropping_onto_another_node_is_nudged_clear() {
    let mut app = app_with_identity_canvas();
    let a = app.editor.add_root(NodeFields::named("A"));
    let b = app.editor.add_root(NodeFields::named("B"));

    // Grab B at its corner and drop it right on top of A
    run_frames(
        &mut app,
        egui::Modifiers::NONE,
        drag_frames(egui::pos2(305.0, 105.0), egui::pos2(105.0, 105.0)),
    );

    let chart = app.editor.chart();
    let rect_a = app.editor.metrics().rect_of(chart.get(&a).unwrap());
    let rect_b = app.editor.metrics().rect_of(chart.get(&b).unwrap());
    assert!(!rect_a.intersects(&rect_b), "{rect_a:?} {rect_b:?}");
}

#[test]
fn shift_drag_between_nodes_sets_parent() {
    use egui::PointerButton::Primary;
    let mut app = app_with_identity_canvas();
    let a = app.editor.add_root(NodeFields::named("A"));
    let b = app.editor.add_root(NodeFields::named("B"));

    let on_a = egui::pos2(120.0, 110.0);
    let on_b = egui::pos2(320.0, 110.0);
    run_frames(&mut app, egui::Modifiers::SHIFT, drag_frames(on_b, on_a));

    assert_eq!(app.editor.chart().get(&a).unwrap().parent_id.as_deref(), Some(b.as_str()));
    assert_eq!(app.editor.connectors().len(), 1);
    assert!(!app.modal.is_open());

    // The reverse link would make a cycle and is refused
    run_frames(
        &mut app,
        egui::Modifiers::SHIFT,
        vec![
            vec![egui::Event::PointerMoved(on_a)],
            vec![press(on_a, Primary)],
            vec![egui::Event::PointerMoved(on_b)],
            vec![release(on_b, Primary)],
        ],
    );
    assert!(matches!(app.modal, Modal::Alert(_)));
    assert_eq!(app.editor.chart().get(&b).unwrap().parent_id, None);
}

#[test]
fn shift_click_toggles_selection() {
    let mut app = app_with_identity_canvas();
    let a = app.editor.add_root(NodeFields::named("A"));
    let b = app.editor.add_root(NodeFields::named("B"));
    app.select_node(&a);

    let on_b = egui::pos2(320.0, 110.0);
    run_frames(&mut app, egui::Modifiers::SHIFT, drag_frames(on_b, on_b));

    assert!(app.interaction.is_selected(&a));
    assert!(app.interaction.is_selected(&b));
    assert_eq!(app.editor.chart().get(&b).unwrap().parent_id, None);
}

#[test]
fn marquee_selects_nodes_by_center() {
    let mut app = app_with_identity_canvas();
    let a = app.editor.add_root(NodeFields::named("A"));
    let b = app.editor.add_root(NodeFields::named("B"));
    let c = app.editor.add_root(NodeFields::named("C"));

    // Covers the centers of A and B but not C (x 500..650)
    run_frames(
        &mut app,
        egui::Modifiers::NONE,
        drag_frames(egui::pos2(50.0, 50.0), egui::pos2(480.0, 200.0)),
    );

    assert_eq!(app.interaction.selected_nodes, vec![a, b]);
    assert!(!app.interaction.is_selected(&c));
    assert!(app.interaction.gesture.is_idle());
}

#[test]
fn escape_cancels_drag_without_history() {
    use egui::PointerButton::Primary;
    let mut app = app_with_identity_canvas();
    let id = app.editor.add_root(NodeFields::named("Board"));
    let start = egui::pos2(120.0, 110.0);
    let end = egui::pos2(420.0, 410.0);

    run_frames(
        &mut app,
        egui::Modifiers::NONE,
        vec![
            vec![egui::Event::PointerMoved(start)],
            vec![press(start, Primary)],
            vec![egui::Event::PointerMoved(end)],
            vec![key(egui::Key::Escape, egui::Modifiers::NONE)],
            vec![release(end, Primary)],
        ],
    );

    let node = app.editor.chart().get(&id).unwrap();
    assert_eq!((node.x, node.y), (100.0, 100.0));
    assert!(app.interaction.selected_nodes.is_empty());

    // Only the node creation is in history
    app.perform_undo();
    assert!(app.editor.chart().is_empty());
}

#[test]
fn secondary_click_opens_context_menu_on_node() {
    use egui::PointerButton::Secondary;
    let mut app = app_with_identity_canvas();
    let id = app.editor.add_root(NodeFields::named("Board"));
    let pos = egui::pos2(120.0, 110.0);

    run_frames(
        &mut app,
        egui::Modifiers::NONE,
        vec![
            vec![egui::Event::PointerMoved(pos)],
            vec![press(pos, Secondary)],
            vec![release(pos, Secondary)],
        ],
    );

    assert!(app.context_menu.show);
    assert_eq!(app.context_menu.target.as_deref(), Some(id.as_str()));
    assert!(app.interaction.is_selected(&id));
    assert!(app.form.is_editing(&id));
}

#[test]
fn secondary_click_on_empty_canvas_has_no_target() {
    use egui::PointerButton::Secondary;
    let mut app = app_with_identity_canvas();
    app.editor.add_root(NodeFields::named("Board"));
    let pos = egui::pos2(700.0, 600.0);

    run_frames(
        &mut app,
        egui::Modifiers::NONE,
        vec![
            vec![egui::Event::PointerMoved(pos)],
            vec![press(pos, Secondary)],
            vec![release(pos, Secondary)],
        ],
    );

    assert!(app.context_menu.show);
    assert_eq!(app.context_menu.target, None);
}

#[test]
fn ctrl_z_and_ctrl_y_walk_history() {
    let mut app = app_with_identity_canvas();
    app.editor.add_root(NodeFields::named("Board"));

    run_frames(
        &mut app,
        egui::Modifiers::COMMAND,
        vec![vec![key(egui::Key::Z, egui::Modifiers::COMMAND)]],
    );
    assert!(app.editor.chart().is_empty());

    run_frames(
        &mut app,
        egui::Modifiers::COMMAND,
        vec![vec![key(egui::Key::Y, egui::Modifiers::COMMAND)]],
    );
    assert_eq!(app.editor.chart().len(), 1);
}

#[test]
fn undo_waits_for_drag_to_finish() {
    use egui::PointerButton::Primary;
    let mut app = app_with_identity_canvas();
    let id = app.editor.add_root(NodeFields::named("Board"));
    let none = egui::Modifiers::NONE;
    let start = egui::pos2(120.0, 110.0);
    let end = egui::pos2(420.0, 410.0);

    run_frames_with(
        &mut app,
        vec![
            (none, vec![egui::Event::PointerMoved(start)]),
            (none, vec![press(start, Primary)]),
            (none, vec![egui::Event::PointerMoved(egui::pos2(220.0, 210.0))]),
            (
                egui::Modifiers::COMMAND,
                vec![
                    key(egui::Key::Z, egui::Modifiers::COMMAND),
                    egui::Event::PointerMoved(end),
                ],
            ),
            (none, vec![release(end, Primary)]),
        ],
    );

    // The node survived and the drag committed normally
    let node = app.editor.chart().get(&id).unwrap();
    assert_eq!((node.x, node.y), (400.0, 400.0));
    assert!(app.interaction.gesture.is_idle());

    app.perform_undo();
    let node = app.editor.chart().get(&id).unwrap();
    assert_eq!((node.x, node.y), (100.0, 100.0));
    assert!(app.editor.can_redo());
}

#[test]
fn ctrl_g_groups_selection() {
    let mut app = app_with_identity_canvas();
    let a = app.editor.add_root(NodeFields::named("A"));
    let b = app.editor.add_root(NodeFields::named("B"));
    app.interaction.selected_nodes = vec![a.clone(), b];

    run_frames(
        &mut app,
        egui::Modifiers::COMMAND,
        vec![vec![key(egui::Key::G, egui::Modifiers::COMMAND)]],
    );
    assert_eq!(app.editor.chart().groups().len(), 1);

    // A single node cannot form a group
    let mut app = app_with_identity_canvas();
    let a = app.editor.add_root(NodeFields::named("A"));
    app.interaction.selected_nodes = vec![a];
    run_frames(
        &mut app,
        egui::Modifiers::COMMAND,
        vec![vec![key(egui::Key::G, egui::Modifiers::COMMAND)]],
    );
    assert!(app.editor.chart().groups().is_empty());
    assert!(matches!(app.modal, Modal::Alert(_)));
}

#[test]
fn delete_key_asks_for_confirmation() {
    let mut app = app_with_identity_canvas();
    let id = app.editor.add_root(NodeFields::named("Board"));
    app.select_node(&id);
    app.form.close();

    run_frames(
        &mut app,
        egui::Modifiers::NONE,
        vec![vec![key(egui::Key::Delete, egui::Modifiers::NONE)]],
    );
    assert_eq!(app.modal, Modal::ConfirmDelete(id.clone()));
    assert_eq!(app.editor.chart().len(), 1);

    app.modal = Modal::None;
    app.delete_node(&id);
    assert!(app.editor.chart().is_empty());
    assert!(app.interaction.selected_nodes.is_empty());
}

#[test]
fn keyboard_zoom_steps_and_clamps() {
    let mut app = app_with_identity_canvas();
    let zoom_in = || vec![key(egui::Key::Plus, egui::Modifiers::COMMAND)];

    run_frames(&mut app, egui::Modifiers::COMMAND, vec![zoom_in()]);
    assert!((app.canvas.zoom_factor - 1.1).abs() < 1e-4);

    run_frames(&mut app, egui::Modifiers::COMMAND, (0..20).map(|_| zoom_in()).collect());
    assert!((app.canvas.zoom_factor - constants::MAX_ZOOM).abs() < 1e-4);

    run_frames(
        &mut app,
        egui::Modifiers::COMMAND,
        vec![vec![key(egui::Key::Num0, egui::Modifiers::COMMAND)]],
    );
    assert!((app.canvas.zoom_factor - 1.0).abs() < 1e-4);
}

#[test]
fn undo_drops_selection_of_removed_nodes() {
    let mut app = app_with_identity_canvas();
    app.editor.add_root(NodeFields::named("A"));
    let b = app.editor.add_root(NodeFields::named("B"));
    app.select_node(&b);

    app.perform_undo();
    assert!(app.interaction.selected_nodes.is_empty());
    assert!(!app.form.is_open());
}

#[test]
fn gesture_starts_idle_and_escape_resets_it() {
    let mut app = app_with_identity_canvas();
    app.interaction.gesture = Gesture::Panning {
        last: egui::pos2(1.0, 1.0),
    };
    app.context_menu.show = true;
    app.handle_escape();
    assert!(app.interaction.gesture.is_idle());
    assert!(!app.context_menu.show);
}
