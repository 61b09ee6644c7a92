//! Undo must return the table to exactly the state before the action

mod common;

use common::*;
use phyco::prelude::*;
use pretty_assertions::{assert_eq, assert_ne};

fn assert_undo_identity(editor: &mut Editor, intent: Intent) {
    let before = state(editor);
    let report = editor.submit(intent);
    assert!(report.is_valid(), "{:?}", report);
    let after = state(editor);
    assert_ne!(before, after);

    assert!(editor.undo());
    assert_eq!(state(editor), before);

    assert!(editor.redo());
    assert_eq!(state(editor), after);

    assert!(editor.undo());
    assert_eq!(state(editor), before);
}

fn with_chart() -> Fixture {
    let mut fixture = fixture();
    let columns = vec![fixture.a.clone(), fixture.b.clone()];
    let report = fixture.editor.submit(Intent::AddChart {
        name: "Speed".into(),
        kind: "linear".into(),
        columns,
    });
    assert!(report.is_valid(), "{:?}", report);
    fixture
}

#[test]
fn test_undo_add_plain_column() {
    let Fixture { mut editor, .. } = fixture();
    assert_undo_identity(
        &mut editor,
        Intent::AddColumn {
            name: "Time".into(),
            column_type: "numerical".into(),
            formula: None,
        },
    );
}

#[test]
fn test_undo_add_formula_column() {
    let Fixture { mut editor, .. } = fixture();
    assert_undo_identity(
        &mut editor,
        Intent::AddColumn {
            name: "Spread".into(),
            column_type: "formula".into(),
            formula: Some("[A] - [A.mean] + [B.stddev]".into()),
        },
    );
}

#[test]
fn test_undo_first_column_removes_seed_row() {
    let mut editor = Editor::new();
    assert_undo_identity(
        &mut editor,
        Intent::AddColumn {
            name: "A".into(),
            column_type: "numerical".into(),
            formula: None,
        },
    );
    assert_eq!(editor.table().row_count(), 0);
}

#[test]
fn test_undo_rename_column() {
    let Fixture { mut editor, .. } = fixture();
    assert_undo_identity(
        &mut editor,
        Intent::EditColumn {
            index: 0,
            name: "Length".into(),
            formula: None,
        },
    );
}

#[test]
fn test_undo_edit_formula() {
    let Fixture { mut editor, .. } = fixture();
    let _ = add_column(&mut editor, "C", "formula", Some("[B] + [M]"));
    assert_undo_identity(
        &mut editor,
        Intent::EditColumn {
            index: 2,
            name: "Twice".into(),
            formula: Some("[A] * [A.max]".into()),
        },
    );
}

#[test]
fn test_undo_delete_column_cascade() {
    let Fixture { mut editor, .. } = with_chart();
    let _ = add_column(&mut editor, "C", "formula", Some("[B] + 1"));
    assert_undo_identity(&mut editor, Intent::DeleteColumn { index: 0 });
}

#[test]
fn test_undo_add_row() {
    let Fixture { mut editor, .. } = fixture();
    assert_undo_identity(&mut editor, Intent::AddRow);
}

#[test]
fn test_undo_delete_row() {
    let Fixture { mut editor, .. } = fixture();
    assert_undo_identity(&mut editor, Intent::DeleteRow { index: 1 });
}

#[test]
fn test_undo_edit_cell() {
    let Fixture { mut editor, a, .. } = fixture();
    assert_undo_identity(
        &mut editor,
        Intent::EditCell {
            column_key: a,
            row_index: 2,
            value: "30".into(),
        },
    );
}

#[test]
fn test_undo_edit_text_cell() {
    let Fixture {
        mut editor, label, ..
    } = fixture();
    assert_undo_identity(
        &mut editor,
        Intent::EditCell {
            column_key: label,
            row_index: 0,
            value: "renamed".into(),
        },
    );
}

#[test]
fn test_undo_add_chart() {
    let Fixture {
        mut editor, a, m, ..
    } = fixture();
    assert_undo_identity(
        &mut editor,
        Intent::AddChart {
            name: "Matrix".into(),
            kind: "correlation".into(),
            columns: vec![a, m],
        },
    );
}

#[test]
fn test_undo_delete_chart() {
    let Fixture { mut editor, .. } = with_chart();
    assert_undo_identity(&mut editor, Intent::DeleteChart { index: 0 });
}

#[test]
fn test_cascade_keeps_charts() {
    let Fixture {
        mut editor,
        a,
        label,
        b,
        m,
    } = with_chart();
    let chart = editor.table().charts()[0].key.clone();
    let before = state(&editor);

    assert!(editor.submit(Intent::DeleteColumn { index: 0 }).is_valid());

    let table = editor.table();
    let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Label"]);
    assert_eq!(table.charts().len(), 1);
    assert!(table.graph().contains_node(&chart));
    assert!(table.graph().query_dependencies(&chart).is_empty());
    for key in [&a, &b, &m] {
        assert!(!table.graph().contains_node(key));
        assert!(table.rows().iter().all(|row| row.get(key).is_none()));
        assert!(table.statistics().get(key).is_none());
    }
    assert_eq!(table.cell(0, &label), Some("first"));
    assert_eq!(table.chart_series(&chart), Some(Vec::new()));

    assert!(editor.undo());
    assert_eq!(state(&editor), before);
    let order: Vec<&NodeKey> = editor.table().columns().iter().map(|c| c.key()).collect();
    assert_eq!(order, vec![&a, &label, &b, &m]);
}

#[test]
fn test_chart_series_values() {
    let Fixture { editor, .. } = with_chart();
    let chart = editor.table().charts()[0].key.clone();
    let series = editor.table().chart_series(&chart).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].name, "A");
    assert_eq!(series[0].values, vec![1.0, 2.0, 3.0]);
    assert_eq!(series[1].name, "B");
    assert_eq!(series[1].values, vec![2.0, 4.0, 6.0]);
}

#[test]
fn test_new_action_clears_redo() {
    let Fixture { mut editor, a, .. } = fixture();
    set_cell(&mut editor, &a, 0, "10");
    assert!(editor.undo());
    assert!(editor.can_redo());
    assert_eq!(editor.actions().redo_label(), Some("Edit cell"));

    add_row(&mut editor);
    assert!(!editor.can_redo());
    assert!(!editor.redo());
}

#[test]
fn test_undo_on_empty_history() {
    let mut editor = Editor::new();
    assert!(!editor.can_undo());
    assert!(!editor.undo());
    assert!(!editor.redo());
}

#[test]
fn test_undo_whole_history() {
    let Fixture { mut editor, .. } = fixture();
    while editor.undo() {}

    let table = editor.table();
    assert_eq!(table.column_count(), 0);
    assert_eq!(table.row_count(), 0);
    assert!(table.graph().nodes().is_empty());
    assert!(table.graph().edges().is_empty());
    assert!(table.statistics().is_empty());
}

#[test]
fn test_rejected_intent_is_not_recorded() {
    let Fixture { mut editor, .. } = fixture();
    let depth = editor.actions().undo_len();
    let report = editor.submit(Intent::DeleteRow { index: 99 });
    assert!(!report.is_valid());
    assert_eq!(editor.actions().undo_len(), depth);
}
