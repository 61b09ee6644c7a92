//! Shared fixtures for integration tests

#![allow(dead_code)]

use phyco::prelude::*;
use phyco::{DependencyGraph, StatisticStore};

/// Everything an undo must restore
#[derive(Debug, PartialEq)]
pub struct State {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub charts: Vec<Chart>,
    pub graph: DependencyGraph,
    pub statistics: StatisticStore,
}

pub fn state(editor: &Editor) -> State {
    let table = editor.table();
    State {
        columns: table.columns().to_vec(),
        rows: table.rows().to_vec(),
        charts: table.charts().to_vec(),
        graph: table.graph().clone(),
        statistics: table.statistics().clone(),
    }
}

pub fn add_column(editor: &mut Editor, name: &str, column_type: &str, formula: Option<&str>) -> NodeKey {
    let report = editor.submit(Intent::AddColumn {
        name: name.into(),
        column_type: column_type.into(),
        formula: formula.map(str::to_string),
    });
    assert!(report.is_valid(), "add column {} rejected: {:?}", name, report);
    editor
        .table()
        .column_by_name(name)
        .expect("column was added")
        .key()
        .clone()
}

pub fn add_row(editor: &mut Editor) {
    assert!(editor.submit(Intent::AddRow).is_valid());
}

pub fn set_cell(editor: &mut Editor, column: &NodeKey, row_index: usize, value: &str) {
    let report = editor.submit(Intent::EditCell {
        column_key: column.clone(),
        row_index,
        value: value.into(),
    });
    assert!(report.is_valid(), "edit rejected: {:?}", report);
}

pub fn cells(editor: &Editor, column: &NodeKey) -> Vec<String> {
    editor
        .table()
        .column_cells(column)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Keys of the standard fixture
pub struct Fixture {
    pub editor: Editor,
    pub a: NodeKey,
    pub label: NodeKey,
    pub b: NodeKey,
    pub m: NodeKey,
}

/// `A = [1, 2, 3]`, `Label` text, `B = [A] * 2`, `M = [A.mean]`
pub fn fixture() -> Fixture {
    let mut editor = Editor::new();
    let a = add_column(&mut editor, "A", "numerical", None);
    let label = add_column(&mut editor, "Label", "text", None);
    let b = add_column(&mut editor, "B", "formula", Some("[A] * 2"));
    let m = add_column(&mut editor, "M", "formula", Some("[A.mean]"));
    add_row(&mut editor);
    add_row(&mut editor);
    for (i, value) in ["1", "2", "3"].iter().enumerate() {
        set_cell(&mut editor, &a, i, value);
    }
    set_cell(&mut editor, &label, 0, "first");
    Fixture {
        editor,
        a,
        label,
        b,
        m,
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
