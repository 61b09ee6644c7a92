//! Saving and reopening projects

mod common;

use common::*;
use phyco::prelude::*;
use phyco::Error;
use phyco::RowKey;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn saved_fixture() -> (Fixture, TempDir, std::path::PathBuf) {
    let mut fixture = fixture();
    let columns = vec![fixture.a.clone(), fixture.m.clone()];
    assert!(fixture
        .editor
        .submit(Intent::AddChart {
            name: "Means".into(),
            kind: "bar".into(),
            columns,
        })
        .is_valid());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("experiment.json");
    fixture.editor.save(&path).unwrap();
    (fixture, dir, path)
}

#[test]
fn test_save_and_open() {
    let (fixture, _dir, path) = saved_fixture();
    let opened = Editor::open(&path, EngineOptions::default()).unwrap();

    assert_eq!(opened.snapshot(), fixture.editor.snapshot());
    assert_eq!(opened.table().columns(), fixture.editor.table().columns());
    assert_eq!(opened.table().graph(), fixture.editor.table().graph());
    assert!(!opened.can_undo());
    assert_eq!(cells(&opened, &fixture.b), strings(&["2", "4", "6"]));
}

#[test]
fn test_opened_project_stays_reactive() {
    let (fixture, _dir, path) = saved_fixture();
    let mut opened = Editor::open(&path, EngineOptions::default()).unwrap();

    assert_eq!(opened.recalculate_all(), 2);
    assert_eq!(cells(&opened, &fixture.m), strings(&["2", "2", "2"]));

    set_cell(&mut opened, &fixture.a, 0, "4");
    assert_eq!(cells(&opened, &fixture.b), strings(&["8", "4", "6"]));
    assert_eq!(cells(&opened, &fixture.m), strings(&["3", "3", "3"]));

    // Fresh keys never collide with loaded ones
    let t = add_column(&mut opened, "Time", "numerical", None);
    assert!(![&fixture.a, &fixture.label, &fixture.b, &fixture.m].contains(&&t));
    add_row(&mut opened);
    let keys: Vec<RowKey> = opened.table().rows().iter().map(|r| r.key).collect();
    let mut unique = keys.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(keys.len(), 4);
    assert_eq!(unique.len(), keys.len());
}

#[test]
fn test_file_is_plain_json() {
    let (fixture, _dir, path) = saved_fixture();
    let text = std::fs::read_to_string(&path).unwrap();
    let snapshot = ProjectSnapshot::from_json(&text).unwrap();

    assert_eq!(snapshot.columns.len(), 4);
    assert_eq!(snapshot.columns[2].raw_expression.as_deref(), Some("[A] * 2"));
    assert_eq!(snapshot.charts.len(), 1);
    assert_eq!(snapshot.rows.len(), 3);
    assert_eq!(snapshot.dependencies.len(), fixture.editor.table().graph().edges().len());
}

#[test]
fn test_open_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = Editor::open(dir.path().join("missing.json"), EngineOptions::default());
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_open_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"columns\": [").unwrap();
    let result = Editor::open(&path, EngineOptions::default());
    assert!(matches!(result, Err(Error::Json(_))));
}
