//! Tests for stored report retrieval

use std::fs;
use std::path::PathBuf;

use code_audit::ledger::{LedgerStore, MemoryLedgerStore, NewTarget};
use code_audit::report::{ReportLookupError, read_report};
use tempfile::TempDir;

fn store_with_reports(reports: Vec<PathBuf>) -> (MemoryLedgerStore, u64) {
    let store = MemoryLedgerStore::new();
    let mut target = store
        .create(NewTarget {
            module_name: "billing".to_string(),
            ..NewTarget::default()
        })
        .unwrap();
    target.report_paths = reports;
    store.update(&target).unwrap();
    let id = target.id;
    (store, id)
}

#[test]
fn reads_first_report_by_default() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("views_1.html");
    let second = temp.path().join("views_2.html");
    fs::write(&first, "<html>first</html>").unwrap();
    fs::write(&second, "<html>second</html>").unwrap();
    let (store, id) = store_with_reports(vec![first, second]);

    assert_eq!(read_report(&store, id, None).unwrap(), "<html>first</html>");
    assert_eq!(read_report(&store, id, Some(1)).unwrap(), "<html>second</html>");
}

#[test]
fn unknown_target() {
    let store = MemoryLedgerStore::new();
    assert!(matches!(read_report(&store, 7, None), Err(ReportLookupError::UnknownTarget(7))));
}

#[test]
fn never_generated() {
    let (store, id) = store_with_reports(Vec::new());
    assert!(matches!(read_report(&store, id, None), Err(ReportLookupError::NeverGenerated(_))));
}

#[test]
fn missing_on_disk() {
    let temp = TempDir::new().unwrap();
    let gone = temp.path().join("gone.html");
    let (store, id) = store_with_reports(vec![gone.clone()]);

    match read_report(&store, id, None) {
        Err(ReportLookupError::MissingOnDisk(path)) => assert_eq!(path, gone),
        other => panic!("expected MissingOnDisk, got {other:?}"),
    }
}

#[test]
fn index_out_of_range() {
    let temp = TempDir::new().unwrap();
    let only = temp.path().join("only.html");
    fs::write(&only, "x").unwrap();
    let (store, id) = store_with_reports(vec![only]);

    match read_report(&store, id, Some(3)) {
        Err(ReportLookupError::IndexOutOfRange { index, available }) => {
            assert_eq!(index, 3);
            assert_eq!(available, 1);
        },
        other => panic!("expected IndexOutOfRange, got {other:?}"),
    }
}

#[test]
fn unreadable_report() {
    let temp = TempDir::new().unwrap();
    // a directory exists but cannot be read as a file
    let dir = temp.path().join("report.html");
    fs::create_dir(&dir).unwrap();
    let (store, id) = store_with_reports(vec![dir]);

    assert!(matches!(read_report(&store, id, None), Err(ReportLookupError::Unreadable { .. })));
}
