// Tests for the CSV/JSON output sink

use sifter_core::config::{OutputFormat, OutputOptions};
use sifter_core::output::{OutputSink, run_timestamp, write_csv, write_json};
use sifter_core::RunError;
use sifter_scanner::reconcile::{columns, reconcile};
use sifter_scanner::{FieldValue, RawRecord, UniformRecord};
use std::fs;
use tempfile::TempDir;

fn records() -> (Vec<String>, Vec<UniformRecord>) {
    let raw = vec![
        RawRecord::new([
            ("title".to_string(), FieldValue::Text("Lamp, brass".to_string())),
            ("price".to_string(), FieldValue::Text("$12".to_string())),
        ]),
        RawRecord::new([("title".to_string(), FieldValue::Text("Rug".to_string()))]),
    ];
    (columns(&raw), reconcile(&raw))
}

fn sink(dir: &TempDir, format: OutputFormat) -> OutputSink {
    OutputSink::new(OutputOptions {
        dir: dir.path().join("out"),
        base_name: "listing".to_string(),
        format,
    })
}

// ============================================================================
// File Naming
// ============================================================================

#[test]
fn test_run_timestamp_format() {
    let ts = run_timestamp();
    assert_eq!(ts.len(), 15);
    assert_eq!(&ts[8..9], "_");
    assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
}

#[test]
fn test_both_formats_written_with_timestamped_names() {
    let dir = TempDir::new().unwrap();
    let (cols, rows) = records();

    let written = sink(&dir, OutputFormat::Both)
        .write_at("20240101_120000", &cols, &rows)
        .unwrap();

    let csv = written.csv.unwrap();
    let json = written.json.unwrap();
    assert_eq!(csv, dir.path().join("out").join("listing_20240101_120000.csv"));
    assert_eq!(json, dir.path().join("out").join("listing_20240101_120000.json"));
    assert!(csv.exists());
    assert!(json.exists());
}

#[test]
fn test_single_format() {
    let dir = TempDir::new().unwrap();
    let (cols, rows) = records();

    let written = sink(&dir, OutputFormat::Json).write(&cols, &rows).unwrap();
    assert!(written.csv.is_none());
    assert_eq!(written.paths().count(), 1);
}

// ============================================================================
// File Contents
// ============================================================================

#[test]
fn test_csv_contents() {
    let dir = TempDir::new().unwrap();
    let (cols, rows) = records();
    let path = dir.path().join("out.csv");

    write_csv(&path, &cols, &rows).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec!["title,price", "\"Lamp, brass\",$12", "Rug,N/A"]);
}

#[test]
fn test_json_contents() {
    let dir = TempDir::new().unwrap();
    let (_, rows) = records();
    let path = dir.path().join("out.json");

    write_json(&path, &rows).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(
        value,
        serde_json::json!([
            {"title": "Lamp, brass", "price": "$12"},
            {"title": "Rug", "price": null}
        ])
    );
    // Column order survives serialization
    let first = content.find("\"title\"").unwrap();
    let second = content.find("\"price\"").unwrap();
    assert!(first < second);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unwritable_directory_is_output_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let (cols, rows) = records();

    let sink = OutputSink::new(OutputOptions {
        dir: blocker.join("nested"),
        base_name: "listing".to_string(),
        format: OutputFormat::Csv,
    });

    let err = sink.write(&cols, &rows).unwrap_err();
    assert!(matches!(err, RunError::Output { .. }));
}
