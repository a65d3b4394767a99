//! Integration test: structured log files and the artifact index.
//!
//! Validates that:
//! 1. A file-backed emitter writes one valid JSONL record per event.
//! 2. validate_log_file reports malformed lines with their line numbers.
//! 3. The artifact index records SHA-256 digests and sizes of real files.
//!
//! Run: cargo test -p boundary-harness --test structured_log_test

use std::path::PathBuf;

use boundary_harness::Round;
use boundary_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogLevel, Outcome, Phase, sha256_hex, validate_log_file,
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("boundary-harness-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn file_emitter_output_validates() {
    let dir = scratch_dir("log");
    let path = dir.join("run.jsonl");
    {
        let mut log = LogEmitter::to_file(&path, "file-test").unwrap();
        let start = log.entry(LogLevel::Info, "suite_start");
        log.emit_entry(start).unwrap();
        let entry = log
            .entry(LogLevel::Info, "variant_timed")
            .with_variant("arena")
            .with_round(Round::ArenaIndex)
            .with_phase(Phase::Time)
            .with_outcome(Outcome::Pass)
            .with_latency_ns(1234.5);
        log.emit_entry(entry).unwrap();
        log.flush().unwrap();
    }

    let (lines, errors) = validate_log_file(&path).unwrap();
    assert_eq!(lines, 2);
    assert!(errors.is_empty(), "{errors:?}");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains(r#""trace_id":"boundary::file-test::0002""#));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn malformed_lines_are_located() {
    let dir = scratch_dir("bad-log");
    let path = dir.join("bad.jsonl");
    let good = r#"{"timestamp":"2026-01-01T00:00:00.000Z","trace_id":"boundary::r::0001","level":"info","event":"ok"}"#;
    std::fs::write(&path, format!("{good}\n\nnot json\n{good}\n")).unwrap();

    let (lines, errors) = validate_log_file(&path).unwrap();
    assert_eq!(lines, 3);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line_number, 3);
    assert_eq!(errors[0].field, "<json>");
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn artifact_index_hashes_files() {
    let dir = scratch_dir("artifacts");
    let report = dir.join("report.json");
    std::fs::write(&report, b"{}").unwrap();

    let mut index = ArtifactIndex::new("artifact-test");
    index.add_file(&report, "report").unwrap();
    assert!(index.add_file(&dir.join("missing.json"), "report").is_err());

    let parsed: serde_json::Value = serde_json::from_str(&index.to_json().unwrap()).unwrap();
    let artifacts = parsed["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0]["kind"], "report");
    assert_eq!(artifacts[0]["size_bytes"], 2);
    assert_eq!(artifacts[0]["sha256"], sha256_hex(b"{}"));
    std::fs::remove_dir_all(&dir).ok();
}
