//! Tests for the Output module
//!
//! Output provides structured result types that can be rendered as either
//! human-readable text or machine-parseable JSON.

use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use code_audit::engine::RunReport;
use code_audit::ledger::{AuditTarget, HistoryEntry, TargetStatus};
use code_audit::output::{
    AuditResult, HistoryInfo, OperationResult, OutputMode, TargetInfo, TargetListResult, UnitListResult,
};
use code_audit::registry::{Provenance, UnitClassification};

fn completed_run(score: f64) -> RunReport {
    RunReport {
        target_id: None,
        files: vec![PathBuf::from("billing/views.py")],
        report_path: Some(PathBuf::from("reports/views_20260101_120000.html")),
        score: Some(score),
        status: TargetStatus::Completed,
        error: None,
        history: None,
    }
}

fn sample_target() -> AuditTarget {
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    AuditTarget {
        id: 4,
        module_name: "billing".to_string(),
        target: Some("views.py".to_string()),
        file_author: Some("alice".to_string()),
        git_user: None,
        last_run: Some(at),
        status: TargetStatus::Completed,
        report_paths: vec![PathBuf::from("reports/views.html")],
        score: Some(8.5),
        created_at: at,
        updated_at: at,
    }
}

fn history_entry(score: f64) -> HistoryEntry {
    let at = Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap();
    HistoryEntry {
        target_id: 4,
        score,
        report_paths: vec![PathBuf::from("reports/old.html")],
        run_at: at,
        recorded_at: at,
    }
}

// =============================================================================
// OutputMode Tests
// =============================================================================

#[test]
fn output_mode_default() {
    assert_eq!(OutputMode::default(), OutputMode::Human);
}

// =============================================================================
// AuditResult Tests
// =============================================================================

#[test]
fn audit_result_passes_at_threshold() {
    let result = AuditResult::new(completed_run(8.0), 8.0);
    assert!(result.passed);
}

#[test]
fn audit_result_fails_below_threshold() {
    let result = AuditResult::new(completed_run(7.99), 8.0);
    assert!(!result.passed);
}

#[test]
fn audit_result_failed_run_never_passes() {
    let run = RunReport {
        status: TargetStatus::Failed,
        error: Some("pylint exited with status 1: boom".to_string()),
        ..completed_run(9.0)
    };
    assert!(!AuditResult::new(run, 0.0).passed);
}

#[test]
fn audit_result_serialization_is_flat() {
    let result = AuditResult::new(completed_run(9.25), 8.0);
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();

    assert_eq!(json["passed"], true);
    assert_eq!(json["threshold"], 8.0);
    assert_eq!(json["score"], 9.25);
    assert_eq!(json["status"], "completed");
    assert_eq!(json["files"][0], "billing/views.py");
    assert!(json.get("target_id").is_none());
    assert!(json.get("error").is_none());
}

// =============================================================================
// Target Tests
// =============================================================================

#[test]
fn target_info_takes_last_score_from_newest_history() {
    let info = TargetInfo::new(&sample_target(), &[history_entry(6.0), history_entry(4.0)]);

    assert_eq!(info.score, Some(8.5));
    assert_eq!(info.last_score, Some(6.0));
    assert_eq!(info.attribution.as_deref(), Some("author: alice"));
    assert_eq!(info.report_paths, vec!["reports/views.html".to_string()]);
    assert_eq!(info.last_run.as_deref(), Some("2026-03-01T12:00:00+00:00"));
}

#[test]
fn target_info_without_history() {
    let mut target = sample_target();
    target.file_author = None;
    let info = TargetInfo::new(&target, &[]);

    assert!(info.last_score.is_none());
    assert!(info.attribution.is_none());
}

#[test]
fn target_list_serialization() {
    let result = TargetListResult {
        targets: vec![TargetInfo::new(&sample_target(), &[])],
        total: 1,
    };
    let json = serde_json::to_string(&result).unwrap();

    assert!(json.contains("\"total\":1"));
    assert!(json.contains("\"module_name\":\"billing\""));
    assert!(json.contains("\"status\":\"completed\""));
}

#[test]
fn history_info_from_entry() {
    let info = HistoryInfo::from(&history_entry(5.5));
    assert!((info.score - 5.5).abs() < f64::EPSILON);
    assert_eq!(info.run_at, "2026-02-01T09:30:00+00:00");
    assert_eq!(info.report_paths, vec!["reports/old.html".to_string()]);
}

// =============================================================================
// Misc Result Tests
// =============================================================================

#[test]
fn unit_list_serialization() {
    let result = UnitListResult {
        units: vec![
            UnitClassification {
                name: "billing".to_string(),
                root: Some(PathBuf::from("billing")),
                provenance: Provenance::FirstParty,
            },
            UnitClassification {
                name: "rest_framework".to_string(),
                root: None,
                provenance: Provenance::Unresolved,
            },
        ],
    };
    let json: serde_json::Value = serde_json::to_value(&result).unwrap();

    assert_eq!(json["units"][0]["provenance"], "first_party");
    assert_eq!(json["units"][1]["provenance"], "unresolved");
    assert!(json["units"][1]["root"].is_null());
}

#[test]
fn operation_result_serialization() {
    let result = OperationResult {
        success: false,
        message: "Audit target 3 not run: empty target".to_string(),
    };
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"success\":false"));
    assert!(json.contains("empty target"));
}
