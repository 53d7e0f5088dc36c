//! Audit command - one-off analyzer run

use std::path::{Path, PathBuf};

use code_audit::attribution::Attribution;
use code_audit::engine::{AuditEngine, AuditRequest};
use code_audit::ledger::MemoryLedgerStore;
use code_audit::output::{AuditResult, OutputMode};
use code_audit::vcs::GitVersionControl;

use super::load_settings;
use crate::cli::AttributionArgs;

/// Run the analyzer over a target and compare the score to `fail_under`
pub fn audit(
    project: Option<&Path>,
    file: Option<String>,
    attribution: &AttributionArgs,
    fail_under: f64,
    output: Option<PathBuf>,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let settings = load_settings(project)?;
    let vcs = GitVersionControl::new(settings.root.clone());
    // ad-hoc runs are never recorded
    let store = MemoryLedgerStore::new();
    let engine = AuditEngine::new(settings, &store, vcs);

    let request = AuditRequest {
        target: file,
        attribution: Attribution::select(attribution.file_author.as_deref(), attribution.identity()),
        output,
    };

    let run = engine.audit(&request)?;
    let result = AuditResult::new(run, fail_under);
    result.render(mode);

    if !result.passed {
        std::process::exit(1);
    }
    Ok(())
}
