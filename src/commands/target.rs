//! Target command - manage recorded audit targets

use std::path::Path;

use code_audit::engine::AuditEngine;
use code_audit::ledger::{JsonLedgerStore, LedgerStore, NewTarget};
use code_audit::output::{
    AuditResult, HistoryInfo, OperationResult, OutputMode, TargetInfo, TargetListResult,
    TargetShowResult,
};
use code_audit::vcs::GitVersionControl;

use super::load_settings;
use crate::cli::{AttributionArgs, TargetAction};

/// Handle target subcommands
pub fn target_cmd(project: Option<&Path>, action: TargetAction, mode: OutputMode) -> anyhow::Result<()> {
    match action {
        TargetAction::Add {
            module,
            file,
            attribution,
        } => add(project, module, file, &attribution, mode),
        TargetAction::List => list(project, mode),
        TargetAction::Show { id } => show(project, id, mode),
        TargetAction::Run { id, fail_under } => run(project, id, fail_under, mode),
    }
}

fn add(
    project: Option<&Path>,
    module: String,
    file: Option<String>,
    attribution: &AttributionArgs,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let settings = load_settings(project)?;
    let store = JsonLedgerStore::new(&settings.ledger_path);

    let target = store.create(NewTarget {
        module_name: module,
        target: file.filter(|f| !f.trim().is_empty()),
        file_author: attribution.file_author.clone().filter(|a| !a.trim().is_empty()),
        git_user: attribution.identity(),
    })?;

    if mode == OutputMode::Json {
        println!(
            "{}",
            serde_json::json!({
                "success": true,
                "id": target.id,
                "module": target.module_name,
                "target": target.target,
            })
        );
    } else {
        println!("Created audit target: {}", target.id);
        println!("  Module: {}", target.module_name);
        println!("  Target: {}", target.target.as_deref().unwrap_or("(whole project)"));
    }
    Ok(())
}

fn list(project: Option<&Path>, mode: OutputMode) -> anyhow::Result<()> {
    let settings = load_settings(project)?;
    let store = JsonLedgerStore::new(&settings.ledger_path);

    let targets = store
        .list()?
        .iter()
        .map(|t| Ok(TargetInfo::new(t, &store.history(t.id)?)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let result = TargetListResult {
        total: targets.len(),
        targets,
    };
    result.render(mode);
    Ok(())
}

fn show(project: Option<&Path>, id: u64, mode: OutputMode) -> anyhow::Result<()> {
    let settings = load_settings(project)?;
    let store = JsonLedgerStore::new(&settings.ledger_path);

    let result = match store.get(id)? {
        Some(target) => {
            let history = store.history(id)?;
            TargetShowResult {
                found: true,
                target: Some(TargetInfo::new(&target, &history)),
                history: history.iter().map(HistoryInfo::from).collect(),
            }
        },
        None => TargetShowResult {
            found: false,
            target: None,
            history: Vec::new(),
        },
    };

    result.render(mode);
    Ok(())
}

fn run(project: Option<&Path>, id: u64, fail_under: f64, mode: OutputMode) -> anyhow::Result<()> {
    let settings = load_settings(project)?;
    let store = JsonLedgerStore::new(&settings.ledger_path);
    let vcs = GitVersionControl::new(settings.root.clone());
    let engine = AuditEngine::new(settings, &store, vcs);

    let run = match engine.run_target(id) {
        Ok(run) => run,
        Err(e) => {
            OperationResult {
                success: false,
                message: format!("Audit target {id} not run: {e}"),
            }
            .render(mode);
            std::process::exit(1);
        },
    };

    let result = AuditResult::new(run, fail_under);
    result.render(mode);
    if !result.passed {
        std::process::exit(1);
    }
    Ok(())
}
