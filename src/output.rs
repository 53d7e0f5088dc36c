//! Output formatting for human and JSON modes
//!
//! Every command builds one of the result types below and renders it either
//! as human-readable text or as machine-parseable JSON.

use colored::Colorize;
use serde::Serialize;

use crate::engine::RunReport;
use crate::ledger::{AuditTarget, HistoryEntry, TargetStatus};
use crate::registry::{Provenance, UnitClassification};

/// Output mode for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output (machine-readable)
    Json,
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.2}"))
}

fn colored_status(status: TargetStatus) -> String {
    match status {
        TargetStatus::NotRun => status.to_string().dimmed().to_string(),
        TargetStatus::Completed => status.to_string().green().to_string(),
        TargetStatus::Failed => status.to_string().red().to_string(),
    }
}

/// Result of an `audit` or `target run`
#[derive(Debug, Serialize)]
pub struct AuditResult {
    /// Whether the score reached the threshold
    pub passed: bool,
    /// Minimum acceptable score
    pub threshold: f64,
    /// The run itself
    #[serde(flatten)]
    pub run: RunReport,
}

impl AuditResult {
    /// Evaluate `run` against `threshold`
    #[must_use]
    pub fn new(run: RunReport, threshold: f64) -> Self {
        Self {
            passed: run.passes(threshold),
            threshold,
            run,
        }
    }

    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => self.render_human(),
            OutputMode::Json => print_json(self),
        }
    }

    fn render_human(&self) {
        println!("Analyzed {} path(s)", self.run.files.len());
        for file in &self.run.files {
            println!("  {}", file.display());
        }
        if let Some(report) = &self.run.report_path {
            println!("Report: {}", report.display());
        }
        if let Some(prior) = &self.run.history {
            println!("Previous score: {:.2}", prior.score);
        }
        if let Some(error) = &self.run.error {
            println!("{} {error}", "Run failed:".red().bold());
        }

        let score = self.run.score.unwrap_or(0.0);
        if self.passed {
            println!("Score: {score:.2}");
            println!("{}", "Audit passed".green().bold());
        } else {
            println!(
                "{}",
                format!("Audit failed. Score {score:.2} < {:.2}", self.threshold).red().bold()
            );
        }
    }
}

/// Summary of one registered target
#[derive(Debug, Serialize)]
pub struct TargetInfo {
    /// Target identity
    pub id: u64,
    /// Module / unit name
    pub module_name: String,
    /// Target specification
    pub target: Option<String>,
    /// Attribution, as configured
    pub attribution: Option<String>,
    /// Most recent status
    pub status: TargetStatus,
    /// Current score
    pub score: Option<f64>,
    /// Score held before the last completed run
    pub last_score: Option<f64>,
    /// Current reports
    pub report_paths: Vec<String>,
    /// Last successful run (RFC 3339)
    pub last_run: Option<String>,
}

impl TargetInfo {
    /// Build from a target and its history (newest first)
    #[must_use]
    pub fn new(target: &AuditTarget, history: &[HistoryEntry]) -> Self {
        let attribution = match (&target.file_author, &target.git_user) {
            (Some(author), _) => Some(format!("author: {author}")),
            (None, Some(user)) => Some(format!("git user: {user}")),
            (None, None) => None,
        };
        Self {
            id: target.id,
            module_name: target.module_name.clone(),
            target: target.target.clone(),
            attribution,
            status: target.status,
            score: target.score,
            last_score: history.first().map(|h| h.score),
            report_paths: target.report_paths.iter().map(|p| p.display().to_string()).collect(),
            last_run: target.last_run.map(|t| t.to_rfc3339()),
        }
    }
}

/// Result of `target list`
#[derive(Debug, Serialize)]
pub struct TargetListResult {
    /// Registered targets
    pub targets: Vec<TargetInfo>,
    /// Number of targets
    pub total: usize,
}

impl TargetListResult {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => self.render_human(),
            OutputMode::Json => print_json(self),
        }
    }

    fn render_human(&self) {
        if self.targets.is_empty() {
            println!("No audit targets registered.");
            println!("Add one with: code-audit target add <module> --file <target>");
            return;
        }

        println!("Audit targets ({}):\n", self.total);
        for t in &self.targets {
            println!(
                "  [{}] {} {}  {}",
                t.id,
                t.module_name.bold(),
                t.target.as_deref().unwrap_or("(whole project)"),
                colored_status(t.status)
            );
            println!(
                "       score: {}  last score: {}  last run: {}",
                format_score(t.score),
                format_score(t.last_score),
                t.last_run.as_deref().unwrap_or("never")
            );
        }
    }
}

/// One history row
#[derive(Debug, Serialize)]
pub struct HistoryInfo {
    /// Snapshotted score
    pub score: f64,
    /// Snapshotted reports
    pub report_paths: Vec<String>,
    /// When that run happened (RFC 3339)
    pub run_at: String,
}

impl From<&HistoryEntry> for HistoryInfo {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            score: entry.score,
            report_paths: entry.report_paths.iter().map(|p| p.display().to_string()).collect(),
            run_at: entry.run_at.to_rfc3339(),
        }
    }
}

/// Result of `target show`
#[derive(Debug, Serialize)]
pub struct TargetShowResult {
    /// Whether the target was found
    pub found: bool,
    /// The target
    pub target: Option<TargetInfo>,
    /// Its history, newest first
    pub history: Vec<HistoryInfo>,
}

impl TargetShowResult {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => self.render_human(),
            OutputMode::Json => print_json(self),
        }
    }

    fn render_human(&self) {
        let Some(t) = &self.target else {
            println!("Audit target not found.");
            return;
        };

        println!("[{}] {}", t.id, t.module_name.bold());
        println!("  Target:      {}", t.target.as_deref().unwrap_or("(whole project)"));
        if let Some(attribution) = &t.attribution {
            println!("  Attribution: {attribution}");
        }
        println!("  Status:      {}", colored_status(t.status));
        println!("  Score:       {}", format_score(t.score));
        println!("  Last run:    {}", t.last_run.as_deref().unwrap_or("never"));
        for report in &t.report_paths {
            println!("  Report:      {report}");
        }

        if self.history.is_empty() {
            return;
        }
        println!("\nHistory:");
        for h in &self.history {
            println!("  {}  {:.2}", h.run_at, h.score);
        }
    }
}

/// Result of `apps`
#[derive(Debug, Serialize)]
pub struct UnitListResult {
    /// Declared units with their classification
    pub units: Vec<UnitClassification>,
}

impl UnitListResult {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => self.render_human(),
            OutputMode::Json => print_json(self),
        }
    }

    fn render_human(&self) {
        if self.units.is_empty() {
            println!("No application units declared.");
            return;
        }
        for unit in &self.units {
            let label = format!("{:<12}", unit.provenance.to_string());
            let provenance = match unit.provenance {
                Provenance::FirstParty => label.green(),
                _ => label.dimmed(),
            };
            let root = unit.root.as_ref().map_or_else(|| "-".to_string(), |r| r.display().to_string());
            println!("  {:<24} {provenance} {root}", unit.name);
        }
    }
}

/// Generic operation result for simple commands
#[derive(Debug, Serialize)]
pub struct OperationResult {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable message
    pub message: String,
}

impl OperationResult {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => println!("{}", self.message),
            OutputMode::Json => print_json(self),
        }
    }
}
