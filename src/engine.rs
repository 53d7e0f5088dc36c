//! Audit engine
//!
//! Wires the pipeline together:
//!
//! ```text
//! registry -> resolver -> attribution -> analyzer -> ledger
//! ```
//!
//! [`AuditEngine::audit`] is the ad-hoc entry point used by the `audit`
//! command; nothing is persisted and every failure is an `Err`.
//! [`AuditEngine::run_target`] runs a registered target and records the
//! outcome. Analyzer failures on that path end up in the target's status
//! instead of being raised, so batch callers always see a consistent
//! record.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

use crate::analyzer::{AnalyzeError, AnalyzerInvoker, score_report};
use crate::attribution::{Attribution, AttributionFilter, VcsIdentity};
use crate::config::Settings;
use crate::ledger::{HistoryEntry, LedgerStore, RunLedger, RunOutcome, TargetId, TargetStatus};
use crate::registry::first_party_units;
use crate::resolver::{ResolveError, ResolvedFileSet, Resolver};
use crate::target::TargetSpec;
use crate::vcs::VersionControl;

/// Stem used when a run has neither target nor attribution to name it after
pub const APP_LEVEL_STEM: &str = "app_level_report";

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum AuditError {
    /// Target resolution failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Analyzer invocation failed
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    /// Resolution and attribution left nothing to analyze
    #[error("no files to audit")]
    NoFilesToAudit,

    /// No registered target with this identity
    #[error("audit target {0} does not exist")]
    UnknownTarget(TargetId),

    /// Persistence or VCS failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Parameters of an ad-hoc audit
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    /// Target specification; `None` audits every first-party unit
    pub target: Option<String>,
    /// Attribution criterion
    pub attribution: Option<Attribution>,
    /// Explicit report destination
    pub output: Option<PathBuf>,
}

/// What one run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Ledger target, for recorded runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
    /// Files handed to the analyzer
    pub files: Vec<PathBuf>,
    /// Report location, if one was written
    pub report_path: Option<PathBuf>,
    /// Extracted score
    pub score: Option<f64>,
    /// Resulting status
    pub status: TargetStatus,
    /// Failure cause, for failed runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Snapshot of the previous result, for recorded runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryEntry>,
}

impl RunReport {
    /// Whether the score reaches `threshold`
    #[must_use]
    pub fn passes(&self, threshold: f64) -> bool {
        self.status == TargetStatus::Completed && self.score.is_some_and(|s| s >= threshold)
    }
}

/// Runs audits for one project
#[derive(Debug)]
pub struct AuditEngine<'a, S: LedgerStore + ?Sized, V: VersionControl> {
    settings: Settings,
    ledger: RunLedger<'a, S>,
    vcs: V,
}

impl<'a, S: LedgerStore + ?Sized, V: VersionControl> AuditEngine<'a, S, V> {
    /// Create an engine over `store`, using `vcs` for VCS attribution
    #[must_use]
    pub fn new(settings: Settings, store: &'a S, vcs: V) -> Self {
        Self {
            settings,
            ledger: RunLedger::new(store),
            vcs,
        }
    }

    /// The settings in use
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The run ledger
    #[must_use]
    pub const fn ledger(&self) -> &RunLedger<'a, S> {
        &self.ledger
    }

    /// Resolver over the current first-party units
    #[must_use]
    pub fn resolver(&self) -> Resolver {
        Resolver::new(first_party_units(&self.settings), self.settings.source_suffix.clone())
    }

    /// Resolve and narrow the analyzer input
    pub fn collect(
        &self,
        target: Option<&str>,
        attribution: Option<&Attribution>,
    ) -> Result<ResolvedFileSet, AuditError> {
        let resolver = self.resolver();
        log::debug!("{} first-party unit(s)", resolver.units().len());

        let candidates = match target.map(str::trim).filter(|t| !t.is_empty()) {
            Some(target) => resolver.resolve(&TargetSpec::new(target))?,
            None => resolver.scan_sources(),
        };

        let files = match attribution {
            Some(attribution) => AttributionFilter::new(&resolver, &self.vcs).apply(&candidates, attribution)?,
            None => candidates,
        };

        if files.is_empty() {
            return Err(AuditError::NoFilesToAudit);
        }
        Ok(files)
    }

    /// Run an ad-hoc audit; nothing is recorded
    pub fn audit(&self, request: &AuditRequest) -> Result<RunReport, AuditError> {
        let files = self.collect(request.target.as_deref(), request.attribution.as_ref())?;
        let destination = match &request.output {
            Some(path) => path.clone(),
            None => self.report_destination(request.target.as_deref(), request.attribution.as_ref())?,
        };

        let invocation = self.invoker().invoke(&files, &destination)?;
        let score = score_or_zero(&invocation.report_path);

        Ok(RunReport {
            target_id: None,
            files: files.into_paths(),
            report_path: Some(invocation.report_path),
            score: Some(score),
            status: TargetStatus::Completed,
            error: None,
            history: None,
        })
    }

    /// Run a registered target and record the outcome
    pub fn run_target(&self, id: TargetId) -> Result<RunReport, AuditError> {
        let _guard = self.ledger.lock(id)?;

        let target = self.ledger.store().get(id)?.ok_or(AuditError::UnknownTarget(id))?;
        let attribution = target.attribution();
        let files = self.collect(target.target.as_deref(), attribution.as_ref())?;
        let destination = self.report_destination(target.target.as_deref(), attribution.as_ref())?;

        match self.invoker().invoke(&files, &destination) {
            Ok(invocation) => {
                let score = score_or_zero(&invocation.report_path);
                let outcome = RunOutcome::Completed {
                    score,
                    report_paths: vec![invocation.report_path.clone()],
                };
                let history = self.ledger.apply(id, outcome)?;
                Ok(RunReport {
                    target_id: Some(id),
                    files: files.into_paths(),
                    report_path: Some(invocation.report_path),
                    score: Some(score),
                    status: TargetStatus::Completed,
                    error: None,
                    history,
                })
            },
            Err(err @ AnalyzeError::ConfigNotFound(_)) => {
                self.ledger.apply(id, RunOutcome::Failed { reason: err.to_string() })?;
                Err(err.into())
            },
            Err(err) => {
                let reason = err.to_string();
                self.ledger.apply(id, RunOutcome::Failed { reason: reason.clone() })?;
                Ok(RunReport {
                    target_id: Some(id),
                    files: files.into_paths(),
                    report_path: None,
                    score: target.score,
                    status: TargetStatus::Failed,
                    error: Some(reason),
                    history: None,
                })
            },
        }
    }

    fn invoker(&self) -> AnalyzerInvoker {
        AnalyzerInvoker::new(self.settings.analyzer.clone())
    }

    fn report_destination(
        &self,
        target: Option<&str>,
        attribution: Option<&Attribution>,
    ) -> Result<PathBuf, AuditError> {
        let spec = target.map(TargetSpec::new);
        let stem = match spec.as_ref().and_then(|t| t.stem(&self.settings.source_suffix)) {
            Some(stem) => stem.to_string(),
            None => self.attribution_stem(attribution)?,
        };
        let base = format!("{}_{}", sanitize_stem(&stem), Local::now().format("%Y%m%d_%H%M%S"));
        Ok(unused_report_path(
            &self.settings.report_dir,
            &base,
            &self.settings.report_extension,
        ))
    }

    fn attribution_stem(&self, attribution: Option<&Attribution>) -> anyhow::Result<String> {
        Ok(match attribution {
            Some(Attribution::Author(author)) => author.clone(),
            Some(Attribution::VcsUser(VcsIdentity::Explicit(user))) => user.clone(),
            Some(Attribution::VcsUser(VcsIdentity::Local)) => self
                .vcs
                .configured_user()?
                .unwrap_or_else(|| APP_LEVEL_STEM.to_string()),
            None => APP_LEVEL_STEM.to_string(),
        })
    }
}

fn score_or_zero(report: &Path) -> f64 {
    score_report(report).unwrap_or_else(|e| {
        log::warn!("{e}; scoring as 0.0");
        0.0
    })
}

/// `<dir>/<base><ext>`, or `<dir>/<base>_<n><ext>` for the first free `n`
/// when that file already exists
fn unused_report_path(dir: &Path, base: &str, extension: &str) -> PathBuf {
    let first = dir.join(format!("{base}{extension}"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("{base}_{n}{extension}")))
        .find(|path| !path.exists())
        .unwrap_or(first)
}

/// Reduce `stem` to `[A-Za-z0-9_-]`, replacing anything else with `_`
#[must_use]
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        APP_LEVEL_STEM.to_string()
    } else {
        cleaned
    }
}
