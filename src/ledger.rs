//! Run ledger
//!
//! Keeps one [`AuditTarget`] record per registered target plus an
//! append-only list of [`HistoryEntry`] snapshots.
//!
//! A history entry captures the score and reports a target held *before* a
//! run overwrote them; the current values always live on the target itself.
//! Failed runs only flip the status and never touch score or reports.
//!
//! Storage is pluggable through [`LedgerStore`]:
//! - [`JsonLedgerStore`]: a single JSON document on disk (default)
//! - [`MemoryLedgerStore`]: in-process, for embedding and tests

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attribution::{Attribution, VcsIdentity};

/// Identity of an audit target
pub type TargetId = u64;

/// Most recent run status of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Registered, never run
    #[default]
    NotRun,
    /// Last run produced a report
    Completed,
    /// Last run failed
    Failed,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRun => write!(f, "not_run"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Fields supplied when registering a target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTarget {
    /// Module / unit name the target belongs to
    pub module_name: String,
    /// Target specification; `None` audits the whole project
    pub target: Option<String>,
    /// Author marker
    pub file_author: Option<String>,
    /// VCS user marker
    pub git_user: Option<VcsIdentity>,
}

/// The unit of tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTarget {
    /// Identity
    pub id: TargetId,
    /// Module / unit name
    pub module_name: String,
    /// Target specification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Author marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_author: Option<String>,
    /// VCS user marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_user: Option<VcsIdentity>,
    /// When the last successful run finished
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    /// Most recent status
    #[serde(default)]
    pub status: TargetStatus,
    /// Reports of the last successful run
    #[serde(default)]
    pub report_paths: Vec<PathBuf>,
    /// Score of the last successful run
    #[serde(default)]
    pub score: Option<f64>,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl AuditTarget {
    fn from_new(id: TargetId, new: NewTarget) -> Self {
        let now = Utc::now();
        Self {
            id,
            module_name: new.module_name,
            target: new.target,
            file_author: new.file_author,
            git_user: new.git_user,
            last_run: None,
            status: TargetStatus::NotRun,
            report_paths: Vec::new(),
            score: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The attribution criterion configured for this target
    #[must_use]
    pub fn attribution(&self) -> Option<Attribution> {
        Attribution::select(self.file_author.as_deref(), self.git_user.clone())
    }
}

/// Immutable snapshot of a target's previous result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Parent target
    pub target_id: TargetId,
    /// Score held before the run
    pub score: f64,
    /// Reports held before the run
    pub report_paths: Vec<PathBuf>,
    /// When the snapshotted run happened
    pub run_at: DateTime<Utc>,
    /// When the snapshot was taken
    pub recorded_at: DateTime<Utc>,
}

/// What a run produced
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The analyzer ran and wrote reports
    Completed {
        /// Extracted score
        score: f64,
        /// Generated reports
        report_paths: Vec<PathBuf>,
    },
    /// The run failed before producing a report
    Failed {
        /// Human-readable cause
        reason: String,
    },
}

/// Persistence contract for the ledger
pub trait LedgerStore: Send + Sync {
    /// Register a new target
    fn create(&self, new: NewTarget) -> anyhow::Result<AuditTarget>;

    /// Read a target by identity
    fn get(&self, id: TargetId) -> anyhow::Result<Option<AuditTarget>>;

    /// Replace a target in place
    fn update(&self, target: &AuditTarget) -> anyhow::Result<()>;

    /// Append a history entry
    fn append_history(&self, entry: &HistoryEntry) -> anyhow::Result<()>;

    /// History of a target, newest first
    fn history(&self, id: TargetId) -> anyhow::Result<Vec<HistoryEntry>>;

    /// All targets, by identity
    fn list(&self) -> anyhow::Result<Vec<AuditTarget>>;

    /// Apply a run: optional history entry plus the updated target.
    ///
    /// Implementations backed by a single document should override this to
    /// write both in one step.
    fn commit_run(&self, target: &AuditTarget, entry: Option<&HistoryEntry>) -> anyhow::Result<()> {
        if let Some(entry) = entry {
            self.append_history(entry)?;
        }
        self.update(target)
    }
}

/// Serialized ledger contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerDocument {
    /// Last identity handed out
    #[serde(default)]
    pub last_id: TargetId,
    /// Registered targets
    #[serde(default)]
    pub targets: Vec<AuditTarget>,
    /// History entries, in insertion order
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl LedgerDocument {
    fn create(&mut self, new: NewTarget) -> AuditTarget {
        self.last_id += 1;
        let target = AuditTarget::from_new(self.last_id, new);
        self.targets.push(target.clone());
        target
    }

    fn get(&self, id: TargetId) -> Option<AuditTarget> {
        self.targets.iter().find(|t| t.id == id).cloned()
    }

    fn update(&mut self, target: &AuditTarget) -> anyhow::Result<()> {
        let Some(slot) = self.targets.iter_mut().find(|t| t.id == target.id) else {
            anyhow::bail!("unknown audit target {}", target.id);
        };
        *slot = target.clone();
        Ok(())
    }

    fn append(&mut self, entry: &HistoryEntry) -> anyhow::Result<()> {
        if !self.targets.iter().any(|t| t.id == entry.target_id) {
            anyhow::bail!("unknown audit target {}", entry.target_id);
        }
        self.history.push(entry.clone());
        Ok(())
    }

    fn history(&self, id: TargetId) -> Vec<HistoryEntry> {
        let mut entries: Vec<_> = self.history.iter().filter(|h| h.target_id == id).cloned().collect();
        entries.reverse();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        entries
    }
}

fn locked<T>(mutex: &Mutex<T>) -> anyhow::Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow::anyhow!("ledger lock poisoned"))
}

/// In-memory ledger
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    doc: Mutex<LedgerDocument>,
}

impl MemoryLedgerStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn create(&self, new: NewTarget) -> anyhow::Result<AuditTarget> {
        Ok(locked(&self.doc)?.create(new))
    }

    fn get(&self, id: TargetId) -> anyhow::Result<Option<AuditTarget>> {
        Ok(locked(&self.doc)?.get(id))
    }

    fn update(&self, target: &AuditTarget) -> anyhow::Result<()> {
        locked(&self.doc)?.update(target)
    }

    fn append_history(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        locked(&self.doc)?.append(entry)
    }

    fn history(&self, id: TargetId) -> anyhow::Result<Vec<HistoryEntry>> {
        Ok(locked(&self.doc)?.history(id))
    }

    fn list(&self) -> anyhow::Result<Vec<AuditTarget>> {
        Ok(locked(&self.doc)?.targets.clone())
    }

    fn commit_run(&self, target: &AuditTarget, entry: Option<&HistoryEntry>) -> anyhow::Result<()> {
        let mut doc = locked(&self.doc)?;
        let mut staged = doc.clone();
        if let Some(entry) = entry {
            staged.append(entry)?;
        }
        staged.update(target)?;
        *doc = staged;
        Ok(())
    }
}

/// JSON-file ledger
///
/// Every mutation loads the document, applies the change and replaces the
/// file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct JsonLedgerStore {
    path: PathBuf,
    io: Mutex<()>,
}

impl JsonLedgerStore {
    /// Open (lazily) the ledger at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    /// Ledger file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<LedgerDocument> {
        if !self.path.exists() {
            return Ok(LedgerDocument::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(LedgerDocument::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, doc: &LedgerDocument) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(doc)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&LedgerDocument) -> R) -> anyhow::Result<R> {
        let _io = locked(&self.io)?;
        Ok(f(&self.load()?))
    }

    fn write<R>(&self, f: impl FnOnce(&mut LedgerDocument) -> anyhow::Result<R>) -> anyhow::Result<R> {
        let _io = locked(&self.io)?;
        let mut doc = self.load()?;
        let result = f(&mut doc)?;
        self.save(&doc)?;
        Ok(result)
    }
}

impl LedgerStore for JsonLedgerStore {
    fn create(&self, new: NewTarget) -> anyhow::Result<AuditTarget> {
        self.write(|doc| Ok(doc.create(new)))
    }

    fn get(&self, id: TargetId) -> anyhow::Result<Option<AuditTarget>> {
        self.read(|doc| doc.get(id))
    }

    fn update(&self, target: &AuditTarget) -> anyhow::Result<()> {
        self.write(|doc| doc.update(target))
    }

    fn append_history(&self, entry: &HistoryEntry) -> anyhow::Result<()> {
        self.write(|doc| doc.append(entry))
    }

    fn history(&self, id: TargetId) -> anyhow::Result<Vec<HistoryEntry>> {
        self.read(|doc| doc.history(id))
    }

    fn list(&self) -> anyhow::Result<Vec<AuditTarget>> {
        self.read(|doc| doc.targets.clone())
    }

    fn commit_run(&self, target: &AuditTarget, entry: Option<&HistoryEntry>) -> anyhow::Result<()> {
        self.write(|doc| {
            if let Some(entry) = entry {
                doc.append(entry)?;
            }
            doc.update(target)
        })
    }
}

/// Per-target run locks, released when the [`TargetGuard`] drops
#[derive(Debug, Default)]
struct TargetLocks {
    held: Mutex<HashSet<TargetId>>,
    released: Condvar,
}

/// Exclusive claim on one target for the duration of a run
#[derive(Debug)]
pub struct TargetGuard<'l> {
    locks: &'l TargetLocks,
    id: TargetId,
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut held) = self.locks.held.lock() {
            held.remove(&self.id);
        }
        self.locks.released.notify_all();
    }
}

/// Records run outcomes against targets
#[derive(Debug)]
pub struct RunLedger<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    locks: TargetLocks,
}

impl<'a, S: LedgerStore + ?Sized> RunLedger<'a, S> {
    /// Wrap a store
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            locks: TargetLocks::default(),
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &'a S {
        self.store
    }

    /// Block until no other run holds target `id`, then claim it
    pub fn lock(&self, id: TargetId) -> anyhow::Result<TargetGuard<'_>> {
        let mut held = locked(&self.locks.held)?;
        while held.contains(&id) {
            held = self
                .locks
                .released
                .wait(held)
                .map_err(|_| anyhow::anyhow!("ledger lock poisoned"))?;
        }
        held.insert(id);
        Ok(TargetGuard {
            locks: &self.locks,
            id,
        })
    }

    /// Record `outcome` for target `id`.
    ///
    /// Returns the history entry created for the previous result, if the
    /// target had one and the run completed.
    pub fn record_run(&self, id: TargetId, outcome: RunOutcome) -> anyhow::Result<Option<HistoryEntry>> {
        let _guard = self.lock(id)?;
        self.apply(id, outcome)
    }

    /// Record `outcome` without claiming the target; the caller holds its guard
    pub(crate) fn apply(&self, id: TargetId, outcome: RunOutcome) -> anyhow::Result<Option<HistoryEntry>> {
        let mut target = self
            .store
            .get(id)?
            .ok_or_else(|| anyhow::anyhow!("unknown audit target {id}"))?;
        let now = Utc::now();

        match outcome {
            RunOutcome::Completed { score, report_paths } if !report_paths.is_empty() => {
                let entry = target.score.map(|previous| HistoryEntry {
                    target_id: id,
                    score: previous,
                    report_paths: target.report_paths.clone(),
                    run_at: target.last_run.unwrap_or(now),
                    recorded_at: now,
                });

                target.score = Some(score);
                target.report_paths = report_paths;
                target.status = TargetStatus::Completed;
                target.last_run = Some(now);
                target.updated_at = now;

                self.store.commit_run(&target, entry.as_ref())?;
                log::info!("target {id} completed with score {score:.2}");
                Ok(entry)
            },
            RunOutcome::Completed { .. } => {
                self.mark_failed(target, now, "analyzer produced no report")?;
                Ok(None)
            },
            RunOutcome::Failed { reason } => {
                self.mark_failed(target, now, &reason)?;
                Ok(None)
            },
        }
    }

    fn mark_failed(&self, mut target: AuditTarget, now: DateTime<Utc>, reason: &str) -> anyhow::Result<()> {
        log::warn!("target {} failed: {reason}", target.id);
        target.status = TargetStatus::Failed;
        target.updated_at = now;
        self.store.commit_run(&target, None)
    }
}
