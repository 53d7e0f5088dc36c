//! Stored report retrieval

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ledger::{LedgerStore, TargetId};

/// Why a report could not be produced
#[derive(Debug, Error)]
pub enum ReportLookupError {
    /// No target with this identity
    #[error("audit target {0} does not exist")]
    UnknownTarget(TargetId),

    /// The target never completed a run
    #[error("no report has been generated for target {0} yet")]
    NeverGenerated(TargetId),

    /// The ledger points at a file that is gone
    #[error("report {} no longer exists", .0.display())]
    MissingOnDisk(PathBuf),

    /// Asked for a report the target does not have
    #[error("report index {index} out of range ({available} available)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of stored reports
        available: usize,
    },

    /// The file exists but could not be read
    #[error("report {} is unreadable: {source}", .path.display())]
    Unreadable {
        /// Report path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The ledger itself failed
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Read the stored report text of target `id`.
///
/// `index` selects among the reports of the last successful run and
/// defaults to the first one.
pub fn read_report(
    store: &dyn LedgerStore,
    id: TargetId,
    index: Option<usize>,
) -> Result<String, ReportLookupError> {
    let target = store.get(id)?.ok_or(ReportLookupError::UnknownTarget(id))?;
    if target.report_paths.is_empty() {
        return Err(ReportLookupError::NeverGenerated(id));
    }

    let index = index.unwrap_or(0);
    let Some(path) = target.report_paths.get(index) else {
        return Err(ReportLookupError::IndexOutOfRange {
            index,
            available: target.report_paths.len(),
        });
    };

    if !path.exists() {
        return Err(ReportLookupError::MissingOnDisk(path.clone()));
    }
    fs::read_to_string(path).map_err(|source| ReportLookupError::Unreadable {
        path: path.clone(),
        source,
    })
}
