//! Run report: what was classified, what failed, and whether the run was cut
//! short.

use std::fmt;
use std::path::PathBuf;

use wpsync_core::{ChangeRecord, Classification};

/// The mutating call that failed for a [`FileFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    MakeDir,
    Upload,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::MakeDir => "mkdir",
            Operation::Upload => "upload",
            Operation::Remove => "remove",
        };
        write!(f, "{s}")
    }
}

/// A tolerated per-file failure; the run continued past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub relative_path: String,
    pub operation: Operation,
    pub reason: String,
}

/// Outcome of one transfer (or its dry-run preview).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub source_root: PathBuf,
    /// `user@host:/dir` style description of the destination.
    pub destination: String,
    pub dry_run: bool,
    /// Every inspected entry, sorted by relative path.
    pub records: Vec<ChangeRecord>,
    pub failures: Vec<FileFailure>,
    /// Operations actually issued against the remote.
    pub operations_issued: usize,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn new(source_root: impl Into<PathBuf>, destination: impl Into<String>, dry_run: bool) -> Self {
        Self {
            source_root: source_root.into(),
            destination: destination.into(),
            dry_run,
            ..Self::default()
        }
    }

    pub fn count(&self, classification: Classification) -> usize {
        self.records
            .iter()
            .filter(|r| r.classification == classification)
            .count()
    }

    /// Records that are not `Unchanged`.
    pub fn changes(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(|r| r.classification.is_change())
    }

    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Bytes of created and updated files.
    pub fn bytes_to_transfer(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| {
                !r.kind.is_dir()
                    && matches!(
                        r.classification,
                        Classification::Created | Classification::Updated
                    )
            })
            .map(|r| r.size_bytes)
            .sum()
    }

    pub fn record(&self, relative_path: &str) -> Option<&ChangeRecord> {
        self.records.iter().find(|r| r.relative_path == relative_path)
    }
}
