//! Error types for wpsync-backup.

use std::path::PathBuf;

use thiserror::Error;

use wpsync_core::ExcludeError;

/// All errors that can arise while creating or pruning backups.
///
/// None of these abort a deployment; the pipeline downgrades them to warnings.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The archive writer reported a failure; no archive was kept.
    #[error("archive creation failed for {path}: {reason}")]
    ArchiveCreationFailed { path: PathBuf, reason: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup exclusion error: {0}")]
    Exclude(#[from] ExcludeError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BackupError {
    BackupError::Io {
        path: path.into(),
        source,
    }
}
