//! Error types for wpsync-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use wpsync_core::{ConfigError, ExcludeError};
use wpsync_remote::TransportError;

use crate::pipeline::RunStage;
use crate::report::SyncReport;

/// Local-side failures while preparing a transfer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Fatal outcomes of the differential transfer.
///
/// Every variant raised after the plan was built carries the report
/// accumulated so far, so callers can still show what happened.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("local scan failed: {0}")]
    Scan(#[from] SyncError),

    /// The connection itself failed (unreachable, timeout, client missing).
    #[error("transport failure: {source}")]
    Transport {
        #[source]
        source: TransportError,
        report: Box<SyncReport>,
    },

    /// A per-file operation failed in a way the partial-transfer policy does
    /// not tolerate.
    #[error("transfer of {relative_path} failed: {source}")]
    Fatal {
        relative_path: String,
        #[source]
        source: TransportError,
        report: Box<SyncReport>,
    },

    /// The remote directory itself could not be created.
    #[error("could not create remote directory {dir}: {source}")]
    RootUnavailable {
        dir: String,
        #[source]
        source: TransportError,
        report: Box<SyncReport>,
    },

    #[error("{failed} files failed to transfer (limit {limit})")]
    TooManyFailures {
        failed: usize,
        limit: usize,
        report: Box<SyncReport>,
    },
}

impl TransferError {
    /// Report accumulated before the failure, when the plan was reached.
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            TransferError::Scan(_) => None,
            TransferError::Transport { report, .. }
            | TransferError::Fatal { report, .. }
            | TransferError::RootUnavailable { report, .. }
            | TransferError::TooManyFailures { report, .. } => Some(report),
        }
    }
}

/// Fatal failures of the remote eraser.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote host unreachable: {0}")]
    Unreachable(#[source] TransportError),

    #[error("failed to erase remote directory {dir}: {reason}")]
    EraseFailed { dir: String, reason: String },
}

/// Why a run stopped.
#[derive(Debug, Error)]
pub enum PipelineErrorKind {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exclusions(#[from] ExcludeError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("cancelled by user")]
    Cancelled,
}

/// A failed run: the stage it stopped in, the cause, and whatever report
/// was produced before stopping.
#[derive(Debug)]
pub struct PipelineError {
    pub stage: RunStage,
    pub kind: PipelineErrorKind,
    pub report: Option<SyncReport>,
}

impl PipelineError {
    pub(crate) fn new(stage: RunStage, kind: impl Into<PipelineErrorKind>) -> Self {
        let kind = kind.into();
        let report = match &kind {
            PipelineErrorKind::Transfer(err) => err.report().cloned(),
            _ => None,
        };
        Self {
            stage,
            kind,
            report,
        }
    }

    pub(crate) fn cancelled(stage: RunStage, report: Option<SyncReport>) -> Self {
        Self {
            stage,
            kind: PipelineErrorKind::Cancelled,
            report,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, PipelineErrorKind::Cancelled)
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self.kind, PipelineErrorKind::Config(_))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.kind)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
