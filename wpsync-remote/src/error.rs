//! Error types for wpsync-remote.

use std::path::PathBuf;

use thiserror::Error;

/// All errors a transport can raise.
///
/// [`TransportError::is_connection_failure`] separates "the host is gone"
/// from "this one operation failed"; callers decide how tolerant to be with
/// the latter.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote host {host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    #[error("connection to {host} timed out")]
    Timeout { host: String },

    /// The client program itself could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote command ran and exited non-zero.
    #[error("remote command exited with status {code}: {stderr}")]
    Status { code: i32, stderr: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A remote listing line did not have the expected shape.
    #[error("unexpected listing line: {line:?}")]
    Parse { line: String },
}

impl TransportError {
    /// `true` when the transport itself is unusable, independent of any file.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Unreachable { .. }
                | TransportError::Timeout { .. }
                | TransportError::Spawn { .. }
        )
    }

    /// Exit status for [`TransportError::Status`].
    pub fn status_code(&self) -> Option<i32> {
        match self {
            TransportError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TransportError {
    TransportError::Io {
        path: path.into(),
        source,
    }
}
