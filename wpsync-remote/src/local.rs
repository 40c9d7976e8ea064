//! Transport whose "remote" directory lives on this machine.
//!
//! Useful for staging a deployment into a mounted share and for exercising
//! the full pipeline in tests without a network.

use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::process::{Command, Stdio};

use filetime::FileTime;
use walkdir::WalkDir;

use wpsync_core::{slash_path, EntryKind};

use crate::error::{io_err, TransportError};
use crate::transport::{BulkTransfer, CommandOutput, RemoteEntry, RemoteExecutor};

/// Runs commands with `sh -c` and file operations with `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct LocalTransport;

impl LocalTransport {
    pub fn new() -> Self {
        Self
    }
}

impl RemoteExecutor for LocalTransport {
    fn execute(&mut self, command: &str) -> Result<CommandOutput, TransportError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| TransportError::Spawn {
                program: "sh".to_string(),
                source,
            })?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl BulkTransfer for LocalTransport {
    fn list(&mut self, remote_dir: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let root = Path::new(remote_dir);
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                io_err(path, e.into())
            })?;
            let meta = entry.metadata().map_err(|e| io_err(entry.path(), e.into()))?;
            let relative_path = slash_path(root, entry.path());
            let kind = if entry.path_is_symlink() {
                EntryKind::Symlink
            } else if meta.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };
            entries.push(RemoteEntry {
                relative_path,
                kind,
                size: if kind.is_dir() { 0 } else { meta.len() },
                modified: FileTime::from_last_modification_time(&meta).unix_seconds(),
            });
        }
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }

    fn make_dir(&mut self, remote_path: &str) -> Result<(), TransportError> {
        std::fs::create_dir_all(remote_path).map_err(|e| io_err(remote_path, e))
    }

    fn upload(&mut self, local: &Path, remote_path: &str, modified: i64) -> Result<(), TransportError> {
        let dest = Path::new(remote_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let is_link = std::fs::symlink_metadata(dest).is_ok_and(|m| m.file_type().is_symlink());
        if is_link {
            std::fs::remove_file(dest).map_err(|e| io_err(dest, e))?;
        }
        let mut source = File::open(local).map_err(|e| io_err(local, e))?;
        let mut out = File::create(dest).map_err(|e| io_err(dest, e))?;
        io::copy(&mut source, &mut out).map_err(|e| io_err(dest, e))?;
        drop(out);
        filetime::set_file_mtime(dest, FileTime::from_unix_time(modified, 0))
            .map_err(|e| io_err(dest, e))
    }

    fn remove(&mut self, remote_path: &str, kind: EntryKind) -> Result<(), TransportError> {
        let result = if kind.is_dir() {
            std::fs::remove_dir_all(remote_path)
        } else {
            std::fs::remove_file(remote_path)
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(remote_path, err)),
        }
    }
}
