//! In-memory transport that records every call.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;

use wpsync_core::{CancelFlag, EntryKind, SyncTarget};
use wpsync_remote::{BulkTransfer, CommandOutput, RemoteEntry, RemoteExecutor, TransportError};

pub const REMOTE_DIR: &str = "/srv/wp/wp-content/plugins/my-plugin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubEntry {
    pub kind: EntryKind,
    pub size: u64,
    pub modified: i64,
}

#[derive(Debug, Clone, Copy)]
pub enum StubFailure {
    Status(i32),
    Unreachable,
}

#[derive(Debug, Default)]
pub struct StubTransport {
    /// Absolute remote path → entry.
    pub entries: BTreeMap<String, StubEntry>,
    pub commands: Vec<String>,
    pub mutations: usize,
    pub lists: usize,
    /// Every call fails as unreachable.
    pub unreachable: bool,
    /// Per-path failures, keyed by the path relative to [`REMOTE_DIR`].
    pub failures: BTreeMap<String, StubFailure>,
    /// Exit statuses for successive `execute` calls; missing means 0.
    pub command_statuses: Vec<i32>,
    /// Set the flag once this many mutations have happened.
    pub cancel_after: Option<(usize, CancelFlag)>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, relative: &str, size: u64, modified: i64) -> Self {
        self.entries.insert(
            remote(relative),
            StubEntry {
                kind: EntryKind::File,
                size,
                modified,
            },
        );
        self
    }

    pub fn with_dir(mut self, relative: &str) -> Self {
        self.entries.insert(
            remote(relative),
            StubEntry {
                kind: EntryKind::Dir,
                size: 4096,
                modified: 0,
            },
        );
        self
    }

    /// Paths relative to [`REMOTE_DIR`], sorted.
    pub fn relative_paths(&self) -> Vec<String> {
        let prefix = format!("{REMOTE_DIR}/");
        self.entries
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn entry(&self, relative: &str) -> Option<&StubEntry> {
        self.entries.get(&remote(relative))
    }

    fn check(&self, remote_path: &str) -> Result<(), TransportError> {
        if self.unreachable {
            return Err(unreachable());
        }
        let relative = remote_path
            .strip_prefix(REMOTE_DIR)
            .map(|r| r.trim_start_matches('/'))
            .unwrap_or(remote_path);
        match self.failures.get(relative) {
            Some(StubFailure::Status(code)) => Err(TransportError::Status {
                code: *code,
                stderr: format!("cannot write {relative}"),
            }),
            Some(StubFailure::Unreachable) => Err(unreachable()),
            None => Ok(()),
        }
    }

    fn mutated(&mut self) {
        self.mutations += 1;
        if let Some((after, flag)) = &self.cancel_after {
            if self.mutations >= *after {
                flag.cancel();
            }
        }
    }

    fn remove_tree(&mut self, path: &str) {
        let below = format!("{path}/");
        self.entries
            .retain(|k, _| k != path && !k.starts_with(&below));
    }
}

pub fn remote(relative: &str) -> String {
    format!("{REMOTE_DIR}/{relative}")
}

fn unreachable() -> TransportError {
    TransportError::Unreachable {
        host: "example.com".to_string(),
        reason: "connection refused".to_string(),
    }
}

impl RemoteExecutor for StubTransport {
    fn execute(&mut self, command: &str) -> Result<CommandOutput, TransportError> {
        if self.unreachable {
            return Err(unreachable());
        }
        let idx = self.commands.len();
        self.commands.push(command.to_string());
        let status = self.command_statuses.get(idx).copied().unwrap_or(0);
        if status == 0 {
            if let Some(dir) = command
                .strip_prefix("rm -rf '")
                .and_then(|rest| rest.strip_suffix("'/*"))
            {
                let dir = dir.to_string();
                let below = format!("{dir}/");
                self.entries.retain(|k, _| !k.starts_with(&below));
            }
        }
        Ok(CommandOutput {
            status,
            stdout: String::new(),
            stderr: if status == 0 {
                String::new()
            } else {
                "permission denied".to_string()
            },
        })
    }
}

impl BulkTransfer for StubTransport {
    fn list(&mut self, remote_dir: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        if self.unreachable {
            return Err(unreachable());
        }
        self.lists += 1;
        let prefix = format!("{remote_dir}/");
        Ok(self
            .entries
            .iter()
            .filter_map(|(k, e)| {
                k.strip_prefix(&prefix).map(|rel| RemoteEntry {
                    relative_path: rel.to_string(),
                    kind: e.kind,
                    size: e.size,
                    modified: e.modified,
                })
            })
            .collect())
    }

    fn make_dir(&mut self, remote_path: &str) -> Result<(), TransportError> {
        self.check(remote_path)?;
        self.mutated();
        self.entries.insert(
            remote_path.to_string(),
            StubEntry {
                kind: EntryKind::Dir,
                size: 4096,
                modified: 0,
            },
        );
        Ok(())
    }

    fn upload(&mut self, local: &Path, remote_path: &str, modified: i64) -> Result<(), TransportError> {
        self.check(remote_path)?;
        self.mutated();
        let size = fs::metadata(local)
            .map_err(|source| TransportError::Io {
                path: local.to_path_buf(),
                source,
            })?
            .len();
        self.entries.insert(
            remote_path.to_string(),
            StubEntry {
                kind: EntryKind::File,
                size,
                modified,
            },
        );
        Ok(())
    }

    fn remove(&mut self, remote_path: &str, _kind: EntryKind) -> Result<(), TransportError> {
        self.check(remote_path)?;
        self.mutated();
        self.remove_tree(remote_path);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn target(local_root: &Path) -> SyncTarget {
    SyncTarget::new(
        "my-plugin",
        wpsync_core::ProjectKind::Plugin,
        local_root,
        "example.com",
        "deploy",
        Some("/srv/wp/wp-content"),
        None,
    )
    .expect("target")
}

/// Write `content` at `root/relative` with a fixed mtime.
pub fn write_file(root: &Path, relative: &str, content: &str, mtime: i64) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(&path, content).expect("write");
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).expect("mtime");
    path
}
