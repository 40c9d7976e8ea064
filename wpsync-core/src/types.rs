//! Domain types shared by every wpsync crate.
//!
//! Local paths use `PathBuf`. Remote paths are POSIX strings joined with `/`
//! because they are interpreted by the remote host, not by this machine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What is being deployed; decides where it lands on the remote host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    #[default]
    Plugin,
    Theme,
    Custom,
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectKind::Plugin => write!(f, "plugin"),
            ProjectKind::Theme => write!(f, "theme"),
            ProjectKind::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for ProjectKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plugin" => Ok(Self::Plugin),
            "theme" => Ok(Self::Theme),
            "custom" => Ok(Self::Custom),
            other => Err(ConfigError::InvalidProjectKind(other.to_string())),
        }
    }
}

/// File, directory, or (remote listings only) symbolic link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// Never matches a local entry, so a remote link is always removed and
    /// replaced rather than written through.
    Symlink,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Dir)
    }
}

/// Per-entry outcome of comparing the local tree against the remote tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Missing remotely; will be (or was) uploaded.
    Created,
    /// Present remotely but differs by size or modification time.
    Updated,
    /// Present remotely only (or newly excluded); will be (or was) removed.
    Deleted,
    Unchanged,
}

impl Classification {
    /// `true` for everything except [`Classification::Unchanged`].
    pub fn is_change(self) -> bool {
        !matches!(self, Classification::Unchanged)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Created => write!(f, "created"),
            Classification::Updated => write!(f, "updated"),
            Classification::Deleted => write!(f, "deleted"),
            Classification::Unchanged => write!(f, "unchanged"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync target
// ---------------------------------------------------------------------------

/// Where a project comes from and where it is deployed to.
///
/// Built once per invocation from [`Config`](crate::Config); there are no
/// setters, so the resolved remote directory can never drift from the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    project_name: String,
    project_kind: ProjectKind,
    local_root: PathBuf,
    remote_host: String,
    remote_user: String,
    remote_base_dir: String,
    resolved_remote_dir: String,
}

impl SyncTarget {
    /// Build a target, deriving the remote directory from `project_kind`.
    ///
    /// Plugin and theme targets need `remote_base_dir`; custom targets need an
    /// absolute `custom_remote_dir` and ignore the base.
    pub fn new(
        project_name: impl Into<String>,
        project_kind: ProjectKind,
        local_root: impl Into<PathBuf>,
        remote_host: impl Into<String>,
        remote_user: impl Into<String>,
        remote_base_dir: Option<&str>,
        custom_remote_dir: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let project_name = project_name.into();
        if project_name.trim().is_empty() {
            return Err(ConfigError::MissingField("project_name"));
        }
        let base = remote_base_dir
            .map(trim_trailing_slash)
            .filter(|b| !b.is_empty());
        let resolved_remote_dir =
            resolve_remote_dir(project_kind, base.as_deref(), &project_name, custom_remote_dir)?;

        Ok(Self {
            project_name,
            project_kind,
            local_root: local_root.into(),
            remote_host: remote_host.into(),
            remote_user: remote_user.into(),
            remote_base_dir: base.unwrap_or_default(),
            resolved_remote_dir,
        })
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_kind(&self) -> ProjectKind {
        self.project_kind
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn remote_user(&self) -> &str {
        &self.remote_user
    }

    pub fn remote_base_dir(&self) -> &str {
        &self.remote_base_dir
    }

    /// Absolute remote directory that mirrors `local_root`.
    pub fn resolved_remote_dir(&self) -> &str {
        &self.resolved_remote_dir
    }

    /// Absolute remote path for an entry relative to the project root.
    pub fn remote_path(&self, relative: &str) -> String {
        remote_join(&self.resolved_remote_dir, relative)
    }

    /// `user@host`, or just `host` when no user is configured.
    pub fn destination(&self) -> String {
        if self.remote_user.is_empty() {
            self.remote_host.clone()
        } else {
            format!("{}@{}", self.remote_user, self.remote_host)
        }
    }
}

/// Derive the deployment directory for a project.
///
/// - plugin → `{base}/plugins/{name}`
/// - theme → `{base}/themes/{name}`
/// - custom → `custom` verbatim (must be absolute)
///
/// A directory that resolves to the filesystem root is rejected, so nothing
/// downstream can list, erase or delete from `/`.
pub fn resolve_remote_dir(
    kind: ProjectKind,
    base: Option<&str>,
    project_name: &str,
    custom: Option<&str>,
) -> Result<String, ConfigError> {
    match kind {
        ProjectKind::Plugin | ProjectKind::Theme => {
            let base = base.ok_or(ConfigError::MissingField("remote_base_dir"))?;
            let segment = if kind == ProjectKind::Plugin {
                "plugins"
            } else {
                "themes"
            };
            Ok(remote_join(&remote_join(base, segment), project_name))
        }
        ProjectKind::Custom => {
            let custom = custom
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or(ConfigError::MissingCustomDir)?;
            if !custom.starts_with('/') {
                return Err(ConfigError::RelativeCustomDir(custom.to_string()));
            }
            if is_filesystem_root(custom) {
                return Err(ConfigError::RootRemoteDir(custom.to_string()));
            }
            Ok(trim_trailing_slash(custom))
        }
    }
}

fn is_filesystem_root(path: &str) -> bool {
    path.split('/').all(|segment| segment.is_empty() || segment == ".")
}

/// Join two POSIX path fragments with exactly one `/` between them.
pub fn remote_join(base: &str, child: &str) -> String {
    let child = child.trim_start_matches('/');
    if child.is_empty() {
        return base.to_string();
    }
    if base.ends_with('/') {
        format!("{base}{child}")
    } else {
        format!("{base}/{child}")
    }
}

/// `/`-joined form of `path` relative to `root` (lossy for non-UTF-8 names).
pub fn slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn trim_trailing_slash(path: &str) -> String {
    path.trim().trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// Run options and policies
// ---------------------------------------------------------------------------

/// Per-invocation switches, fixed once the command line has been parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub create_backup: bool,
}

/// How many backup archives survive pruning. `0` disables a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_archives_per_version: u32,
    pub max_age_days: u32,
}

impl RetentionPolicy {
    /// Pruning only runs when at least one limit is set.
    pub fn is_active(&self) -> bool {
        self.max_archives_per_version > 0 || self.max_age_days > 0
    }
}

/// Boundary between a tolerable per-file transport failure and a fatal one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialTransferPolicy {
    /// Exit statuses treated as "this file was skipped" rather than fatal.
    pub tolerated_exit_codes: Vec<i32>,
    /// Upper bound on skipped files before the run fails; `None` is unlimited.
    pub max_failed_files: Option<usize>,
}

/// Exit codes tolerated by default: generic per-file failure, plus the rsync
/// "partial transfer" and "source files vanished" statuses.
pub const DEFAULT_TOLERATED_EXIT_CODES: &[i32] = &[1, 23, 24];

impl Default for PartialTransferPolicy {
    fn default() -> Self {
        Self {
            tolerated_exit_codes: DEFAULT_TOLERATED_EXIT_CODES.to_vec(),
            max_failed_files: None,
        }
    }
}

impl PartialTransferPolicy {
    pub fn tolerates(&self, code: i32) -> bool {
        self.tolerated_exit_codes.contains(&code)
    }

    pub fn exceeded_by(&self, failed: usize) -> bool {
        self.max_failed_files.is_some_and(|max| failed > max)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One inspected entry and what the transfer engine decided for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// `/`-separated path relative to the project root.
    pub relative_path: String,
    pub kind: EntryKind,
    pub classification: Classification,
    pub size_bytes: u64,
}

/// A backup archive written to local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArchive {
    pub project_name: String,
    /// Version read from the project descriptor; empty when unknown.
    pub version: String,
    pub created_at: DateTime<Local>,
    pub file_path: PathBuf,
    pub size_bytes: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
