//! Archive pruning.
//!
//! Two independent rules, both optional:
//!   per-version count: keep at most N archives of each version
//!   age: drop archives whose mtime is older than `now - days`
//!
//! The archive just written is never removed, and removal failures are
//! logged without failing the backup.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use wpsync_core::RetentionPolicy;

use crate::error::{io_err, BackupError};
use crate::naming::parse_archive_name;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    version: String,
    modified: SystemTime,
}

/// Prune archives of `project_name` in `backup_dir` according to `policy`.
///
/// Returns the removed paths, sorted. Files that do not parse as this
/// project's archives are left alone.
///
/// # Errors
/// Only listing `backup_dir` itself can fail; a missing directory is empty.
pub fn enforce_retention(
    backup_dir: &Path,
    project_name: &str,
    extension: &str,
    policy: &RetentionPolicy,
    keep: &Path,
    now: SystemTime,
) -> Result<Vec<PathBuf>, BackupError> {
    if !policy.is_active() {
        return Ok(Vec::new());
    }

    let candidates = list_candidates(backup_dir, project_name, extension)?;
    let mut doomed: BTreeSet<PathBuf> = BTreeSet::new();

    if policy.max_archives_per_version > 0 {
        let limit = policy.max_archives_per_version as usize;
        let mut by_version: BTreeMap<&str, Vec<&Candidate>> = BTreeMap::new();
        for candidate in &candidates {
            by_version
                .entry(candidate.version.as_str())
                .or_default()
                .push(candidate);
        }
        for (version, mut group) in by_version {
            group.sort_by(|a, b| (a.modified, &a.path).cmp(&(b.modified, &b.path)));
            let excess = group.len().saturating_sub(limit);
            let removable = group.iter().filter(|c| c.path != keep).take(excess);
            for candidate in removable {
                tracing::debug!(version, path = %candidate.path.display(), "archive over per-version limit");
                doomed.insert(candidate.path.clone());
            }
        }
    }

    if policy.max_age_days > 0 {
        let max_age = Duration::from_secs(u64::from(policy.max_age_days) * SECS_PER_DAY);
        if let Some(cutoff) = now.checked_sub(max_age) {
            for candidate in &candidates {
                if candidate.path != keep && candidate.modified < cutoff {
                    tracing::debug!(path = %candidate.path.display(), "archive older than age limit");
                    doomed.insert(candidate.path.clone());
                }
            }
        }
    }

    let mut removed = Vec::with_capacity(doomed.len());
    for path in doomed {
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "old backup removed");
                removed.push(path);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove old backup");
            }
        }
    }
    Ok(removed)
}

fn list_candidates(
    backup_dir: &Path,
    project_name: &str,
    extension: &str,
) -> Result<Vec<Candidate>, BackupError> {
    let entries = match fs::read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_err(backup_dir, err)),
    };

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(backup_dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(parsed) = parse_archive_name(name, project_name, extension) else {
            continue;
        };
        let meta = match entry.metadata() {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot stat backup archive");
                continue;
            }
        };
        let modified = meta.modified().map_err(|e| io_err(&path, e))?;
        candidates.push(Candidate {
            path,
            version: parsed.version,
            modified,
        });
    }
    Ok(candidates)
}
