//! Backup creation: version lookup, archive naming, writing and pruning.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::Local;

use wpsync_core::{anchored_pattern, BackupArchive, ExclusionSet, Provenance, RetentionPolicy};

use crate::error::{io_err, BackupError};
use crate::naming::archive_file_name;
use crate::retention::enforce_retention;
use crate::version::extract_version;
use crate::writer::ArchiveWriter;

/// What to back up and where.
#[derive(Debug, Clone, Copy)]
pub struct BackupRequest<'a> {
    pub project_name: &'a str,
    pub source_root: &'a Path,
    pub backup_dir: &'a Path,
    /// Backup-specific exclusions (`backup_exclude_patterns`).
    pub excludes: &'a ExclusionSet,
}

/// Write a timestamped archive of `request.source_root` into
/// `request.backup_dir`, then prune older archives per `policy`.
///
/// The backup directory is always left out of the archive when it lives
/// inside the source tree. A failed write leaves no partial file behind.
/// Pruning problems are logged and never fail the backup.
pub fn create_backup<W: ArchiveWriter + ?Sized>(
    writer: &W,
    request: &BackupRequest<'_>,
    policy: &RetentionPolicy,
) -> Result<BackupArchive, BackupError> {
    let version = extract_version(request.source_root, request.project_name);
    let created_at = Local::now();
    let file_name = archive_file_name(
        request.project_name,
        &version,
        &created_at,
        writer.extension(),
    );

    fs::create_dir_all(request.backup_dir).map_err(|e| io_err(request.backup_dir, e))?;
    let archive_path = request.backup_dir.join(&file_name);

    let excludes = with_backup_dir_excluded(request)?;

    tracing::info!(
        project = request.project_name,
        version = %version,
        path = %archive_path.display(),
        "creating backup archive"
    );

    if let Err(err) = writer.write(request.source_root, &archive_path, &excludes) {
        if let Err(cleanup) = fs::remove_file(&archive_path) {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %archive_path.display(),
                    error = %cleanup,
                    "failed to remove partial archive"
                );
            }
        }
        return Err(BackupError::ArchiveCreationFailed {
            path: archive_path,
            reason: err.to_string(),
        });
    }

    let size_bytes = fs::metadata(&archive_path)
        .map_err(|e| io_err(&archive_path, e))?
        .len();

    match enforce_retention(
        request.backup_dir,
        request.project_name,
        writer.extension(),
        policy,
        &archive_path,
        SystemTime::now(),
    ) {
        Ok(removed) if !removed.is_empty() => {
            tracing::info!(count = removed.len(), "pruned old backups");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "backup retention failed"),
    }

    Ok(BackupArchive {
        project_name: request.project_name.to_string(),
        version,
        created_at,
        file_path: archive_path,
        size_bytes,
    })
}

fn with_backup_dir_excluded(request: &BackupRequest<'_>) -> Result<ExclusionSet, BackupError> {
    match anchored_pattern(request.source_root, request.backup_dir, true) {
        Some(pattern) => {
            let own = ExclusionSet::from_patterns(&[pattern], Provenance::SelfProtection)?;
            Ok(request.excludes.union(&own)?)
        }
        None => Ok(request.excludes.clone()),
    }
}
