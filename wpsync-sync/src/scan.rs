//! Local tree scan.

use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use wpsync_core::{slash_path, EntryKind, ExclusionSet};

use crate::error::{io_err, SyncError};

/// One deployable entry of the local tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    /// `/`-separated, relative to the source root.
    pub relative_path: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    /// Whole seconds since the Unix epoch.
    pub modified: i64,
}

/// Walk `source_root` in lexical order, skipping excluded entries.
///
/// Excluded directories are pruned, so nothing below them is visited.
/// Symlinks to files are followed; symlinks to directories and broken links
/// are skipped.
pub fn scan_local(source_root: &Path, excludes: &ExclusionSet) -> Result<Vec<LocalEntry>, SyncError> {
    let meta = std::fs::metadata(source_root).map_err(|e| io_err(source_root, e))?;
    if !meta.is_dir() {
        return Err(io_err(
            source_root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "source root is not a directory"),
        ));
    }

    let walker = WalkDir::new(source_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let rel = slash_path(source_root, e.path());
            let excluded = excludes.is_excluded(&rel, e.file_type().is_dir());
            if excluded {
                tracing::trace!(path = %rel, "excluded");
            }
            !excluded
        });

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source_root).to_path_buf();
            io_err(path, e.into())
        })?;
        let relative_path = slash_path(source_root, entry.path());

        let meta = if entry.path_is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => {
                    tracing::debug!(path = %relative_path, "skipping directory symlink");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(path = %relative_path, error = %err, "skipping broken symlink");
                    continue;
                }
            }
        } else {
            entry.metadata().map_err(|e| io_err(entry.path(), e.into()))?
        };

        let kind = if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        entries.push(LocalEntry {
            relative_path,
            path: entry.path().to_path_buf(),
            kind,
            size: if kind.is_dir() { 0 } else { meta.len() },
            modified: FileTime::from_last_modification_time(&meta).unix_seconds(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wpsync_core::Provenance;

    #[test]
    fn scan_is_sorted_and_prunes_excluded_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        std::fs::write(root.join("src/b.php"), "bb").unwrap();
        std::fs::write(root.join("a.php"), "a").unwrap();

        let excludes =
            ExclusionSet::from_patterns(&["node_modules/"], Provenance::IgnoreFile).unwrap();
        let entries = scan_local(root, &excludes).unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.relative_path.as_str()).collect();

        assert_eq!(paths, vec!["a.php", "src", "src/b.php"]);
        assert_eq!(entries[0].size, 1);
        assert_eq!(entries[1].kind, EntryKind::Dir);
        assert_eq!(entries[1].size, 0);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan_local(&tmp.path().join("absent"), &ExclusionSet::default()).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn file_symlinks_followed_dir_and_broken_links_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("real.txt"), "12345").unwrap();
        std::os::unix::fs::symlink(outside.join("real.txt"), root.join("link.txt")).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("linkdir")).unwrap();
        std::os::unix::fs::symlink(outside.join("gone"), root.join("broken")).unwrap();

        let entries = scan_local(&root, &ExclusionSet::default()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path, "link.txt");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].size, 5);
    }
}
