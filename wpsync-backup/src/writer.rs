//! Archive writers.
//!
//! The archiver only needs "write a compressed archive of this tree, minus
//! these exclusions"; [`ArchiveWriter`] is that contract and [`TarGzWriter`]
//! is the shipped implementation.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use walkdir::WalkDir;

use wpsync_core::{slash_path, ExclusionSet};

/// Writes a compressed snapshot of a directory tree.
pub trait ArchiveWriter {
    /// File extension of produced archives, without the leading dot.
    fn extension(&self) -> &str;

    /// Archive `source_root` into `destination`, skipping excluded entries.
    fn write(&self, source_root: &Path, destination: &Path, excludes: &ExclusionSet)
        -> io::Result<()>;
}

/// Gzip-compressed tarball; entries live under a top-level directory named
/// after the source root.
#[derive(Debug, Clone)]
pub struct TarGzWriter {
    level: Compression,
}

impl Default for TarGzWriter {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl TarGzWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gzip level, 0 (store) to 9 (smallest).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl ArchiveWriter for TarGzWriter {
    fn extension(&self) -> &str {
        "tar.gz"
    }

    fn write(&self, source_root: &Path, destination: &Path, excludes: &ExclusionSet) -> io::Result<()> {
        let prefix = source_root
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("project"));

        let file = File::create(destination)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, self.level));
        builder.follow_symlinks(true);

        let walker = WalkDir::new(source_root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let rel = slash_path(source_root, e.path());
                !excludes.is_excluded(&rel, e.file_type().is_dir())
            });

        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            let name = prefix.join(entry.path().strip_prefix(source_root).unwrap_or(entry.path()));
            if entry.file_type().is_dir() {
                builder.append_dir(&name, entry.path())?;
                continue;
            }
            if entry.path_is_symlink() {
                match std::fs::metadata(entry.path()) {
                    Ok(meta) if meta.is_file() => {}
                    _ => {
                        tracing::debug!(path = %entry.path().display(), "skipping non-file symlink");
                        continue;
                    }
                }
            }
            builder.append_path_with_name(entry.path(), &name)?;
        }

        builder.into_inner()?.finish()?;
        Ok(())
    }
}
