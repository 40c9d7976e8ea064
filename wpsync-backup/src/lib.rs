//! # wpsync-backup
//!
//! Pre-deployment snapshots of the project tree.
//!
//! Call [`create_backup`] to read the project version, write a timestamped
//! archive through an [`ArchiveWriter`], and prune older archives according
//! to a [`RetentionPolicy`](wpsync_core::RetentionPolicy).

pub mod archiver;
pub mod error;
pub mod naming;
pub mod retention;
pub mod version;
pub mod writer;

pub use archiver::{create_backup, BackupRequest};
pub use error::BackupError;
pub use naming::{archive_file_name, parse_archive_name, ArchiveName};
pub use retention::enforce_retention;
pub use version::extract_version;
pub use writer::{ArchiveWriter, TarGzWriter};
