//! Collaborator traits between the sync engine and the deployment host.

use std::path::Path;

use wpsync_core::EntryKind;

use crate::error::TransportError;

/// Captured result of a remote shell command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// `/`-separated path relative to the listed directory.
    pub relative_path: String,
    pub kind: EntryKind,
    pub size: u64,
    /// Modification time, whole seconds since the Unix epoch.
    pub modified: i64,
}

/// Runs shell commands on the remote host.
pub trait RemoteExecutor {
    /// Execute `command` through the remote shell.
    ///
    /// A non-zero exit status is reported through [`CommandOutput::status`];
    /// `Err` means the command could not be run at all.
    fn execute(&mut self, command: &str) -> Result<CommandOutput, TransportError>;
}

/// File-level operations against the remote tree.
///
/// Every path is an absolute remote path.
pub trait BulkTransfer {
    /// Recursively list `remote_dir`. A missing directory lists as empty.
    fn list(&mut self, remote_dir: &str) -> Result<Vec<RemoteEntry>, TransportError>;

    /// Create a directory and any missing parents.
    fn make_dir(&mut self, remote_path: &str) -> Result<(), TransportError>;

    /// Copy `local` to `remote_path`, setting its modification time to
    /// `modified` so later comparisons see it as unchanged.
    fn upload(&mut self, local: &Path, remote_path: &str, modified: i64)
        -> Result<(), TransportError>;

    /// Remove a file, or a directory with everything below it.
    fn remove(&mut self, remote_path: &str, kind: EntryKind) -> Result<(), TransportError>;
}

/// Both capabilities; what the pipeline needs from a connection.
pub trait Transport: RemoteExecutor + BulkTransfer {}

impl<T: RemoteExecutor + BulkTransfer> Transport for T {}

/// Parse one `type<TAB>size<TAB>mtime<TAB>path` listing line.
///
/// `type` is `find -printf %y` output: `d` is a directory, `l` a symbolic
/// link, anything else is treated as a file. `mtime` may carry a fractional part, which is dropped.
pub(crate) fn parse_listing_line(line: &str) -> Result<RemoteEntry, TransportError> {
    let parse_err = || TransportError::Parse {
        line: line.to_string(),
    };
    let mut fields = line.splitn(4, '\t');
    let kind = match fields.next().ok_or_else(parse_err)? {
        "d" => EntryKind::Dir,
        "l" => EntryKind::Symlink,
        _ => EntryKind::File,
    };
    let size = fields
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(parse_err)?;
    let modified = fields
        .next()
        .and_then(|s| s.split('.').next())
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(parse_err)?;
    let relative_path = fields
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(parse_err)?
        .to_string();
    Ok(RemoteEntry {
        relative_path,
        kind,
        size,
        modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_line_with_fractional_mtime() {
        let entry = parse_listing_line("f\t120\t1700000000.5512\tassets/app.js").unwrap();
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.size, 120);
        assert_eq!(entry.modified, 1_700_000_000);
        assert_eq!(entry.relative_path, "assets/app.js");
    }

    #[test]
    fn parses_directory_and_keeps_tabs_in_names() {
        let entry = parse_listing_line("d\t4096\t1700000000\tweird\tname").unwrap();
        assert_eq!(entry.kind, EntryKind::Dir);
        assert_eq!(entry.relative_path, "weird\tname");
    }

    #[test]
    fn symlinks_are_listed_as_links() {
        let entry = parse_listing_line("l\t11\t1700000000\tuploads").unwrap();
        assert_eq!(entry.kind, EntryKind::Symlink);
        assert!(!entry.kind.is_dir());
    }

    #[test]
    fn rejects_truncated_lines() {
        assert!(matches!(
            parse_listing_line("f\t12"),
            Err(TransportError::Parse { .. })
        ));
    }
}
