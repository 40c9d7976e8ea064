//! Remote state eraser: empties the deployment directory before a transfer.
//!
//! Three independent commands run through [`RemoteExecutor`]. Only the first
//! (visible contents) must succeed; the hidden-artifact and legacy-docs
//! sweeps are best effort and surface as warnings.

use wpsync_core::SyncTarget;
use wpsync_remote::{shell_quote, RemoteExecutor, TransportError};

use crate::error::RemoteError;

/// Hidden files left behind by desktop systems.
const OS_ARTIFACTS: &[&str] = &[".DS_Store", "._*", ".AppleDouble", "Thumbs.db", "desktop.ini"];

/// A secondary erase command that exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEraseCommandFailed {
    pub command: String,
    pub status: i32,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EraseReport {
    pub skipped: bool,
    pub commands_run: usize,
    pub warnings: Vec<RemoteEraseCommandFailed>,
}

impl EraseReport {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Erase the contents of `target`'s remote directory, keeping the directory.
///
/// `legacy_docs_dir` names a leftover directory to sweep explicitly; an empty
/// name skips that command. A dry run does nothing.
pub fn erase_remote<E: RemoteExecutor + ?Sized>(
    executor: &mut E,
    target: &SyncTarget,
    legacy_docs_dir: &str,
    dry_run: bool,
) -> Result<EraseReport, RemoteError> {
    let dir = target.resolved_remote_dir();
    if dry_run {
        tracing::info!(dir, "[dry-run] remote erase skipped");
        return Ok(EraseReport::skipped());
    }

    let mut report = EraseReport::default();
    for (idx, command) in erase_commands(dir, legacy_docs_dir).into_iter().enumerate() {
        let primary = idx == 0;
        tracing::debug!(command = %command, "remote erase");
        report.commands_run += 1;

        let output = match executor.execute(&command) {
            Ok(output) => output,
            Err(err) if err.is_connection_failure() => return Err(RemoteError::Unreachable(err)),
            Err(err) if primary => {
                return Err(RemoteError::EraseFailed {
                    dir: dir.to_string(),
                    reason: err.to_string(),
                })
            }
            Err(err) => {
                tracing::warn!(command = %command, error = %err, "remote erase command failed");
                report.warnings.push(RemoteEraseCommandFailed {
                    command,
                    status: err.status_code().unwrap_or(-1),
                    stderr: err.to_string(),
                });
                continue;
            }
        };

        if output.success() {
            continue;
        }
        if primary {
            return Err(RemoteError::EraseFailed {
                dir: dir.to_string(),
                reason: TransportError::Status {
                    code: output.status,
                    stderr: output.stderr.trim().to_string(),
                }
                .to_string(),
            });
        }
        tracing::warn!(
            command = %command,
            status = output.status,
            stderr = %output.stderr.trim(),
            "remote erase command failed"
        );
        report.warnings.push(RemoteEraseCommandFailed {
            command,
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }

    tracing::info!(dir, warnings = report.warnings.len(), "remote directory erased");
    Ok(report)
}

/// Quoted directory, unquoted glob suffix.
fn erase_commands(dir: &str, legacy_docs_dir: &str) -> Vec<String> {
    let q = shell_quote(dir);
    let mut artifacts: Vec<String> = OS_ARTIFACTS.iter().map(|a| format!("{q}/{a}")).collect();
    artifacts.push(format!("{q}/.[!.]*"));
    artifacts.push(format!("{q}/..?*"));

    let mut commands = vec![
        format!("rm -rf {q}/*"),
        format!("rm -rf {}", artifacts.join(" ")),
    ];
    let legacy = legacy_docs_dir.trim().trim_matches('/');
    if !legacy.is_empty() {
        commands.push(format!("rm -rf {}", shell_quote(&format!("{dir}/{legacy}"))));
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_quote_paths_and_leave_globs_bare() {
        let cmds = erase_commands("/srv/wp/plugins/my plugin", "docs");
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0], "rm -rf '/srv/wp/plugins/my plugin'/*");
        assert!(cmds[1].contains("'/srv/wp/plugins/my plugin'/.DS_Store"));
        assert!(cmds[1].contains("'/srv/wp/plugins/my plugin'/.[!.]*"));
        assert!(cmds[1].ends_with("'/srv/wp/plugins/my plugin'/..?*"));
        assert_eq!(cmds[2], "rm -rf '/srv/wp/plugins/my plugin/docs'");
    }

    #[test]
    fn empty_legacy_dir_skips_third_command() {
        assert_eq!(erase_commands("/srv/x", "").len(), 2);
    }
}
