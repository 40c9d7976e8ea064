//! OpenSSH-backed transport.
//!
//! Every operation is one `ssh` invocation. Key-based authentication runs
//! with `BatchMode=yes` so a missing key fails fast instead of prompting;
//! when a password is configured the client is wrapped in `sshpass -e`, with
//! the password passed through the environment rather than the command line.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use wpsync_core::{EntryKind, SyncTarget};

use crate::error::{io_err, TransportError};
use crate::quote::shell_quote;
use crate::transport::{parse_listing_line, BulkTransfer, CommandOutput, RemoteEntry, RemoteExecutor};

/// `ssh` exits with this status when the connection itself failed.
const SSH_CONNECTION_FAILURE: i32 = 255;

/// `sshpass` statuses for a rejected password and an unknown host key.
const SSHPASS_AUTH_FAILURES: &[i32] = &[5, 6];

/// Transport that runs every operation through the `ssh` client.
#[derive(Debug, Clone)]
pub struct SshTransport {
    host: String,
    user: String,
    port: u16,
    password: Option<String>,
    connect_timeout: Duration,
}

impl SshTransport {
    pub fn new(host: impl Into<String>, user: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port,
            password: None,
            connect_timeout: Duration::from_secs(15),
        }
    }

    /// Transport for `target`'s host and user.
    pub fn for_target(target: &SyncTarget, port: u16) -> Self {
        Self::new(target.remote_host(), target.remote_user(), port)
    }

    /// Switch to password authentication through `sshpass`.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn destination(&self) -> String {
        if self.user.is_empty() {
            self.host.clone()
        } else {
            format!("{}@{}", self.user, self.host)
        }
    }

    fn program(&self) -> &'static str {
        if self.password.is_some() {
            "sshpass"
        } else {
            "ssh"
        }
    }

    /// Build the client invocation for `remote_command`.
    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = match &self.password {
            Some(password) => {
                let mut c = Command::new("sshpass");
                c.env("SSHPASS", password).arg("-e").arg("ssh");
                c.args(["-o", "PubkeyAuthentication=no"]);
                c
            }
            None => {
                let mut c = Command::new("ssh");
                c.args(["-o", "BatchMode=yes"]);
                c
            }
        };
        cmd.arg("-p")
            .arg(self.port.to_string())
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)))
            .arg(self.destination())
            .arg("--")
            .arg(remote_command);
        cmd
    }

    fn run(&self, remote_command: &str, stdin: Option<File>) -> Result<CommandOutput, TransportError> {
        tracing::trace!(host = %self.host, command = remote_command, "ssh");
        let mut cmd = self.command(remote_command);
        cmd.stdin(match stdin {
            Some(file) => Stdio::from(file),
            None => Stdio::null(),
        });
        let output = cmd.output().map_err(|source| TransportError::Spawn {
            program: self.program().to_string(),
            source,
        })?;
        let result = CommandOutput {
            status: output.status.code().unwrap_or(SSH_CONNECTION_FAILURE),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };
        self.check_connection(&result)?;
        Ok(result)
    }

    /// Turn client-level failures into connection errors.
    fn check_connection(&self, output: &CommandOutput) -> Result<(), TransportError> {
        let auth_failed =
            self.password.is_some() && SSHPASS_AUTH_FAILURES.contains(&output.status);
        if output.status != SSH_CONNECTION_FAILURE && !auth_failed {
            return Ok(());
        }
        if output.stderr.to_ascii_lowercase().contains("timed out") {
            return Err(TransportError::Timeout {
                host: self.host.clone(),
            });
        }
        Err(TransportError::Unreachable {
            host: self.host.clone(),
            reason: if output.stderr.is_empty() {
                format!("client exited with status {}", output.status)
            } else {
                output.stderr.clone()
            },
        })
    }

    fn run_checked(&self, remote_command: &str, stdin: Option<File>) -> Result<CommandOutput, TransportError> {
        let output = self.run(remote_command, stdin)?;
        if !output.success() {
            return Err(TransportError::Status {
                code: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

impl RemoteExecutor for SshTransport {
    fn execute(&mut self, command: &str) -> Result<CommandOutput, TransportError> {
        self.run(command, None)
    }
}

impl BulkTransfer for SshTransport {
    fn list(&mut self, remote_dir: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let dir = shell_quote(remote_dir);
        let command = format!(
            "if [ -d {dir} ]; then cd {dir} && find . -mindepth 1 -printf '%y\\t%s\\t%T@\\t%P\\n'; fi"
        );
        let output = self.run_checked(&command, None)?;
        let mut entries = output
            .stdout
            .lines()
            .filter(|l| !l.is_empty())
            .map(parse_listing_line)
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(entries)
    }

    fn make_dir(&mut self, remote_path: &str) -> Result<(), TransportError> {
        self.run_checked(&format!("mkdir -p {}", shell_quote(remote_path)), None)?;
        Ok(())
    }

    fn upload(&mut self, local: &Path, remote_path: &str, modified: i64) -> Result<(), TransportError> {
        let file = File::open(local).map_err(|e| io_err(local, e))?;
        let parent = remote_path
            .rsplit_once('/')
            .map(|(p, _)| if p.is_empty() { "/" } else { p })
            .unwrap_or(".");
        let command = upload_command(parent, remote_path, modified);
        self.run_checked(&command, Some(file))?;
        Ok(())
    }

    fn remove(&mut self, remote_path: &str, kind: EntryKind) -> Result<(), TransportError> {
        let flags = if kind.is_dir() { "-rf" } else { "-f" };
        self.run_checked(&format!("rm {flags} {}", shell_quote(remote_path)), None)?;
        Ok(())
    }
}

/// `rm -f` first so an existing symlink is replaced instead of followed.
fn upload_command(parent: &str, remote_path: &str, modified: i64) -> String {
    let target = shell_quote(remote_path);
    format!(
        "mkdir -p {} && rm -f {target} && cat > {target} && touch -d @{modified} {target}",
        shell_quote(parent)
    )
}
