//! YAML configuration.
//!
//! # Discovery
//!
//! ```text
//! --config <FILE>                        (explicit)
//! ./wpsync.yaml                          (project root)
//! <config_dir>/wpsync/config.yaml        (per user)
//! ```
//!
//! # API pattern
//!
//! Loading has two forms, mirroring the rest of the workspace:
//! - `load_at(path)`: explicit file; used in tests with `TempDir`
//! - `discover(cwd)`: walks the search list above, delegates to `load_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{
    PartialTransferPolicy, ProjectKind, RetentionPolicy, SyncTarget, DEFAULT_TOLERATED_EXIT_CODES,
};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "wpsync.yaml";

/// Environment variable that overrides `remote_password`.
pub const PASSWORD_ENV: &str = "WPSYNC_PASSWORD";

/// How files reach the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// OpenSSH client on the `PATH`.
    #[default]
    Ssh,
    /// Destination directory on this machine (staging, tests).
    Local,
}

/// Everything a run needs, loaded once and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Defaults to the local root's directory name.
    #[serde(default)]
    pub project_name: Option<String>,
    /// Defaults to the directory holding the configuration file.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
    pub project_kind: String,

    #[serde(default)]
    pub remote_host: String,
    #[serde(default)]
    pub remote_user: String,
    #[serde(default = "default_remote_port")]
    pub remote_port: u16,
    #[serde(default)]
    pub remote_base_dir: Option<String>,
    #[serde(default)]
    pub custom_remote_dir: Option<String>,
    /// Switches SSH to password authentication when present.
    #[serde(default, skip_serializing)]
    pub remote_password: Option<String>,
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub create_backup: bool,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default)]
    pub max_archives_per_version: u32,
    #[serde(default)]
    pub max_backup_age_days: u32,
    #[serde(default = "default_backup_excludes")]
    pub backup_exclude_patterns: Vec<String>,

    #[serde(default = "default_ignore_file")]
    pub ignore_file: PathBuf,
    /// Wipe the remote directory before transferring.
    #[serde(default = "default_true")]
    pub erase_remote: bool,
    #[serde(default = "default_legacy_docs_dir")]
    pub legacy_docs_dir: String,
    #[serde(default = "default_tolerated_exit_codes")]
    pub tolerated_exit_codes: Vec<i32>,
    #[serde(default)]
    pub max_failed_files: Option<usize>,
}

fn default_remote_port() -> u16 {
    22
}

fn default_transport() -> String {
    "ssh".to_string()
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_backup_excludes() -> Vec<String> {
    vec![".git/".to_string(), "node_modules/".to_string()]
}

fn default_ignore_file() -> PathBuf {
    PathBuf::from(".deployignore")
}

fn default_legacy_docs_dir() -> String {
    "docs".to_string()
}

fn default_tolerated_exit_codes() -> Vec<i32> {
    DEFAULT_TOLERATED_EXIT_CODES.to_vec()
}

impl Config {
    /// Parse configuration from YAML text. `origin` anchors relative paths.
    pub fn from_yaml(yaml: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut config: Config =
            serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        if config.local_root.is_none() {
            let dir = origin
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            config.local_root = Some(dir.to_path_buf());
        }
        Ok(config)
    }

    /// Local project root (absolute when loaded through [`load_at`]).
    pub fn local_root(&self) -> PathBuf {
        self.local_root.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// `backup_dir`, resolved against the local root when relative.
    pub fn backup_dir(&self) -> PathBuf {
        if self.backup_dir.is_absolute() {
            self.backup_dir.clone()
        } else {
            self.local_root().join(&self.backup_dir)
        }
    }

    /// `ignore_file`, resolved against the local root when relative.
    pub fn ignore_file(&self) -> PathBuf {
        if self.ignore_file.is_absolute() {
            self.ignore_file.clone()
        } else {
            self.local_root().join(&self.ignore_file)
        }
    }

    pub fn project_kind(&self) -> Result<ProjectKind, ConfigError> {
        self.project_kind.parse()
    }

    pub fn transport_kind(&self) -> Result<TransportKind, ConfigError> {
        match self.transport.trim().to_ascii_lowercase().as_str() {
            "ssh" => Ok(TransportKind::Ssh),
            "local" => Ok(TransportKind::Local),
            other => Err(ConfigError::InvalidTransport(other.to_string())),
        }
    }

    pub fn project_name(&self) -> Result<String, ConfigError> {
        if let Some(name) = self.project_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Ok(name.trim().to_string());
        }
        self.local_root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(ConfigError::MissingField("project_name"))
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_archives_per_version: self.max_archives_per_version,
            max_age_days: self.max_backup_age_days,
        }
    }

    pub fn partial_policy(&self) -> PartialTransferPolicy {
        PartialTransferPolicy {
            tolerated_exit_codes: self.tolerated_exit_codes.clone(),
            max_failed_files: self.max_failed_files,
        }
    }

    /// Validate the configuration and build the immutable [`SyncTarget`].
    pub fn target(&self) -> Result<SyncTarget, ConfigError> {
        let kind = self.project_kind()?;
        let transport = self.transport_kind()?;
        if transport == TransportKind::Ssh && self.remote_host.trim().is_empty() {
            return Err(ConfigError::MissingField("remote_host"));
        }
        SyncTarget::new(
            self.project_name()?,
            kind,
            self.local_root(),
            self.remote_host.trim(),
            self.remote_user.trim(),
            self.remote_base_dir.as_deref(),
            self.custom_remote_dir.as_deref(),
        )
    }

    /// Password from the environment, falling back to the file.
    pub fn password(&self) -> Option<String> {
        std::env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.remote_password.clone().filter(|p| !p.is_empty()))
    }
}

/// Load configuration from an explicit file.
///
/// The local root is canonicalized so later relative-path computations are
/// stable regardless of the working directory.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let mut config = Config::from_yaml(&contents, path)?;
    let root = config.local_root();
    let root = if root.is_relative() {
        path.parent().unwrap_or_else(|| Path::new(".")).join(root)
    } else {
        root
    };
    let canonical = root
        .canonicalize()
        .map_err(|source| ConfigError::LocalRoot { path: root, source })?;
    config.local_root = Some(canonical);
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Ordered list of locations searched when no explicit path is given.
pub fn search_paths(cwd: &Path) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("wpsync").join("config.yaml"));
    }
    paths
}

/// Load from `explicit`, or from the first existing entry of [`search_paths`].
pub fn discover(cwd: &Path, explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return load_at(path);
    }
    let candidates = search_paths(cwd);
    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => load_at(path),
        None => Err(ConfigError::NotFound {
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "project_kind: plugin\nremote_host: example.com\nremote_base_dir: /srv/wp/wp-content\n";

    #[test]
    fn defaults_are_applied() {
        let config = Config::from_yaml(MINIMAL, Path::new("/work/my-plugin/wpsync.yaml")).unwrap();
        assert_eq!(config.remote_port, 22);
        assert!(config.create_backup);
        assert!(config.erase_remote);
        assert_eq!(config.backup_dir(), PathBuf::from("/work/my-plugin/backups"));
        assert_eq!(config.ignore_file(), PathBuf::from("/work/my-plugin/.deployignore"));
        assert_eq!(config.tolerated_exit_codes, vec![1, 23, 24]);
        assert_eq!(config.max_failed_files, None);
        assert!(!config.retention().is_active());
    }

    #[test]
    fn project_name_defaults_to_root_directory() {
        let config = Config::from_yaml(MINIMAL, Path::new("/work/my-plugin/wpsync.yaml")).unwrap();
        assert_eq!(config.project_name().unwrap(), "my-plugin");
        let target = config.target().unwrap();
        assert_eq!(
            target.resolved_remote_dir(),
            "/srv/wp/wp-content/plugins/my-plugin"
        );
    }

    #[test]
    fn invalid_kind_is_a_config_error() {
        let yaml = MINIMAL.replace("plugin", "widget");
        let config = Config::from_yaml(&yaml, Path::new("/w/x/wpsync.yaml")).unwrap();
        assert!(matches!(
            config.target(),
            Err(ConfigError::InvalidProjectKind(_))
        ));
    }

    #[test]
    fn ssh_requires_remote_host() {
        let yaml = "project_kind: theme\nremote_base_dir: /srv\n";
        let config = Config::from_yaml(yaml, Path::new("/w/x/wpsync.yaml")).unwrap();
        assert!(matches!(
            config.target(),
            Err(ConfigError::MissingField("remote_host"))
        ));
    }

    #[test]
    fn local_transport_does_not_need_a_host() {
        let yaml = "project_kind: custom\ntransport: local\ncustom_remote_dir: /tmp/out\n";
        let config = Config::from_yaml(yaml, Path::new("/w/x/wpsync.yaml")).unwrap();
        assert_eq!(config.transport_kind().unwrap(), TransportKind::Local);
        assert_eq!(config.target().unwrap().resolved_remote_dir(), "/tmp/out");
    }

    #[test]
    fn unknown_transport_is_rejected() {
        let yaml = format!("{MINIMAL}transport: ftp\n");
        let config = Config::from_yaml(&yaml, Path::new("/w/x/wpsync.yaml")).unwrap();
        assert!(matches!(
            config.transport_kind(),
            Err(ConfigError::InvalidTransport(_))
        ));
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let err = Config::from_yaml("project_kind: [", Path::new("/w/x/wpsync.yaml")).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, PathBuf::from("/w/x/wpsync.yaml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn password_is_never_serialized() {
        let yaml = format!("{MINIMAL}remote_password: hunter2\n");
        let config = Config::from_yaml(&yaml, Path::new("/w/x/wpsync.yaml")).unwrap();
        assert_eq!(config.remote_password.as_deref(), Some("hunter2"));
        let out = serde_yaml::to_string(&config).unwrap();
        assert!(!out.contains("hunter2"));
    }
}
