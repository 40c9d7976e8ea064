//! Error types for wpsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or resolving the sync target.
///
/// Every variant is fatal and is reported before any remote I/O happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading a configuration file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse configuration at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// No configuration file was found in any of the searched locations.
    #[error("no configuration file found (searched: {searched})")]
    NotFound { searched: String },

    #[error("unknown project kind '{0}'; expected: plugin, theme, custom")]
    InvalidProjectKind(String),

    #[error("unknown transport '{0}'; expected: ssh, local")]
    InvalidTransport(String),

    /// `project_kind: custom` without `custom_remote_dir`.
    #[error("project kind 'custom' requires custom_remote_dir")]
    MissingCustomDir,

    #[error("custom_remote_dir must be an absolute path, got '{0}'")]
    RelativeCustomDir(String),

    #[error("custom_remote_dir '{0}' is the filesystem root")]
    RootRemoteDir(String),

    /// A required key was absent or empty.
    #[error("missing required configuration key '{0}'")]
    MissingField(&'static str),

    /// The local project root could not be resolved.
    #[error("cannot resolve local root {path}: {source}")]
    LocalRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while building an [`ExclusionSet`](crate::ExclusionSet).
#[derive(Debug, Error)]
pub enum ExcludeError {
    /// The ignore file exists but could not be read.
    #[error("cannot read ignore file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclusion pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
