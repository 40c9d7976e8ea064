//! wpsync core library: domain types, configuration, exclusion rules.
//!
//! Public API surface:
//! - [`types`]: target, options, change records, archive descriptors
//! - [`config`]: YAML configuration loading and target resolution
//! - [`exclude`]: exclusion resolver and matcher
//! - [`cancel`]: shared cancellation flag
//! - [`error`]: [`ConfigError`], [`ExcludeError`]

pub mod cancel;
pub mod config;
pub mod error;
pub mod exclude;
pub mod types;

pub use cancel::CancelFlag;
pub use config::{Config, TransportKind};
pub use error::{ConfigError, ExcludeError};
pub use exclude::{anchored_pattern, resolve_exclusions, ExclusionRule, ExclusionSet, Provenance};
pub use types::{
    BackupArchive, ChangeRecord, Classification, EntryKind, PartialTransferPolicy, ProjectKind,
    RetentionPolicy, RunOptions, SyncTarget,
};
pub use types::{remote_join, slash_path};
