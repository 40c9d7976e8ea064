//! # wpsync-remote
//!
//! Typed collaborators for talking to the deployment host.
//!
//! - [`RemoteExecutor`] runs shell commands on the host.
//! - [`BulkTransfer`] lists, creates, uploads and removes remote entries.
//!
//! [`SshTransport`] implements both over the OpenSSH client;
//! [`LocalTransport`] implements both against a directory on this machine.

pub mod error;
pub mod local;
pub mod quote;
pub mod ssh;
pub mod transport;

pub use error::TransportError;
pub use local::LocalTransport;
pub use quote::shell_quote;
pub use ssh::SshTransport;
pub use transport::{BulkTransfer, CommandOutput, RemoteEntry, RemoteExecutor, Transport};
