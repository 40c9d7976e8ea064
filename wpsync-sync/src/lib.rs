//! # wpsync-sync
//!
//! Clean-mirror deployment of a local tree onto a remote directory.
//!
//! The flow for one run is owned by [`Pipeline`]:
//!
//! 1. resolve exclusions ([`wpsync_core::resolve_exclusions`])
//! 2. optional pre-deployment backup ([`wpsync_backup::create_backup`])
//! 3. planning ([`plan_transfer`]): [`scan_local`], remote listing,
//!    [`build_plan`]
//! 4. optional wipe of the remote directory ([`erase_remote`])
//! 5. execution ([`execute_plan`]) against the remote as it now stands
//!
//! [`sync`] runs planning and execution back to back without an erase.
//!
//! Every step honours dry-run: classification still happens, mutation does
//! not.

pub mod engine;
pub mod eraser;
pub mod error;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod scan;

pub use engine::{execute_plan, plan_transfer, sync, RemoteBaseline, TransferPlan};
pub use eraser::{erase_remote, EraseReport, RemoteEraseCommandFailed};
pub use error::{PipelineError, PipelineErrorKind, RemoteError, SyncError, TransferError};
pub use pipeline::{BackupStatus, Pipeline, RunOutcome, RunStage};
pub use plan::build_plan;
pub use report::{FileFailure, Operation, SyncReport};
pub use scan::{scan_local, LocalEntry};
