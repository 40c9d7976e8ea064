//! Run orchestration.
//!
//! One run walks a fixed sequence of stages:
//!
//! ```text
//! Init → ExclusionsResolved → [BackupAttempted] → Planned → [RemoteErased] → Transferring → Reported
//! ```
//!
//! Bracketed stages are skipped when disabled or in dry-run mode. The remote
//! is listed and classified in `Planned`, before any erase, so a preview and
//! a real run report the same classification.
//! Cancellation is checked before every stage.

use std::fmt;

use wpsync_backup::{create_backup, ArchiveWriter, BackupRequest};
use wpsync_core::{
    resolve_exclusions, BackupArchive, CancelFlag, Config, ExclusionSet, Provenance, RunOptions,
    SyncTarget,
};
use wpsync_remote::Transport;

use crate::engine::{execute_plan, plan_transfer, RemoteBaseline};
use crate::eraser::{erase_remote, EraseReport};
use crate::error::PipelineError;
use crate::report::SyncReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunStage {
    Init,
    ExclusionsResolved,
    BackupAttempted,
    Planned,
    RemoteErased,
    Transferring,
    Reported,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Init => "initialisation",
            RunStage::ExclusionsResolved => "exclusion resolution",
            RunStage::BackupAttempted => "backup",
            RunStage::Planned => "planning",
            RunStage::RemoteErased => "remote erase",
            RunStage::Transferring => "transfer",
            RunStage::Reported => "report",
        };
        write!(f, "{s}")
    }
}

/// What happened to the pre-deployment backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    Created(BackupArchive),
    /// The archive could not be written; the deployment went ahead.
    Failed(String),
    Skipped(String),
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub target: SyncTarget,
    pub backup: BackupStatus,
    /// `None` when erasing was disabled or the run was a dry run.
    pub erase: Option<EraseReport>,
    pub report: SyncReport,
    /// Stages entered, in order.
    pub stages: Vec<RunStage>,
}

/// A single deployment run over borrowed collaborators.
pub struct Pipeline<'a, T: Transport + ?Sized, W: ArchiveWriter + ?Sized> {
    config: &'a Config,
    options: RunOptions,
    transport: &'a mut T,
    writer: &'a W,
    cancel: CancelFlag,
    stages: Vec<RunStage>,
}

impl<'a, T: Transport + ?Sized, W: ArchiveWriter + ?Sized> Pipeline<'a, T, W> {
    pub fn new(
        config: &'a Config,
        options: RunOptions,
        transport: &'a mut T,
        writer: &'a W,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            config,
            options,
            transport,
            writer,
            cancel,
            stages: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<RunOutcome, PipelineError> {
        let dry_run = self.options.dry_run;

        self.enter(RunStage::Init)?;
        let target = self
            .config
            .target()
            .map_err(|e| PipelineError::new(RunStage::Init, e))?;
        tracing::info!(
            project = target.project_name(),
            kind = %target.project_kind(),
            destination = %target.destination(),
            dir = target.resolved_remote_dir(),
            dry_run,
            "run started"
        );

        self.enter(RunStage::ExclusionsResolved)?;
        let excludes = resolve_exclusions(
            target.local_root(),
            &self.config.ignore_file(),
            &self.config.backup_dir(),
        )
        .map_err(|e| PipelineError::new(RunStage::ExclusionsResolved, e))?;
        tracing::debug!(rules = excludes.len(), "exclusions resolved");

        let backup = if !self.options.create_backup {
            BackupStatus::Skipped("disabled".to_string())
        } else if dry_run {
            BackupStatus::Skipped("dry run".to_string())
        } else {
            self.enter(RunStage::BackupAttempted)?;
            self.backup(&target)
        };

        self.enter(RunStage::Planned)?;
        let plan = plan_transfer(
            &mut *self.transport,
            target.local_root(),
            &target,
            &excludes,
            dry_run,
        )
        .map_err(|e| PipelineError::new(RunStage::Planned, e))?;

        let erase = if !dry_run && self.config.erase_remote {
            self.enter(RunStage::RemoteErased)?;
            let report = erase_remote(
                &mut *self.transport,
                &target,
                &self.config.legacy_docs_dir,
                dry_run,
            )
            .map_err(|e| {
                let mut err = PipelineError::new(RunStage::RemoteErased, e);
                err.report = Some(plan.report.clone());
                err
            })?;
            Some(report)
        } else {
            None
        };
        let baseline = if erase.is_some() {
            RemoteBaseline::Relist
        } else {
            RemoteBaseline::AsPlanned
        };

        self.enter(RunStage::Transferring)?;
        let report = execute_plan(
            &mut *self.transport,
            plan,
            &target,
            &excludes,
            &self.config.partial_policy(),
            &self.cancel,
            baseline,
        )
        .map_err(|e| PipelineError::new(RunStage::Transferring, e))?;
        if report.cancelled {
            return Err(PipelineError::cancelled(RunStage::Transferring, Some(report)));
        }

        self.enter(RunStage::Reported)?;
        Ok(RunOutcome {
            target,
            backup,
            erase,
            report,
            stages: self.stages,
        })
    }

    fn enter(&mut self, stage: RunStage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            tracing::warn!(%stage, "run cancelled");
            return Err(PipelineError::cancelled(stage, None));
        }
        tracing::debug!(%stage, "entering stage");
        self.stages.push(stage);
        Ok(())
    }

    fn backup(&self, target: &SyncTarget) -> BackupStatus {
        let excludes = match ExclusionSet::from_patterns(
            self.config.backup_exclude_patterns.as_slice(),
            Provenance::BackupConfig,
        ) {
            Ok(excludes) => excludes,
            Err(err) => {
                tracing::warn!(error = %err, "invalid backup exclusion; backup skipped");
                return BackupStatus::Failed(err.to_string());
            }
        };
        let backup_dir = self.config.backup_dir();
        let request = BackupRequest {
            project_name: target.project_name(),
            source_root: target.local_root(),
            backup_dir: &backup_dir,
            excludes: &excludes,
        };
        match create_backup(self.writer, &request, &self.config.retention()) {
            Ok(archive) => {
                tracing::info!(path = %archive.file_path.display(), "backup created");
                BackupStatus::Created(archive)
            }
            Err(err) => {
                tracing::warn!(error = %err, "backup failed; continuing without backup");
                BackupStatus::Failed(err.to_string())
            }
        }
    }
}
