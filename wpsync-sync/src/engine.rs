//! Differential transfer: scan, list, plan, execute.
//!
//! [`sync`] does both halves at once. The pipeline calls [`plan_transfer`]
//! before erasing the remote and [`execute_plan`] after it.
//!
//! Execution order:
//!   1. deletions that clear the way for a local entry of another kind
//!   2. creations and updates, lexical order (parents before children)
//!   3. remaining deletions, reverse lexical order (children before parents)
//!
//! Remote entries below a deleted directory are removed with it and never
//! issued on their own.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use wpsync_core::{
    CancelFlag, ChangeRecord, Classification, EntryKind, ExclusionSet, PartialTransferPolicy,
    SyncTarget,
};
use wpsync_remote::{RemoteEntry, Transport, TransportError};

use crate::error::TransferError;
use crate::plan::build_plan;
use crate::report::{FileFailure, Operation, SyncReport};
use crate::scan::{scan_local, LocalEntry};

/// Which remote state the operations of an [`execute_plan`] call are derived
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBaseline {
    /// The listing taken by [`plan_transfer`].
    AsPlanned,
    /// A fresh listing; the remote was changed since planning (erased).
    Relist,
}

/// A classified transfer that has not been applied yet.
///
/// `report.records` is the classification shown to the user. It is fixed
/// at planning time so a preview and a real run over the same trees report
/// the same thing.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub report: SyncReport,
    source_root: PathBuf,
    local: Vec<LocalEntry>,
}

/// Mirror `source_root` onto `target`'s remote directory.
///
/// With `dry_run` the plan is built and reported but no mutating call is
/// made. Cancellation is checked before every operation; a cancelled run
/// returns `Ok` with `report.cancelled` set.
pub fn sync<T: Transport + ?Sized>(
    transport: &mut T,
    source_root: &Path,
    target: &SyncTarget,
    excludes: &ExclusionSet,
    policy: &PartialTransferPolicy,
    dry_run: bool,
    cancel: &CancelFlag,
) -> Result<SyncReport, TransferError> {
    let plan = plan_transfer(transport, source_root, target, excludes, dry_run)?;
    execute_plan(
        transport,
        plan,
        target,
        excludes,
        policy,
        cancel,
        RemoteBaseline::AsPlanned,
    )
}

/// Scan the local tree, list the remote one and classify every entry.
/// Makes no mutating call.
pub fn plan_transfer<T: Transport + ?Sized>(
    transport: &mut T,
    source_root: &Path,
    target: &SyncTarget,
    excludes: &ExclusionSet,
    dry_run: bool,
) -> Result<TransferPlan, TransferError> {
    let remote_dir = target.resolved_remote_dir();
    let mut report = SyncReport::new(
        source_root,
        format!("{}:{}", target.destination(), remote_dir),
        dry_run,
    );

    let local = scan_local(source_root, excludes)?;
    tracing::debug!(entries = local.len(), root = %source_root.display(), "local tree scanned");

    let remote = list_remote(transport, remote_dir, &report)?;
    report.records = build_plan(&local, &remote, excludes);
    tracing::info!(
        created = report.count(Classification::Created),
        updated = report.count(Classification::Updated),
        deleted = report.count(Classification::Deleted),
        unchanged = report.count(Classification::Unchanged),
        dry_run,
        "plan built"
    );

    Ok(TransferPlan {
        report,
        source_root: source_root.to_path_buf(),
        local,
    })
}

/// Apply a plan. A dry-run plan is returned as its report untouched.
///
/// With [`RemoteBaseline::Relist`] the remote is listed again and the
/// operations issued are whatever brings that state to the local tree; the
/// reported classification stays the planned one.
pub fn execute_plan<T: Transport + ?Sized>(
    transport: &mut T,
    plan: TransferPlan,
    target: &SyncTarget,
    excludes: &ExclusionSet,
    policy: &PartialTransferPolicy,
    cancel: &CancelFlag,
    baseline: RemoteBaseline,
) -> Result<SyncReport, TransferError> {
    let TransferPlan {
        mut report,
        source_root,
        local,
    } = plan;

    if report.dry_run {
        for record in report.changes() {
            tracing::info!(
                path = %record.relative_path,
                change = %record.classification,
                "[dry-run] would apply"
            );
        }
        return Ok(report);
    }

    let ops = match baseline {
        RemoteBaseline::AsPlanned => schedule(&report.records),
        RemoteBaseline::Relist => {
            let remote = list_remote(transport, target.resolved_remote_dir(), &report)?;
            schedule(&build_plan(&local, &remote, excludes))
        }
    };
    let local_by_path: BTreeMap<&str, &LocalEntry> = local
        .iter()
        .map(|e| (e.relative_path.as_str(), e))
        .collect();

    let mut executor = Executor {
        transport,
        target,
        policy,
        cancel,
        report: &mut report,
    };

    if ops.iter().any(|op| op.operation != Operation::Remove) {
        executor.ensure_root()?;
    }

    for op in &ops {
        if executor.cancel.is_cancelled() {
            tracing::warn!("transfer cancelled");
            executor.report.cancelled = true;
            break;
        }
        let modified = local_by_path.get(op.relative_path.as_str()).map(|e| e.modified);
        let local_path = source_root.join(&op.relative_path);
        executor.apply(op, &local_path, modified)?;
    }

    let failed = report.failures.len();
    if policy.exceeded_by(failed) {
        let limit = policy.max_failed_files.unwrap_or(failed);
        return Err(TransferError::TooManyFailures {
            failed,
            limit,
            report: Box::new(report),
        });
    }
    Ok(report)
}

fn list_remote<T: Transport + ?Sized>(
    transport: &mut T,
    remote_dir: &str,
    report: &SyncReport,
) -> Result<Vec<RemoteEntry>, TransferError> {
    match transport.list(remote_dir) {
        Ok(remote) => {
            tracing::debug!(entries = remote.len(), dir = remote_dir, "remote tree listed");
            Ok(remote)
        }
        Err(source) => Err(TransferError::Transport {
            source,
            report: Box::new(report.clone()),
        }),
    }
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledOp {
    relative_path: String,
    kind: EntryKind,
    operation: Operation,
}

fn schedule(records: &[ChangeRecord]) -> Vec<ScheduledOp> {
    let created: BTreeSet<&str> = records
        .iter()
        .filter(|r| r.classification == Classification::Created)
        .map(|r| r.relative_path.as_str())
        .collect();
    let deleted_dirs: BTreeSet<&str> = records
        .iter()
        .filter(|r| r.classification == Classification::Deleted && r.kind.is_dir())
        .map(|r| r.relative_path.as_str())
        .collect();

    let covered = |path: &str| ancestors(path).any(|a| deleted_dirs.contains(a));

    let mut clearing = Vec::new();
    let mut writes = Vec::new();
    let mut deletes = Vec::new();
    for record in records {
        let op = ScheduledOp {
            relative_path: record.relative_path.clone(),
            kind: record.kind,
            operation: match (record.classification, record.kind) {
                (Classification::Deleted, _) => Operation::Remove,
                (_, EntryKind::Dir) => Operation::MakeDir,
                _ => Operation::Upload,
            },
        };
        match record.classification {
            Classification::Unchanged => {}
            Classification::Created | Classification::Updated => writes.push(op),
            Classification::Deleted if covered(&record.relative_path) => {}
            Classification::Deleted if created.contains(record.relative_path.as_str()) => {
                clearing.push(op)
            }
            Classification::Deleted => deletes.push(op),
        }
    }
    clearing.reverse();
    deletes.reverse();

    clearing.into_iter().chain(writes).chain(deletes).collect()
}

/// Proper ancestors of a `/`-separated path, nearest first.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut rest = path;
    std::iter::from_fn(move || {
        let idx = rest.rfind('/')?;
        rest = &rest[..idx];
        Some(rest)
    })
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

struct Executor<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    target: &'a SyncTarget,
    policy: &'a PartialTransferPolicy,
    cancel: &'a CancelFlag,
    report: &'a mut SyncReport,
}

impl<T: Transport + ?Sized> Executor<'_, T> {
    fn ensure_root(&mut self) -> Result<(), TransferError> {
        let root = self.target.resolved_remote_dir();
        self.report.operations_issued += 1;
        match self.transport.make_dir(root) {
            Ok(()) => Ok(()),
            Err(source) if source.is_connection_failure() => Err(TransferError::Transport {
                source,
                report: Box::new(self.report.clone()),
            }),
            Err(source) => Err(TransferError::RootUnavailable {
                dir: root.to_string(),
                source,
                report: Box::new(self.report.clone()),
            }),
        }
    }

    fn apply(
        &mut self,
        op: &ScheduledOp,
        local_path: &Path,
        modified: Option<i64>,
    ) -> Result<(), TransferError> {
        let remote_path = self.target.remote_path(&op.relative_path);
        tracing::debug!(path = %op.relative_path, operation = %op.operation, "applying");
        self.report.operations_issued += 1;

        let result = match op.operation {
            Operation::MakeDir => self.transport.make_dir(&remote_path),
            Operation::Upload => {
                self.transport
                    .upload(local_path, &remote_path, modified.unwrap_or_default())
            }
            Operation::Remove => self.transport.remove(&remote_path, op.kind),
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) if self.is_tolerated(&err) => {
                tracing::warn!(
                    path = %op.relative_path,
                    operation = %op.operation,
                    error = %err,
                    "file skipped"
                );
                self.report.failures.push(FileFailure {
                    relative_path: op.relative_path.clone(),
                    operation: op.operation,
                    reason: err.to_string(),
                });
                Ok(())
            }
            Err(err) => Err(self.fatal(&op.relative_path, err)),
        }
    }

    fn is_tolerated(&self, err: &TransportError) -> bool {
        match err {
            TransportError::Io { .. } => true,
            TransportError::Status { code, .. } => self.policy.tolerates(*code),
            _ => false,
        }
    }

    fn fatal(&self, relative_path: &str, source: TransportError) -> TransferError {
        let report = Box::new(self.report.clone());
        if source.is_connection_failure() {
            TransferError::Transport { source, report }
        } else {
            TransferError::Fatal {
                relative_path: relative_path.to_string(),
                source,
                report,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, kind: EntryKind, c: Classification) -> ChangeRecord {
        ChangeRecord {
            relative_path: path.to_string(),
            kind,
            classification: c,
            size_bytes: 0,
        }
    }

    fn order(ops: &[ScheduledOp]) -> Vec<(&str, Operation)> {
        ops.iter()
            .map(|o| (o.relative_path.as_str(), o.operation))
            .collect()
    }

    #[test]
    fn ancestors_nearest_first() {
        assert_eq!(ancestors("a/b/c").collect::<Vec<_>>(), vec!["a/b", "a"]);
        assert_eq!(ancestors("top").count(), 0);
    }

    #[test]
    fn writes_precede_deletes_and_deletes_run_children_first() {
        let records = vec![
            rec("a.txt", EntryKind::File, Classification::Created),
            rec("old", EntryKind::Dir, Classification::Deleted),
            rec("old/x.txt", EntryKind::File, Classification::Deleted),
            rec("stale.txt", EntryKind::File, Classification::Deleted),
            rec("z", EntryKind::Dir, Classification::Created),
            rec("z/y.txt", EntryKind::File, Classification::Updated),
            rec("keep.txt", EntryKind::File, Classification::Unchanged),
        ];

        let ops = schedule(&records);

        assert_eq!(
            order(&ops),
            vec![
                ("a.txt", Operation::Upload),
                ("z", Operation::MakeDir),
                ("z/y.txt", Operation::Upload),
                ("stale.txt", Operation::Remove),
                ("old", Operation::Remove),
            ]
        );
    }

    #[test]
    fn kind_conflicts_are_cleared_before_writes() {
        let records = vec![
            rec("x", EntryKind::File, Classification::Deleted),
            rec("x", EntryKind::Dir, Classification::Created),
            rec("x/in.txt", EntryKind::File, Classification::Created),
        ];

        let ops = schedule(&records);

        assert_eq!(
            order(&ops),
            vec![
                ("x", Operation::Remove),
                ("x", Operation::MakeDir),
                ("x/in.txt", Operation::Upload),
            ]
        );
    }

    #[test]
    fn remote_symlink_is_removed_before_the_file_is_uploaded() {
        let records = vec![
            rec("wp-config.php", EntryKind::Symlink, Classification::Deleted),
            rec("wp-config.php", EntryKind::File, Classification::Created),
        ];

        let ops = schedule(&records);

        assert_eq!(
            order(&ops),
            vec![
                ("wp-config.php", Operation::Remove),
                ("wp-config.php", Operation::Upload),
            ]
        );
        assert_eq!(ops[0].kind, EntryKind::Symlink);
    }
}
