//! Classification of local and remote entries into a change plan.

use std::collections::BTreeMap;

use wpsync_core::{ChangeRecord, Classification, EntryKind, ExclusionSet};
use wpsync_remote::RemoteEntry;

use crate::scan::LocalEntry;

/// Compare the local scan with the remote listing.
///
/// - local file missing remotely → Created
/// - local file with a different size or mtime (seconds) → Updated
/// - local directory present remotely → Unchanged, missing → Created
/// - remote entry with no local counterpart, or excluded → Deleted
/// - kind mismatch at one path → Deleted (remote) then Created (local)
///
/// Records are sorted by relative path; at a shared path the deletion comes
/// first.
pub fn build_plan(
    local: &[LocalEntry],
    remote: &[RemoteEntry],
    excludes: &ExclusionSet,
) -> Vec<ChangeRecord> {
    let local_by_path: BTreeMap<&str, &LocalEntry> = local
        .iter()
        .filter(|e| !excludes.is_excluded(&e.relative_path, e.kind.is_dir()))
        .map(|e| (e.relative_path.as_str(), e))
        .collect();
    let remote_by_path: BTreeMap<&str, &RemoteEntry> = remote
        .iter()
        .map(|e| (e.relative_path.as_str(), e))
        .collect();

    let mut records = Vec::with_capacity(local_by_path.len() + remote_by_path.len());

    for (path, remote_entry) in &remote_by_path {
        let keep = !excludes.is_excluded(path, remote_entry.kind.is_dir())
            && local_by_path
                .get(path)
                .is_some_and(|l| l.kind == remote_entry.kind);
        if !keep {
            records.push(ChangeRecord {
                relative_path: path.to_string(),
                kind: remote_entry.kind,
                classification: Classification::Deleted,
                size_bytes: remote_entry.size,
            });
        }
    }

    for (path, local_entry) in &local_by_path {
        let classification = match remote_by_path.get(path) {
            Some(r) if r.kind != local_entry.kind => Classification::Created,
            Some(_) if local_entry.kind == EntryKind::Dir => Classification::Unchanged,
            Some(r) if r.size == local_entry.size && r.modified == local_entry.modified => {
                Classification::Unchanged
            }
            Some(_) => Classification::Updated,
            None => Classification::Created,
        };
        records.push(ChangeRecord {
            relative_path: path.to_string(),
            kind: local_entry.kind,
            classification,
            size_bytes: local_entry.size,
        });
    }

    records.sort_by(|a, b| {
        a.relative_path.cmp(&b.relative_path).then_with(|| {
            let a_del = a.classification == Classification::Deleted;
            let b_del = b.classification == Classification::Deleted;
            b_del.cmp(&a_del)
        })
    });
    records
}
