//! Merges what the spooler reports with what this process submitted.
//!
//! The resulting [`Reconciliation`] is the only source of truth for how many
//! queue entries exist and which entry sits at which index. Rendering, cursor
//! clamping and action dispatch all read the same snapshot; nothing else
//! recounts jobs.

use crate::{OperationStatus, PrintOperation, SpoolerJob};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciledEntry {
    /// A spooler job that this process submitted.
    SpoolerBacked {
        job: SpoolerJob,
        op: PrintOperation,
    },
    /// A spooler job of unknown origin (another process, an earlier session).
    BareSpoolerJob { job: SpoolerJob },
    /// A tracked operation that is not (or no longer) on the spooler.
    UntetheredOperation { op: PrintOperation },
}

impl ReconciledEntry {
    pub fn display_name(&self) -> &str {
        match self {
            ReconciledEntry::SpoolerBacked { job, op } => {
                if op.file_name.is_empty() {
                    &job.display_name
                } else {
                    &op.file_name
                }
            }
            ReconciledEntry::BareSpoolerJob { job } => &job.display_name,
            ReconciledEntry::UntetheredOperation { op } => &op.file_name,
        }
    }

    /// Local lifecycle status; bare jobs have none.
    pub fn status(&self) -> Option<OperationStatus> {
        match self {
            ReconciledEntry::SpoolerBacked { op, .. }
            | ReconciledEntry::UntetheredOperation { op } => Some(op.status),
            ReconciledEntry::BareSpoolerJob { .. } => None,
        }
    }

    pub fn op_id(&self) -> Option<&str> {
        match self {
            ReconciledEntry::SpoolerBacked { op, .. }
            | ReconciledEntry::UntetheredOperation { op } => Some(op.op_id.as_str()),
            ReconciledEntry::BareSpoolerJob { .. } => None,
        }
    }

    pub fn system_job_id(&self) -> Option<&str> {
        match self {
            ReconciledEntry::SpoolerBacked { job, .. }
            | ReconciledEntry::BareSpoolerJob { job } => Some(job.id.as_str()),
            ReconciledEntry::UntetheredOperation { op } => op.system_job_id.as_deref(),
        }
    }

    /// Path known from the local operation. Bare jobs need the persisted store.
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ReconciledEntry::SpoolerBacked { op, .. }
            | ReconciledEntry::UntetheredOperation { op } => Some(op.file_path.as_path()),
            ReconciledEntry::BareSpoolerJob { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ReconciledEntry::SpoolerBacked { op, .. }
            | ReconciledEntry::UntetheredOperation { op } => op.error.as_deref(),
            ReconciledEntry::BareSpoolerJob { .. } => None,
        }
    }
}

/// Ordered, deduplicated queue snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    entries: Vec<ReconciledEntry>,
}

impl Reconciliation {
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReconciledEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[ReconciledEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReconciledEntry> {
        self.entries.iter()
    }
}

/// Spooler jobs first, in spooler order, each enriched by the first operation
/// that carries its id; then the remaining operations in submission order,
/// minus delivered (`Sent`) ones and any still matching a live job.
pub fn reconcile(jobs: &[SpoolerJob], operations: &[PrintOperation]) -> Reconciliation {
    let mut op_by_job: HashMap<&str, usize> = HashMap::new();
    for (idx, op) in operations.iter().enumerate() {
        if let Some(job_id) = op.system_job_id.as_deref() {
            op_by_job.entry(job_id).or_insert(idx);
        }
    }

    let live_jobs: HashSet<&str> = jobs.iter().map(|job| job.id.as_str()).collect();
    let mut consumed = vec![false; operations.len()];
    let mut entries = Vec::with_capacity(jobs.len() + operations.len());

    for job in jobs {
        let matched = op_by_job
            .get(job.id.as_str())
            .copied()
            .filter(|idx| !consumed[*idx]);
        match matched {
            Some(idx) => {
                consumed[idx] = true;
                entries.push(ReconciledEntry::SpoolerBacked {
                    job: job.clone(),
                    op: operations[idx].clone(),
                });
            }
            None => entries.push(ReconciledEntry::BareSpoolerJob { job: job.clone() }),
        }
    }

    for (idx, op) in operations.iter().enumerate() {
        if consumed[idx] || op.status == OperationStatus::Sent {
            continue;
        }
        if op
            .system_job_id
            .as_deref()
            .is_some_and(|job_id| live_jobs.contains(job_id))
        {
            continue;
        }
        entries.push(ReconciledEntry::UntetheredOperation { op: op.clone() });
    }

    Reconciliation { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn job(id: &str, name: &str) -> SpoolerJob {
        SpoolerJob {
            id: id.to_string(),
            display_name: name.to_string(),
            size_bytes: 1024,
            spooler_state: "active".to_string(),
        }
    }

    fn op(op_id: &str, status: OperationStatus, system_job_id: Option<&str>) -> PrintOperation {
        let now = Utc::now();
        PrintOperation {
            op_id: op_id.to_string(),
            file_path: PathBuf::from(format!("/docs/{op_id}.pdf")),
            file_name: format!("{op_id}.pdf"),
            copies: 1,
            status,
            error: None,
            system_job_id: system_job_id.map(str::to_string),
            started_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn delivered_operation_never_reappears() {
        let ops = vec![op("a", OperationStatus::Sent, Some("5"))];
        let result = reconcile(&[], &ops);
        assert_eq!(result.count(), 0);
    }

    #[test]
    fn operation_enriches_matching_spooler_job() {
        let jobs = vec![job("7", "lpq-title")];
        let ops = vec![op("a", OperationStatus::Sending, Some("7"))];
        let result = reconcile(&jobs, &ops);
        assert_eq!(result.count(), 1);
        let entry = result.get(0).expect("entry");
        assert!(matches!(entry, ReconciledEntry::SpoolerBacked { .. }));
        assert_eq!(entry.status(), Some(OperationStatus::Sending));
        assert_eq!(entry.display_name(), "a.pdf");
        assert_eq!(entry.op_id(), Some("a"));
    }

    #[test]
    fn spooler_name_used_when_operation_has_none() {
        let jobs = vec![job("7", "lpq-title")];
        let mut backing = op("a", OperationStatus::Sent, Some("7"));
        backing.file_name.clear();
        let result = reconcile(&jobs, &[backing]);
        assert_eq!(result.get(0).map(|e| e.display_name()), Some("lpq-title"));
    }

    #[test]
    fn unknown_jobs_are_bare_and_come_first() {
        let jobs = vec![job("1", "other.pdf"), job("2", "mine.pdf")];
        let ops = vec![
            op("failed", OperationStatus::Failed, None),
            op("mine", OperationStatus::Sent, Some("2")),
            op("pending", OperationStatus::Pending, None),
        ];
        let result = reconcile(&jobs, &ops);
        let shapes: Vec<&str> = result
            .iter()
            .map(|entry| match entry {
                ReconciledEntry::SpoolerBacked { .. } => "backed",
                ReconciledEntry::BareSpoolerJob { .. } => "bare",
                ReconciledEntry::UntetheredOperation { .. } => "untethered",
            })
            .collect();
        assert_eq!(shapes, vec!["bare", "backed", "untethered", "untethered"]);
        assert_eq!(result.get(2).and_then(|e| e.op_id()), Some("failed"));
        assert_eq!(result.get(3).and_then(|e| e.op_id()), Some("pending"));
    }

    #[test]
    fn duplicate_job_ids_on_operations_show_once() {
        let jobs = vec![job("9", "x")];
        let ops = vec![
            op("first", OperationStatus::Sent, Some("9")),
            op("second", OperationStatus::Canceled, Some("9")),
        ];
        let result = reconcile(&jobs, &ops);
        assert_eq!(result.count(), 1);
        assert_eq!(result.get(0).and_then(|e| e.op_id()), Some("first"));
    }

    #[test]
    fn untethered_statuses_are_visible() {
        let ops = vec![
            op("p", OperationStatus::Pending, None),
            op("s", OperationStatus::Sending, None),
            op("f", OperationStatus::Failed, None),
            op("c", OperationStatus::Canceled, Some("44")),
        ];
        let result = reconcile(&[], &ops);
        assert_eq!(result.count(), 4);
        assert_eq!(result.get(3).and_then(|e| e.op_id()), Some("c"));
        assert_eq!(result.get(3).and_then(|e| e.system_job_id()), Some("44"));
    }

    #[test]
    fn reconcile_is_deterministic() {
        let jobs = vec![job("3", "c"), job("1", "a"), job("2", "b")];
        let ops = vec![
            op("x", OperationStatus::Sending, Some("2")),
            op("y", OperationStatus::Failed, None),
            op("z", OperationStatus::Sending, Some("3")),
        ];
        let first = reconcile(&jobs, &ops);
        let second = reconcile(&jobs, &ops);
        assert_eq!(first, second);
        assert_eq!(first.count(), first.entries().len());
        assert_eq!(first.get(1).and_then(|e| e.system_job_id()), Some("1"));
    }
}
