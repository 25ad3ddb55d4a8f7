//! Lifecycle of print operations submitted by this process.
//!
//! Status only changes on explicit events: a submission, a status report from
//! the submission task, a user action, or poll-driven cleanup. Nothing here is
//! time-based.

use crate::spooler::{JobPathStore, SubmitDispatch, SubmitRequest};
use crate::{OperationStatus, PrintOperation, SpoolerJob};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of one submission attempt, reported back to the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub op_id: String,
    pub status: OperationStatus,
    pub system_job_id: Option<String>,
    pub error: Option<String>,
}

impl StatusEvent {
    pub fn sending(op_id: impl Into<String>) -> Self {
        Self {
            op_id: op_id.into(),
            status: OperationStatus::Sending,
            system_job_id: None,
            error: None,
        }
    }

    pub fn sent(op_id: impl Into<String>, system_job_id: impl Into<String>) -> Self {
        Self {
            op_id: op_id.into(),
            status: OperationStatus::Sent,
            system_job_id: Some(system_job_id.into()),
            error: None,
        }
    }

    pub fn failed(op_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            op_id: op_id.into(),
            status: OperationStatus::Failed,
            system_job_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Applied,
    /// Unknown operation, or an event that no longer applies.
    Dropped,
    /// The user canceled while the submission was in flight and the spooler
    /// accepted it anyway; the caller should cancel the spooler job.
    CanceledButSubmitted { system_job_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    SoftCanceled,
    Removed(PrintOperation),
    Unknown,
}

pub struct OperationTracker {
    operations: Vec<PrintOperation>,
    dispatch: Box<dyn SubmitDispatch>,
    paths: Box<dyn JobPathStore>,
}

impl OperationTracker {
    pub fn new(dispatch: Box<dyn SubmitDispatch>, paths: Box<dyn JobPathStore>) -> Self {
        Self {
            operations: Vec::new(),
            dispatch,
            paths,
        }
    }

    /// Operations in submission order.
    pub fn operations(&self) -> &[PrintOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn get(&self, op_id: &str) -> Option<&PrintOperation> {
        self.operations.iter().find(|op| op.op_id == op_id)
    }

    fn get_mut(&mut self, op_id: &str) -> Option<&mut PrintOperation> {
        self.operations.iter_mut().find(|op| op.op_id == op_id)
    }

    pub fn submit(&mut self, path: PathBuf, file_name: impl Into<String>, copies: u32) -> String {
        let now = Utc::now();
        let op_id = Uuid::new_v4().to_string();
        let copies = copies.max(1);
        self.operations.push(PrintOperation {
            op_id: op_id.clone(),
            file_path: path.clone(),
            file_name: file_name.into(),
            copies,
            status: OperationStatus::Sending,
            error: None,
            system_job_id: None,
            started_at: now,
            updated_at: now,
        });
        self.dispatch.dispatch(SubmitRequest {
            op_id: op_id.clone(),
            path,
            copies,
        });
        op_id
    }

    pub fn on_status_event(&mut self, event: StatusEvent) -> StatusOutcome {
        let Some(op) = self.operations.iter_mut().find(|op| op.op_id == event.op_id) else {
            debug!(op_id = %event.op_id, status = %event.status, "status event for unknown operation");
            return StatusOutcome::Dropped;
        };

        if op.status == OperationStatus::Canceled {
            let job_id = match (event.status, event.system_job_id) {
                (OperationStatus::Sent, Some(job_id)) => job_id,
                _ => {
                    debug!(op_id = %op.op_id, status = %event.status, "status event after cancel ignored");
                    return StatusOutcome::Dropped;
                }
            };
            if op.system_job_id.is_none() {
                op.system_job_id = Some(job_id.clone());
                self.paths.record(&job_id, &op.file_path);
            }
            op.updated_at = Utc::now();
            info!(op_id = %op.op_id, job_id = %job_id, "canceled operation reached the spooler");
            return StatusOutcome::CanceledButSubmitted {
                system_job_id: job_id,
            };
        }

        op.status = event.status;
        op.error = event.error;
        op.updated_at = Utc::now();
        if event.status == OperationStatus::Sent && op.system_job_id.is_none() {
            if let Some(job_id) = event.system_job_id {
                self.paths.record(&job_id, &op.file_path);
                op.system_job_id = Some(job_id);
            }
        }
        StatusOutcome::Applied
    }

    /// Re-submits a Failed or Canceled operation. Anything else, including an
    /// operation the spooler already accepted, is left untouched.
    pub fn retry(&mut self, op_id: &str) -> bool {
        let Some(op) = self.get_mut(op_id) else {
            return false;
        };
        if !op.status.is_retryable() || op.system_job_id.is_some() {
            return false;
        }
        op.status = OperationStatus::Pending;
        op.error = None;
        op.updated_at = Utc::now();
        let request = SubmitRequest {
            op_id: op.op_id.clone(),
            path: op.file_path.clone(),
            copies: op.copies,
        };
        self.dispatch.dispatch(request);
        true
    }

    /// In-flight operations are marked Canceled; settled ones are deleted.
    pub fn cancel_or_remove(&mut self, op_id: &str) -> CancelOutcome {
        let Some(idx) = self.operations.iter().position(|op| op.op_id == op_id) else {
            return CancelOutcome::Unknown;
        };
        let op = &mut self.operations[idx];
        if op.status.is_in_flight() {
            op.status = OperationStatus::Canceled;
            op.updated_at = Utc::now();
            CancelOutcome::SoftCanceled
        } else {
            CancelOutcome::Removed(self.operations.remove(idx))
        }
    }

    /// Drops terminal operations that are not backing a live spooler job.
    pub fn clear_terminal(&mut self, live_jobs: &[SpoolerJob]) -> usize {
        let live: HashSet<&str> = live_jobs.iter().map(|job| job.id.as_str()).collect();
        let before = self.operations.len();
        self.operations.retain(|op| {
            let backed = op
                .system_job_id
                .as_deref()
                .is_some_and(|job_id| live.contains(job_id));
            !op.status.is_terminal() || backed
        });
        before - self.operations.len()
    }

    /// Forgets Sent operations that a poll issued after their last update no
    /// longer lists. They are delivered and will never be shown again.
    pub fn prune_delivered(&mut self, live_jobs: &[SpoolerJob], polled_at: DateTime<Utc>) -> usize {
        let live: HashSet<&str> = live_jobs.iter().map(|job| job.id.as_str()).collect();
        let before = self.operations.len();
        self.operations.retain(|op| {
            if op.status != OperationStatus::Sent || op.updated_at >= polled_at {
                return true;
            }
            op.system_job_id
                .as_deref()
                .is_some_and(|job_id| live.contains(job_id))
        });
        before - self.operations.len()
    }

    /// File behind a spooler job, from this session or the persisted store.
    pub fn lookup_path(&self, system_job_id: &str) -> Option<PathBuf> {
        self.operations
            .iter()
            .find(|op| op.system_job_id.as_deref() == Some(system_job_id))
            .map(|op| op.file_path.clone())
            .or_else(|| self.paths.lookup(system_job_id))
    }

    /// Drops the persisted path of a job that is gone from the spooler for good.
    pub fn forget_path(&mut self, system_job_id: &str) {
        self.paths.forget(system_job_id);
    }
}
