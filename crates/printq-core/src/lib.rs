use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub mod cups;
pub mod error;
pub mod navigation;
pub mod reconcile;
pub mod spooler;
pub mod staging;
pub mod tracker;
pub mod viewport;

pub use error::{SpoolerError, StoreError};
pub use navigation::{
    FileFocus, LayoutMode, NavBounds, NavigationState, Pane, QueueSection, Selection,
};
pub use reconcile::{reconcile, ReconciledEntry, Reconciliation};
pub use spooler::{JobPathStore, MemoryJobPathStore, Spooler, SubmitDispatch, SubmitRequest};
pub use staging::{RemoveOutcome, StagingStore};
pub use tracker::{CancelOutcome, OperationTracker, StatusEvent, StatusOutcome};
pub use viewport::{fit_width, ScrollableViewport, ScrollbarGlyph, ViewportRow};

/// One queue entry as reported by the spooler on a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolerJob {
    pub id: String,
    pub display_name: String,
    pub size_bytes: i64,
    pub spooler_state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Canceled,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Sending => "sending",
            OperationStatus::Sent => "sent",
            OperationStatus::Failed => "failed",
            OperationStatus::Canceled => "canceled",
        }
    }

    /// Still on its way to the spooler; `x` soft-cancels instead of removing.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, OperationStatus::Pending | OperationStatus::Sending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Sent | OperationStatus::Failed | OperationStatus::Canceled
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationStatus::Failed | OperationStatus::Canceled)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "pending" => Ok(OperationStatus::Pending),
            "sending" => Ok(OperationStatus::Sending),
            "sent" => Ok(OperationStatus::Sent),
            "failed" => Ok(OperationStatus::Failed),
            "canceled" | "cancelled" => Ok(OperationStatus::Canceled),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// A locally-tracked act of submitting one file to the spooler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintOperation {
    pub op_id: String,
    pub file_path: PathBuf,
    pub file_name: String,
    pub copies: u32,
    pub status: OperationStatus,
    pub error: Option<String>,
    pub system_job_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file marked for printing but not yet submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    pub name: String,
    pub path: PathBuf,
    pub staged_from: PathBuf,
    pub size_bytes: i64,
    pub added_at: DateTime<Utc>,
    pub copies: u32,
    #[serde(skip)]
    pub pending_remove: bool,
}

impl StagedFile {
    pub fn new(path: PathBuf, size_bytes: i64) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let staged_from = path
            .parent()
            .map(|parent| parent.to_path_buf())
            .unwrap_or_default();
        Self {
            name,
            path,
            staged_from,
            size_bytes,
            added_at: Utc::now(),
            copies: 1,
            pending_remove: false,
        }
    }
}

pub fn format_size(size: i64) -> String {
    const UNIT: i64 = 1024;
    if size < UNIT {
        return format!("{size} B");
    }
    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = size / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp.min(5)];
    format!("{:.1} {}B", size as f64 / div as f64, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_accepts_both_spellings() {
        assert_eq!(
            "cancelled".parse::<OperationStatus>(),
            Ok(OperationStatus::Canceled)
        );
        assert_eq!(" Sent ".parse::<OperationStatus>(), Ok(OperationStatus::Sent));
        assert!("queued".parse::<OperationStatus>().is_err());
    }

    #[test]
    fn staged_file_derives_name_and_directory() {
        let staged = StagedFile::new(PathBuf::from("/home/ada/docs/report.pdf"), 2048);
        assert_eq!(staged.name, "report.pdf");
        assert_eq!(staged.staged_from, PathBuf::from("/home/ada/docs"));
        assert_eq!(staged.copies, 1);
        assert!(!staged.pending_remove);
    }

    #[test]
    fn format_size_uses_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
