use crate::{PrinterInfo, SpoolerError, SpoolerJob};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The external print queue. Implementations do not enforce timeouts; the
/// caller wraps every call.
#[async_trait]
pub trait Spooler: Send + Sync {
    async fn poll_jobs(&self) -> Result<Vec<SpoolerJob>, SpoolerError>;

    async fn default_printer(&self) -> Result<PrinterInfo, SpoolerError>;

    /// Returns the spooler's own id for the queued job.
    async fn submit(&self, path: &Path, copies: u32) -> Result<String, SpoolerError>;

    async fn cancel(&self, system_job_id: &str) -> Result<(), SpoolerError>;
}

/// Persisted association of spooler job ids to the files they printed, so
/// jobs submitted by an earlier session can still be opened.
pub trait JobPathStore {
    fn lookup(&self, system_job_id: &str) -> Option<PathBuf>;
    fn record(&mut self, system_job_id: &str, path: &Path);
    fn forget(&mut self, system_job_id: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub op_id: String,
    pub path: PathBuf,
    pub copies: u32,
}

/// Fire-and-forget hand-off of a submission to whatever runs it.
pub trait SubmitDispatch {
    fn dispatch(&self, request: SubmitRequest);
}

impl<F> SubmitDispatch for F
where
    F: Fn(SubmitRequest),
{
    fn dispatch(&self, request: SubmitRequest) {
        self(request)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryJobPathStore {
    paths: HashMap<String, PathBuf>,
}

impl MemoryJobPathStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl JobPathStore for MemoryJobPathStore {
    fn lookup(&self, system_job_id: &str) -> Option<PathBuf> {
        self.paths.get(system_job_id).cloned()
    }

    fn record(&mut self, system_job_id: &str, path: &Path) {
        self.paths
            .insert(system_job_id.to_string(), path.to_path_buf());
    }

    fn forget(&mut self, system_job_id: &str) {
        self.paths.remove(system_job_id);
    }
}
