use chrono::{DateTime, Utc};
use fs2::FileExt;
use printq_core::{JobPathStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub file_path: PathBuf,
    pub file_name: String,
    pub added_at: DateTime<Utc>,
}

/// Spooler job id to source file, shared by every running dashboard through
/// one JSON file.
pub struct FileJobStore {
    path: PathBuf,
    lock_path: PathBuf,
    records: BTreeMap<String, JobRecord>,
}

struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Never waits: a lock held by another dashboard yields `Locked` so the
    /// event loop is not stalled.
    fn try_acquire(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked {
                path: path.to_path_buf(),
            });
        }
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl FileJobStore {
    /// Loads the store and drops records older than `retention`. A store that
    /// cannot be read starts empty.
    pub fn open(path: PathBuf, retention: chrono::Duration) -> Self {
        let lock_path = match path.file_name() {
            Some(name) => path.with_file_name(format!("{}.lock", name.to_string_lossy())),
            None => path.with_extension("lock"),
        };
        let mut store = Self {
            path,
            lock_path,
            records: BTreeMap::new(),
        };
        if let Err(err) = store.prune_older_than(Utc::now() - retention) {
            warn!(path = %store.path.display(), "job store unavailable: {err}");
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, job_id: &str) -> Option<&JobRecord> {
        self.records.get(job_id)
    }

    pub fn prune_older_than(&mut self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        self.update(|records| {
            let before = records.len();
            records.retain(|_, record| record.added_at >= cutoff);
            before - records.len()
        })
    }

    pub fn insert(&mut self, job_id: &str, path: &Path) -> Result<(), StoreError> {
        let record = JobRecord {
            job_id: job_id.to_string(),
            file_path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            added_at: Utc::now(),
        };
        self.update(|records| {
            records.insert(record.job_id.clone(), record);
        })
    }

    pub fn remove(&mut self, job_id: &str) -> Result<(), StoreError> {
        self.update(|records| {
            records.remove(job_id);
        })
    }

    /// Re-reads the file under the lock so writes from other processes are
    /// merged rather than clobbered.
    fn update<T>(
        &mut self,
        apply: impl FnOnce(&mut BTreeMap<String, JobRecord>) -> T,
    ) -> Result<T, StoreError> {
        let _lock = StoreLock::try_acquire(&self.lock_path)?;
        let mut records = match read_records(&self.path) {
            Ok(records) => records,
            Err(StoreError::Serialization(err)) => {
                warn!(path = %self.path.display(), "discarding unreadable job store: {err}");
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        let result = apply(&mut records);
        let payload = serde_json::to_string_pretty(&records)?;
        write_atomic(&self.path, &payload)?;
        self.records = records;
        Ok(result)
    }
}

impl JobPathStore for FileJobStore {
    fn lookup(&self, system_job_id: &str) -> Option<PathBuf> {
        self.get(system_job_id)
            .map(|record| record.file_path.clone())
            .or_else(|| {
                read_records(&self.path)
                    .ok()
                    .and_then(|mut records| records.remove(system_job_id))
                    .map(|record| record.file_path)
            })
    }

    fn record(&mut self, system_job_id: &str, path: &Path) {
        match self.insert(system_job_id, path) {
            Ok(()) => debug!(job_id = system_job_id, "recorded job path"),
            Err(err) => warn!(job_id = system_job_id, "failed to persist job path: {err}"),
        }
    }

    fn forget(&mut self, system_job_id: &str) {
        if let Err(err) = self.remove(system_job_id) {
            warn!(job_id = system_job_id, "failed to forget job path: {err}");
        }
    }
}

fn read_records(path: &Path) -> Result<BTreeMap<String, JobRecord>, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(err.into()),
    }
}

fn write_atomic(path: &Path, payload: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = match path.file_name() {
        Some(name) => path.with_file_name(format!("{}.tmp", name.to_string_lossy())),
        None => path.with_extension("tmp"),
    };
    fs::write(&temp_path, payload)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store_in(dir: &Path) -> FileJobStore {
        FileJobStore::open(dir.join("printq/jobs.json"), Duration::hours(24))
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path());
        store.record("216", Path::new("/docs/report.pdf"));

        let reopened = store_in(dir.path());
        assert_eq!(reopened.lookup("216"), Some(PathBuf::from("/docs/report.pdf")));
        assert_eq!(
            reopened.get("216").map(|record| record.file_name.as_str()),
            Some("report.pdf")
        );
    }

    #[test]
    fn writes_from_two_handles_merge() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut first = store_in(dir.path());
        let mut second = store_in(dir.path());
        first.record("1", Path::new("/a.pdf"));
        second.record("2", Path::new("/b.pdf"));

        assert_eq!(second.len(), 2);
        assert_eq!(first.lookup("2"), Some(PathBuf::from("/b.pdf")));
        first.forget("1");
        assert!(store_in(dir.path()).lookup("1").is_none());
    }

    #[test]
    fn stale_records_are_pruned_on_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("printq/jobs.json");
        let mut records = BTreeMap::new();
        for (id, age_hours) in [("old", 30), ("fresh", 1)] {
            records.insert(
                id.to_string(),
                JobRecord {
                    job_id: id.to_string(),
                    file_path: PathBuf::from(format!("/{id}.pdf")),
                    file_name: format!("{id}.pdf"),
                    added_at: Utc::now() - Duration::hours(age_hours),
                },
            );
        }
        write_atomic(&path, &serde_json::to_string(&records).expect("json")).expect("seed");

        let store = FileJobStore::open(path, Duration::hours(24));
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh").is_some());
        assert!(store.lookup("old").is_none());
    }

    #[test]
    fn held_lock_skips_the_write_instead_of_waiting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = store_in(dir.path());
        let held = StoreLock::try_acquire(&store.lock_path).expect("first lock");

        assert!(matches!(
            store.insert("9", Path::new("/x.pdf")),
            Err(StoreError::Locked { .. })
        ));
        store.record("9", Path::new("/x.pdf"));
        assert!(store.lookup("9").is_none());

        drop(held);
        store.record("9", Path::new("/x.pdf"));
        assert_eq!(store.lookup("9"), Some(PathBuf::from("/x.pdf")));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobs.json");
        fs::write(&path, "{not json").expect("write");
        let store = FileJobStore::open(path, Duration::hours(24));
        assert_eq!(store.len(), 0);
        assert!(store.lookup("1").is_none());
    }
}
