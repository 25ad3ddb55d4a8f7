//! Work that runs off the event loop. Each task owns its inputs and reports
//! back with messages only; none of them touch application state.

use chrono::{DateTime, Utc};
use printq_core::{PrinterInfo, Spooler, SpoolerError, SpoolerJob, StatusEvent, SubmitRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    JobsPolled {
        jobs: Vec<SpoolerJob>,
        printer: Option<PrinterInfo>,
        requested_at: DateTime<Utc>,
    },
    PollFailed {
        reason: String,
    },
    Status(StatusEvent),
    CancelResult {
        system_job_id: String,
        error: Option<String>,
    },
    DirectoryChanged(PathBuf),
}

fn send(tx: &UnboundedSender<AppEvent>, event: AppEvent) {
    // The loop only goes away on shutdown.
    let _ = tx.send(event);
}

/// Polls the queue and default printer concurrently under one deadline, so a
/// poll never outlives `limit`. A stuck spooler yields `PollFailed` and the
/// app keeps showing the previous list; a stuck printer query only drops the
/// printer line.
pub async fn poll_task(spooler: Arc<dyn Spooler>, limit: Duration, tx: UnboundedSender<AppEvent>) {
    let requested_at = Utc::now();
    let deadline = Instant::now() + limit;
    let (jobs, printer) = tokio::join!(
        timeout_at(deadline, spooler.poll_jobs()),
        timeout_at(deadline, spooler.default_printer()),
    );
    let printer = match printer {
        Ok(Ok(info)) => Some(info),
        Ok(Err(err)) => {
            warn!("default printer query failed: {err}");
            None
        }
        Err(_) => None,
    };
    let event = match jobs {
        Ok(Ok(jobs)) => AppEvent::JobsPolled {
            jobs,
            printer,
            requested_at,
        },
        Ok(Err(err)) => {
            warn!("queue poll failed: {err}");
            AppEvent::PollFailed {
                reason: err.to_string(),
            }
        }
        Err(_) => {
            let err = SpoolerError::Timeout {
                operation: "queue poll".to_string(),
                secs: limit.as_secs().max(1),
            };
            warn!("{err}");
            AppEvent::PollFailed {
                reason: err.to_string(),
            }
        }
    };
    send(&tx, event);
}

/// Delay before a submission, uniform in `[min_ms, max_ms)`.
pub fn stagger_delay((min_ms, max_ms): (u64, u64)) -> Duration {
    if max_ms > min_ms {
        Duration::from_millis(rand::random_range(min_ms..max_ms))
    } else {
        Duration::from_millis(min_ms)
    }
}

/// Sends one file to the spooler. Always reports `Sending` first, then
/// exactly one of `Sent` or `Failed`.
pub async fn submit_task(
    spooler: Arc<dyn Spooler>,
    request: SubmitRequest,
    stagger: Duration,
    limit: Duration,
    tx: UnboundedSender<AppEvent>,
) {
    tokio::time::sleep(stagger).await;
    send(&tx, AppEvent::Status(StatusEvent::sending(&request.op_id)));

    let outcome = match timeout(limit, spooler.submit(&request.path, request.copies)).await {
        Ok(result) => result,
        Err(_) => Err(SpoolerError::Timeout {
            operation: "print command".to_string(),
            secs: limit.as_secs(),
        }),
    };
    let event = match outcome {
        Ok(job_id) => {
            info!(op_id = %request.op_id, job_id = %job_id, path = %request.path.display(), "submitted");
            StatusEvent::sent(&request.op_id, job_id)
        }
        Err(err) => {
            warn!(op_id = %request.op_id, path = %request.path.display(), "submit failed: {err}");
            StatusEvent::failed(&request.op_id, err.to_string())
        }
    };
    send(&tx, AppEvent::Status(event));
}

pub async fn cancel_task(
    spooler: Arc<dyn Spooler>,
    system_job_id: String,
    limit: Duration,
    tx: UnboundedSender<AppEvent>,
) {
    let error = match timeout(limit, spooler.cancel(&system_job_id)).await {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(_) => Some(
            SpoolerError::Timeout {
                operation: "cancel".to_string(),
                secs: limit.as_secs(),
            }
            .to_string(),
        ),
    };
    match &error {
        None => info!(job_id = %system_job_id, "cancel requested"),
        Some(err) => warn!(job_id = %system_job_id, "cancel failed: {err}"),
    }
    send(
        &tx,
        AppEvent::CancelResult {
            system_job_id,
            error,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use printq_core::OperationStatus;
    use std::path::Path;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeSpooler {
        jobs: Vec<SpoolerJob>,
        delay: Duration,
        printer_delay: Duration,
        reject: bool,
        cancelled: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Spooler for FakeSpooler {
        async fn poll_jobs(&self) -> Result<Vec<SpoolerJob>, SpoolerError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.jobs.clone())
        }

        async fn default_printer(&self) -> Result<PrinterInfo, SpoolerError> {
            tokio::time::sleep(self.printer_delay).await;
            Ok(PrinterInfo {
                name: "Office".to_string(),
                status: "idle".to_string(),
            })
        }

        async fn submit(&self, path: &Path, _copies: u32) -> Result<String, SpoolerError> {
            tokio::time::sleep(self.delay).await;
            if self.reject {
                return Err(SpoolerError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            Ok("216".to_string())
        }

        async fn cancel(&self, system_job_id: &str) -> Result<(), SpoolerError> {
            self.cancelled
                .lock()
                .expect("lock")
                .push(system_job_id.to_string());
            Ok(())
        }
    }

    fn request() -> SubmitRequest {
        SubmitRequest {
            op_id: "op-1".to_string(),
            path: PathBuf::from("/docs/a.pdf"),
            copies: 1,
        }
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn submit_reports_sending_then_sent() {
        let (tx, rx) = mpsc::unbounded_channel();
        let spooler: Arc<dyn Spooler> = Arc::new(FakeSpooler::default());
        submit_task(spooler, request(), Duration::ZERO, Duration::from_secs(1), tx).await;
        let statuses: Vec<(OperationStatus, Option<String>)> = drain(rx)
            .await
            .into_iter()
            .filter_map(|event| match event {
                AppEvent::Status(status) => Some((status.status, status.system_job_id)),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                (OperationStatus::Sending, None),
                (OperationStatus::Sent, Some("216".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn submit_timeout_fails_with_message() {
        let (tx, rx) = mpsc::unbounded_channel();
        let spooler: Arc<dyn Spooler> = Arc::new(FakeSpooler {
            delay: Duration::from_secs(5),
            ..FakeSpooler::default()
        });
        submit_task(spooler, request(), Duration::ZERO, Duration::from_millis(20), tx).await;
        let events = drain(rx).await;
        match events.last() {
            Some(AppEvent::Status(event)) => {
                assert_eq!(event.status, OperationStatus::Failed);
                let message = event.error.as_deref().unwrap_or_default();
                assert!(message.starts_with("print command timed out after"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_submit_carries_reason() {
        let (tx, rx) = mpsc::unbounded_channel();
        let spooler: Arc<dyn Spooler> = Arc::new(FakeSpooler {
            reject: true,
            ..FakeSpooler::default()
        });
        submit_task(spooler, request(), Duration::ZERO, Duration::from_secs(1), tx).await;
        let events = drain(rx).await;
        assert!(matches!(
            events.last(),
            Some(AppEvent::Status(StatusEvent { error: Some(message), .. }))
                if message == "file does not exist: /docs/a.pdf"
        ));
    }

    #[tokio::test]
    async fn stuck_poll_reports_failure() {
        let (tx, rx) = mpsc::unbounded_channel();
        let spooler: Arc<dyn Spooler> = Arc::new(FakeSpooler {
            delay: Duration::from_secs(5),
            ..FakeSpooler::default()
        });
        poll_task(spooler, Duration::from_millis(20), tx).await;
        let events = drain(rx).await;
        assert!(matches!(events.as_slice(), [AppEvent::PollFailed { .. }]));
    }

    #[tokio::test]
    async fn poll_carries_jobs_and_printer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let spooler: Arc<dyn Spooler> = Arc::new(FakeSpooler {
            jobs: vec![SpoolerJob {
                id: "3".to_string(),
                display_name: "a.pdf".to_string(),
                size_bytes: 10,
                spooler_state: "active".to_string(),
            }],
            ..FakeSpooler::default()
        });
        poll_task(spooler, Duration::from_secs(1), tx).await;
        match drain(rx).await.as_slice() {
            [AppEvent::JobsPolled { jobs, printer, .. }] => {
                assert_eq!(jobs.len(), 1);
                assert_eq!(printer.as_ref().map(|p| p.name.as_str()), Some("Office"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_queue_and_stuck_printer_share_one_deadline() {
        let (tx, rx) = mpsc::unbounded_channel();
        let spooler: Arc<dyn Spooler> = Arc::new(FakeSpooler {
            delay: Duration::from_millis(150),
            printer_delay: Duration::from_secs(5),
            ..FakeSpooler::default()
        });
        let limit = Duration::from_millis(200);
        let started = std::time::Instant::now();
        poll_task(spooler, limit, tx).await;
        let elapsed = started.elapsed();
        assert!(elapsed < limit + Duration::from_millis(100), "poll took {elapsed:?}");
        match drain(rx).await.as_slice() {
            [AppEvent::JobsPolled { printer, .. }] => assert!(printer.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_reports_result() {
        let (tx, rx) = mpsc::unbounded_channel();
        let fake = Arc::new(FakeSpooler::default());
        let spooler: Arc<dyn Spooler> = fake.clone();
        cancel_task(spooler, "42".to_string(), Duration::from_secs(1), tx).await;
        assert_eq!(
            drain(rx).await,
            vec![AppEvent::CancelResult {
                system_job_id: "42".to_string(),
                error: None,
            }]
        );
        assert_eq!(*fake.cancelled.lock().expect("lock"), vec!["42".to_string()]);
    }

    #[test]
    fn stagger_stays_in_window() {
        for _ in 0..50 {
            let delay = stagger_delay((100, 300));
            assert!(delay >= Duration::from_millis(100) && delay < Duration::from_millis(300));
        }
        assert_eq!(stagger_delay((250, 250)), Duration::from_millis(250));
    }
}
