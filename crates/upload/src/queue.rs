//! The bounded-concurrency upload queue.
//!
//! A fixed pool of workers pulls tasks from a shared queue; the pool size
//! is the hard upper bound on simultaneously in-flight transfers,
//! independent of how many tasks are submitted.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::TransferError;
use crate::task::{FailedUpload, QueueEvent, UploadReport, UploadTask};
use crate::uploader::FileUploader;

/// Executes upload tasks with a hard concurrency bound.
pub struct UploadQueue {
    concurrency: usize,
    events_tx: mpsc::Sender<QueueEvent>,
    events_rx: Option<mpsc::Receiver<QueueEvent>>,
    cancel: CancellationToken,
}

impl UploadQueue {
    /// Creates a queue with at most `concurrency` transfers in flight.
    ///
    /// A bound of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self::with_cancel(concurrency, CancellationToken::new())
    }

    /// Creates a queue whose cancellation is driven by an existing token,
    /// so an outer orchestrator can cancel the queue along with itself.
    pub fn with_cancel(concurrency: usize, cancel: CancellationToken) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            concurrency: concurrency.max(1),
            events_tx,
            events_rx: Some(events_rx),
            cancel,
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<QueueEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this queue.
    ///
    /// Cancelling stops new tasks from starting; in-flight transfers run
    /// to completion. Tasks that never started are reported as cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs all tasks and returns the per-task outcome.
    ///
    /// One task's failure never cancels its siblings: the queue always
    /// drains and the report enumerates every failure with its cause.
    /// Cross-file ordering is unspecified.
    pub async fn run(&self, tasks: Vec<UploadTask>, uploader: Arc<dyn FileUploader>) -> UploadReport {
        if tasks.is_empty() {
            return UploadReport::default();
        }

        let workers = self.concurrency.min(tasks.len());
        debug!(tasks = tasks.len(), workers, "starting upload queue");

        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let report = Arc::new(Mutex::new(UploadReport::default()));

        let mut set = JoinSet::new();
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let report = Arc::clone(&report);
            let uploader = Arc::clone(&uploader);
            let events_tx = self.events_tx.clone();
            let cancel = self.cancel.clone();

            set.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let task = {
                        let mut q = queue.lock().unwrap();
                        q.pop_front()
                    };
                    let Some(task) = task else { break };

                    let rel = task.relative_path.clone();
                    let _ = events_tx.try_send(QueueEvent::TaskStarted {
                        relative_path: rel.clone(),
                    });

                    // A panicking uploader must not take the worker (and the
                    // rest of its tasks) down with it, nor vanish from the
                    // report.
                    let outcome = AssertUnwindSafe(uploader.upload(&task))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|payload| {
                            let reason = payload
                                .downcast_ref::<&str>()
                                .map(|s| s.to_string())
                                .or_else(|| payload.downcast_ref::<String>().cloned())
                                .unwrap_or_else(|| "unknown panic".into());
                            Err(TransferError::Panicked(reason))
                        });

                    match outcome {
                        Ok(()) => {
                            debug!(path = %rel, "upload succeeded");
                            let _ = events_tx.try_send(QueueEvent::TaskSucceeded {
                                relative_path: rel.clone(),
                            });
                            report.lock().unwrap().succeeded.push(rel);
                        }
                        Err(e) => {
                            warn!(path = %rel, error = %e, "upload failed");
                            let _ = events_tx.try_send(QueueEvent::TaskFailed {
                                relative_path: rel.clone(),
                                error: e.to_string(),
                            });
                            report.lock().unwrap().failed.push(FailedUpload {
                                relative_path: rel,
                                error: e,
                            });
                        }
                    }
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "upload worker panicked");
            }
        }

        // Whatever is left in the queue never started.
        let mut report = Arc::try_unwrap(report)
            .expect("workers finished")
            .into_inner()
            .unwrap();
        let leftover = Arc::try_unwrap(queue)
            .expect("workers finished")
            .into_inner()
            .unwrap();
        for task in leftover {
            report.cancelled.push(task.relative_path);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransferError;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn task(rel: &str) -> UploadTask {
        UploadTask {
            absolute_path: format!("/project/{rel}").into(),
            relative_path: rel.into(),
            size: 10,
            is_update: false,
            destinations: vec![format!("https://bucket/{rel}")],
        }
    }

    /// Uploader stub that tracks in-flight counts and fails chosen paths.
    struct StubUploader {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_paths: Vec<String>,
        delay: Duration,
        cancel_after_first: Option<CancellationToken>,
    }

    impl StubUploader {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_paths: Vec::new(),
                delay: Duration::from_millis(5),
                cancel_after_first: None,
            }
        }

        fn failing(paths: &[&str]) -> Self {
            Self {
                fail_paths: paths.iter().map(|p| p.to_string()).collect(),
                ..Self::new()
            }
        }
    }

    impl FileUploader for StubUploader {
        fn upload<'a>(
            &'a self,
            task: &'a UploadTask,
        ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);

                tokio::time::sleep(self.delay).await;

                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                if let Some(token) = &self.cancel_after_first {
                    token.cancel();
                }
                if self.fail_paths.contains(&task.relative_path) {
                    Err(TransferError::Upload(format!(
                        "simulated failure for {}",
                        task.relative_path
                    )))
                } else {
                    Ok(())
                }
            })
        }
    }

    #[tokio::test]
    async fn limit_one_serializes_transfers() {
        let queue = UploadQueue::new(1);
        let uploader = Arc::new(StubUploader::new());
        let tasks: Vec<UploadTask> = (0..8).map(|i| task(&format!("f{i}.bin"))).collect();

        let report = queue.run(tasks, uploader.clone()).await;

        assert_eq!(report.succeeded.len(), 8);
        assert_eq!(uploader.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn limit_bounds_concurrency() {
        let queue = UploadQueue::new(3);
        let uploader = Arc::new(StubUploader::new());
        let tasks: Vec<UploadTask> = (0..12).map(|i| task(&format!("f{i}.bin"))).collect();

        let report = queue.run(tasks, uploader.clone()).await;

        assert_eq!(report.succeeded.len(), 12);
        assert!(uploader.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn failures_are_isolated_and_enumerated() {
        let queue = UploadQueue::new(2);
        let uploader = Arc::new(StubUploader::failing(&["f2.bin", "f4.bin"]));
        let tasks: Vec<UploadTask> = (1..=5).map(|i| task(&format!("f{i}.bin"))).collect();

        let report = queue.run(tasks, uploader).await;

        let mut succeeded = report.succeeded.clone();
        succeeded.sort();
        assert_eq!(succeeded, vec!["f1.bin", "f3.bin", "f5.bin"]);

        let mut failed: Vec<&str> = report
            .failed
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        failed.sort();
        assert_eq!(failed, vec!["f2.bin", "f4.bin"]);
        for failure in &report.failed {
            assert!(failure.error.to_string().contains("simulated failure"));
        }

        assert!(!report.all_succeeded());
        assert_eq!(report.total(), 5);
    }

    /// Uploader that panics on one path and succeeds on the rest.
    struct PanickingUploader {
        panic_path: String,
    }

    impl FileUploader for PanickingUploader {
        fn upload<'a>(
            &'a self,
            task: &'a UploadTask,
        ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>> {
            Box::pin(async move {
                if task.relative_path == self.panic_path {
                    panic!("corrupt state for {}", task.relative_path);
                }
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn panicking_task_is_recorded_as_failed() {
        let queue = UploadQueue::new(1);
        let uploader = Arc::new(PanickingUploader {
            panic_path: "f1.bin".into(),
        });
        let tasks: Vec<UploadTask> = (0..3).map(|i| task(&format!("f{i}.bin"))).collect();

        let report = queue.run(tasks, uploader).await;

        // The panic neither kills the worker's remaining tasks nor drops
        // the task from the report.
        assert_eq!(report.total(), 3);
        let mut succeeded = report.succeeded.clone();
        succeeded.sort();
        assert_eq!(succeeded, vec!["f0.bin", "f2.bin"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].relative_path, "f1.bin");
        assert!(matches!(report.failed[0].error, TransferError::Panicked(_)));
        assert!(
            report.failed[0]
                .error
                .to_string()
                .contains("corrupt state for f1.bin")
        );
    }

    #[tokio::test]
    async fn cancel_before_run_starts_nothing() {
        let queue = UploadQueue::new(2);
        queue.cancel_token().cancel();
        let uploader = Arc::new(StubUploader::new());
        let tasks: Vec<UploadTask> = (0..4).map(|i| task(&format!("f{i}.bin"))).collect();

        let report = queue.run(tasks, uploader.clone()).await;

        assert!(report.succeeded.is_empty());
        assert_eq!(report.cancelled.len(), 4);
        assert_eq!(uploader.max_in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_mid_run_finishes_in_flight_only() {
        let queue = UploadQueue::new(1);
        let uploader = Arc::new(StubUploader {
            cancel_after_first: Some(queue.cancel_token()),
            ..StubUploader::new()
        });
        let tasks: Vec<UploadTask> = (0..5).map(|i| task(&format!("f{i}.bin"))).collect();

        let report = queue.run(tasks, uploader).await;

        // First task completes and cancels; the rest never start.
        assert_eq!(report.succeeded.len(), 1);
        assert_eq!(report.cancelled.len(), 4);
        assert_eq!(report.total(), 5);
    }

    #[tokio::test]
    async fn events_cover_every_started_task() {
        let mut queue = UploadQueue::new(2);
        let mut events_rx = queue.take_events().unwrap();
        let uploader = Arc::new(StubUploader::failing(&["f1.bin"]));
        let tasks: Vec<UploadTask> = (0..3).map(|i| task(&format!("f{i}.bin"))).collect();

        let report = queue.run(tasks, uploader).await;
        drop(queue);

        let mut started = 0;
        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(event) = events_rx.recv().await {
            match event {
                QueueEvent::TaskStarted { .. } => started += 1,
                QueueEvent::TaskSucceeded { .. } => succeeded += 1,
                QueueEvent::TaskFailed { .. } => failed += 1,
            }
        }
        assert_eq!(started, 3);
        assert_eq!(succeeded, report.succeeded.len());
        assert_eq!(failed, report.failed.len());
    }

    #[tokio::test]
    async fn empty_task_list_is_empty_report() {
        let queue = UploadQueue::new(4);
        let report = queue.run(Vec::new(), Arc::new(StubUploader::new())).await;
        assert!(report.all_succeeded());
        assert_eq!(report.total(), 0);
    }

    #[tokio::test]
    async fn take_events_once() {
        let mut queue = UploadQueue::new(1);
        assert!(queue.take_events().is_some());
        assert!(queue.take_events().is_none());
    }
}
