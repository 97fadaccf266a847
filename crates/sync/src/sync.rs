//! The sync pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wsync_fingerprint::fingerprint_manifest;
use wsync_poll::{PollError, poll_until_complete};
use wsync_protocol::FileRecord;
use wsync_upload::{FileUploader, QueueEvent, UploadQueue, UploadTask};

use crate::exchange::{ExchangeClient, FileSubmission};
use crate::types::{SyncEvent, SyncOptions, SyncReport, SyncStage};
use crate::SyncError;

/// Orchestrates one sync run against the warehouse.
pub struct ProjectSync {
    options: SyncOptions,
    events_tx: mpsc::Sender<SyncEvent>,
    events_rx: Option<mpsc::Receiver<SyncEvent>>,
    cancel: CancellationToken,
}

impl ProjectSync {
    /// Creates an orchestrator with the given options.
    pub fn new(options: SyncOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            options,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this run.
    ///
    /// Cancelling stops new transfers from starting; in-flight transfers
    /// finish and the run ends with [`SyncError::Cancelled`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the full pipeline: fingerprint, request upload, plan, request
    /// URLs, transfer, finalize, poll.
    ///
    /// Fingerprint and plan failures abort before any byte is uploaded.
    /// Transfer failures drain the queue first and surface every failed
    /// path with its cause.
    pub async fn run(
        &self,
        manifest: Vec<FileRecord>,
        exchange: &dyn ExchangeClient,
        uploader: Arc<dyn FileUploader>,
    ) -> Result<SyncReport, SyncError> {
        let run_id = Uuid::new_v4();
        info!(%run_id, files = manifest.len(), "sync started");

        // 1. Fingerprint the manifest.
        self.emit_stage(run_id, SyncStage::Fingerprinting).await;
        self.check_cancelled()?;
        let fingerprints = fingerprint_manifest(&manifest, &self.options.chunking).await?;

        let submissions: Vec<FileSubmission> = manifest
            .iter()
            .map(|record| FileSubmission {
                relative_path: record.relative_path.clone(),
                fingerprint: fingerprints[&record.relative_path].value.clone(),
                size: record.size,
            })
            .collect();

        // 2. Submit; the warehouse compares fingerprints and decides.
        self.emit_stage(run_id, SyncStage::Requesting).await;
        self.check_cancelled()?;
        let grant = exchange.request_upload(&submissions).await?;
        debug!(project_id = %grant.project_id, "upload granted");

        // 3. Reconcile the decision into a transfer plan.
        let plan = wsync_plan::plan(&manifest, &grant.decision)?;
        info!(
            upload = plan.to_upload.len(),
            ignore = plan.to_ignore.len(),
            delete = plan.to_delete.len(),
            "plan ready"
        );

        if plan.is_noop() {
            info!(%run_id, "project already matches the warehouse, nothing to do");
            self.emit_stage(run_id, SyncStage::Complete).await;
            return Ok(SyncReport {
                run_id,
                project_id: grant.project_id,
                uploaded: 0,
                ignored: plan.to_ignore.len(),
                deleted: 0,
                job: None,
            });
        }

        // 4. Transfer.
        let uploaded = if plan.to_upload.is_empty() {
            0
        } else {
            self.emit_stage(run_id, SyncStage::Uploading).await;
            self.check_cancelled()?;
            self.transfer(&plan, exchange, uploader).await?
        };

        // 5. Finalize; server-side processing starts here.
        self.emit_stage(run_id, SyncStage::Finalizing).await;
        self.check_cancelled()?;
        exchange.finalize().await?;

        // 6. Poll until the job settles, unless the caller opted out.
        let job = if self.options.wait {
            self.emit_stage(run_id, SyncStage::Polling).await;
            let fetch = || {
                let fut = exchange.check_status();
                async move { fut.await.map_err(|e| PollError::Fetch(e.to_string())) }
            };
            let report =
                poll_until_complete(fetch, self.options.poll_interval, self.options.max_wait)
                    .await?;
            Some(report)
        } else {
            None
        };

        self.emit_stage(run_id, SyncStage::Complete).await;
        info!(%run_id, uploaded, "sync complete");

        Ok(SyncReport {
            run_id,
            project_id: grant.project_id,
            uploaded,
            ignored: plan.to_ignore.len(),
            deleted: plan.to_delete.len(),
            job,
        })
    }

    /// Requests signed URLs, builds tasks, and drains the upload queue.
    /// Returns the number of files uploaded.
    async fn transfer(
        &self,
        plan: &wsync_plan::TransferPlan,
        exchange: &dyn ExchangeClient,
        uploader: Arc<dyn FileUploader>,
    ) -> Result<usize, SyncError> {
        let paths: Vec<String> = plan
            .to_upload
            .iter()
            .map(|u| u.record.relative_path.clone())
            .collect();
        let signed = exchange.request_file_urls(&paths).await?;

        let planned: HashSet<&str> = plan
            .to_upload
            .iter()
            .map(|u| u.record.relative_path.as_str())
            .collect();

        let mut urls_by_path = HashMap::with_capacity(signed.len());
        for entry in signed {
            if !planned.contains(entry.relative_path.as_str()) {
                return Err(SyncError::UnknownPath(entry.relative_path));
            }
            urls_by_path.insert(entry.relative_path.clone(), entry.urls);
        }

        let mut tasks = Vec::with_capacity(plan.to_upload.len());
        for upload in &plan.to_upload {
            let rel = &upload.record.relative_path;
            let Some(urls) = urls_by_path.remove(rel) else {
                return Err(SyncError::Exchange(format!("no signed URLs for {rel}")));
            };
            tasks.push(UploadTask {
                absolute_path: upload.record.absolute_path.clone(),
                relative_path: rel.clone(),
                size: upload.record.size,
                is_update: upload.is_update,
                destinations: urls,
            });
        }

        let mut queue = UploadQueue::with_cancel(self.options.concurrency, self.cancel.clone());
        self.forward_queue_events(&mut queue);
        let report = queue.run(tasks, uploader).await;
        drop(queue);

        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "transfers failed");
            return Err(SyncError::Transfer {
                failures: report
                    .failed
                    .iter()
                    .map(|f| (f.relative_path.clone(), f.error.to_string()))
                    .collect(),
            });
        }
        if !report.cancelled.is_empty() {
            return Err(SyncError::Cancelled);
        }
        Ok(report.succeeded.len())
    }

    /// Bridges queue events onto the sync event channel.
    fn forward_queue_events(&self, queue: &mut UploadQueue) {
        let Some(mut queue_rx) = queue.take_events() else {
            return;
        };
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = queue_rx.recv().await {
                let mapped = match event {
                    QueueEvent::TaskStarted { relative_path } => {
                        SyncEvent::FileStarted { relative_path }
                    }
                    QueueEvent::TaskSucceeded { relative_path } => {
                        SyncEvent::FileSucceeded { relative_path }
                    }
                    QueueEvent::TaskFailed {
                        relative_path,
                        error,
                    } => SyncEvent::FileFailed {
                        relative_path,
                        error,
                    },
                };
                let _ = events_tx.try_send(mapped);
            }
        });
    }

    async fn emit_stage(&self, run_id: Uuid, stage: SyncStage) {
        let _ = self.events_tx.try_send(SyncEvent::Stage { run_id, stage });
    }

    fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}
