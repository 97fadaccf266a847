//! The transport seam and the standard single-shot/multipart dispatcher.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::debug;
use wsync_fingerprint::ChunkReader;
use wsync_protocol::ChunkingConfig;

use crate::TransferError;
use crate::task::UploadTask;

/// Uploads one file. Implemented by the transport layer (it knows the
/// HTTP mechanics); the queue only sequences and bounds calls to it.
pub trait FileUploader: Send + Sync {
    fn upload<'a>(
        &'a self,
        task: &'a UploadTask,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>>;
}

/// Raw transfer primitives the transport layer provides.
///
/// `ChunkedUploader` builds file-level semantics on top of these; the
/// URLs are opaque signed destinations issued by the warehouse.
pub trait PartTransport: Send + Sync {
    /// Single-shot transfer of a whole file to one destination.
    fn put_file<'a>(
        &'a self,
        url: &'a str,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>>;

    /// Transfer of one multipart chunk to its destination.
    fn put_part<'a>(
        &'a self,
        url: &'a str,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>>;
}

/// Dispatches each task to a single-shot or multipart transfer.
///
/// One destination URL means single-shot. More than one means multipart:
/// the file is split with the same [`ChunkingConfig`] the fingerprinter
/// used, and parts go out strictly in chunk order so remote reassembly is
/// deterministic. The destination count must match the part count derived
/// from the task's size.
pub struct ChunkedUploader<T: PartTransport> {
    transport: T,
    config: ChunkingConfig,
}

impl<T: PartTransport> ChunkedUploader<T> {
    pub fn new(transport: T, config: ChunkingConfig) -> Self {
        Self { transport, config }
    }

    async fn upload_task(&self, task: &UploadTask) -> Result<(), TransferError> {
        match task.destinations.len() {
            0 => Err(TransferError::NoDestinations),
            1 => {
                debug!(path = %task.relative_path, "single-shot upload");
                self.transport
                    .put_file(&task.destinations[0], &task.absolute_path)
                    .await
            }
            n => {
                let expected = self.config.part_count(task.size) as usize;
                if n != expected {
                    return Err(TransferError::PartCountMismatch {
                        expected,
                        actual: n,
                    });
                }
                debug!(path = %task.relative_path, parts = n, "multipart upload");
                self.upload_parts(task).await
            }
        }
    }

    async fn upload_parts(&self, task: &UploadTask) -> Result<(), TransferError> {
        let path = task.absolute_path.clone();
        let chunk_size = self.config.chunk_size;
        let mut reader = tokio::task::spawn_blocking(move || ChunkReader::new(&path, chunk_size))
            .await
            .map_err(|e| TransferError::Upload(format!("chunk task join error: {e}")))??;

        // The destination count was validated against the recorded size;
        // a file that changed on disk since enumeration would chunk into
        // a different part count than the warehouse issued URLs for.
        if reader.file_size() != task.size {
            return Err(TransferError::SizeMismatch {
                expected: task.size,
                actual: reader.file_size(),
            });
        }

        // All parts of one file go out sequentially, in chunk order;
        // cross-file parallelism comes from the queue's worker pool.
        loop {
            let (returned, chunk) = tokio::task::spawn_blocking(move || {
                let mut r = reader;
                let chunk = r.next_chunk();
                (r, chunk)
            })
            .await
            .map_err(|e| TransferError::Upload(format!("chunk task join error: {e}")))?;
            reader = returned;

            let Some(chunk) = chunk? else { break };
            let Some(url) = task.destinations.get(chunk.index) else {
                return Err(TransferError::PartCountMismatch {
                    expected: task.destinations.len(),
                    actual: chunk.index + 1,
                });
            };
            self.transport
                .put_part(url, chunk.data)
                .await
                .map_err(|e| TransferError::Part {
                    index: chunk.index,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

impl<T: PartTransport> FileUploader for ChunkedUploader<T> {
    fn upload<'a>(
        &'a self,
        task: &'a UploadTask,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransferError>> + Send + 'a>> {
        Box::pin(self.upload_task(task))
    }
}
