//! Device-to-host transfer with completion tokens
//!
//! A transfer is fire-and-forget for the writer: `copy_to_host` queues the
//! copy and hands back a [`CompletionToken`] immediately. Only readers wait on
//! the token, and only at the point they need the bytes.
//!
//! ```text
//! RenderLoop --copy_to_host--> TransferStream (worker thread, FIFO)
//!      |                              |
//!      +-- publish(token) --> FrameSlot    +-- CompletionSignal::complete
//!                                  |
//!                     readers: token.wait().await
//! ```

use bytes::Bytes;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::device::DeviceBuffer;
use crate::error::{AppError, Result};
use crate::video::Resolution;

/// Queue depth of the threaded transfer stream
const TRANSFER_QUEUE_DEPTH: usize = 2;

/// Transfer progress as seen through a completion token
#[derive(Debug, Clone)]
pub enum TransferStatus {
    /// Copy still in flight
    Pending,
    /// Copy finished; host bytes are valid
    Complete(Bytes),
    /// Copy failed; bytes must not be used
    Failed(String),
}

impl TransferStatus {
    fn is_settled(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

/// Writer half of a completion pair, owned by the transfer engine
#[derive(Debug)]
pub struct CompletionSignal {
    tx: watch::Sender<TransferStatus>,
}

impl CompletionSignal {
    /// Mark the transfer complete with its host bytes
    pub fn complete(self, data: Bytes) {
        self.tx.send_replace(TransferStatus::Complete(data));
    }

    /// Mark the transfer failed
    pub fn fail(self, reason: impl Into<String>) {
        self.tx.send_replace(TransferStatus::Failed(reason.into()));
    }
}

/// Reader half of a completion pair
///
/// Cloning is cheap; every clone observes the same transfer.
#[derive(Debug, Clone)]
pub struct CompletionToken {
    rx: watch::Receiver<TransferStatus>,
}

/// Create a linked signal/token pair for one transfer
pub fn completion_pair() -> (CompletionSignal, CompletionToken) {
    let (tx, rx) = watch::channel(TransferStatus::Pending);
    (CompletionSignal { tx }, CompletionToken { rx })
}

impl CompletionToken {
    /// A token whose transfer has already finished
    pub fn completed(data: Bytes) -> Self {
        let (signal, token) = completion_pair();
        signal.complete(data);
        token
    }

    /// Current status without waiting
    ///
    /// A token whose signal was dropped before settling reports `Failed`.
    pub fn status(&self) -> TransferStatus {
        let status = self.rx.borrow().clone();
        match status {
            TransferStatus::Pending if self.rx.has_changed().is_err() => {
                TransferStatus::Failed("transfer abandoned".to_string())
            }
            other => other,
        }
    }

    /// Whether the copy has completed successfully
    pub fn is_complete(&self) -> bool {
        matches!(self.status(), TransferStatus::Complete(_))
    }

    /// Wait until the transfer settles and return the host bytes
    ///
    /// Suspends only the calling task.
    pub async fn wait(&self) -> Result<Bytes> {
        let mut rx = self.rx.clone();
        let settled = rx
            .wait_for(TransferStatus::is_settled)
            .await
            .map(|status| status.clone())
            .map_err(|_| AppError::TransferError("transfer abandoned".to_string()))?;

        match settled {
            TransferStatus::Complete(data) => Ok(data),
            TransferStatus::Failed(reason) => Err(AppError::TransferError(reason)),
            TransferStatus::Pending => Err(AppError::TransferError(
                "transfer still pending".to_string(),
            )),
        }
    }
}

/// Engine that copies device buffers into host memory asynchronously
///
/// Implementations must start the copy only after the compute that produced
/// the buffer has been issued, and must settle every returned token.
pub trait TransferStream: Send + Sync {
    /// Queue a copy and return its completion token without blocking on it
    fn copy_to_host(&self, buffer: DeviceBuffer) -> CompletionToken;
}

struct TransferJob {
    buffer: DeviceBuffer,
    signal: CompletionSignal,
}

/// Transfer stream backed by a dedicated worker thread
///
/// Jobs complete in submission order. Because the render loop only submits a
/// buffer once its compute has returned, every copy is ordered after the
/// work that produced its pixels.
pub struct ThreadedTransferStream {
    tx: mpsc::SyncSender<TransferJob>,
    _worker: JoinHandle<()>,
}

impl ThreadedTransferStream {
    /// Spawn the transfer worker
    pub fn new() -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<TransferJob>(TRANSFER_QUEUE_DEPTH);
        let worker = std::thread::Builder::new()
            .name("transfer".to_string())
            .spawn(move || {
                debug!("Transfer worker started");
                while let Ok(job) = rx.recv() {
                    run_copy(job);
                }
                debug!("Transfer worker stopped");
            })?;

        Ok(Self {
            tx,
            _worker: worker,
        })
    }
}

fn run_copy(job: TransferJob) {
    let TransferJob { buffer, signal } = job;
    let resolution: Resolution = buffer.resolution();
    if buffer.len() != resolution.rgba_len() {
        warn!(
            "Transfer of {} buffer has wrong size {} (expected {})",
            resolution,
            buffer.len(),
            resolution.rgba_len()
        );
        signal.fail(format!("device buffer size mismatch for {}", resolution));
        return;
    }
    // Host copy is a fresh allocation; the device buffer is released here
    let host = Bytes::copy_from_slice(buffer.as_slice());
    signal.complete(host);
}

impl TransferStream for ThreadedTransferStream {
    fn copy_to_host(&self, buffer: DeviceBuffer) -> CompletionToken {
        let (signal, token) = completion_pair();
        if let Err(mpsc::SendError(job)) = self.tx.send(TransferJob { buffer, signal }) {
            job.signal.fail("transfer worker stopped");
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_completed_token() {
        let token = CompletionToken::completed(Bytes::from_static(b"abcd"));
        assert!(token.is_complete());
        assert_eq!(token.wait().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn test_reader_waits_until_signalled() {
        let (signal, token) = completion_pair();
        let waiter = token.clone();
        let mut wait = task::spawn(async move { waiter.wait().await });

        assert_pending!(wait.poll());
        assert!(!token.is_complete());

        signal.complete(Bytes::from_static(b"done"));
        assert!(wait.is_woken());
        let data = assert_ready!(wait.poll()).unwrap();
        assert_eq!(data, Bytes::from_static(b"done"));
    }

    #[tokio::test]
    async fn test_failed_transfer() {
        let (signal, token) = completion_pair();
        signal.fail("dma error");
        let err = token.wait().await.unwrap_err();
        assert!(matches!(err, AppError::TransferError(ref r) if r == "dma error"));
    }

    #[tokio::test]
    async fn test_dropped_signal_fails_token() {
        let (signal, token) = completion_pair();
        drop(signal);
        assert!(matches!(token.status(), TransferStatus::Failed(_)));
        assert!(token.wait().await.is_err());
    }

    #[tokio::test]
    async fn test_threaded_stream_copies() {
        let stream = ThreadedTransferStream::new().unwrap();
        let res = Resolution::new(2, 1);
        let buffer = DeviceBuffer::new(vec![7u8; res.rgba_len()], res);
        let token = stream.copy_to_host(buffer);
        let data = token.wait().await.unwrap();
        assert_eq!(data.len(), 8);
        assert!(data.iter().all(|&b| b == 7));
    }

    #[tokio::test]
    async fn test_threaded_stream_rejects_bad_size() {
        let stream = ThreadedTransferStream::new().unwrap();
        let buffer = DeviceBuffer::new(vec![0u8; 3], Resolution::new(2, 1));
        assert!(stream.copy_to_host(buffer).wait().await.is_err());
    }
}
