//! Latest-frame slot shared by the render loop and all stream connections
//!
//! The slot holds a reference to the most recently published frame. The
//! mutex protects only the reference swap; readers clone the `Arc` under the
//! lock, release it, and then wait on the frame's completion token. A slow
//! device-to-host copy therefore never blocks the writer or other readers.
//!
//! ```text
//! RenderLoop --publish(res, token)--> [ Mutex<Arc<PublishedFrame>> ] --acquire_latest--> readers
//!                                     [ watch<u64> generation     ] --subscribe-------> readers
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use super::format::Resolution;
use super::frame::HostFrame;
use crate::error::Result;
use crate::render::transfer::CompletionToken;

/// A published frame handle
///
/// The bytes become valid once the completion token settles.
#[derive(Debug)]
pub struct PublishedFrame {
    /// Monotonically increasing generation number
    pub generation: u64,
    /// Frame resolution
    pub resolution: Resolution,
    /// Publish timestamp
    pub published_at: Instant,
    token: CompletionToken,
}

impl PublishedFrame {
    /// Completion token of the transfer that fills this frame
    pub fn token(&self) -> &CompletionToken {
        &self.token
    }

    /// Whether the bytes can be read without waiting
    pub fn is_ready(&self) -> bool {
        self.token.is_complete()
    }

    /// Wait for the transfer and return the completed host frame
    pub async fn wait(&self) -> Result<HostFrame> {
        let data = self.token.wait().await?;
        HostFrame::new(data, self.resolution, self.generation)
    }
}

/// Single-entry latest-frame buffer (one writer, many readers)
pub struct FrameSlot {
    current: Mutex<Arc<PublishedFrame>>,
    generation_tx: watch::Sender<u64>,
}

impl FrameSlot {
    /// Create the slot holding a completed placeholder as generation 0
    pub fn new(placeholder: HostFrame) -> Self {
        let initial = PublishedFrame {
            generation: 0,
            resolution: placeholder.resolution,
            published_at: Instant::now(),
            token: CompletionToken::completed(placeholder.data_bytes()),
        };
        let (generation_tx, _) = watch::channel(0);
        Self {
            current: Mutex::new(Arc::new(initial)),
            generation_tx,
        }
    }

    /// Install a new frame reference and return its generation
    ///
    /// Never waits on `token`.
    pub fn publish(&self, resolution: Resolution, token: CompletionToken) -> u64 {
        let generation = {
            let mut current = self.current.lock();
            let generation = current.generation + 1;
            *current = Arc::new(PublishedFrame {
                generation,
                resolution,
                published_at: Instant::now(),
                token,
            });
            generation
        };

        self.generation_tx.send_if_modified(|latest| {
            if generation > *latest {
                *latest = generation;
                true
            } else {
                false
            }
        });
        generation
    }

    /// Take a reference to the latest published frame
    ///
    /// The lock is released before returning; wait on the returned frame
    /// outside of it.
    pub fn acquire_latest(&self) -> Arc<PublishedFrame> {
        self.current.lock().clone()
    }

    /// Latest published generation
    pub fn generation(&self) -> u64 {
        self.current.lock().generation
    }

    /// Watch the latest generation number
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }
}
