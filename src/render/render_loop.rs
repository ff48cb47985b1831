//! Render loop
//!
//! Runs on its own OS thread and never waits on network consumers. Each
//! iteration snapshots the camera, renders, applies the color correction
//! kernel, queues the device-to-host copy and publishes the frame handle.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::correction::correct_and_flip;
use super::renderer::Renderer;
use super::transfer::{CompletionToken, TransferStatus, TransferStream};
use crate::camera::CameraState;
use crate::error::{AppError, Result};
use crate::events::{EventBus, SystemEvent};
use crate::utils::FpsMeter;
use crate::video::FrameSlot;

/// Continuous render-and-publish loop
pub struct RenderLoop<R: Renderer> {
    renderer: R,
    camera: Arc<CameraState>,
    slot: Arc<FrameSlot>,
    transfer: Arc<dyn TransferStream>,
    events: Arc<EventBus>,
    fps: FpsMeter,
    frame_index: u64,
    /// Copies not yet settled, oldest first
    in_flight: VecDeque<CompletionToken>,
}

impl<R: Renderer> RenderLoop<R> {
    pub fn new(
        renderer: R,
        camera: Arc<CameraState>,
        slot: Arc<FrameSlot>,
        transfer: Arc<dyn TransferStream>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            renderer,
            camera,
            slot,
            transfer,
            events,
            fps: FpsMeter::new(),
            frame_index: 0,
            in_flight: VecDeque::new(),
        }
    }

    /// Override the FPS reporting window
    pub fn with_fps_window(mut self, window: Duration) -> Self {
        self.fps = FpsMeter::with_window(window);
        self
    }

    /// Frames published so far
    pub fn frames_rendered(&self) -> u64 {
        self.frame_index
    }

    /// Run one iteration and return the published generation
    ///
    /// Any error is fatal: nothing is published for a failed iteration.
    pub fn step(&mut self) -> Result<u64> {
        self.check_transfers()?;

        let camera = self.camera.snapshot();
        let image = self
            .renderer
            .render(&camera, self.frame_index)
            .map_err(|e| match e {
                AppError::RenderError(_) => e,
                other => AppError::RenderError(other.to_string()),
            })?;

        if image.resolution() != camera.resolution {
            return Err(AppError::RenderError(format!(
                "renderer returned {} for a {} camera",
                image.resolution(),
                camera.resolution
            )));
        }

        let buffer = correct_and_flip(&image, camera.correction());
        // Compute for this frame has returned, so the copy is ordered after it
        let token = self.transfer.copy_to_host(buffer);
        let generation = self.slot.publish(camera.resolution, token.clone());
        self.in_flight.push_back(token);
        self.frame_index += 1;

        if let Some(fps) = self.fps.tick() {
            info!("Render FPS: {:.2}", fps);
            self.events
                .publish(SystemEvent::RenderFps { fps, generation });
        }

        Ok(generation)
    }

    /// Non-blocking check of every outstanding copy
    ///
    /// Completed copies are forgotten; the first failure found is returned.
    fn check_transfers(&mut self) -> Result<()> {
        let mut failure = None;
        self.in_flight.retain(|token| match token.status() {
            TransferStatus::Pending => true,
            TransferStatus::Complete(_) => false,
            TransferStatus::Failed(reason) => {
                failure.get_or_insert(reason);
                false
            }
        });

        match failure {
            Some(reason) => Err(AppError::TransferError(reason)),
            None => Ok(()),
        }
    }

    /// Render until cancelled or a fatal error occurs
    ///
    /// Returns the number of frames published.
    pub fn run(mut self, cancel: CancellationToken) -> Result<u64> {
        info!(
            "Render loop started with renderer '{}'",
            self.renderer.name()
        );

        let result = loop {
            if cancel.is_cancelled() {
                debug!("Render loop cancelled");
                break Ok(());
            }
            if let Err(e) = self.step() {
                break Err(e);
            }
        };

        let frames = self.frame_index;
        match &result {
            Ok(()) => info!("Render loop stopped after {} frames", frames),
            Err(e) => error!("Render loop failed after {} frames: {}", frames, e),
        }
        self.events.publish(SystemEvent::RenderStopped {
            frames,
            error: result.as_ref().err().map(|e| e.to_string()),
        });

        result.map(|_| frames)
    }
}

/// Handle to a render loop running on its own thread
pub struct RenderHandle {
    done: oneshot::Receiver<Result<u64>>,
}

impl RenderHandle {
    /// Wait for the render loop to finish
    ///
    /// Must not be called again once it has returned.
    pub async fn wait(&mut self) -> Result<u64> {
        (&mut self.done)
            .await
            .map_err(|_| AppError::Internal("render thread panicked".to_string()))?
    }
}

/// Start a render loop on a dedicated thread named `render`
pub fn spawn_render_loop<R: Renderer + 'static>(
    render_loop: RenderLoop<R>,
    cancel: CancellationToken,
) -> Result<RenderHandle> {
    let (done_tx, done) = oneshot::channel();
    std::thread::Builder::new()
        .name("render".to_string())
        .spawn(move || {
            let result = render_loop.run(cancel);
            let _ = done_tx.send(result);
        })?;
    Ok(RenderHandle { done })
}
