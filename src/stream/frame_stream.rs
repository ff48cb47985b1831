//! Frame streaming service
//!
//! Every WebSocket connection runs an independent send loop:
//!
//! ```text
//! acquire_latest -> wait for transfer -> encode (blocking pool) -> send
//! ```
//!
//! There is no per-client queue. A slow client simply samples fewer
//! generations, and a reconnecting client starts from whatever is latest.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::Router;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::clients::{ClientGuard, ClientRegistry};
use crate::error::{AppError, Result};
use crate::events::{EventBus, ServiceKind, SystemEvent};
use crate::utils::{FpsMeter, LogThrottler, FPS_REPORT_WINDOW};
use crate::video::encoder::EncoderConfig;
use crate::video::{create_encoder, EncodedFormat, FrameEncoder, FrameSlot, HostFrame};
use crate::warn_throttled;

/// Per-connection output settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSettings {
    /// Payload format
    pub encoding: EncodedFormat,
    /// JPEG quality (0-100)
    pub quality: u32,
    /// Wait for a newer generation instead of re-sending the last one
    pub skip_duplicate_frames: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            encoding: EncodedFormat::Jpeg,
            quality: 75,
            skip_duplicate_frames: false,
        }
    }
}

/// Outbound frame streaming over WebSocket
pub struct FrameStreamingService {
    slot: Arc<FrameSlot>,
    settings: StreamSettings,
    clients: Arc<ClientRegistry>,
    events: Arc<EventBus>,
    throttler: LogThrottler,
    fps_window: Duration,
    shutdown: CancellationToken,
}

impl FrameStreamingService {
    pub fn new(
        slot: Arc<FrameSlot>,
        settings: StreamSettings,
        events: Arc<EventBus>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            slot,
            settings,
            clients: ClientRegistry::new(ServiceKind::Stream, events.clone()),
            events,
            throttler: LogThrottler::default(),
            fps_window: FPS_REPORT_WINDOW,
            shutdown,
        })
    }

    /// Live streaming connections
    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    pub fn settings(&self) -> StreamSettings {
        self.settings
    }

    /// Build the router; every path upgrades to the frame stream
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .fallback(ws_handler)
            .with_state(self.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve connections until the shutdown token fires
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Frame stream listening on ws://{}", local_addr);

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Frame stream on {} stopped", local_addr);
        Ok(())
    }

    /// Handle one upgraded WebSocket
    async fn handle_socket(self: Arc<Self>, socket: WebSocket) {
        let guard = ClientGuard::new(self.clients.clone());
        let (sender, receiver) = socket.split();

        tokio::select! {
            result = self.run_connection(sender, &guard) => {
                match result {
                    Err(e) if e.is_disconnect() => {
                        debug!("Stream client {} ended: {}", guard.id(), e);
                    }
                    Err(e) => warn!("Stream client {} failed: {}", guard.id(), e),
                    Ok(()) => {}
                }
            }
            _ = drain_incoming(receiver) => {
                debug!("Stream client {} closed the connection", guard.id());
            }
            _ = self.shutdown.cancelled() => {
                debug!("Stream client {} closed for shutdown", guard.id());
            }
        }
    }

    /// Send loop for one connection
    ///
    /// Returns only on a send, encode or internal failure. Failures stay
    /// local to this connection.
    pub async fn run_connection<S>(&self, mut sink: S, guard: &ClientGuard) -> Result<()>
    where
        S: Sink<Message> + Unpin,
        S::Error: std::fmt::Display,
    {
        let mut encoder: Option<Box<dyn FrameEncoder>> = None;
        let mut fps = FpsMeter::with_window(self.fps_window);
        let mut last_sent: Option<u64> = None;

        loop {
            let published = self.slot.acquire_latest();

            if self.settings.skip_duplicate_frames && last_sent == Some(published.generation) {
                self.wait_newer_than(published.generation).await?;
                continue;
            }

            let frame = match published.wait().await {
                Ok(frame) => frame,
                Err(e) => {
                    warn_throttled!(
                        self.throttler,
                        "transfer_failed",
                        "Stream client {} skipping generation {}: {}",
                        guard.id(),
                        published.generation,
                        e
                    );
                    self.wait_newer_than(published.generation).await?;
                    continue;
                }
            };

            let generation = frame.generation;
            let (enc, payload) = self.encode(encoder.take(), frame).await?;
            encoder = Some(enc);

            sink.send(Message::Binary(payload))
                .await
                .map_err(|e| AppError::connection(guard.id(), e))?;

            guard.stats().record_message();
            last_sent = Some(generation);

            if let Some(rate) = fps.tick() {
                info!("Stream client {} FPS: {:.2}", guard.id(), rate);
                self.events.publish(SystemEvent::StreamFps {
                    client_id: guard.id().clone(),
                    fps: rate,
                });
            }
        }
    }

    /// Compress on the blocking pool, reusing the encoder while the
    /// resolution is unchanged
    async fn encode(
        &self,
        encoder: Option<Box<dyn FrameEncoder>>,
        frame: HostFrame,
    ) -> Result<(Box<dyn FrameEncoder>, Vec<u8>)> {
        let mut encoder = match encoder {
            Some(enc) if enc.config().resolution == frame.resolution => enc,
            _ => {
                debug!(
                    "Creating {} encoder for {}",
                    self.settings.encoding, frame.resolution
                );
                create_encoder(
                    self.settings.encoding,
                    EncoderConfig::new(frame.resolution, self.settings.quality),
                )?
            }
        };

        let (encoder, result) = tokio::task::spawn_blocking(move || {
            let result = encoder.encode(&frame);
            (encoder, result)
        })
        .await
        .map_err(|e| AppError::Internal(format!("encode task failed: {}", e)))?;

        let encoded = result?;
        Ok((encoder, encoded.data.to_vec()))
    }

    async fn wait_newer_than(&self, generation: u64) -> Result<()> {
        let mut generations = self.slot.subscribe();
        generations
            .wait_for(|current| *current > generation)
            .await
            .map(|_| ())
            .map_err(|_| AppError::Internal("frame slot closed".to_string()))
    }
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<Arc<FrameStreamingService>>,
) -> Response {
    ws.on_upgrade(move |socket| service.handle_socket(socket))
}

/// Consume inbound messages until the peer closes or the socket errors
async fn drain_incoming<R>(mut receiver: R)
where
    R: Stream<Item = std::result::Result<Message, axum::Error>> + Unpin,
{
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Stream socket receive error: {}", e);
                break;
            }
        }
    }
}
