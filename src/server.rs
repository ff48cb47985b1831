//! Pipeline orchestration
//!
//! Builds the shared state, binds both listeners, starts the render thread
//! and runs until shutdown or a fatal render failure.
//!
//! ```text
//!                 +--> FrameStreamingService (send_port) --> viewers
//! RenderLoop --> FrameSlot
//!     ^
//! CameraState <-- CameraControlService (recv_port) <-- controllers
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::camera::{CameraParameters, CameraState};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::events::EventBus;
use crate::render::{spawn_render_loop, RenderHandle, RenderLoop, Renderer, ThreadedTransferStream};
use crate::stream::{CameraControlService, ClientRegistry, FrameStreamingService, StreamSettings};
use crate::video::{FrameSlot, HostFrame};

/// Pipeline builder
pub struct Orchestrator {
    config: AppConfig,
}

impl Orchestrator {
    /// Validate the configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bind both listeners, then start the servers and the render thread
    pub async fn start<R: Renderer + 'static>(self, renderer: R) -> Result<RunningPipeline> {
        let config = self.config;

        let send_listener = bind(config.server.send_addr()?, "frame stream").await?;
        let recv_listener = bind(config.server.recv_addr()?, "camera control").await?;
        let send_addr = send_listener.local_addr()?;
        let recv_addr = recv_listener.local_addr()?;

        let resolution = config.camera.resolution();
        let camera = Arc::new(
            CameraState::new(CameraParameters::with_resolution(resolution))
                .with_max_resolution(config.camera.max_resolution()),
        );
        let slot = Arc::new(FrameSlot::new(HostFrame::placeholder(resolution)));
        let events = Arc::new(EventBus::new());
        let shutdown = CancellationToken::new();

        let settings = StreamSettings {
            encoding: config.stream.encoding,
            quality: config.stream.jpeg_quality,
            skip_duplicate_frames: config.stream.skip_duplicate_frames,
        };
        let stream = FrameStreamingService::new(
            slot.clone(),
            settings,
            events.clone(),
            shutdown.child_token(),
        );
        let control =
            CameraControlService::new(camera.clone(), events.clone(), shutdown.child_token());

        let transfer = Arc::new(ThreadedTransferStream::new()?);
        let servers = vec![
            tokio::spawn(stream.clone().serve(send_listener)),
            tokio::spawn(control.clone().serve(recv_listener)),
        ];

        let render_loop = RenderLoop::new(
            renderer,
            camera.clone(),
            slot.clone(),
            transfer,
            events.clone(),
        );
        let render = match spawn_render_loop(render_loop, shutdown.child_token()) {
            Ok(handle) => handle,
            Err(e) => {
                shutdown.cancel();
                return Err(e);
            }
        };

        info!(
            "Pipeline started at {} (stream {}, control {})",
            resolution, send_addr, recv_addr
        );

        Ok(RunningPipeline {
            send_addr,
            recv_addr,
            camera,
            slot,
            events,
            stream,
            control,
            shutdown,
            render: Some(render),
            servers,
        })
    }
}

async fn bind(addr: SocketAddr, name: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("failed to bind {} listener on {}: {}", name, addr, e)))
}

/// A started pipeline
///
/// Dropping it cancels everything without waiting.
pub struct RunningPipeline {
    send_addr: SocketAddr,
    recv_addr: SocketAddr,
    camera: Arc<CameraState>,
    slot: Arc<FrameSlot>,
    events: Arc<EventBus>,
    stream: Arc<FrameStreamingService>,
    control: Arc<CameraControlService>,
    shutdown: CancellationToken,
    render: Option<RenderHandle>,
    servers: Vec<JoinHandle<Result<()>>>,
}

impl RunningPipeline {
    /// Bound frame streaming address
    pub fn send_addr(&self) -> SocketAddr {
        self.send_addr
    }

    /// Bound camera control address
    pub fn recv_addr(&self) -> SocketAddr {
        self.recv_addr
    }

    pub fn camera(&self) -> &Arc<CameraState> {
        &self.camera
    }

    pub fn slot(&self) -> &Arc<FrameSlot> {
        &self.slot
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn stream_clients(&self) -> &Arc<ClientRegistry> {
        self.stream.clients()
    }

    pub fn control_clients(&self) -> &Arc<ClientRegistry> {
        self.control.clients()
    }

    /// Run until `signal` resolves or the render loop stops
    ///
    /// Returns the number of rendered frames, or the render failure.
    pub async fn run_until<F>(mut self, signal: F) -> Result<u64>
    where
        F: Future<Output = ()>,
    {
        let mut render = self
            .render
            .take()
            .ok_or_else(|| AppError::Internal("pipeline already stopped".to_string()))?;

        let finished = tokio::select! {
            _ = signal => {
                info!("Shutdown requested");
                None
            }
            result = render.wait() => Some(result),
        };

        self.shutdown.cancel();
        let result = match finished {
            Some(result) => result,
            None => render.wait().await,
        };

        for server in self.servers.drain(..) {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task failed: {}", e),
            }
        }

        match &result {
            Ok(frames) => info!("Pipeline stopped after {} frames", frames),
            Err(e) => error!("Pipeline stopped: {}", e),
        }
        result
    }

    /// Stop everything and wait for the render thread and servers
    pub async fn shutdown(self) -> Result<u64> {
        self.run_until(std::future::ready(())).await
    }
}

impl Drop for RunningPipeline {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::ControlMessage;
    use crate::render::{DeviceImage, PatternRenderer};
    use crate::video::Resolution;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.send_port = 0;
        config.server.recv_port = 0;
        config.camera.width = 32;
        config.camera.height = 16;
        config
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = local_config();
        config.stream.jpeg_quality = 300;
        assert!(Orchestrator::new(config).is_err());
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let pipeline = Orchestrator::new(local_config())
            .unwrap()
            .start(PatternRenderer::new())
            .await
            .unwrap();

        assert_ne!(pipeline.send_addr().port(), 0);
        assert_ne!(pipeline.send_addr(), pipeline.recv_addr());

        let mut generations = pipeline.slot().subscribe();
        generations.wait_for(|g| *g >= 3).await.unwrap();
        assert_eq!(
            pipeline.slot().acquire_latest().resolution,
            Resolution::new(32, 16)
        );

        assert_eq!(
            pipeline.camera().max_resolution(),
            Resolution::new(3840, 2160)
        );
        pipeline
            .camera()
            .apply(&ControlMessage::Reset)
            .unwrap();
        let frames = pipeline.shutdown().await.unwrap();
        assert!(frames >= 3);
    }

    #[tokio::test]
    async fn test_render_failure_is_returned() {
        struct Broken;
        impl Renderer for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn render(&mut self, _: &CameraParameters, _: u64) -> Result<DeviceImage> {
                Err(AppError::RenderError("model not loaded".to_string()))
            }
        }

        let pipeline = Orchestrator::new(local_config())
            .unwrap()
            .start(Broken)
            .await
            .unwrap();
        let err = pipeline
            .run_until(std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RenderError(_)));
    }

    #[tokio::test]
    async fn test_port_conflict_fails_before_start() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = local_config();
        config.server.send_port = taken.local_addr().unwrap().port();

        let err = Orchestrator::new(config)
            .unwrap()
            .start(PatternRenderer::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
