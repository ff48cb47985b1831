//! Camera control service
//!
//! Receives JSON control messages over WebSocket and applies them to the
//! shared [`CameraState`]. Messages from one connection are applied in
//! arrival order; across connections the last writer wins. Malformed
//! messages are logged, counted and dropped while the connection stays open.
//! Nothing is ever sent back.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::Router;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::clients::{ClientGuard, ClientRegistry};
use crate::camera::{CameraState, ControlMessage};
use crate::error::Result;
use crate::events::{EventBus, ServiceKind, SystemEvent};
use crate::utils::LogThrottler;
use crate::warn_throttled;

/// Inbound camera control over WebSocket
pub struct CameraControlService {
    camera: Arc<CameraState>,
    clients: Arc<ClientRegistry>,
    events: Arc<EventBus>,
    throttler: LogThrottler,
    shutdown: CancellationToken,
}

impl CameraControlService {
    pub fn new(
        camera: Arc<CameraState>,
        events: Arc<EventBus>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            camera,
            clients: ClientRegistry::new(ServiceKind::Control, events.clone()),
            events,
            throttler: LogThrottler::default(),
            shutdown,
        })
    }

    /// Live control connections
    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    /// Build the router; every path upgrades to the control channel
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .fallback(ws_handler)
            .with_state(self.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve connections until the shutdown token fires
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Camera control listening on ws://{}", local_addr);

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Camera control on {} stopped", local_addr);
        Ok(())
    }

    async fn handle_socket(self: Arc<Self>, socket: WebSocket) {
        let guard = ClientGuard::new(self.clients.clone());
        tokio::select! {
            _ = self.run_connection(socket, &guard) => {}
            _ = self.shutdown.cancelled() => {
                debug!("Control client {} closed for shutdown", guard.id());
            }
        }
        self.throttler.clear(guard.id());
    }

    /// Receive loop for one connection
    ///
    /// Returns when the peer closes or the transport fails. The client's
    /// log throttling entry is dropped on return.
    pub async fn run_connection<R, E>(&self, mut receiver: R, guard: &ClientGuard)
    where
        R: Stream<Item = std::result::Result<Message, E>> + Unpin,
        E: std::fmt::Display,
    {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => self.handle_payload(text.as_bytes(), guard),
                Ok(Message::Binary(data)) => self.handle_payload(&data, guard),
                Ok(Message::Close(_)) => {
                    debug!("Control client {} sent close", guard.id());
                    break;
                }
                // Ping/pong are answered by the transport
                Ok(_) => {}
                Err(e) => {
                    warn!("Control client {} receive error: {}", guard.id(), e);
                    break;
                }
            }
        }
        self.throttler.clear(guard.id());
    }

    /// Decode and apply one message
    ///
    /// A rejected message is counted and reported but never ends the
    /// connection.
    pub fn handle_payload(&self, data: &[u8], guard: &ClientGuard) {
        let applied =
            ControlMessage::decode(data).and_then(|msg| self.camera.apply_versioned(&msg));

        match applied {
            Ok((params, version)) => {
                guard.stats().record_message();
                debug!(
                    "Control client {} updated camera to version {} ({})",
                    guard.id(),
                    version,
                    params.resolution
                );
                self.events.publish(SystemEvent::CameraUpdated {
                    client_id: guard.id().clone(),
                    version,
                });
            }
            Err(e) => {
                guard.stats().record_rejected();
                warn_throttled!(
                    self.throttler,
                    guard.id(),
                    "Control client {} sent a malformed message: {}",
                    guard.id(),
                    e
                );
                self.events.publish(SystemEvent::ControlRejected {
                    client_id: guard.id().clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<Arc<CameraControlService>>,
) -> Response {
    ws.on_upgrade(move |socket| service.handle_socket(socket))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraParameters;
    use crate::video::Resolution;
    use futures::stream;

    fn service() -> (Arc<CameraControlService>, Arc<CameraState>, Arc<EventBus>) {
        let camera = Arc::new(CameraState::new(CameraParameters::with_resolution(
            Resolution::new(64, 32),
        )));
        let events = Arc::new(EventBus::new());
        let service =
            CameraControlService::new(camera.clone(), events.clone(), CancellationToken::new());
        (service, camera, events)
    }

    fn text(s: &str) -> std::result::Result<Message, String> {
        Ok(Message::Text(s.to_string()))
    }

    #[tokio::test]
    async fn test_updates_applied_in_order() {
        let (service, camera, _) = service();
        let guard = ClientGuard::new(service.clients().clone());

        let messages = stream::iter(vec![
            text(r#"{"type":"update","payload":{"translation":[1,0,0]}}"#),
            Ok(Message::Binary(
                br#"{"type":"update","payload":{"translation":[2,0,0],"exposure":2.0}}"#.to_vec(),
            )),
            Ok(Message::Ping(vec![1])),
        ]);
        service.run_connection(messages, &guard).await;

        let params = camera.snapshot();
        assert_eq!(params.translation, [2.0, 0.0, 0.0]);
        assert_eq!(params.exposure, 2.0);
        assert_eq!(camera.version(), 2);
        assert_eq!(guard.stats().messages(), 2);
    }

    #[tokio::test]
    async fn test_malformed_message_keeps_connection() {
        let (service, camera, events) = service();
        let mut rx = events.subscribe();
        let guard = ClientGuard::new(service.clients().clone());

        let messages = stream::iter(vec![
            text("{not json"),
            text(r#"{"type":"update","payload":{"width":0}}"#),
            text(r#"{"type":"update","payload":{"near":0.5}}"#),
        ]);
        service.run_connection(messages, &guard).await;

        assert_eq!(guard.stats().rejected(), 2);
        assert_eq!(guard.stats().messages(), 1);
        assert_eq!(camera.snapshot().near, 0.5);
        assert_eq!(camera.snapshot().resolution, Resolution::new(64, 32));

        let mut rejected = 0;
        let mut updated = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                SystemEvent::ControlRejected { .. } => rejected += 1,
                SystemEvent::CameraUpdated { version, .. } => {
                    assert_eq!(version, 1);
                    updated += 1;
                }
                _ => {}
            }
        }
        assert_eq!((rejected, updated), (2, 1));
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let (service, camera, _) = service();
        let guard = ClientGuard::new(service.clients().clone());

        service.handle_payload(br#"{"type":"update","payload":{"time":4.0}}"#, &guard);
        assert_eq!(camera.snapshot().time, 4.0);
        service.handle_payload(br#"{"type":"reset"}"#, &guard);
        assert_eq!(camera.snapshot(), camera.defaults());
    }

    #[tokio::test]
    async fn test_throttle_entries_released_with_client() {
        let (service, _, _) = service();

        for _ in 0..100 {
            let guard = ClientGuard::new(service.clients().clone());
            let messages = stream::iter(vec![text("{bad"), text("{worse")]);
            service.run_connection(messages, &guard).await;
            assert_eq!(guard.stats().rejected(), 2);
        }

        assert!(service.throttler.is_empty());
        assert_eq!(service.clients().client_count(), 0);
    }

    #[tokio::test]
    async fn test_interleaved_clients_get_their_own_versions() {
        let (service, camera, events) = service();
        let mut rx = events.subscribe();
        let a = ClientGuard::new(service.clients().clone());
        let b = ClientGuard::new(service.clients().clone());

        service.handle_payload(br#"{"type":"update","payload":{"time":1.0}}"#, &a);
        service.handle_payload(br#"{"type":"reset"}"#, &b);
        service.handle_payload(br#"{"type":"update","payload":{"time":2.0}}"#, &a);

        let mut reported = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SystemEvent::CameraUpdated { client_id, version } = event {
                reported.push((client_id, version));
            }
        }
        assert_eq!(
            reported,
            vec![
                (a.id().clone(), 1),
                (b.id().clone(), 2),
                (a.id().clone(), 3),
            ]
        );
        assert_eq!(camera.version(), 3);
    }

    #[tokio::test]
    async fn test_stops_on_close_and_error() {
        let (service, camera, _) = service();
        let guard = ClientGuard::new(service.clients().clone());

        let messages = stream::iter(vec![
            Ok(Message::Close(None)),
            text(r#"{"type":"update","payload":{"time":1.0}}"#),
        ]);
        service.run_connection(messages, &guard).await;
        assert_eq!(camera.version(), 0);

        let messages = stream::iter(vec![
            Err("connection reset".to_string()),
            text(r#"{"type":"update","payload":{"time":1.0}}"#),
        ]);
        service.run_connection(messages, &guard).await;
        assert_eq!(camera.version(), 0);
    }
}
