//! Connection bookkeeping shared by both services
//!
//! Each accepted WebSocket gets a UUID and a [`ClientGuard`]. The guard
//! registers the client on creation and unregisters it on drop, so a
//! connection task that exits for any reason (error, peer close, shutdown,
//! panic unwinding) always leaves the registry consistent.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::events::{EventBus, ServiceKind, SystemEvent};

/// Client ID type (UUID string)
pub type ClientId = String;

/// Per-connection counters
#[derive(Debug)]
pub struct ConnectionStats {
    /// Connection timestamp
    pub connected_at: Instant,
    /// Last frame sent or message received
    last_activity: Mutex<Instant>,
    /// Frames sent (stream) or messages applied (control)
    messages: AtomicU64,
    /// Messages rejected (control only)
    rejected: AtomicU64,
}

impl ConnectionStats {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            connected_at: now,
            last_activity: Mutex::new(now),
            messages: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        self.touch();
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last frame or message
    pub fn idle_duration(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn connected_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Registry of live connections for one service
pub struct ClientRegistry {
    service: ServiceKind,
    clients: RwLock<HashMap<ClientId, Arc<ConnectionStats>>>,
    events: Arc<EventBus>,
}

impl ClientRegistry {
    pub fn new(service: ServiceKind, events: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self {
            service,
            clients: RwLock::new(HashMap::new()),
            events,
        })
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    /// Get client count
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// IDs of connected clients
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.read().keys().cloned().collect()
    }

    /// Counters of one client
    pub fn stats(&self, client_id: &str) -> Option<Arc<ConnectionStats>> {
        self.clients.read().get(client_id).cloned()
    }

    fn register(&self, client_id: ClientId) -> Arc<ConnectionStats> {
        let stats = Arc::new(ConnectionStats::new());
        let total = {
            let mut clients = self.clients.write();
            clients.insert(client_id.clone(), stats.clone());
            clients.len()
        };

        info!(
            "{} client {} connected (total: {})",
            self.service, client_id, total
        );
        self.events.publish(SystemEvent::ClientConnected {
            service: self.service,
            client_id,
            total,
        });
        stats
    }

    fn unregister(&self, client_id: &str) {
        let removed = self.clients.write().remove(client_id);
        if let Some(stats) = removed {
            let connected_secs = stats.connected_duration().as_secs_f64();
            info!(
                "{} client {} disconnected after {:.1}s ({} messages, idle {:.1}s)",
                self.service,
                client_id,
                connected_secs,
                stats.messages(),
                stats.idle_duration().as_secs_f64()
            );
            self.events.publish(SystemEvent::ClientDisconnected {
                service: self.service,
                client_id: client_id.to_string(),
                messages: stats.messages(),
                connected_secs,
            });
        }
    }
}

/// RAII guard for client lifecycle management
pub struct ClientGuard {
    client_id: ClientId,
    stats: Arc<ConnectionStats>,
    registry: Arc<ClientRegistry>,
}

impl ClientGuard {
    /// Register a new client with a fresh UUID
    pub fn new(registry: Arc<ClientRegistry>) -> Self {
        let client_id = uuid::Uuid::new_v4().to_string();
        let stats = registry.register(client_id.clone());
        Self {
            client_id,
            stats,
            registry,
        }
    }

    /// Get client ID
    pub fn id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.client_id);
    }
}
