/// Worker node representation
use crate::gateway::NodeTransport;
use crate::health::GatewayStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// A worker node in the fleet: one configured credential plus a live handle
/// to its gateway transport.
///
/// Health is derived from the transport at the instant of the call and never
/// cached; a node that was healthy a moment ago may not be now.
pub struct BotNode {
    name: String,
    transport: Arc<dyn NodeTransport>,
    started_at: SystemTime,
    released: AtomicBool,
}

impl BotNode {
    pub fn new(name: impl Into<String>, transport: Arc<dyn NodeTransport>) -> Self {
        Self {
            name: name.into(),
            transport,
            started_at: SystemTime::now(),
            released: AtomicBool::new(false),
        }
    }

    /// Node identity. Unique within the fleet.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current transport status, queried live.
    pub fn status(&self) -> GatewayStatus {
        self.transport.status()
    }

    /// Whether the node can currently be given leadership.
    pub fn is_healthy(&self) -> bool {
        self.status().is_healthy()
    }

    pub fn uptime_seconds(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.started_at)
            .unwrap_or_default()
            .as_secs()
    }

    /// Releases the underlying transport. Safe to call more than once; only
    /// the first call reaches the transport.
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            tracing::info!(
                "Releasing node '{}' after {}s uptime",
                self.name,
                self.uptime_seconds()
            );
            self.transport.shutdown();
        }
    }
}

impl std::fmt::Debug for BotNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotNode")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}
