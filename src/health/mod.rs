/// Gateway health classification for fleet nodes
use std::fmt;

/// Connection status of a node's gateway transport.
///
/// Anything the transport cannot positively classify is `Other`, including
/// failures to query the status at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Connected,
    Initializing,
    Loading,
    Other,
}

impl GatewayStatus {
    /// Whether a node in this state may hold leadership. A node that is
    /// still initializing or loading counts as healthy: it will serve the
    /// guild as soon as startup completes.
    pub fn is_healthy(&self) -> bool {
        matches!(
            self,
            GatewayStatus::Connected | GatewayStatus::Initializing | GatewayStatus::Loading
        )
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayStatus::Connected => write!(f, "Connected"),
            GatewayStatus::Initializing => write!(f, "Initializing"),
            GatewayStatus::Loading => write!(f, "Loading"),
            GatewayStatus::Other => write!(f, "Other"),
        }
    }
}
