/// Per-guild leadership coordination across the fleet
///
/// Every tenant-scoped action first asks the coordinator whether the calling
/// node is the primary for that guild. The coordinator keeps the guild ->
/// primary mapping converged on exactly one healthy node, re-electing when a
/// primary goes unhealthy, either on demand or from the periodic sweep.
use crate::core::{BotNode, GuildId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Coordinates primary-node assignment for all guilds served by the fleet.
pub struct FleetCoordinator {
    /// Fleet members in registration order; the order is the election
    /// tie-break when the requesting node is not eligible.
    nodes: Vec<Arc<BotNode>>,

    /// Guild -> primary node name. The source of truth.
    primaries: Arc<RwLock<HashMap<GuildId, String>>>,

    /// Node name -> guilds it leads. Kept in lockstep with `primaries` for
    /// fleet-wide inspection; never consulted to answer `should_respond`.
    node_guilds: Arc<RwLock<HashMap<String, HashSet<GuildId>>>>,

    /// Serializes every election and the sweep. Elections are infrequent and
    /// cheap, so one global section is enough.
    election_guard: Mutex<()>,

    sweep_interval: Duration,
    sweep_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl FleetCoordinator {
    pub fn new(nodes: Vec<Arc<BotNode>>, sweep_interval: Duration) -> Self {
        let mut node_guilds = HashMap::new();
        for node in &nodes {
            node_guilds.insert(node.name().to_string(), HashSet::new());
        }

        Self {
            nodes,
            primaries: Arc::new(RwLock::new(HashMap::new())),
            node_guilds: Arc::new(RwLock::new(node_guilds)),
            election_guard: Mutex::new(()),
            sweep_interval,
            sweep_task: std::sync::Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Whether `node` is authorized to act for the given guild.
    ///
    /// A `None` guild is a direct-message context: every node responds,
    /// regardless of health. Otherwise only the (healthy) primary does, and
    /// this call elects or replaces the primary as needed.
    pub async fn should_respond(&self, node: &BotNode, guild_id: Option<GuildId>) -> bool {
        let Some(guild_id) = guild_id else {
            // DMs: all nodes can respond
            return true;
        };

        if !node.is_healthy() {
            return false;
        }

        let primary = { self.primaries.read().await.get(&guild_id).cloned() };
        match primary {
            None => {
                self.elect_primary(node, guild_id).await;
                self.is_primary(node.name(), guild_id).await
            }
            Some(name) => {
                if self.is_node_healthy(&name) {
                    name == node.name()
                } else {
                    warn!(
                        "Primary node '{}' for guild {} is unhealthy, electing new primary",
                        name, guild_id
                    );
                    self.elect_primary(node, guild_id).await;
                    self.is_primary(node.name(), guild_id).await
                }
            }
        }
    }

    /// Current primary for a guild, if one is recorded.
    pub async fn primary_for(&self, guild_id: GuildId) -> Option<String> {
        self.primaries.read().await.get(&guild_id).cloned()
    }

    /// Guilds currently led by a node.
    pub async fn guilds_led_by(&self, node_name: &str) -> HashSet<GuildId> {
        self.node_guilds
            .read()
            .await
            .get(node_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> &[Arc<BotNode>] {
        &self.nodes
    }

    async fn is_primary(&self, node_name: &str, guild_id: GuildId) -> bool {
        self.primaries.read().await.get(&guild_id).map(String::as_str) == Some(node_name)
    }

    fn node_by_name(&self, name: &str) -> Option<&Arc<BotNode>> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    fn is_node_healthy(&self, name: &str) -> bool {
        self.node_by_name(name).map(|n| n.is_healthy()).unwrap_or(false)
    }

    fn first_healthy(&self) -> Option<&Arc<BotNode>> {
        self.nodes.iter().find(|n| n.is_healthy())
    }

    /// Elects a primary for a guild, preferring the requesting node when it
    /// is healthy. Serialized: concurrent elections for the same guild see
    /// each other's result, and an election that finds the current primary
    /// still healthy is a no-op.
    async fn elect_primary(&self, requester: &BotNode, guild_id: GuildId) {
        let _guard = self.election_guard.lock().await;

        // Re-check under the guard; a racing election may have settled this.
        let current = { self.primaries.read().await.get(&guild_id).cloned() };
        if let Some(name) = &current {
            if self.is_node_healthy(name) {
                return;
            }
        }

        let new_primary = if requester.is_healthy() {
            Some(requester.name().to_string())
        } else {
            self.first_healthy().map(|n| n.name().to_string())
        };

        let Some(new_name) = new_primary else {
            error!("No healthy node available for guild {}", guild_id);
            return;
        };

        self.record_primary(guild_id, current.as_deref(), &new_name)
            .await;
    }

    /// Writes the leadership entry and its reverse mapping, logging the
    /// change.
    async fn record_primary(&self, guild_id: GuildId, old: Option<&str>, new_name: &str) {
        {
            let mut primaries = self.primaries.write().await;
            primaries.insert(guild_id, new_name.to_string());
        }

        {
            let mut node_guilds = self.node_guilds.write().await;
            node_guilds
                .entry(new_name.to_string())
                .or_default()
                .insert(guild_id);
            if let Some(old_name) = old {
                if old_name != new_name {
                    if let Some(guilds) = node_guilds.get_mut(old_name) {
                        guilds.remove(&guild_id);
                    }
                }
            }
        }

        match old {
            Some(old_name) if old_name != new_name => info!(
                "Elected node '{}' as primary for guild {} (replaced '{}')",
                new_name, guild_id, old_name
            ),
            Some(_) => {}
            None => info!("Elected node '{}' as primary for guild {}", new_name, guild_id),
        }
    }

    /// Starts the periodic re-election sweep.
    pub fn start(self: Arc<Self>) {
        let coordinator = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.sweep_interval);
            // The first tick completes immediately; the sweep should not.
            interval.tick().await;
            loop {
                interval.tick().await;
                if coordinator.shut_down.load(Ordering::SeqCst) {
                    break;
                }
                coordinator.check_and_reelect().await;
            }
        });

        let mut task = self.sweep_task.lock().unwrap();
        *task = Some(handle);
    }

    /// One sweep pass: replace every primary that is no longer healthy with
    /// the first healthy node in registration order.
    pub async fn check_and_reelect(&self) {
        let _guard = self.election_guard.lock().await;

        let stale: Vec<(GuildId, String)> = {
            let primaries = self.primaries.read().await;
            primaries
                .iter()
                .filter(|(_, name)| !self.is_node_healthy(name))
                .map(|(guild, name)| (*guild, name.clone()))
                .collect()
        };

        for (guild_id, old_name) in stale {
            match self.first_healthy() {
                Some(replacement) => {
                    let new_name = replacement.name().to_string();
                    self.record_primary(guild_id, Some(&old_name), &new_name)
                        .await;
                    info!(
                        "Re-elected node '{}' as primary for guild {} due to health check",
                        new_name, guild_id
                    );
                }
                None => {
                    error!("No healthy node available for guild {}", guild_id);
                }
            }
        }
    }

    /// Stops the sweep and releases every node's transport. Safe against
    /// double invocation.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Shutting down fleet coordinator");

        let handle = self.sweep_task.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
        }

        for node in &self.nodes {
            node.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::NodeTransport;
    use crate::health::GatewayStatus;

    struct SwitchTransport {
        status: std::sync::Mutex<GatewayStatus>,
        shutdowns: std::sync::atomic::AtomicUsize,
    }

    impl SwitchTransport {
        fn new(status: GatewayStatus) -> Arc<Self> {
            Arc::new(Self {
                status: std::sync::Mutex::new(status),
                shutdowns: std::sync::atomic::AtomicUsize::new(0),
            })
        }

        fn set(&self, status: GatewayStatus) {
            *self.status.lock().unwrap() = status;
        }
    }

    impl NodeTransport for SwitchTransport {
        fn status(&self) -> GatewayStatus {
            *self.status.lock().unwrap()
        }

        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fleet_of(names: &[&str]) -> (Vec<Arc<SwitchTransport>>, Arc<FleetCoordinator>) {
        let transports: Vec<Arc<SwitchTransport>> = names
            .iter()
            .map(|_| SwitchTransport::new(GatewayStatus::Connected))
            .collect();
        let nodes = names
            .iter()
            .zip(&transports)
            .map(|(name, transport)| {
                Arc::new(BotNode::new(*name, transport.clone() as Arc<dyn NodeTransport>))
            })
            .collect();
        let coordinator = Arc::new(FleetCoordinator::new(nodes, Duration::from_secs(30)));
        (transports, coordinator)
    }

    fn node<'a>(coordinator: &'a FleetCoordinator, name: &str) -> &'a Arc<BotNode> {
        coordinator.node_by_name(name).unwrap()
    }

    #[tokio::test]
    async fn test_dm_context_bypasses_health_and_leadership() {
        let (transports, coordinator) = fleet_of(&["a"]);
        transports[0].set(GatewayStatus::Other);

        let a = node(&coordinator, "a").clone();
        assert!(coordinator.should_respond(&a, None).await);
        // No leadership entry was written
        assert!(coordinator.primaries.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_unhealthy_node_never_self_elects() {
        let (transports, coordinator) = fleet_of(&["a", "b"]);
        transports[0].set(GatewayStatus::Other);

        let a = node(&coordinator, "a").clone();
        assert!(!coordinator.should_respond(&a, Some(1)).await);
        assert_eq!(coordinator.primary_for(1).await, None);
    }

    #[tokio::test]
    async fn test_first_caller_becomes_primary() {
        // Scenario A: three healthy nodes, B asks first
        let (_transports, coordinator) = fleet_of(&["a", "b", "c"]);
        let a = node(&coordinator, "a").clone();
        let b = node(&coordinator, "b").clone();

        assert!(coordinator.should_respond(&b, Some(42)).await);
        assert!(!coordinator.should_respond(&a, Some(42)).await);

        assert_eq!(coordinator.primary_for(42).await.as_deref(), Some("b"));
        assert!(coordinator.guilds_led_by("b").await.contains(&42));
        assert!(coordinator.guilds_led_by("a").await.is_empty());
    }

    #[tokio::test]
    async fn test_unhealthy_primary_is_replaced_on_demand() {
        // Scenario B
        let (transports, coordinator) = fleet_of(&["a", "b"]);
        let a = node(&coordinator, "a").clone();
        let b = node(&coordinator, "b").clone();

        assert!(coordinator.should_respond(&a, Some(9)).await);
        transports[0].set(GatewayStatus::Other);

        assert!(coordinator.should_respond(&b, Some(9)).await);
        assert_eq!(coordinator.primary_for(9).await.as_deref(), Some("b"));

        // Reverse mapping followed the change
        assert!(coordinator.guilds_led_by("a").await.is_empty());
        assert!(coordinator.guilds_led_by("b").await.contains(&9));
    }

    #[tokio::test]
    async fn test_concurrent_elections_pick_exactly_one_primary() {
        let (_transports, coordinator) = fleet_of(&["a", "b"]);
        let a = node(&coordinator, "a").clone();
        let b = node(&coordinator, "b").clone();

        let (a_responds, b_responds) = tokio::join!(
            coordinator.should_respond(&a, Some(5)),
            coordinator.should_respond(&b, Some(5)),
        );

        // Exactly one of the racing nodes won
        assert!(a_responds ^ b_responds);
        let primary = coordinator.primary_for(5).await.unwrap();
        assert_eq!(a_responds, primary == "a");
        assert_eq!(b_responds, primary == "b");
    }

    #[tokio::test]
    async fn test_election_retried_until_a_node_is_healthy() {
        let (transports, coordinator) = fleet_of(&["a"]);
        transports[0].set(GatewayStatus::Other);
        let a = node(&coordinator, "a").clone();

        assert!(!coordinator.should_respond(&a, Some(3)).await);
        assert_eq!(coordinator.primary_for(3).await, None);

        // Node recovers; the next call elects it
        transports[0].set(GatewayStatus::Initializing);
        assert!(coordinator.should_respond(&a, Some(3)).await);
        assert_eq!(coordinator.primary_for(3).await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_sweep_replaces_unhealthy_primaries() {
        let (transports, coordinator) = fleet_of(&["a", "b", "c"]);
        let c = node(&coordinator, "c").clone();

        assert!(coordinator.should_respond(&c, Some(1)).await);
        assert!(coordinator.should_respond(&c, Some(2)).await);

        transports[2].set(GatewayStatus::Other);
        coordinator.check_and_reelect().await;

        // Replacement is the first healthy node in registration order
        assert_eq!(coordinator.primary_for(1).await.as_deref(), Some("a"));
        assert_eq!(coordinator.primary_for(2).await.as_deref(), Some("a"));
        assert!(coordinator.guilds_led_by("c").await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_leaves_guild_unresolved_without_healthy_nodes() {
        let (transports, coordinator) = fleet_of(&["a", "b"]);
        let a = node(&coordinator, "a").clone();
        assert!(coordinator.should_respond(&a, Some(8)).await);

        transports[0].set(GatewayStatus::Other);
        transports[1].set(GatewayStatus::Other);
        coordinator.check_and_reelect().await;

        // Stale entry remains until somebody healthy shows up
        assert_eq!(coordinator.primary_for(8).await.as_deref(), Some("a"));
        let a = node(&coordinator, "a").clone();
        assert!(!coordinator.should_respond(&a, Some(8)).await);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_releases_nodes() {
        let (transports, coordinator) = fleet_of(&["a", "b"]);
        coordinator.clone().start();

        coordinator.shutdown().await;
        coordinator.shutdown().await;

        for transport in &transports {
            assert_eq!(transport.shutdowns.load(Ordering::SeqCst), 1);
        }
        assert!(coordinator.sweep_task.lock().unwrap().is_none());
    }
}
