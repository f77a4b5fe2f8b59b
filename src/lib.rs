pub mod cluster;
pub mod config;
/// coro - Resilient multi-node streaming coordinator for chat-platform bot fleets
///
/// A fleet of worker nodes jointly serves many guilds; for every guild
/// exactly one node is authoritative at a time. Two pieces do the real work:
/// 1. FleetCoordinator: per-guild leader election and failover across nodes
/// 2. StreamManager + StreamScheduler: voice connections that survive drops
///    and a loop source that keeps playing across track ends and load failures
pub mod core;
pub mod error;
pub mod gateway;
pub mod health;
pub mod stats;
pub mod utils;
pub mod voice;

use crate::cluster::FleetCoordinator;
use crate::config::Config;
use crate::core::{BotNode, GuildId};
use crate::gateway::{NodeTransport, PlayerFactory, TrackLoader, VoiceGateway};
use crate::stats::SettingsStore;
use crate::utils::generate_id;
use crate::voice::reconnect::ReconnectSupervisor;
use crate::voice::StreamManager;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators required to run one fleet node. The hosting application
/// builds one of these per configured credential.
pub struct NodeSetup {
    /// Node name; generated when omitted.
    pub name: Option<String>,
    pub transport: Arc<dyn NodeTransport>,
    pub gateway: Arc<dyn VoiceGateway>,
    pub loader: Arc<dyn TrackLoader>,
    pub players: Arc<dyn PlayerFactory>,
}

/// The assembled fleet: coordinator plus one stream manager and reconnect
/// supervisor per node.
///
/// Everything is constructed explicitly and torn down with `shutdown`; there
/// are no process-global instances.
pub struct Fleet {
    coordinator: Arc<FleetCoordinator>,
    managers: HashMap<String, Arc<StreamManager>>,
    supervisors: HashMap<String, Arc<ReconnectSupervisor>>,
    shut_down: AtomicBool,
}

impl Fleet {
    pub fn new(config: &Config, setups: Vec<NodeSetup>, store: Arc<dyn SettingsStore>) -> Self {
        let mut nodes = Vec::with_capacity(setups.len());
        let mut managers = HashMap::new();
        let mut supervisors = HashMap::new();

        for setup in setups {
            let name = setup.name.unwrap_or_else(|| generate_id("node"));
            let node = Arc::new(BotNode::new(name.clone(), setup.transport));

            let manager = Arc::new(StreamManager::new(
                setup.gateway,
                setup.loader,
                setup.players,
                store.clone(),
                config.stream.retry_delay(),
            ));
            let supervisor = Arc::new(ReconnectSupervisor::new(
                manager.clone(),
                config.stream.reconnect_delay(),
                config.stream.ready_reconnect_delay(),
            ));

            nodes.push(node);
            managers.insert(name.clone(), manager);
            supervisors.insert(name, supervisor);
        }

        let coordinator = Arc::new(FleetCoordinator::new(
            nodes,
            config.fleet.health_check_interval(),
        ));

        Self {
            coordinator,
            managers,
            supervisors,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Launches the periodic re-election sweep.
    pub fn start(&self) {
        self.coordinator.clone().start();
        info!(
            "Fleet started with {} node(s)",
            self.coordinator.nodes().len()
        );
    }

    pub fn coordinator(&self) -> &Arc<FleetCoordinator> {
        &self.coordinator
    }

    /// Stream manager of a node.
    pub fn manager(&self, node_name: &str) -> Option<&Arc<StreamManager>> {
        self.managers.get(node_name)
    }

    /// Reconnect supervisor of a node.
    pub fn supervisor(&self, node_name: &str) -> Option<&Arc<ReconnectSupervisor>> {
        self.supervisors.get(node_name)
    }

    /// Whether the named node should act for a guild. The command layer
    /// calls this before executing any guild-scoped action and silently
    /// ignores the event on `false`.
    pub async fn should_respond(&self, node_name: &str, guild_id: Option<GuildId>) -> bool {
        let node = self
            .coordinator
            .nodes()
            .iter()
            .find(|n| n.name() == node_name)
            .cloned();
        match node {
            Some(node) => self.coordinator.should_respond(&node, guild_id).await,
            None => {
                warn!("should_respond called for unknown node '{}'", node_name);
                false
            }
        }
    }

    /// Stops the sweep, abandons pending reconnects and releases every
    /// node's transport. Safe against double invocation.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Shutting down fleet");
        for supervisor in self.supervisors.values() {
            supervisor.close();
        }
        self.coordinator.shutdown().await;
    }
}
