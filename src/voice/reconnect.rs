/// Automatic reconnection after involuntary voice disconnects
///
/// The hosting layer feeds voice-state changes and node readiness in here;
/// the supervisor turns them into delayed one-shot reconnect attempts. Every
/// scheduled task re-checks liveness when it fires, so a shutdown or an
/// explicit leave in the meantime turns it into a no-op.
use crate::core::{ChannelId, GuildId};
use crate::voice::StreamManager;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ReconnectSupervisor {
    manager: Arc<StreamManager>,
    reconnect_delay: Duration,
    ready_delay: Duration,
    closed: Arc<AtomicBool>,
}

impl ReconnectSupervisor {
    pub fn new(
        manager: Arc<StreamManager>,
        reconnect_delay: Duration,
        ready_delay: Duration,
    ) -> Self {
        Self {
            manager,
            reconnect_delay,
            ready_delay,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Voice-state change for the node itself. A departure from the
    /// remembered channel that the node did not ask for schedules one
    /// reconnect attempt after the configured delay.
    pub fn on_voice_update(
        &self,
        guild_id: GuildId,
        channel_left: Option<ChannelId>,
        channel_joined: Option<ChannelId>,
    ) {
        let Some(left) = channel_left else {
            return;
        };
        if channel_joined.is_some() {
            // A move between channels is not a disconnect
            return;
        }

        let manager = self.manager.clone();
        let closed = self.closed.clone();
        let delay = self.reconnect_delay;
        tokio::spawn(async move {
            let remembered = manager.remembered_channel(guild_id).await;
            if remembered != Some(left) {
                debug!(
                    "Ignoring voice departure from channel {} in guild {}",
                    left, guild_id
                );
                return;
            }

            warn!(
                "Node was disconnected from voice channel {} in guild {}",
                left, guild_id
            );
            info!("Scheduling reconnection attempt for guild {}", guild_id);
            tokio::time::sleep(delay).await;

            if closed.load(Ordering::SeqCst) {
                return;
            }
            if manager.is_connected(guild_id) {
                return;
            }

            if manager.reconnect_if_possible(guild_id).await {
                info!("Successfully reconnected to voice channel in guild {}", guild_id);
            } else {
                warn!("Failed to reconnect to voice channel in guild {}", guild_id);
            }
        });
    }

    /// Node readiness. One fleet-wide pass after the configured delay picks
    /// up every guild whose disconnect happened while the node was offline.
    pub fn on_ready(&self) {
        info!("Node is ready, checking for voice channels to reconnect");
        let manager = self.manager.clone();
        let closed = self.closed.clone();
        let delay = self.ready_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if closed.load(Ordering::SeqCst) {
                return;
            }
            run_reconnect_pass(&manager).await;
        });
    }

    /// Attempts to reconnect every remembered, currently disconnected guild.
    pub async fn reconnect_all(&self) {
        run_reconnect_pass(&self.manager).await;
    }

    /// Pending tasks that fire after this point do nothing.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// The fleet-wide pass: every remembered, disconnected guild gets one
/// concurrent reconnect attempt.
async fn run_reconnect_pass(manager: &Arc<StreamManager>) {
    let guilds: Vec<GuildId> = manager
        .remembered_guilds()
        .await
        .into_iter()
        .filter(|guild_id| !manager.is_connected(*guild_id))
        .collect();

    if guilds.is_empty() {
        return;
    }

    let attempts = guilds.into_iter().map(|guild_id| {
        let manager = manager.clone();
        async move { (guild_id, manager.reconnect_if_possible(guild_id).await) }
    });

    for (guild_id, reconnected) in join_all(attempts).await {
        if reconnected {
            info!("Successfully reconnected to voice channel in guild {}", guild_id);
        } else {
            warn!("Failed to reconnect to voice channel in guild {}", guild_id);
        }
    }
}
