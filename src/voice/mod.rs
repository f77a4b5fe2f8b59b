/// Resilient voice session management
///
/// `StreamManager` owns every per-guild streaming concern on one node:
/// opening and closing voice connections, remembering enough state to come
/// back after a drop, volume, and teardown. Failures at the gateway are
/// logged and reported as booleans; nothing here propagates into the command
/// layer.
pub mod reconnect;
pub mod scheduler;
pub mod session;

use crate::core::{ChannelId, EndReason, GuildId, TrackHandle};
use crate::gateway::{AudioPlayer, PlayerFactory, PlayerSink, TrackLoader, VoiceGateway};
use crate::stats::{SettingsStore, DEFAULT_VOLUME};
use scheduler::StreamScheduler;
use session::GuildSession;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Player and scheduler for one guild, allocated on first connect.
#[derive(Clone)]
struct GuildStream {
    player: Arc<dyn AudioPlayer>,
    scheduler: Arc<StreamScheduler>,
}

/// Voice connection manager for one fleet node.
pub struct StreamManager {
    gateway: Arc<dyn VoiceGateway>,
    loader: Arc<dyn TrackLoader>,
    players: Arc<dyn PlayerFactory>,
    store: Arc<dyn SettingsStore>,
    retry_delay: Duration,
    streams: Arc<RwLock<HashMap<GuildId, GuildStream>>>,
    sessions: Arc<RwLock<HashMap<GuildId, GuildSession>>>,
}

impl StreamManager {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        loader: Arc<dyn TrackLoader>,
        players: Arc<dyn PlayerFactory>,
        store: Arc<dyn SettingsStore>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            gateway,
            loader,
            players,
            store,
            retry_delay,
            streams: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets or lazily creates the guild's player and scheduler.
    async fn stream_for(&self, guild_id: GuildId) -> GuildStream {
        let mut streams = self.streams.write().await;
        streams
            .entry(guild_id)
            .or_insert_with(|| {
                let player = self.players.create_player();
                let scheduler = Arc::new(StreamScheduler::new(
                    guild_id,
                    player.clone(),
                    self.loader.clone(),
                    self.store.clone(),
                    self.retry_delay,
                ));
                GuildStream { player, scheduler }
            })
            .clone()
    }

    async fn existing_stream(&self, guild_id: GuildId) -> Option<GuildStream> {
        self.streams.read().await.get(&guild_id).cloned()
    }

    /// Connects to a voice channel and remembers it as the reconnect target.
    ///
    /// Returns `false` on any transport failure; the error never propagates.
    pub async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let stream = self.stream_for(guild_id).await;

        self.gateway
            .install_sink(guild_id, Arc::new(PlayerSink::new(stream.player.clone())));

        if let Err(e) = self.gateway.open(guild_id, channel_id).await {
            error!(
                "Failed to connect to voice channel {} in guild {}: {}",
                channel_id, guild_id, e
            );
            return false;
        }

        // Only send audio, never listen
        self.gateway.set_self_deafened(guild_id, true);

        {
            let mut sessions = self.sessions.write().await;
            sessions
                .entry(guild_id)
                .or_insert_with(GuildSession::new)
                .set_channel(channel_id);
        }

        info!(
            "Connected to voice channel {} in guild {}",
            channel_id, guild_id
        );
        true
    }

    /// Closes the voice connection, retaining the playing item and the
    /// channel so a later reconnect can resume.
    pub async fn disconnect(&self, guild_id: GuildId) {
        if !self.gateway.is_connected(guild_id) {
            return;
        }

        if let Some(stream) = self.existing_stream(guild_id).await {
            if let Some(track) = stream.player.playing() {
                let mut sessions = self.sessions.write().await;
                sessions
                    .entry(guild_id)
                    .or_insert_with(GuildSession::new)
                    .retain_track(track);
            }
        }

        self.gateway.close(guild_id).await;
        // The remembered channel deliberately stays for reconnection
        info!("Disconnected from voice channel in guild {}", guild_id);
    }

    /// Live transport connection state.
    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.gateway.is_connected(guild_id)
    }

    /// Attempts to reconnect to the remembered channel and resume playback.
    pub async fn reconnect_if_possible(&self, guild_id: GuildId) -> bool {
        let channel_id = {
            let sessions = self.sessions.read().await;
            sessions.get(&guild_id).and_then(|s| s.channel_id())
        };
        let Some(channel_id) = channel_id else {
            debug!("No stored voice channel for guild {}", guild_id);
            return false;
        };

        if !self.gateway.channel_exists(guild_id, channel_id) {
            warn!(
                "Stored voice channel {} no longer exists in guild {}",
                channel_id, guild_id
            );
            self.release(guild_id).await;
            return false;
        }

        if !self.connect(guild_id, channel_id).await {
            return false;
        }

        let retained = {
            let sessions = self.sessions.read().await;
            sessions
                .get(&guild_id)
                .and_then(|s| s.retained_track().cloned())
        };
        if let Some(track) = retained {
            self.resume(guild_id, track).await;
        }

        true
    }

    /// Restores volume from the settings store and restarts the retained
    /// item, re-arming the loop when it was armed before the drop.
    async fn resume(&self, guild_id: GuildId, track: TrackHandle) {
        let stream = self.stream_for(guild_id).await;

        let volume = match self.store.guild_volume(guild_id).await {
            Ok(volume) => volume.min(100),
            Err(e) => {
                warn!("Failed to read volume for guild {}: {}", guild_id, e);
                DEFAULT_VOLUME
            }
        };
        stream.player.set_volume(volume);

        if stream.scheduler.is_looping().await {
            // The configured loop source is authoritative; the retained
            // track's identifier may lag behind a re-targeted loop.
            if let Some(source) = stream.scheduler.loop_source().await {
                if source != track.identifier {
                    warn!(
                        "Loop source '{}' and resumed track '{}' diverge in guild {}",
                        source, track.identifier, guild_id
                    );
                }
                stream.scheduler.set_stream_url(source).await;
            }
            stream.player.start(track);
            info!(
                "Resumed looped playback after reconnection in guild {} at {}% volume",
                guild_id, volume
            );
        } else {
            stream.player.start(track);
            info!(
                "Resumed track after reconnection in guild {} at {}% volume",
                guild_id, volume
            );
        }
    }

    /// Applies a clamped volume to the live player and mirrors it to the
    /// settings store. Returns the volume actually applied.
    pub async fn set_volume(&self, guild_id: GuildId, volume: u32) -> u32 {
        let clamped = volume.min(100);

        if let Some(stream) = self.existing_stream(guild_id).await {
            stream.player.set_volume(clamped);
        }

        // Best-effort persistence; the live player already changed
        if let Err(e) = self.store.set_guild_volume(guild_id, clamped).await {
            warn!("Failed to persist volume for guild {}: {}", guild_id, e);
        }

        clamped
    }

    /// Live player volume, falling back to the persisted value before the
    /// guild's player exists.
    pub async fn get_volume(&self, guild_id: GuildId) -> u32 {
        if let Some(stream) = self.existing_stream(guild_id).await {
            return stream.player.volume();
        }

        match self.store.guild_volume(guild_id).await {
            Ok(volume) => volume.min(100),
            Err(e) => {
                warn!("Failed to read volume for guild {}: {}", guild_id, e);
                DEFAULT_VOLUME
            }
        }
    }

    /// Explicitly forgets the remembered channel and retained track. Used
    /// when the user asks the bot to leave for good.
    pub async fn release(&self, guild_id: GuildId) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(&guild_id).is_some() {
            debug!("Released remembered voice state for guild {}", guild_id);
        }
    }

    /// Tears down all per-guild state, folding any in-progress playback
    /// duration into the persisted total first.
    pub async fn cleanup(&self, guild_id: GuildId) {
        let stream = {
            let mut streams = self.streams.write().await;
            streams.remove(&guild_id)
        };

        if let Some(stream) = stream {
            stream.scheduler.stop_looping().await;
            stream.scheduler.flush_playback_time().await;
            stream.player.destroy();
        }

        self.release(guild_id).await;
        info!("Cleaned up streaming state for guild {}", guild_id);
    }

    /// Scheduler for a guild, once it has one.
    pub async fn scheduler(&self, guild_id: GuildId) -> Option<Arc<StreamScheduler>> {
        Some(self.existing_stream(guild_id).await?.scheduler)
    }

    /// Player for a guild, once it has one.
    pub async fn player(&self, guild_id: GuildId) -> Option<Arc<dyn AudioPlayer>> {
        Some(self.existing_stream(guild_id).await?.player)
    }

    /// Track lifecycle event from the hosting layer.
    pub async fn notify_track_start(&self, guild_id: GuildId, track: &TrackHandle) {
        if let Some(stream) = self.existing_stream(guild_id).await {
            stream.scheduler.on_track_start(track).await;
        }
    }

    /// Track lifecycle event from the hosting layer.
    pub async fn notify_track_end(&self, guild_id: GuildId, track: &TrackHandle, reason: EndReason) {
        if let Some(stream) = self.existing_stream(guild_id).await {
            stream.scheduler.on_track_end(track, reason).await;
        }
    }

    /// Remembered reconnect target for a guild, if any.
    pub async fn remembered_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let sessions = self.sessions.read().await;
        sessions.get(&guild_id).and_then(|s| s.channel_id())
    }

    /// Guilds with a remembered channel, for the fleet-wide reconnect pass.
    pub async fn remembered_guilds(&self) -> Vec<GuildId> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(_, session)| session.channel_id().is_some())
            .map(|(guild_id, _)| *guild_id)
            .collect()
    }
}
