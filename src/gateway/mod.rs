/// Collaborator interfaces to the chat/voice backend
///
/// Everything the core consumes from the surrounding platform lives behind
/// these traits: the per-node transport, the per-guild voice gateway, the
/// audio player, and the track loader. The hosting application supplies real
/// implementations; tests and benches use mocks.
use crate::core::{ChannelId, GuildId, LoadOutcome, TrackHandle};
use crate::error::CoroError;
use crate::health::GatewayStatus;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// A node's gateway transport handle.
pub trait NodeTransport: Send + Sync {
    /// Current connection status. Must not fail; implementations report any
    /// trouble querying the transport as `GatewayStatus::Other`.
    fn status(&self) -> GatewayStatus;

    /// Releases the transport's resources.
    fn shutdown(&self);
}

/// Per-guild voice channel gateway.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Opens the voice connection to a channel.
    async fn open(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), CoroError>;

    /// Closes the voice connection, if any.
    async fn close(&self, guild_id: GuildId);

    /// Live connection state for a guild.
    fn is_connected(&self, guild_id: GuildId) -> bool;

    /// Whether a channel still exists in the guild.
    fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> bool;

    /// Installs the audio frame source for a guild's connection.
    fn install_sink(&self, guild_id: GuildId, sink: Arc<dyn AudioSink>);

    /// Marks the node as deafened; the bot only sends audio.
    fn set_self_deafened(&self, guild_id: GuildId, deafened: bool);
}

/// Source of opus frames for the transport, polled every 20 ms.
pub trait AudioSink: Send + Sync {
    /// Next frame, or `None` when the player has nothing to send.
    fn provide_frame(&self) -> Option<Bytes>;

    fn is_opus(&self) -> bool {
        true
    }
}

/// An audio player bound to one guild session.
pub trait AudioPlayer: Send + Sync {
    /// Starts a track, replacing whatever was playing.
    fn start(&self, track: TrackHandle);

    /// Stops playback without destroying the player.
    fn stop(&self);

    /// Handle of the currently playing item, if any.
    fn playing(&self) -> Option<TrackHandle>;

    /// Applies a volume in [0, 100].
    fn set_volume(&self, volume: u32);

    fn volume(&self) -> u32;

    /// Pulls the next 20 ms frame.
    fn provide_frame(&self) -> Option<Bytes>;

    /// Irreversibly tears the player down.
    fn destroy(&self);
}

/// Creates players for lazily-allocated guild sessions.
pub trait PlayerFactory: Send + Sync {
    fn create_player(&self) -> Arc<dyn AudioPlayer>;
}

/// Resolves a source identifier into playable items.
#[async_trait]
pub trait TrackLoader: Send + Sync {
    /// Delivers exactly one outcome per request; failures arrive as
    /// `LoadOutcome::Failed`, never as a panic.
    async fn load(&self, source: &str) -> LoadOutcome;
}

/// Adapter feeding a player's frames to the transport.
pub struct PlayerSink {
    player: Arc<dyn AudioPlayer>,
}

impl PlayerSink {
    pub fn new(player: Arc<dyn AudioPlayer>) -> Self {
        Self { player }
    }
}

impl AudioSink for PlayerSink {
    fn provide_frame(&self) -> Option<Bytes> {
        self.player.provide_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FramePlayer {
        frames: Mutex<Vec<Bytes>>,
    }

    impl AudioPlayer for FramePlayer {
        fn start(&self, _track: TrackHandle) {}
        fn stop(&self) {}
        fn playing(&self) -> Option<TrackHandle> {
            None
        }
        fn set_volume(&self, _volume: u32) {}
        fn volume(&self) -> u32 {
            50
        }
        fn provide_frame(&self) -> Option<Bytes> {
            self.frames.lock().unwrap().pop()
        }
        fn destroy(&self) {}
    }

    #[test]
    fn test_player_sink_delegates_frames() {
        let player = Arc::new(FramePlayer {
            frames: Mutex::new(vec![Bytes::from_static(b"\x01\x02")]),
        });
        let sink = PlayerSink::new(player);

        assert!(sink.is_opus());
        assert_eq!(sink.provide_frame(), Some(Bytes::from_static(b"\x01\x02")));
        assert_eq!(sink.provide_frame(), None);
    }
}
