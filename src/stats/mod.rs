/// Persisted per-guild settings and playback statistics
///
/// The store is an external collaborator with get/set semantics. Every call
/// is best-effort: callers log failures and carry on, a broken store never
/// blocks playback or volume changes.
use crate::core::GuildId;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Volume applied when a guild has no persisted setting yet.
pub const DEFAULT_VOLUME: u32 = 50;

/// Store-level error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store for per-guild settings and accumulated statistics.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Persisted volume for a guild, `DEFAULT_VOLUME` when absent.
    async fn guild_volume(&self, guild_id: GuildId) -> Result<u32, StoreError>;

    async fn set_guild_volume(&self, guild_id: GuildId, volume: u32) -> Result<(), StoreError>;

    /// Adds playback seconds to the guild's running total.
    async fn add_playback_seconds(&self, guild_id: GuildId, seconds: u64)
        -> Result<(), StoreError>;

    async fn guild_playback_seconds(&self, guild_id: GuildId) -> Result<u64, StoreError>;
}

/// In-memory store. The default backing for tests and single-process
/// deployments without a database.
pub struct MemoryStore {
    volumes: RwLock<HashMap<GuildId, u32>>,
    playback: RwLock<HashMap<GuildId, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            volumes: RwLock::new(HashMap::new()),
            playback: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn guild_volume(&self, guild_id: GuildId) -> Result<u32, StoreError> {
        let volumes = self.volumes.read().await;
        Ok(volumes.get(&guild_id).copied().unwrap_or(DEFAULT_VOLUME))
    }

    async fn set_guild_volume(&self, guild_id: GuildId, volume: u32) -> Result<(), StoreError> {
        let mut volumes = self.volumes.write().await;
        volumes.insert(guild_id, volume.min(100));
        Ok(())
    }

    async fn add_playback_seconds(
        &self,
        guild_id: GuildId,
        seconds: u64,
    ) -> Result<(), StoreError> {
        let mut playback = self.playback.write().await;
        *playback.entry(guild_id).or_insert(0) += seconds;
        Ok(())
    }

    async fn guild_playback_seconds(&self, guild_id: GuildId) -> Result<u64, StoreError> {
        let playback = self.playback.read().await;
        Ok(playback.get(&guild_id).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_volume_defaults_until_set() {
        let store = MemoryStore::new();
        assert_eq!(store.guild_volume(1).await.unwrap(), DEFAULT_VOLUME);

        store.set_guild_volume(1, 80).await.unwrap();
        assert_eq!(store.guild_volume(1).await.unwrap(), 80);

        // Other guilds are unaffected
        assert_eq!(store.guild_volume(2).await.unwrap(), DEFAULT_VOLUME);
    }

    #[tokio::test]
    async fn test_playback_seconds_accumulate() {
        let store = MemoryStore::new();
        assert_eq!(store.guild_playback_seconds(7).await.unwrap(), 0);

        store.add_playback_seconds(7, 120).await.unwrap();
        store.add_playback_seconds(7, 30).await.unwrap();
        assert_eq!(store.guild_playback_seconds(7).await.unwrap(), 150);
    }
}
