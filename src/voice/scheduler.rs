/// Loop playback scheduling for a guild session
///
/// Keeps a configured loop source playing indefinitely: every natural track
/// end triggers a fresh load of the source, and a failed load is retried
/// after a delay. The retry checks the loop state again when it fires, so
/// turning looping off in the meantime abandons it silently.
use crate::core::{EndReason, GuildId, LoadOutcome, TrackHandle};
use crate::gateway::{AudioPlayer, TrackLoader};
use crate::stats::SettingsStore;
use crate::utils::format_duration;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default)]
struct LoopState {
    source: Option<String>,
    enabled: bool,
}

/// Per-guild scheduler driving loop playback and playback-time accounting.
pub struct StreamScheduler {
    guild_id: GuildId,
    player: Arc<dyn AudioPlayer>,
    loader: Arc<dyn TrackLoader>,
    store: Arc<dyn SettingsStore>,
    retry_delay: Duration,
    state: Arc<RwLock<LoopState>>,
    pub(crate) playback_started: RwLock<Option<SystemTime>>,
}

/// Everything a detached load/retry task needs. Cloned into the task so a
/// torn-down scheduler never keeps it alive, and the loop state is checked
/// again at fire time.
#[derive(Clone)]
struct LoopRuntime {
    guild_id: GuildId,
    url: String,
    player: Arc<dyn AudioPlayer>,
    loader: Arc<dyn TrackLoader>,
    state: Arc<RwLock<LoopState>>,
    retry_delay: Duration,
}

impl LoopRuntime {
    /// Loads the source and starts the freshly loaded item. A decoded
    /// instance is never reused across plays.
    async fn load_and_start(self) {
        match self.loader.load(&self.url).await {
            LoadOutcome::Failed { reason } => {
                error!("Failed to reload stream {}: {}", self.url, reason);
                self.schedule_retry();
            }
            outcome => match outcome.into_track() {
                Some(track) => self.player.start(track),
                None => warn!("Could not reload stream: {}", self.url),
            },
        }
    }

    /// One delayed retry. Fire-time liveness check: the retry only proceeds
    /// if looping is still armed on the same source.
    fn schedule_retry(self) {
        tokio::spawn(async move {
            tokio::time::sleep(self.retry_delay).await;

            let still_wanted = {
                let state = self.state.read().await;
                state.enabled && state.source.as_deref() == Some(self.url.as_str())
            };
            if !still_wanted {
                debug!("Loop retry abandoned for guild {}", self.guild_id);
                return;
            }

            self.load_and_start().await;
        });
    }
}

impl StreamScheduler {
    pub fn new(
        guild_id: GuildId,
        player: Arc<dyn AudioPlayer>,
        loader: Arc<dyn TrackLoader>,
        store: Arc<dyn SettingsStore>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            guild_id,
            player,
            loader,
            store,
            retry_delay,
            state: Arc::new(RwLock::new(LoopState::default())),
            playback_started: RwLock::new(None),
        }
    }

    fn runtime_for(&self, url: String) -> LoopRuntime {
        LoopRuntime {
            guild_id: self.guild_id,
            url,
            player: self.player.clone(),
            loader: self.loader.clone(),
            state: self.state.clone(),
            retry_delay: self.retry_delay,
        }
    }

    /// Arms looping on a source. Every natural track end reloads it.
    pub async fn set_stream_url(&self, source: impl Into<String>) {
        let mut state = self.state.write().await;
        state.source = Some(source.into());
        state.enabled = true;
    }

    /// Disarms looping and forgets the source. A retry already scheduled
    /// finds looping disabled when it fires and does nothing.
    pub async fn stop_looping(&self) {
        let mut state = self.state.write().await;
        state.enabled = false;
        state.source = None;
    }

    pub async fn is_looping(&self) -> bool {
        self.state.read().await.enabled
    }

    /// Currently configured loop source, if looping is armed.
    pub async fn loop_source(&self) -> Option<String> {
        let state = self.state.read().await;
        if state.enabled {
            state.source.clone()
        } else {
            None
        }
    }

    /// Track lifecycle: a track began playing.
    pub async fn on_track_start(&self, track: &TrackHandle) {
        debug!(
            "Track started in guild {}: {}",
            self.guild_id, track.identifier
        );
        let mut started = self.playback_started.write().await;
        *started = Some(SystemTime::now());
    }

    /// Track lifecycle: a track stopped playing.
    ///
    /// The elapsed playback time is flushed for every end reason; the loop
    /// source is reloaded only when the reason permits starting a new track.
    pub async fn on_track_end(&self, _track: &TrackHandle, reason: EndReason) {
        self.flush_playback_time().await;

        if !reason.may_start_next() {
            return;
        }

        if let Some(url) = self.loop_source().await {
            info!("Track ended, restarting stream: {}", url);
            self.runtime_for(url).load_and_start().await;
        }
    }

    /// Folds the in-progress playback duration into the persisted total and
    /// clears the start timestamp. Store failures are logged, never raised.
    pub(crate) async fn flush_playback_time(&self) {
        let started = { self.playback_started.write().await.take() };
        let Some(started_at) = started else {
            return;
        };

        let elapsed = SystemTime::now()
            .duration_since(started_at)
            .unwrap_or_default();
        let seconds = elapsed.as_secs();
        if seconds == 0 {
            return;
        }

        match self.store.add_playback_seconds(self.guild_id, seconds).await {
            Ok(()) => debug!(
                "Recorded {} of playback for guild {}",
                format_duration(elapsed),
                self.guild_id
            ),
            Err(e) => warn!(
                "Failed to record playback time for guild {}: {}",
                self.guild_id, e
            ),
        }
    }
}
