/// Core identifiers and track abstractions shared between the cluster and
/// streaming modules
pub mod node;

pub use node::BotNode;

/// Snowflake-style identifier of a guild (the per-tenant isolation scope).
pub type GuildId = u64;

/// Snowflake-style identifier of a voice channel inside a guild.
pub type ChannelId = u64;

/// Lightweight reference to a loaded audio item.
///
/// A handle carries just enough to re-acquire the item from its source.
/// Cloning a handle never clones decoded audio; playback always starts from
/// a freshly loaded instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHandle {
    /// Source identifier (stream URL or provider URI).
    pub identifier: String,
    /// Human-readable title, when the source provides one.
    pub title: Option<String>,
    /// Whether the item is an endless live stream.
    pub is_stream: bool,
}

impl TrackHandle {
    /// Handle for an endless live stream.
    pub fn stream(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
            is_stream: true,
        }
    }

    /// Handle for a finite track.
    pub fn track(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
            is_stream: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Why a track stopped playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The track ran to its natural end.
    Finished,
    /// The underlying source failed mid-playback.
    LoadFailed,
    /// Playback was stopped explicitly.
    Stopped,
    /// Another track was started over this one.
    Replaced,
    /// The player itself was torn down.
    Cleanup,
}

impl EndReason {
    /// Whether the player is allowed to start another track after this end
    /// event. Stopped/Replaced/Cleanup suppress continuation.
    pub fn may_start_next(&self) -> bool {
        matches!(self, EndReason::Finished | EndReason::LoadFailed)
    }
}

/// Result of asking the loader to resolve a source identifier.
///
/// Exactly one outcome is delivered per load request.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// A single playable item.
    Track(TrackHandle),
    /// A collection of items; `selected` points at the preferred one.
    Playlist {
        tracks: Vec<TrackHandle>,
        selected: Option<usize>,
    },
    /// The source resolved to nothing.
    NoMatches,
    /// The load failed outright.
    Failed { reason: String },
}

impl LoadOutcome {
    /// Extracts the playable item, if any. For playlists this is the
    /// selected track, falling back to the first one.
    pub fn into_track(self) -> Option<TrackHandle> {
        match self {
            LoadOutcome::Track(track) => Some(track),
            LoadOutcome::Playlist { mut tracks, selected } => {
                if tracks.is_empty() {
                    return None;
                }
                let index = selected.filter(|i| *i < tracks.len()).unwrap_or(0);
                Some(tracks.swap_remove(index))
            }
            LoadOutcome::NoMatches | LoadOutcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_may_start_next() {
        assert!(EndReason::Finished.may_start_next());
        assert!(EndReason::LoadFailed.may_start_next());
        assert!(!EndReason::Stopped.may_start_next());
        assert!(!EndReason::Replaced.may_start_next());
        assert!(!EndReason::Cleanup.may_start_next());
    }

    #[test]
    fn test_load_outcome_single_track() {
        let outcome = LoadOutcome::Track(TrackHandle::stream("http://radio.example/live"));
        let track = outcome.into_track().unwrap();
        assert_eq!(track.identifier, "http://radio.example/live");
        assert!(track.is_stream);
    }

    #[test]
    fn test_load_outcome_playlist_prefers_selected() {
        let outcome = LoadOutcome::Playlist {
            tracks: vec![
                TrackHandle::track("a"),
                TrackHandle::track("b"),
                TrackHandle::track("c"),
            ],
            selected: Some(1),
        };
        assert_eq!(outcome.into_track().unwrap().identifier, "b");
    }

    #[test]
    fn test_load_outcome_playlist_falls_back_to_first() {
        let outcome = LoadOutcome::Playlist {
            tracks: vec![TrackHandle::track("a"), TrackHandle::track("b")],
            selected: None,
        };
        assert_eq!(outcome.into_track().unwrap().identifier, "a");

        let out_of_range = LoadOutcome::Playlist {
            tracks: vec![TrackHandle::track("a")],
            selected: Some(7),
        };
        assert_eq!(out_of_range.into_track().unwrap().identifier, "a");
    }

    #[test]
    fn test_load_outcome_empty() {
        assert!(LoadOutcome::NoMatches.into_track().is_none());
        let failed = LoadOutcome::Failed {
            reason: "boom".to_string(),
        };
        assert!(failed.into_track().is_none());
        let empty = LoadOutcome::Playlist {
            tracks: Vec::new(),
            selected: None,
        };
        assert!(empty.into_track().is_none());
    }
}
