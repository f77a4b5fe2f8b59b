/// Per-guild streaming session record
use crate::core::{ChannelId, TrackHandle};

/// What a guild's streaming connection needs to come back after a drop.
///
/// The record survives transient disconnects on purpose: the remembered
/// channel and the retained track are exactly what a later reconnect resumes
/// from. Only an explicit release or cleanup forgets them.
#[derive(Debug, Clone, Default)]
pub struct GuildSession {
    channel_id: Option<ChannelId>,
    retained_track: Option<TrackHandle>,
}

impl GuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known good voice channel.
    pub fn channel_id(&self) -> Option<ChannelId> {
        self.channel_id
    }

    /// Records the channel a successful connect targeted.
    pub fn set_channel(&mut self, channel_id: ChannelId) {
        self.channel_id = Some(channel_id);
    }

    /// Item that was playing when the connection dropped.
    pub fn retained_track(&self) -> Option<&TrackHandle> {
        self.retained_track.as_ref()
    }

    /// Keeps a clone of the playing item for a later resume.
    pub fn retain_track(&mut self, track: TrackHandle) {
        self.retained_track = Some(track);
    }

    /// Forgets everything; the next reconnect attempt will find nothing.
    pub fn forget(&mut self) {
        self.channel_id = None;
        self.retained_track = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_remembers_nothing() {
        let session = GuildSession::new();
        assert_eq!(session.channel_id(), None);
        assert!(session.retained_track().is_none());
    }

    #[test]
    fn test_retain_and_forget() {
        let mut session = GuildSession::new();
        session.set_channel(42);
        session.retain_track(TrackHandle::stream("http://radio.example/live"));

        assert_eq!(session.channel_id(), Some(42));
        assert_eq!(
            session.retained_track().unwrap().identifier,
            "http://radio.example/live"
        );

        session.forget();
        assert_eq!(session.channel_id(), None);
        assert!(session.retained_track().is_none());
    }
}
