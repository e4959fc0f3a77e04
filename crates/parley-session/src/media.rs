//! Local and remote media handles.
//!
//! Capture devices are behind [`MediaDevices`]; a successful acquisition
//! yields a [`LocalStream`] that stops all of its tracks when dropped.

use std::fmt;

use parley_translate::BoxFuture;

/// Kind of captured media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// One capture track (a microphone or a camera).
pub trait MediaTrack: Send {
    /// Kind of this track.
    fn kind(&self) -> TrackKind;

    /// Stops capturing. Stopping twice has no effect.
    fn stop(&mut self);

    /// Returns true until [`MediaTrack::stop`] is called.
    fn is_live(&self) -> bool;
}

/// Which devices to capture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Captured local media.
pub struct LocalStream {
    tracks: Vec<Box<dyn MediaTrack>>,
}

impl LocalStream {
    /// Wraps already-started tracks.
    pub fn new(tracks: Vec<Box<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }

    /// Number of tracks.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of tracks still capturing.
    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    /// Track kinds, in acquisition order.
    pub fn kinds(&self) -> Vec<TrackKind> {
        self.tracks.iter().map(|t| t.kind()).collect()
    }

    /// Stops every track.
    pub fn stop_all(&mut self) {
        for track in &mut self.tracks {
            track.stop();
        }
    }
}

impl Drop for LocalStream {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl fmt::Debug for LocalStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStream")
            .field("kinds", &self.kinds())
            .field("live", &self.live_tracks())
            .finish()
    }
}

/// Opaque handle to the remote side's media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMedia {
    id: String,
}

impl RemoteMedia {
    /// Creates a handle with a transport-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Transport-assigned id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Source of local media.
pub trait MediaDevices: Send + Sync {
    /// Acquires the requested devices.
    ///
    /// On error nothing may be left capturing.
    fn acquire(&self, constraints: MediaConstraints) -> BoxFuture<'_, Result<LocalStream, String>>;
}
