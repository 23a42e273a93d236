//! Media track and stream model
//!
//! Tracks are opaque handles to live capture resources owned by the
//! capturing context. They never cross the context bridge; only control
//! messages and finalized bytes do. Release is exactly-once by
//! construction, and external end-of-life (the OS "stop sharing" UI) is
//! observable through a watch channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

/// Kind of media a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// Where a track's media comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Display,
    Tab,
    SystemAudio,
    Microphone,
    Camera,
    /// Produced by the composer from multiple audio inputs
    Mixed,
}

struct TrackInner {
    stopped: AtomicBool,
    ended_tx: watch::Sender<bool>,
    ended_rx: watch::Receiver<bool>,
    /// Inputs owned by a mixed track; released together with it
    children: Vec<MediaTrack>,
}

/// Handle to a live capture track
#[derive(Clone)]
pub struct MediaTrack {
    id: Uuid,
    kind: TrackKind,
    source: TrackSource,
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, source: TrackSource) -> Self {
        let (ended_tx, ended_rx) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            kind,
            source,
            inner: Arc::new(TrackInner {
                stopped: AtomicBool::new(false),
                ended_tx,
                ended_rx,
                children: Vec::new(),
            }),
        }
    }

    /// Create a single audio track that owns and sums several inputs
    pub fn mixed(inputs: Vec<MediaTrack>) -> Self {
        let (ended_tx, ended_rx) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            kind: TrackKind::Audio,
            source: TrackSource::Mixed,
            inner: Arc::new(TrackInner {
                stopped: AtomicBool::new(false),
                ended_tx,
                ended_rx,
                children: inputs,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    /// Release the underlying capture resource
    ///
    /// Idempotent; returns true only for the call that actually released.
    /// A mixed track releases its inputs with it.
    pub fn stop(&self) -> bool {
        let first = !self.inner.stopped.swap(true, Ordering::SeqCst);
        if first {
            for child in &self.inner.children {
                child.stop();
            }
        }
        first
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Signal that the track ended outside our control
    pub fn end(&self) {
        self.inner.ended_tx.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.inner.ended_rx.borrow()
    }

    /// Watch for external end-of-life
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.inner.ended_rx.clone()
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Raw display capture before composition: a video track plus optional
/// system audio, as returned by the capture grant
#[derive(Debug)]
pub struct DisplayCapture {
    pub video: MediaTrack,
    pub audio: Option<MediaTrack>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_releases_exactly_once() {
        let track = MediaTrack::new(TrackKind::Video, TrackSource::Display);
        assert!(!track.is_stopped());
        assert!(track.stop());
        assert!(!track.stop());
        assert!(track.is_stopped());
    }

    #[test]
    fn test_mixed_track_releases_inputs() {
        let sys = MediaTrack::new(TrackKind::Audio, TrackSource::SystemAudio);
        let mic = MediaTrack::new(TrackKind::Audio, TrackSource::Microphone);
        let mixed = MediaTrack::mixed(vec![sys.clone(), mic.clone()]);

        mixed.stop();
        assert!(sys.is_stopped());
        assert!(mic.is_stopped());
    }

    #[tokio::test]
    async fn test_ended_watch_observes_external_end() {
        let track = MediaTrack::new(TrackKind::Video, TrackSource::Display);
        let mut rx = track.ended();
        assert!(!*rx.borrow());

        track.end();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
        assert!(track.is_ended());
    }
}
