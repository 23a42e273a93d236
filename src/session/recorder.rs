//! Recording session controller
//!
//! Owns the session lifecycle: idle → starting → active ⇄ paused →
//! stopping → idle. All mutation goes through the transition methods
//! below; the state field is the sole concurrency gate, checked and set
//! under one lock with no suspension in between. An epoch counter
//! abandons in-flight work (the capture-start handshake and its retries)
//! once a stop has reset the session.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, Utc};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::bridge::{ContextBridge, ContextId, Notification};
use crate::error::{RecordingError, RecordingResult};
use crate::options::{EncoderProfile, RecordingOptions};
use crate::session::state::{SessionState, SessionTimeline, StateSnapshot};
use crate::sink::{HistoryEntry, HistoryLog, RecordingSink};
use crate::utils::recording_filename;

/// Events emitted during a session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Recording started
    Started,
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// Recording stopped (explicitly or by external termination)
    Stopped,
    /// Error occurred
    Error(String),
}

#[derive(Default)]
struct SessionInner {
    state: SessionState,
    /// Bumped on every reset; in-flight work from an older epoch is
    /// discarded when it finally resolves
    epoch: u64,
    timeline: Option<SessionTimeline>,
    options: Option<RecordingOptions>,
    profile: Option<EncoderProfile>,
}

/// The one recording session controller
///
/// At most one recording is in progress at a time; a second start()
/// while not idle fails with [`RecordingError::AlreadyRecording`].
pub struct Recorder {
    inner: Mutex<SessionInner>,
    bridge: ContextBridge,
    sink: Box<dyn RecordingSink>,
    history: Mutex<HistoryLog>,
    events: broadcast::Sender<SessionEvent>,
}

impl Recorder {
    pub fn new(bridge: ContextBridge, sink: Box<dyn RecordingSink>) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            inner: Mutex::new(SessionInner::default()),
            bridge,
            sink,
            history: Mutex::new(HistoryLog::default()),
            events,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// The context currently performing the capture, if any
    pub fn active_context(&self) -> Option<ContextId> {
        self.bridge.active_context()
    }

    /// Synchronous state query; the single authoritative clock
    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock();
        let timeline = match (&inner.state, &inner.timeline) {
            (SessionState::Active | SessionState::Paused | SessionState::Stopping, Some(t)) => t,
            _ => return StateSnapshot::idle(),
        };
        StateSnapshot {
            state: inner.state,
            is_recording: true,
            is_paused: inner.state == SessionState::Paused,
            started_at: Some(timeline.started_at()),
            accumulated_pause_ms: timeline.accumulated_pause().as_millis() as u64,
            elapsed_ms: timeline.elapsed().as_millis() as u64,
        }
    }

    /// Completed recordings, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().entries().cloned().collect()
    }

    pub fn remove_history_entry(&self, index: usize) -> Option<HistoryEntry> {
        self.history.lock().remove(index)
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Start a recording with the given options
    ///
    /// Options are resolved to encoder parameters here, once; they never
    /// change mid-session. Any failure on the start path unwinds to Idle
    /// with no partial state left behind.
    pub async fn start(&self, options: RecordingOptions) -> RecordingResult<()> {
        let epoch = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Idle {
                return Err(RecordingError::AlreadyRecording);
            }
            inner.state = SessionState::Starting;
            inner.epoch += 1;
            inner.epoch
        };

        let profile = options.resolve();
        tracing::info!(
            bitrate = profile.video_bits_per_second,
            "starting {:?} recording at {}x{}",
            options.capture_type,
            profile.width,
            profile.height
        );

        match self.start_capture(&options, &profile).await {
            Ok(()) => {
                let raced = {
                    let mut inner = self.inner.lock();
                    if inner.epoch != epoch || inner.state != SessionState::Starting {
                        true
                    } else {
                        inner.state = SessionState::Active;
                        inner.timeline = Some(SessionTimeline::start());
                        inner.options = Some(options);
                        inner.profile = Some(profile);
                        false
                    }
                };
                if raced {
                    // A stop reset the session while the handshake was in
                    // flight; the capture that just started must not
                    // outlive it.
                    tracing::info!("start superseded by stop, tearing capture down");
                    if let Err(e) = self.bridge.stop_capture().await {
                        tracing::warn!("teardown of superseded capture failed: {}", e);
                    }
                    return Err(RecordingError::Cancelled(
                        "session was stopped during start".into(),
                    ));
                }
                self.emit(SessionEvent::Started);
                Ok(())
            }
            Err(e) => {
                {
                    let mut inner = self.inner.lock();
                    if inner.epoch == epoch && inner.state == SessionState::Starting {
                        Self::reset(&mut inner);
                    }
                }
                tracing::warn!("recording failed to start: {}", e);
                self.emit(SessionEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn start_capture(
        &self,
        options: &RecordingOptions,
        profile: &EncoderProfile,
    ) -> RecordingResult<()> {
        let context = self.bridge.resolve_context(options.page_url.as_deref()).await?;
        self.bridge.ensure_ready(&context).await?;
        self.bridge.start_capture(&context, options, profile).await
    }

    /// Pause the active recording
    ///
    /// Valid only while Active. The transition happens first; delivery of
    /// the pause command is best-effort, so the session cannot get stuck
    /// because a control signal was dropped.
    pub async fn pause(&self) -> RecordingResult<()> {
        {
            let mut inner = self.inner.lock();
            match inner.state {
                SessionState::Active => {}
                SessionState::Paused => return Err(RecordingError::AlreadyPaused),
                _ => return Err(RecordingError::NotRecording),
            }
            let Some(timeline) = inner.timeline.as_mut() else {
                return Err(RecordingError::NotRecording);
            };
            timeline.pause();
            inner.state = SessionState::Paused;
        }

        if let Err(e) = self.bridge.pause_capture().await {
            tracing::warn!("pause command not delivered: {}", e);
        }
        self.emit(SessionEvent::Paused);
        Ok(())
    }

    /// Resume a paused recording; valid only while Paused
    pub async fn resume(&self) -> RecordingResult<()> {
        {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Paused {
                return Err(RecordingError::NotPaused);
            }
            let Some(timeline) = inner.timeline.as_mut() else {
                return Err(RecordingError::NotPaused);
            };
            timeline.resume();
            inner.state = SessionState::Active;
        }

        if let Err(e) = self.bridge.resume_capture().await {
            tracing::warn!("resume command not delivered: {}", e);
        }
        self.emit(SessionEvent::Resumed);
        Ok(())
    }

    /// Stop the recording and persist the artifact
    ///
    /// Unconditionally terminal: whatever happens below — the capturing
    /// context unreachable, an empty artifact, a failed save — the
    /// session lands back in Idle. Calling stop while already Idle is a
    /// no-op success. During Starting it abandons the in-flight
    /// handshake.
    pub async fn stop(&self) -> RecordingResult<Option<PathBuf>> {
        let (timeline, options, profile) = {
            let mut inner = self.inner.lock();
            match inner.state {
                SessionState::Idle | SessionState::Stopping => return Ok(None),
                SessionState::Starting => {
                    tracing::info!("stop during start, abandoning capture handshake");
                    Self::reset(&mut inner);
                    return Ok(None);
                }
                SessionState::Active | SessionState::Paused => {
                    inner.state = SessionState::Stopping;
                    (
                        inner.timeline.take(),
                        inner.options.take(),
                        inner.profile.take(),
                    )
                }
            }
        };

        let result = self.finish(timeline, options, profile).await;

        {
            let mut inner = self.inner.lock();
            Self::reset(&mut inner);
        }
        if let Err(e) = &result {
            self.emit(SessionEvent::Error(e.to_string()));
        }
        self.emit(SessionEvent::Stopped);
        result
    }

    async fn finish(
        &self,
        timeline: Option<SessionTimeline>,
        options: Option<RecordingOptions>,
        profile: Option<EncoderProfile>,
    ) -> RecordingResult<Option<PathBuf>> {
        let duration_seconds = timeline.as_ref().map(|t| t.elapsed().as_secs()).unwrap_or(0);

        let artifact = match self.bridge.stop_capture().await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return Err(RecordingError::EmptyArtifact),
            Err(e) => {
                tracing::warn!("stop command failed, recording lost: {}", e);
                return Err(e);
            }
        };

        let extension = profile
            .as_ref()
            .map(|p| p.extension.as_str())
            .unwrap_or("webm");
        let filename = recording_filename(&Local::now(), extension);

        let blob = artifact.finalize()?;
        let persist_result = self.sink.persist(&blob, &filename).await;

        // History is independent of the save outcome: a dismissed save
        // dialog must not erase the recording from history.
        if let Some(options) = options.as_ref() {
            self.history.lock().push(HistoryEntry {
                filename: filename.clone(),
                created_at: Utc::now(),
                duration_seconds,
                quality: options.quality,
                format: options.format,
            });
        }

        let path = persist_result?;
        tracing::info!(
            "recording finished: {} ({} s)",
            path.display(),
            duration_seconds
        );
        Ok(Some(path))
    }

    /// React to an unsolicited message from a capturing context
    ///
    /// External termination (the OS "stop sharing" UI) drives the exact
    /// same cleanup path as an explicit stop.
    pub async fn handle_notification(&self, notification: Notification) {
        match notification {
            Notification::CaptureEnded { context } => {
                tracing::info!("capture in {} ended externally", context);
                let state = self.state();
                if matches!(state, SessionState::Active | SessionState::Paused) {
                    if let Err(e) = self.stop().await {
                        tracing::warn!("cleanup after external termination failed: {}", e);
                    }
                }
            }
        }
    }

    /// Drive notifications from a channel until the senders are gone
    pub fn listen(self: &Arc<Self>, mut notifications: mpsc::Receiver<Notification>) -> JoinHandle<()> {
        let recorder = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                recorder.handle_notification(notification).await;
            }
        })
    }

    fn reset(inner: &mut SessionInner) {
        inner.state = SessionState::Idle;
        inner.epoch += 1;
        inner.timeline = None;
        inner.options = None;
        inner.profile = None;
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
