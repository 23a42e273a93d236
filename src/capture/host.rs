//! Capture host
//!
//! The service object living in the capturing context. It owns the live
//! stream and the encoder, collects chunks while recording, and finalizes
//! the artifact exactly once per capture, whether the stop came from the
//! controller or from the capture source ending underneath us.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bridge::{Command, ContextId, FailureCode, Notification, Reply};
use crate::capture::composer::ComposedStream;
use crate::capture::provider::CaptureSourceProvider;
use crate::error::{RecordingError, RecordingResult};
use crate::options::EncoderProfile;
use crate::session::artifact::RecordedArtifact;

/// Chunk-producing recorder attached to a composed stream
///
/// The MediaRecorder analogue: once started it periodically emits encoded
/// chunks on the provided sender, and drops the sender when stopped so the
/// collector knows the stream is flushed.
#[async_trait]
pub trait StreamEncoder: Send + Sync {
    async fn start(
        &mut self,
        stream: &ComposedStream,
        profile: &EncoderProfile,
        chunks: mpsc::UnboundedSender<Vec<u8>>,
    ) -> RecordingResult<()>;

    async fn pause(&mut self) -> RecordingResult<()>;

    async fn resume(&mut self) -> RecordingResult<()>;

    /// Stop and flush; must drop the chunk sender
    async fn stop(&mut self) -> RecordingResult<()>;
}

/// Builds a fresh encoder per capture
pub type EncoderFactory = Box<dyn Fn() -> Box<dyn StreamEncoder> + Send + Sync>;

struct ActiveCapture {
    stream: ComposedStream,
    encoder: Box<dyn StreamEncoder>,
    chunks: Arc<parking_lot::Mutex<Vec<Vec<u8>>>>,
    collector: JoinHandle<()>,
    watcher: Option<JoinHandle<()>>,
    mime_type: String,
}

/// Handles capture commands inside the capturing context
pub struct CaptureHost {
    context: ContextId,
    provider: CaptureSourceProvider,
    encoder_factory: EncoderFactory,
    active: tokio::sync::Mutex<Option<ActiveCapture>>,
    /// Artifact finalized by an external termination, waiting for the
    /// controller's stop command to collect it
    pending: parking_lot::Mutex<Option<RecordedArtifact>>,
    notifications: mpsc::Sender<Notification>,
}

impl CaptureHost {
    pub fn new(
        context: ContextId,
        provider: CaptureSourceProvider,
        encoder_factory: EncoderFactory,
        notifications: mpsc::Sender<Notification>,
    ) -> Arc<Self> {
        Arc::new(Self {
            context,
            provider,
            encoder_factory,
            active: tokio::sync::Mutex::new(None),
            pending: parking_lot::Mutex::new(None),
            notifications,
        })
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Dispatch one command from the controller
    pub async fn handle(self: &Arc<Self>, command: Command) -> Reply {
        match command {
            Command::Ping => Reply::Pong { ready: true },
            Command::StartCapture { options, profile } => {
                match self.start_capture(&options, &profile).await {
                    Ok(()) => Reply::CaptureStarted,
                    Err(e) => refusal(e),
                }
            }
            Command::PauseCapture => match self.pause_capture().await {
                Ok(()) => Reply::Ack,
                Err(e) => refusal(e),
            },
            Command::ResumeCapture => match self.resume_capture().await {
                Ok(()) => Reply::Ack,
                Err(e) => refusal(e),
            },
            Command::StopCapture => {
                let artifact = match self.teardown(true).await {
                    Some(artifact) => Some(artifact),
                    // Nothing live: an external termination may have
                    // finalized already, hand over what it parked.
                    None => self.pending.lock().take(),
                };
                Reply::Stopped { artifact }
            }
        }
    }

    async fn start_capture(
        self: &Arc<Self>,
        options: &crate::options::RecordingOptions,
        profile: &EncoderProfile,
    ) -> RecordingResult<()> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }
        // A new capture supersedes any uncollected leftover.
        self.pending.lock().take();

        let stream = self.provider.acquire(options, profile).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let mut encoder = (self.encoder_factory)();
        if let Err(e) = encoder.start(&stream, profile, tx).await {
            stream.release();
            return Err(e);
        }

        let chunks = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let collector = {
            let chunks = Arc::clone(&chunks);
            tokio::spawn(async move {
                while let Some(chunk) = rx.recv().await {
                    chunks.lock().push(chunk);
                }
            })
        };

        // External termination: the primary video track ending (OS "stop
        // sharing") drives the same teardown as an explicit stop.
        let watcher = {
            let host = Arc::clone(self);
            let mut ended = stream.video_ended();
            Some(tokio::spawn(async move {
                while !*ended.borrow() {
                    if ended.changed().await.is_err() {
                        return;
                    }
                }
                host.external_end().await;
            }))
        };

        *active = Some(ActiveCapture {
            stream,
            encoder,
            chunks,
            collector,
            watcher,
            mime_type: profile.mime_type.clone(),
        });

        tracing::info!("capture started in {}", self.context);
        Ok(())
    }

    async fn pause_capture(&self) -> RecordingResult<()> {
        let mut active = self.active.lock().await;
        match active.as_mut() {
            Some(capture) => capture.encoder.pause().await,
            None => Err(RecordingError::NotRecording),
        }
    }

    async fn resume_capture(&self) -> RecordingResult<()> {
        let mut active = self.active.lock().await;
        match active.as_mut() {
            Some(capture) => capture.encoder.resume().await,
            None => Err(RecordingError::NotRecording),
        }
    }

    /// Stop the live capture and finalize its artifact, at most once
    ///
    /// Returns None when no capture was live (already finalized or never
    /// started). `abort_watcher` is false when called from the watcher
    /// task itself.
    async fn teardown(&self, abort_watcher: bool) -> Option<RecordedArtifact> {
        let mut capture = self.active.lock().await.take()?;

        if let Err(e) = capture.encoder.stop().await {
            tracing::warn!("encoder stop failed: {}", e);
        }
        if let Err(e) = capture.collector.await {
            tracing::warn!("chunk collector ended abnormally: {}", e);
        }
        capture.stream.release();

        if abort_watcher {
            if let Some(watcher) = capture.watcher.take() {
                watcher.abort();
            }
        }

        let chunks = std::mem::take(&mut *capture.chunks.lock());
        if chunks.is_empty() {
            tracing::warn!("capture ended with no recorded chunks");
            None
        } else {
            Some(RecordedArtifact::from_chunks(capture.mime_type, chunks))
        }
    }

    /// The capture source ended outside our control; finalize, park the
    /// artifact for the controller's stop command, and notify it
    async fn external_end(self: Arc<Self>) {
        tracing::info!("capture source ended externally in {}", self.context);

        if let Some(artifact) = self.teardown(false).await {
            *self.pending.lock() = Some(artifact);
        }

        if self
            .notifications
            .send(Notification::CaptureEnded {
                context: self.context,
            })
            .await
            .is_err()
        {
            tracing::warn!("controller is gone, capture-ended notification dropped");
        }
    }
}

fn refusal(error: RecordingError) -> Reply {
    let code = match &error {
        RecordingError::PermissionDenied(_) => FailureCode::PermissionDenied,
        RecordingError::UserCancelled(_) => FailureCode::UserCancelled,
        _ => FailureCode::CaptureFailed,
    };
    Reply::Failed {
        code,
        message: error.to_string(),
    }
}
