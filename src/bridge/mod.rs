//! Cross-context message bridge
//!
//! The controller and the context that actually holds the capture
//! permission are isolated from each other: no shared memory, only
//! asynchronous message sends that may never resolve. The bridge routes
//! logical commands to the right context, probes readiness, and retries
//! the capture-start handshake within a bounded policy. Every send has an
//! explicit timeout; silence is failure, not a hang.

pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{RecordingError, RecordingResult};
use crate::options::{EncoderProfile, RecordingOptions};
use crate::session::artifact::RecordedArtifact;

pub use retry::RetryPolicy;

/// Kind of execution context a command can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// Script embedded in the captured page
    Content,
    /// Offscreen helper document, used when the page cannot host a script
    Offscreen,
}

/// Identifies one execution context (e.g. the content script of tab 42)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextId {
    pub kind: ContextKind,
    pub target: u32,
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ContextKind::Content => write!(f, "content#{}", self.target),
            ContextKind::Offscreen => write!(f, "offscreen#{}", self.target),
        }
    }
}

/// Logical command sent from the controller to a capturing context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    /// Readiness probe
    Ping,
    /// Begin capturing with resolved parameters
    StartCapture {
        options: RecordingOptions,
        profile: EncoderProfile,
    },
    PauseCapture,
    ResumeCapture,
    /// Stop capturing and hand back the finalized artifact
    StopCapture,
}

/// Why a command was refused by the capturing context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCode {
    PermissionDenied,
    UserCancelled,
    CaptureFailed,
}

/// Response to a [`Command`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "camelCase")]
pub enum Reply {
    Pong { ready: bool },
    CaptureStarted,
    Ack,
    /// `artifact` is None when nothing was captured
    Stopped { artifact: Option<RecordedArtifact> },
    Failed { code: FailureCode, message: String },
}

/// Unsolicited message from a capturing context to the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Notification {
    /// The capture ended outside the controller's control
    /// (e.g. the OS "stop sharing" UI)
    CaptureEnded { context: ContextId },
}

/// Transport-level failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("context not reachable: {0}")]
    Unreachable(String),

    #[error("message timed out")]
    Timeout,

    #[error("no such context available: {0}")]
    Unavailable(String),
}

/// Message-passing capability between contexts
///
/// Implementations wrap the platform messaging layer. `send` must resolve
/// with the peer's reply or a transport error; the bridge adds timeouts on
/// top, so an implementation may legitimately never resolve on its own.
#[async_trait]
pub trait ContextTransport: Send + Sync {
    /// Find the context of the given kind that would perform the capture
    async fn resolve(&self, kind: ContextKind) -> Result<ContextId, TransportError>;

    /// Create/inject the context if it is not loaded yet
    async fn inject(&self, context: &ContextId) -> Result<(), TransportError>;

    /// Deliver a command and wait for the reply
    async fn send(&self, context: &ContextId, command: Command) -> Result<Reply, TransportError>;
}

/// Whether a page URL can host the capturing script
///
/// Browser-internal pages refuse script injection outright.
pub fn is_recordable_url(url: &str) -> bool {
    const RESTRICTED: [&str; 4] = ["chrome://", "chrome-extension://", "edge://", "about:"];
    !RESTRICTED.iter().any(|prefix| url.starts_with(prefix))
}

/// Bridge tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct BridgeConfig {
    /// Retry policy for the capture-start handshake
    pub retry: RetryPolicy,
    /// Readiness probe timeout; no answer within this counts as not ready
    pub ping_timeout: Duration,
    /// Grace period after injecting a context before first use.
    /// Deliberately not a correctness guarantee; callers still tolerate a
    /// subsequent failure.
    pub settle_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            ping_timeout: Duration::from_millis(300),
            settle_delay: Duration::from_millis(200),
        }
    }
}

/// Routes logical recording commands to the active capturing context
pub struct ContextBridge {
    transport: Arc<dyn ContextTransport>,
    config: BridgeConfig,
    /// The one context currently performing a capture; pause/resume/stop
    /// are routed back to it
    active: Mutex<Option<ContextId>>,
}

impl ContextBridge {
    pub fn new(transport: Arc<dyn ContextTransport>) -> Self {
        Self::with_config(transport, BridgeConfig::default())
    }

    pub fn with_config(transport: Arc<dyn ContextTransport>, config: BridgeConfig) -> Self {
        Self {
            transport,
            config,
            active: Mutex::new(None),
        }
    }

    /// The context currently performing a capture, if any
    pub fn active_context(&self) -> Option<ContextId> {
        *self.active.lock()
    }

    /// Pick the context that will perform the capture
    ///
    /// Prefers the page-embedded content context; falls back to the
    /// offscreen helper when the page cannot host a script. A known
    /// browser-internal page URL skips the content attempt entirely,
    /// since injection there is refused outright.
    pub async fn resolve_context(&self, page_url: Option<&str>) -> RecordingResult<ContextId> {
        if let Some(url) = page_url {
            if !is_recordable_url(url) {
                tracing::info!("page {} cannot host a script, using offscreen helper", url);
                return self
                    .transport
                    .resolve(ContextKind::Offscreen)
                    .await
                    .map_err(|e| RecordingError::ContextUnreachable(e.to_string()));
            }
        }

        match self.transport.resolve(ContextKind::Content).await {
            Ok(ctx) => Ok(ctx),
            Err(content_err) => {
                tracing::warn!(
                    "content context unavailable ({}), trying offscreen helper",
                    content_err
                );
                self.transport
                    .resolve(ContextKind::Offscreen)
                    .await
                    .map_err(|e| RecordingError::ContextUnreachable(e.to_string()))
            }
        }
    }

    /// Make sure the context is loaded and answering
    ///
    /// A lightweight ping with a short timeout; absence of a response, not
    /// just an explicit failure, counts as "not ready". If not ready, the
    /// context is injected and given a fixed settle delay.
    pub async fn ensure_ready(&self, context: &ContextId) -> RecordingResult<()> {
        let ready = match tokio::time::timeout(
            self.config.ping_timeout,
            self.transport.send(context, Command::Ping),
        )
        .await
        {
            Ok(Ok(Reply::Pong { ready })) => ready,
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => false,
        };

        if ready {
            return Ok(());
        }

        tracing::info!("context {} not ready, injecting", context);
        self.transport
            .inject(context)
            .await
            .map_err(|e| RecordingError::ContextUnreachable(e.to_string()))?;

        tokio::time::sleep(self.config.settle_delay).await;
        Ok(())
    }

    /// Start capture in `context`, retrying transport failures
    ///
    /// Only undelivered messages are retried; a reply that refuses the
    /// capture (permission denied, user cancelled) is final.
    pub async fn start_capture(
        &self,
        context: &ContextId,
        options: &RecordingOptions,
        profile: &EncoderProfile,
    ) -> RecordingResult<()> {
        let reply = self
            .config
            .retry
            .run(|_attempt| {
                let command = Command::StartCapture {
                    options: options.clone(),
                    profile: profile.clone(),
                };
                async move {
                    match tokio::time::timeout(
                        self.config.retry.timeout,
                        self.transport.send(context, command),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(TransportError::Timeout),
                    }
                }
            })
            .await
            .map_err(|e| RecordingError::ContextUnreachable(e.to_string()))?;

        match reply {
            Reply::CaptureStarted => {
                *self.active.lock() = Some(*context);
                Ok(())
            }
            Reply::Failed { code, message } => Err(refusal_to_error(code, message)),
            other => Err(RecordingError::Capture(format!(
                "unexpected reply to start capture: {:?}",
                other
            ))),
        }
    }

    /// Send pause to the active context, once
    pub async fn pause_capture(&self) -> RecordingResult<()> {
        self.send_control(Command::PauseCapture).await
    }

    /// Send resume to the active context, once
    pub async fn resume_capture(&self) -> RecordingResult<()> {
        self.send_control(Command::ResumeCapture).await
    }

    /// Stop the active context's capture and collect the artifact
    ///
    /// Sent once; clears the active context whatever the outcome so a
    /// failed stop cannot leave a stale route behind.
    pub async fn stop_capture(&self) -> RecordingResult<Option<RecordedArtifact>> {
        let Some(context) = self.active.lock().take() else {
            return Err(RecordingError::NotRecording);
        };

        let reply = self.send_once(&context, Command::StopCapture).await?;
        match reply {
            Reply::Stopped { artifact } => Ok(artifact),
            Reply::Failed { code, message } => Err(refusal_to_error(code, message)),
            other => Err(RecordingError::Capture(format!(
                "unexpected reply to stop capture: {:?}",
                other
            ))),
        }
    }

    async fn send_control(&self, command: Command) -> RecordingResult<()> {
        let Some(context) = self.active.lock().as_ref().copied() else {
            return Err(RecordingError::NotRecording);
        };

        match self.send_once(&context, command).await? {
            Reply::Ack => Ok(()),
            Reply::Failed { code, message } => Err(refusal_to_error(code, message)),
            other => Err(RecordingError::Capture(format!(
                "unexpected control reply: {:?}",
                other
            ))),
        }
    }

    async fn send_once(&self, context: &ContextId, command: Command) -> RecordingResult<Reply> {
        match tokio::time::timeout(
            self.config.retry.timeout,
            self.transport.send(context, command),
        )
        .await
        {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(RecordingError::ContextUnreachable(e.to_string())),
            Err(_) => Err(RecordingError::ContextUnreachable(
                TransportError::Timeout.to_string(),
            )),
        }
    }
}

fn refusal_to_error(code: FailureCode, message: String) -> RecordingError {
    match code {
        FailureCode::PermissionDenied => RecordingError::PermissionDenied(message),
        FailureCode::UserCancelled => RecordingError::UserCancelled(message),
        FailureCode::CaptureFailed => RecordingError::Capture(message),
    }
}
