//! Reclip - browser screen recording, made simple.
//!
//! Core of the recorder: one [`session::Recorder`] drives the session
//! lifecycle, a [`bridge::ContextBridge`] routes commands to whichever
//! isolated context holds the capture permission, and a
//! [`capture::CaptureHost`] on the far side acquires the media, encodes
//! it, and hands the finished artifact back for persistence.

pub mod bridge;
pub mod capture;
pub mod error;
pub mod media;
pub mod options;
pub mod session;
pub mod sink;
pub mod utils;

pub use error::{RecordingError, RecordingResult};
pub use options::{EncoderProfile, RecordingOptions};
pub use session::{Recorder, SessionEvent, SessionState, StateSnapshot};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reclip=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
