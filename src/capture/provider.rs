//! Capture source provider
//!
//! Obtains the raw media for a requested capture target. Display/tab
//! acquisition failure is fatal to the start call; microphone and camera
//! failures degrade gracefully so an unplugged headset never aborts a
//! screen recording.

use std::sync::Arc;

use crate::capture::composer::{ComposedStream, StreamComposer};
use crate::capture::traits::{CaptureSource, VideoConstraints};
use crate::error::RecordingResult;
use crate::media::MediaTrack;
use crate::options::{CaptureType, EncoderProfile, RecordingOptions};

/// Acquires and composes the stream for one capture request
pub struct CaptureSourceProvider {
    source: Arc<dyn CaptureSource>,
}

impl CaptureSourceProvider {
    pub fn new(source: Arc<dyn CaptureSource>) -> Self {
        Self { source }
    }

    /// Acquire everything the options ask for and compose the deliverable
    /// stream
    ///
    /// The returned stream's primary video track carries the end-of-life
    /// watch used as the external-termination signal.
    pub async fn acquire(
        &self,
        options: &RecordingOptions,
        profile: &EncoderProfile,
    ) -> RecordingResult<ComposedStream> {
        let constraints = VideoConstraints {
            width: profile.width,
            height: profile.height,
            frame_rate: profile.frame_rate,
        };

        // The fatal part: tab capture and display capture are different
        // permission grants, chosen by capture type.
        let display = match options.capture_type {
            CaptureType::Tab => {
                self.source
                    .acquire_tab(&constraints, options.audio_enabled)
                    .await?
            }
            CaptureType::Window | CaptureType::Screen => {
                self.source
                    .acquire_display(
                        options.capture_type.surface(),
                        &constraints,
                        options.audio_enabled,
                    )
                    .await?
            }
        };

        let microphone = if options.mic_enabled {
            self.acquire_optional("microphone", || async {
                self.source
                    .acquire_microphone(options.mic_device_id.as_deref())
                    .await
            })
            .await
        } else {
            None
        };

        let camera = if options.camera_enabled {
            self.acquire_optional("camera", || async { self.source.acquire_camera().await })
                .await
        } else {
            None
        };

        Ok(StreamComposer::compose(display, microphone, camera))
    }

    async fn acquire_optional<F, Fut>(&self, what: &str, acquire: F) -> Option<MediaTrack>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = RecordingResult<MediaTrack>>,
    {
        match acquire().await {
            Ok(track) => Some(track),
            Err(e) => {
                tracing::warn!("{} unavailable, continuing without it: {}", what, e);
                None
            }
        }
    }
}
