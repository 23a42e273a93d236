//! Capture capability trait
//!
//! Each execution context acquires its own stream handles through its own
//! capability; streams are never transferred between contexts. Tab capture
//! and window/screen capture sit behind different permission grants, so
//! they are distinct acquisition calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecordingResult;
use crate::media::{DisplayCapture, MediaTrack};
use crate::options::DisplaySurface;

/// Video constraints passed to an acquisition call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

/// Raw media acquisition within one execution context
///
/// Display/tab acquisition failures are fatal to the capture; microphone
/// and camera failures are surfaced as errors here and degraded to
/// warnings by the provider.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Capture the current tab (tab-capture grant)
    async fn acquire_tab(
        &self,
        constraints: &VideoConstraints,
        system_audio: bool,
    ) -> RecordingResult<DisplayCapture>;

    /// Capture a window or monitor (display-capture grant)
    async fn acquire_display(
        &self,
        surface: DisplaySurface,
        constraints: &VideoConstraints,
        system_audio: bool,
    ) -> RecordingResult<DisplayCapture>;

    /// Open the microphone, optionally a specific device
    async fn acquire_microphone(&self, device_id: Option<&str>) -> RecordingResult<MediaTrack>;

    /// Open the camera for the overlay
    async fn acquire_camera(&self) -> RecordingResult<MediaTrack>;
}
