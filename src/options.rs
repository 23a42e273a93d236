//! Recording options and encoder resolution
//!
//! Options are read from user preferences once, at session start, and
//! resolved into a concrete [`EncoderProfile`] that never changes for the
//! lifetime of the session.

use serde::{Deserialize, Serialize};

/// What the recording captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureType {
    /// The current browser tab
    Tab,
    /// A single application window
    Window,
    /// An entire monitor
    Screen,
}

impl CaptureType {
    /// The display surface requested from the capture grant
    pub fn surface(&self) -> DisplaySurface {
        match self {
            CaptureType::Tab => DisplaySurface::Browser,
            CaptureType::Window => DisplaySurface::Window,
            CaptureType::Screen => DisplaySurface::Monitor,
        }
    }
}

/// Display surface kinds understood by the capture layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplaySurface {
    Monitor,
    Window,
    Browser,
}

/// Output resolution preset, named by vertical line count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "480")]
    P480,
    #[serde(rename = "720")]
    P720,
    #[serde(rename = "1080")]
    P1080,
    #[serde(rename = "1440")]
    P1440,
    #[serde(rename = "2160")]
    P2160,
}

impl Quality {
    /// Target resolution in pixels
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            Quality::P480 => (854, 480),
            Quality::P720 => (1280, 720),
            Quality::P1080 => (1920, 1080),
            Quality::P1440 => (2560, 1440),
            Quality::P2160 => (3840, 2160),
        }
    }

    /// Base video bitrate in bits per second, before the frame-rate multiplier
    pub fn base_bitrate(&self) -> u32 {
        match self {
            Quality::P480 => 1_500_000,
            Quality::P720 => 2_500_000,
            Quality::P1080 => 5_000_000,
            Quality::P1440 => 8_000_000,
            Quality::P2160 => 16_000_000,
        }
    }
}

/// Capture frame rate preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameRate {
    #[serde(rename = "24")]
    Fps24,
    #[serde(rename = "30")]
    Fps30,
    #[serde(rename = "60")]
    Fps60,
}

impl FrameRate {
    pub fn fps(&self) -> u32 {
        match self {
            FrameRate::Fps24 => 24,
            FrameRate::Fps30 => 30,
            FrameRate::Fps60 => 60,
        }
    }

    /// Bitrate multiplier relative to the 30fps baseline
    pub fn bitrate_multiplier(&self) -> f64 {
        match self {
            FrameRate::Fps24 => 0.8,
            FrameRate::Fps30 => 1.0,
            FrameRate::Fps60 => 1.5,
        }
    }
}

/// Output container/codec selection
///
/// Codec selection is policy: formats the recorder backend cannot honor
/// fall back to plain WebM rather than failing the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "webm-vp9")]
    WebmVp9,
    #[serde(rename = "webm-vp8")]
    WebmVp8,
    #[serde(rename = "webm-h264")]
    WebmH264,
    #[serde(rename = "mp4")]
    Mp4,
    /// GIF is not directly recordable; captured as WebM
    #[serde(rename = "gif")]
    GifFallback,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::WebmVp9 => "video/webm; codecs=vp9",
            OutputFormat::WebmVp8 => "video/webm; codecs=vp8",
            OutputFormat::WebmH264 => "video/webm; codecs=h264",
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::GifFallback => "video/webm",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            _ => "webm",
        }
    }
}

/// Camera overlay position on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraPosition {
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

/// Camera overlay size preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSize {
    Small,
    Medium,
    Large,
}

impl CameraSize {
    /// Overlay edge length in pixels
    pub fn pixels(&self) -> u32 {
        match self {
            CameraSize::Small => 120,
            CameraSize::Medium => 180,
            CameraSize::Large => 250,
        }
    }
}

/// Camera overlay shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraShape {
    Circle,
    Square,
    Rounded,
}

/// Configuration for starting a recording
///
/// Immutable for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOptions {
    /// What to capture
    pub capture_type: CaptureType,

    /// URL of the page being recorded, when known; gates script injection
    pub page_url: Option<String>,

    /// Whether to capture system audio
    pub audio_enabled: bool,

    /// Whether to capture the microphone
    pub mic_enabled: bool,

    /// Microphone device ID (if capturing)
    pub mic_device_id: Option<String>,

    /// Whether to show the camera overlay
    pub camera_enabled: bool,

    /// Camera overlay position
    pub camera_position: CameraPosition,

    /// Camera overlay size
    pub camera_size: CameraSize,

    /// Camera overlay shape
    pub camera_shape: CameraShape,

    /// Output resolution preset
    pub quality: Quality,

    /// Capture frame rate
    pub frame_rate: FrameRate,

    /// Output format
    pub format: OutputFormat,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            capture_type: CaptureType::Screen,
            page_url: None,
            audio_enabled: true,
            mic_enabled: false,
            mic_device_id: None,
            camera_enabled: false,
            camera_position: CameraPosition::BottomRight,
            camera_size: CameraSize::Medium,
            camera_shape: CameraShape::Circle,
            quality: Quality::P1080,
            frame_rate: FrameRate::Fps30,
            format: OutputFormat::WebmVp9,
        }
    }
}

impl RecordingOptions {
    /// Resolve options into concrete encoder parameters
    ///
    /// Happens exactly once, at session start.
    pub fn resolve(&self) -> EncoderProfile {
        let (width, height) = self.quality.resolution();
        let bitrate =
            (self.quality.base_bitrate() as f64 * self.frame_rate.bitrate_multiplier()).round();

        EncoderProfile {
            width,
            height,
            frame_rate: self.frame_rate.fps(),
            video_bits_per_second: bitrate as u32,
            mime_type: self.format.mime_type().to_string(),
            extension: self.format.extension().to_string(),
        }
    }
}

/// Concrete encoder parameters resolved from [`RecordingOptions`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderProfile {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub video_bits_per_second: u32,
    pub mime_type: String,
    pub extension: String,
}
