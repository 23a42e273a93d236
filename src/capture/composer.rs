//! Stream composition
//!
//! Merges the acquired tracks into the single stream handed to the
//! encoder. When both system audio and microphone are present they are
//! mixed (summed) into one audio track; recorder backends only handle one
//! audio track per output cleanly. Camera video stays an overlay handle
//! for the UI layer and is never part of the recorded track list.

use tokio::sync::watch;

use crate::media::{DisplayCapture, MediaTrack};

/// The final stream handed to the encoder
#[derive(Debug)]
pub struct ComposedStream {
    pub video: MediaTrack,
    /// At most one audio track: system, mic, or a mix of both
    pub audio: Option<MediaTrack>,
    /// Camera track rendered as picture-in-picture by the UI, not recorded
    pub overlay: Option<MediaTrack>,
}

impl ComposedStream {
    /// Tracks that feed the encoder (overlay excluded)
    pub fn recorded_tracks(&self) -> Vec<&MediaTrack> {
        let mut tracks = vec![&self.video];
        if let Some(audio) = &self.audio {
            tracks.push(audio);
        }
        tracks
    }

    /// Watch the primary video track's end-of-life
    pub fn video_ended(&self) -> watch::Receiver<bool> {
        self.video.ended()
    }

    /// Release every owned track; each underlying resource is stopped
    /// exactly once
    pub fn release(&self) {
        self.video.stop();
        if let Some(audio) = &self.audio {
            audio.stop();
        }
        if let Some(overlay) = &self.overlay {
            overlay.stop();
        }
    }
}

/// Combines acquired tracks into one deliverable stream
pub struct StreamComposer;

impl StreamComposer {
    pub fn compose(
        display: DisplayCapture,
        microphone: Option<MediaTrack>,
        camera: Option<MediaTrack>,
    ) -> ComposedStream {
        let audio = match (display.audio, microphone) {
            (Some(system), Some(mic)) => {
                tracing::debug!("mixing system audio and microphone into one track");
                Some(MediaTrack::mixed(vec![system, mic]))
            }
            (Some(system), None) => Some(system),
            (None, Some(mic)) => Some(mic),
            (None, None) => None,
        };

        ComposedStream {
            video: display.video,
            audio,
            overlay: camera,
        }
    }

    /// Sum two sample buffers into one, clamped to [-1, 1]
    ///
    /// This is the mixing rule the sample-level backend applies when both
    /// audio sources are live: sum, not replace.
    pub fn mix_samples(a: &[f32], b: &[f32]) -> Vec<f32> {
        let len = a.len().max(b.len());
        (0..len)
            .map(|i| {
                let sa = a.get(i).copied().unwrap_or(0.0);
                let sb = b.get(i).copied().unwrap_or(0.0);
                (sa + sb).clamp(-1.0, 1.0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{TrackKind, TrackSource};

    fn display_with_audio(audio: bool) -> DisplayCapture {
        DisplayCapture {
            video: MediaTrack::new(TrackKind::Video, TrackSource::Display),
            audio: audio.then(|| MediaTrack::new(TrackKind::Audio, TrackSource::SystemAudio)),
        }
    }

    fn mic() -> MediaTrack {
        MediaTrack::new(TrackKind::Audio, TrackSource::Microphone)
    }

    #[test]
    fn test_both_audio_sources_become_one_mixed_track() {
        let stream = StreamComposer::compose(display_with_audio(true), Some(mic()), None);

        let audio = stream.audio.as_ref().unwrap();
        assert_eq!(audio.source(), TrackSource::Mixed);
        // one video + one audio track, never two audio tracks
        assert_eq!(stream.recorded_tracks().len(), 2);
    }

    #[test]
    fn test_single_audio_source_passes_through() {
        let stream = StreamComposer::compose(display_with_audio(false), Some(mic()), None);
        assert_eq!(
            stream.audio.as_ref().unwrap().source(),
            TrackSource::Microphone
        );

        let stream = StreamComposer::compose(display_with_audio(true), None, None);
        assert_eq!(
            stream.audio.as_ref().unwrap().source(),
            TrackSource::SystemAudio
        );
    }

    #[test]
    fn test_camera_is_overlay_not_recorded() {
        let camera = MediaTrack::new(TrackKind::Video, TrackSource::Camera);
        let stream = StreamComposer::compose(display_with_audio(false), None, Some(camera));

        assert_eq!(stream.recorded_tracks().len(), 1);
        assert!(stream.overlay.is_some());
    }

    #[test]
    fn test_release_cascades_through_mix() {
        let display = display_with_audio(true);
        let system = display.audio.as_ref().unwrap().clone();
        let microphone = mic();
        let stream = StreamComposer::compose(display, Some(microphone.clone()), None);

        stream.release();
        assert!(stream.video.is_stopped());
        assert!(system.is_stopped());
        assert!(microphone.is_stopped());
    }

    #[test]
    fn test_mix_samples_sums_and_clamps() {
        let mixed = StreamComposer::mix_samples(&[0.25, 0.5, 0.9], &[0.25, -0.25, 0.9]);
        assert_eq!(mixed, vec![0.5, 0.25, 1.0]);

        // unequal lengths pad with silence
        let mixed = StreamComposer::mix_samples(&[0.1], &[0.2, -0.3]);
        assert_eq!(mixed.len(), 2);
        assert!((mixed[1] - (-0.3)).abs() < f32::EPSILON);
    }
}
