//! Full-stack session flow over an in-process transport
//!
//! Wires the controller to a real capture host through a transport that
//! dispatches commands in-process, with fake media acquisition and a fake
//! encoder underneath. Exercises the same paths a browser deployment
//! does, minus the platform layer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use reclip::bridge::{
    BridgeConfig, Command, ContextBridge, ContextId, ContextKind, ContextTransport, Reply,
    RetryPolicy, TransportError,
};
use reclip::capture::{
    CaptureHost, CaptureSource, CaptureSourceProvider, ComposedStream, StreamEncoder,
    VideoConstraints,
};
use reclip::error::{RecordingError, RecordingResult};
use reclip::media::{DisplayCapture, MediaTrack, TrackKind, TrackSource};
use reclip::options::{DisplaySurface, EncoderProfile, RecordingOptions};
use reclip::session::{Recorder, SessionState};
use reclip::sink::FileSink;

#[derive(Default)]
struct FakeSource {
    deny_display: bool,
    deny_mic: bool,
    display_calls: AtomicU32,
    last_video: Mutex<Option<MediaTrack>>,
}

#[async_trait]
impl CaptureSource for FakeSource {
    async fn acquire_tab(
        &self,
        _constraints: &VideoConstraints,
        system_audio: bool,
    ) -> RecordingResult<DisplayCapture> {
        let video = MediaTrack::new(TrackKind::Video, TrackSource::Tab);
        *self.last_video.lock() = Some(video.clone());
        Ok(DisplayCapture {
            video,
            audio: system_audio
                .then(|| MediaTrack::new(TrackKind::Audio, TrackSource::SystemAudio)),
        })
    }

    async fn acquire_display(
        &self,
        _surface: DisplaySurface,
        _constraints: &VideoConstraints,
        system_audio: bool,
    ) -> RecordingResult<DisplayCapture> {
        self.display_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_display {
            return Err(RecordingError::PermissionDenied(
                "user dismissed the picker".into(),
            ));
        }
        let video = MediaTrack::new(TrackKind::Video, TrackSource::Display);
        *self.last_video.lock() = Some(video.clone());
        Ok(DisplayCapture {
            video,
            audio: system_audio
                .then(|| MediaTrack::new(TrackKind::Audio, TrackSource::SystemAudio)),
        })
    }

    async fn acquire_microphone(&self, _device_id: Option<&str>) -> RecordingResult<MediaTrack> {
        if self.deny_mic {
            return Err(RecordingError::DegradedTrack("microphone refused".into()));
        }
        Ok(MediaTrack::new(TrackKind::Audio, TrackSource::Microphone))
    }

    async fn acquire_camera(&self) -> RecordingResult<MediaTrack> {
        Ok(MediaTrack::new(TrackKind::Video, TrackSource::Camera))
    }
}

/// Emits three data chunks on start and one flush chunk on stop;
/// `silent` suppresses everything
struct FakeEncoder {
    silent: bool,
    pauses: Arc<AtomicU32>,
    resumes: Arc<AtomicU32>,
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

#[async_trait]
impl StreamEncoder for FakeEncoder {
    async fn start(
        &mut self,
        _stream: &ComposedStream,
        _profile: &EncoderProfile,
        chunks: mpsc::UnboundedSender<Vec<u8>>,
    ) -> RecordingResult<()> {
        if !self.silent {
            for i in 1..=3u8 {
                let _ = chunks.send(vec![i]);
            }
        }
        self.tx = Some(chunks);
        Ok(())
    }

    async fn pause(&mut self) -> RecordingResult<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&mut self) -> RecordingResult<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> RecordingResult<()> {
        if let Some(tx) = self.tx.take() {
            if !self.silent {
                let _ = tx.send(b"flush".to_vec());
            }
        }
        Ok(())
    }
}

/// Dispatches commands straight into the capture host, optionally
/// dropping the first `drop_starts` start sends on the floor
struct LocalTransport {
    host: Arc<CaptureHost>,
    drop_starts: AtomicU32,
}

#[async_trait]
impl ContextTransport for LocalTransport {
    async fn resolve(&self, kind: ContextKind) -> Result<ContextId, TransportError> {
        let context = self.host.context();
        if kind == context.kind {
            Ok(context)
        } else {
            Err(TransportError::Unavailable(format!(
                "no {kind:?} context here"
            )))
        }
    }

    async fn inject(&self, _context: &ContextId) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, _context: &ContextId, command: Command) -> Result<Reply, TransportError> {
        if matches!(command, Command::StartCapture { .. })
            && self.drop_starts.load(Ordering::SeqCst) > 0
        {
            self.drop_starts.fetch_sub(1, Ordering::SeqCst);
            return Err(TransportError::Unreachable("message dropped".into()));
        }
        Ok(self.host.handle(command).await)
    }
}

struct Rig {
    recorder: Arc<Recorder>,
    source: Arc<FakeSource>,
    pauses: Arc<AtomicU32>,
    resumes: Arc<AtomicU32>,
    dir: tempfile::TempDir,
    _listener: tokio::task::JoinHandle<()>,
}

fn rig() -> Rig {
    rig_with(FakeSource::default(), false, 0)
}

fn rig_with(source: FakeSource, silent: bool, drop_starts: u32) -> Rig {
    let source = Arc::new(source);
    let pauses = Arc::new(AtomicU32::new(0));
    let resumes = Arc::new(AtomicU32::new(0));
    let (notif_tx, notif_rx) = mpsc::channel(8);

    let factory = {
        let pauses = pauses.clone();
        let resumes = resumes.clone();
        Box::new(move || {
            Box::new(FakeEncoder {
                silent,
                pauses: pauses.clone(),
                resumes: resumes.clone(),
                tx: None,
            }) as Box<dyn StreamEncoder>
        })
    };

    let host = CaptureHost::new(
        ContextId {
            kind: ContextKind::Content,
            target: 1,
        },
        CaptureSourceProvider::new(source.clone()),
        factory,
        notif_tx,
    );
    let transport = Arc::new(LocalTransport {
        host,
        drop_starts: AtomicU32::new(drop_starts),
    });

    let bridge = ContextBridge::with_config(
        transport,
        BridgeConfig {
            retry: RetryPolicy {
                max_attempts: 5,
                backoff: Duration::from_millis(1),
                timeout: Duration::from_secs(1),
            },
            ping_timeout: Duration::from_millis(50),
            settle_delay: Duration::from_millis(1),
        },
    );

    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::new(bridge, Box::new(FileSink::new(dir.path()))));
    let listener = recorder.listen(notif_rx);

    Rig {
        recorder,
        source,
        pauses,
        resumes,
        dir,
        _listener: listener,
    }
}

fn saved_files(rig: &Rig) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(rig.dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

#[tokio::test]
async fn test_end_to_end_lifecycle_writes_the_recording() -> anyhow::Result<()> {
    let rig = rig();

    rig.recorder.start(RecordingOptions::default()).await?;
    assert_eq!(rig.recorder.state(), SessionState::Active);

    rig.recorder.pause().await?;
    rig.recorder.resume().await?;
    assert_eq!(rig.pauses.load(Ordering::SeqCst), 1);
    assert_eq!(rig.resumes.load(Ordering::SeqCst), 1);

    let path = rig.recorder.stop().await?.expect("a saved path");
    assert_eq!(rig.recorder.state(), SessionState::Idle);

    // three data chunks plus the flush, concatenated in order
    assert_eq!(std::fs::read(&path)?, b"\x01\x02\x03flush");

    let history = rig.recorder.history();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].filename,
        path.file_name().unwrap().to_str().unwrap()
    );
    Ok(())
}

#[tokio::test]
async fn test_display_refusal_fails_start_without_retry() {
    let rig = rig_with(
        FakeSource {
            deny_display: true,
            ..Default::default()
        },
        false,
        0,
    );

    let err = rig
        .recorder
        .start(RecordingOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecordingError::PermissionDenied(_)));
    assert_eq!(rig.recorder.state(), SessionState::Idle);

    // the refusal was delivered, so it was not retried
    assert_eq!(rig.source.display_calls.load(Ordering::SeqCst), 1);
    assert!(saved_files(&rig).is_empty());
}

#[tokio::test]
async fn test_dropped_start_messages_are_retried() {
    let rig = rig_with(FakeSource::default(), false, 2);

    rig.recorder.start(RecordingOptions::default()).await.unwrap();
    assert_eq!(rig.recorder.state(), SessionState::Active);

    rig.recorder.stop().await.unwrap();
    assert_eq!(saved_files(&rig).len(), 1);
}

#[tokio::test]
async fn test_external_termination_saves_exactly_one_recording() {
    let rig = rig();
    rig.recorder.start(RecordingOptions::default()).await.unwrap();

    // the OS "stop sharing" UI ends the capture source underneath us
    let video = rig.source.last_video.lock().clone().unwrap();
    video.end();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while rig.recorder.state() != SessionState::Idle {
        assert!(
            tokio::time::Instant::now() < deadline,
            "session never settled after external termination"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // an explicit stop racing the cleanup must not produce a second file
    assert!(rig.recorder.stop().await.unwrap().is_none());

    assert_eq!(saved_files(&rig).len(), 1);
    assert_eq!(rig.recorder.history().len(), 1);
}

#[tokio::test]
async fn test_silent_capture_surfaces_empty_artifact() {
    let rig = rig_with(FakeSource::default(), true, 0);

    rig.recorder.start(RecordingOptions::default()).await.unwrap();
    let err = rig.recorder.stop().await.unwrap_err();
    assert!(matches!(err, RecordingError::EmptyArtifact));

    assert_eq!(rig.recorder.state(), SessionState::Idle);
    assert!(saved_files(&rig).is_empty());
    assert!(rig.recorder.history().is_empty());
}

#[tokio::test]
async fn test_unavailable_microphone_degrades_to_video_only() {
    let rig = rig_with(
        FakeSource {
            deny_mic: true,
            ..Default::default()
        },
        false,
        0,
    );

    let options = RecordingOptions {
        mic_enabled: true,
        ..Default::default()
    };
    rig.recorder.start(options).await.unwrap();

    let path = rig.recorder.stop().await.unwrap().unwrap();
    assert!(path.exists());
}
