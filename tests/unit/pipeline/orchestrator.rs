use super::*;

use std::sync::Mutex;

use crate::config::PacingMode;
use crate::encode::codec::StaticCodecProbe;
use crate::encode::sink::InMemorySink;
use crate::render::frame::FrameRGBA;
use crate::source::{AudioTrack, GeneratedFrameSource};

fn meta() -> VideoMetadata {
    VideoMetadata {
        duration: 1.0,
        width: 16,
        height: 8,
        fps: 10.0,
        size: 0,
    }
}

fn config() -> ExportConfig {
    ExportConfig {
        pacing: PacingMode::Immediate,
        progress_every_frames: 2,
        ..ExportConfig::default()
    }
}

fn probe() -> StaticCodecProbe {
    StaticCodecProbe::new(["libvpx-vp9", "libopus"])
}

fn checker(w: u32, h: u32) -> FrameRGBA {
    let mut data = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            data.extend_from_slice(&[v, v, v, 255]);
        }
    }
    FrameRGBA::from_rgba8(w, h, data).unwrap()
}

fn source(m: &VideoMetadata) -> VeilResult<GeneratedFrameSource> {
    let (w, h) = (m.width, m.height);
    Ok(GeneratedFrameSource::new(m.clone(), move |_| checker(w, h)))
}

fn request_with_region(start: f64, end: f64) -> ExportRequest {
    ExportRequest {
        metadata: meta(),
        regions: vec![MosaicRegion {
            id: "r1".to_string(),
            x: 0.0,
            y: 0.0,
            width: 0.5,
            height: 1.0,
            start_time: start,
            end_time: end,
            blur_strength: Some(2.0),
        }],
        texts: Vec::new(),
    }
}

fn recorder() -> (Arc<Mutex<Vec<u8>>>, ProgressFn<impl FnMut(u8) + Send>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    (seen, ProgressFn(move |p| s.lock().unwrap().push(p)))
}

use crate::pipeline::progress::ProgressFn;

/// Wraps a generated source with injectable failures.
struct ScriptedSource {
    inner: GeneratedFrameSource,
    fail_seek_at: Option<f64>,
    audio_error: bool,
    closed: Arc<AtomicBool>,
}

impl FrameSource for ScriptedSource {
    fn metadata(&self) -> &VideoMetadata {
        self.inner.metadata()
    }

    fn seek(&mut self, t: f64) -> VeilResult<()> {
        if self.fail_seek_at.is_some_and(|f| t >= f) {
            return Err(VeilError::seek(format!("corrupt frame at {t}")));
        }
        self.inner.seek(t)
    }

    fn read_frame(&mut self) -> VeilResult<FrameRGBA> {
        self.inner.read_frame()
    }

    fn extract_audio_track(&mut self) -> VeilResult<Option<AudioTrack>> {
        if self.audio_error {
            return Err(VeilError::audio("decoder exploded"));
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.close();
    }
}

fn scripted(fail_seek_at: Option<f64>, audio_error: bool) -> (Arc<AtomicBool>, ScriptedSource) {
    let closed = Arc::new(AtomicBool::new(false));
    let m = meta();
    let src = ScriptedSource {
        inner: source(&m).unwrap(),
        fail_seek_at,
        audio_error,
        closed: closed.clone(),
    };
    (closed, src)
}

#[test]
fn run_renders_every_frame_and_completes() {
    let pipeline = Pipeline::new();
    let (seen, obs) = recorder();
    let session = pipeline
        .start(request_with_region(0.2, 0.5), config())
        .unwrap()
        .with_observer(obs);
    let mut sink = InMemorySink::new();

    let artifact = session.run(source, &mut sink, &probe()).unwrap();

    assert_eq!(artifact.frames, 10);
    assert_eq!(artifact.mime, "video/webm;codecs=vp9,opus");
    assert_eq!(sink.frames().len(), 10);
    for (i, (idx, _)) in sink.frames().iter().enumerate() {
        assert_eq!(idx.0, i as u64);
    }
    assert!(sink.was_stopped());

    let seen = seen.lock().unwrap().clone();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.first(), Some(&0));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.contains(&15) && seen.contains(&90) && seen.contains(&95));

    assert_eq!(pipeline.progress(), 100);
    assert_eq!(pipeline.state(), ExportState::Complete);
    assert!(!pipeline.is_busy());
}

#[test]
fn mosaic_applies_only_inside_its_closed_window() {
    let pipeline = Pipeline::new();
    let session = pipeline
        .start(request_with_region(0.2, 0.5), config())
        .unwrap();
    let mut sink = InMemorySink::new();
    session.run(source, &mut sink, &probe()).unwrap();

    let plain = checker(16, 8);
    for (idx, frame) in sink.frames() {
        let t = idx.0 as f64 / 10.0;
        let active = (0.2..=0.5).contains(&t);
        assert_eq!(*frame != plain, active, "frame {} (t={t})", idx.0);
        // Right half is never covered.
        assert_eq!(frame.pixel(12, 3), plain.pixel(12, 3));
    }
}

#[test]
fn second_start_is_rejected_while_a_session_is_alive() {
    let pipeline = Pipeline::new();
    let first = pipeline.start(request_with_region(0.0, 1.0), config()).unwrap();
    pipeline.shared.progress.set(42);

    let err = pipeline
        .start(request_with_region(0.0, 1.0), config())
        .unwrap_err();
    assert!(matches!(err, VeilError::AlreadyProcessing));
    assert_eq!(pipeline.progress(), 42);
    assert!(pipeline.is_busy());

    drop(first);
    assert!(!pipeline.is_busy());
    pipeline.start(request_with_region(0.0, 1.0), config()).unwrap();
}

#[test]
fn invalid_request_releases_the_lock() {
    let pipeline = Pipeline::new();
    let err = pipeline
        .start(request_with_region(3.0, 1.0), config())
        .unwrap_err();
    assert!(matches!(err, VeilError::Validation(_)));
    assert!(!pipeline.is_busy());
}

#[test]
fn codec_unsupported_fails_before_any_frame() {
    let pipeline = Pipeline::new();
    let session = pipeline
        .start(request_with_region(0.0, 1.0), config())
        .unwrap();
    let mut sink = InMemorySink::new();
    let err = session
        .run(source, &mut sink, &StaticCodecProbe::new(["h263"]))
        .unwrap_err();
    assert!(matches!(err, VeilError::CodecUnsupported(_)));
    assert!(sink.config().is_none());
    assert!(sink.frames().is_empty());
    assert_eq!(pipeline.state(), ExportState::Failed);
    assert!(!pipeline.is_busy());
}

#[test]
fn seek_failure_aborts_the_run_and_the_sink() {
    let pipeline = Pipeline::new();
    let session = pipeline
        .start(request_with_region(0.0, 1.0), config())
        .unwrap();
    let (closed, src) = scripted(Some(0.45), false);
    let mut sink = InMemorySink::new();
    let err = session.run(|_| Ok(src), &mut sink, &probe()).unwrap_err();
    assert!(matches!(err, VeilError::SeekFailure(_)));
    assert!(sink.was_aborted());
    assert!(closed.load(Ordering::SeqCst));
    assert!(!pipeline.is_busy());
}

#[test]
fn audio_failure_degrades_to_video_only() {
    let pipeline = Pipeline::new();
    let session = pipeline
        .start(request_with_region(0.0, 1.0), config())
        .unwrap();
    let (closed, src) = scripted(None, true);
    let mut sink = InMemorySink::new();
    let artifact = session.run(|_| Ok(src), &mut sink, &probe()).unwrap();
    assert_eq!(artifact.frames, 10);
    let cfg_audio = sink.config().map(|c| c.audio.is_some());
    assert_eq!(cfg_audio, Some(false));
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn cancellation_mid_run_discards_output() {
    let pipeline = Pipeline::new();
    let session = pipeline
        .start(request_with_region(0.0, 1.0), config())
        .unwrap();
    let cancel = session.cancel_token();
    let session = session.with_observer(ProgressFn(move |p| {
        if p >= 30 {
            cancel.cancel();
        }
    }));
    let mut sink = InMemorySink::new();
    let err = session.run(source, &mut sink, &probe()).unwrap_err();
    assert!(matches!(err, VeilError::Cancelled));
    assert!(sink.was_aborted());
    assert!(!sink.was_stopped());
    assert_eq!(pipeline.state(), ExportState::Failed);
    assert!(pipeline.progress() < 90);
    assert!(!pipeline.is_busy());
}

#[test]
fn mismatched_source_size_is_rejected() {
    let pipeline = Pipeline::new();
    let session = pipeline
        .start(request_with_region(0.0, 1.0), config())
        .unwrap();
    let mut sink = InMemorySink::new();
    let err = session
        .run(
            |m| {
                let mut other = m.clone();
                other.width = 4;
                Ok(GeneratedFrameSource::solid(other, [0, 0, 0, 255]))
            },
            &mut sink,
            &probe(),
        )
        .unwrap_err();
    assert!(matches!(err, VeilError::Validation(_)));
}

#[test]
fn request_snapshot_is_independent_of_the_project() {
    let mut project = EditProject {
        regions: request_with_region(0.0, 1.0).regions,
        texts: Vec::new(),
    };
    let req = ExportRequest::new(meta(), &project);
    project.regions.clear();
    assert_eq!(req.regions.len(), 1);
    let (m, t) = req.active_at(1.0);
    assert_eq!(m.len(), 1);
    assert!(t.is_empty());
}
