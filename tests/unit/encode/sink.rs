use super::*;

use crate::encode::codec::default_candidates;

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 4,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
        codec: default_candidates()[2].clone(),
        video_bits_per_second: 2_500_000,
        audio_bits_per_second: 128_000,
        chunk_interval: Duration::from_millis(100),
        audio: None,
    }
}

#[test]
fn config_validation_catches_bad_values() {
    assert!(cfg().validate().is_ok());
    assert!(SinkConfig { width: 0, ..cfg() }.validate().is_err());
    assert!(
        SinkConfig {
            chunk_interval: Duration::ZERO,
            ..cfg()
        }
        .validate()
        .is_err()
    );
    assert!(
        SinkConfig {
            audio: Some(AudioInputConfig {
                path: PathBuf::from("a.f32le"),
                sample_rate: 0,
                channels: 2,
            }),
            ..cfg()
        }
        .validate()
        .is_err()
    );
}

#[test]
fn audio_is_dropped_for_video_only_codecs() {
    let audio = AudioInputConfig {
        path: PathBuf::from("a.f32le"),
        sample_rate: 48_000,
        channels: 2,
    };
    let video_only = SinkConfig {
        audio: Some(audio.clone()),
        ..cfg()
    };
    assert!(video_only.effective_audio().is_none());

    let with_audio = SinkConfig {
        codec: default_candidates()[0].clone(),
        audio: Some(audio),
        ..cfg()
    };
    assert!(with_audio.effective_audio().is_some());
}

#[test]
fn in_memory_sink_enforces_call_order() {
    let frame = FrameRGBA::solid(4, 2, [1, 2, 3, 255]);
    let mut sink = InMemorySink::new();
    assert!(sink.start().is_err());
    sink.open(cfg()).unwrap();
    assert!(sink.submit_frame(FrameIndex(0), &frame).is_err());
    sink.start().unwrap();
    sink.submit_frame(FrameIndex(0), &frame).unwrap();
    sink.submit_frame(FrameIndex(1), &frame).unwrap();
    assert!(sink.submit_frame(FrameIndex(1), &frame).is_err());
    assert!(sink.stop().unwrap().is_empty());
    assert!(sink.was_stopped());
    assert_eq!(sink.frames().len(), 2);
}

#[test]
fn abort_discards_frames() {
    let frame = FrameRGBA::solid(4, 2, [0, 0, 0, 255]);
    let mut sink = InMemorySink::new();
    sink.open(cfg()).unwrap();
    sink.start().unwrap();
    sink.submit_frame(FrameIndex(0), &frame).unwrap();
    sink.abort();
    assert!(sink.was_aborted());
    assert!(sink.frames().is_empty());
}
