use super::*;

use std::path::PathBuf;

use crate::encode::codec::default_candidates;
use crate::encode::sink::AudioInputConfig;
use crate::foundation::core::Fps;

fn cfg(codec_idx: usize, audio: bool) -> SinkConfig {
    SinkConfig {
        width: 640,
        height: 360,
        fps: Fps::new(30, 1).unwrap(),
        codec: default_candidates()[codec_idx].clone(),
        video_bits_per_second: 2_500_000,
        audio_bits_per_second: 128_000,
        chunk_interval: Duration::from_millis(100),
        audio: audio.then(|| AudioInputConfig {
            path: PathBuf::from("/tmp/a.f32le"),
            sample_rate: 48_000,
            channels: 2,
        }),
    }
}

fn has_pair(args: &[String], a: &str, b: &str) -> bool {
    args.windows(2).any(|w| w[0] == a && w[1] == b)
}

#[test]
fn args_for_vp9_opus_with_audio() {
    let args = encoder_args(&cfg(0, true));
    assert!(has_pair(&args, "-s", "640x360"));
    assert!(has_pair(&args, "-r", "30/1"));
    assert!(has_pair(&args, "-c:v", "libvpx-vp9"));
    assert!(has_pair(&args, "-b:v", "2500000"));
    assert!(has_pair(&args, "-c:a", "libopus"));
    assert!(has_pair(&args, "-b:a", "128000"));
    assert!(has_pair(&args, "-map", "1:a"));
    assert!(has_pair(&args, "-f", "webm"));
    assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    assert!(!args.iter().any(|a| a == "-an"));
}

#[test]
fn args_for_video_only_codec_ignore_audio() {
    let args = encoder_args(&cfg(2, true));
    assert!(args.iter().any(|a| a == "-an"));
    assert!(!args.iter().any(|a| a == "/tmp/a.f32le"));
}

#[test]
fn mp4_output_is_fragmented() {
    let args = encoder_args(&cfg(5, false));
    assert!(has_pair(&args, "-movflags", "frag_keyframe+empty_moov"));
    assert!(has_pair(&args, "-f", "mp4"));
}

#[test]
fn pump_emits_everything_in_order() {
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let (tx, rx) = mpsc::channel();
    pump_chunks(std::io::Cursor::new(data.clone()), Duration::ZERO, tx).unwrap();
    let chunks: Vec<Chunk> = rx.try_iter().collect();
    assert!(chunks.len() > 1);
    assert!(chunks.windows(2).all(|w| w[0].seq + 1 == w[1].seq));
    let joined: Vec<u8> = chunks.into_iter().flat_map(|c| c.bytes).collect();
    assert_eq!(joined, data);
}

#[test]
fn pump_with_long_interval_emits_one_chunk() {
    let (tx, rx) = mpsc::channel();
    pump_chunks(
        std::io::Cursor::new(vec![7u8; 1000]),
        Duration::from_secs(3600),
        tx,
    )
    .unwrap();
    let chunks: Vec<Chunk> = rx.try_iter().collect();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].bytes.len(), 1000);
}

#[test]
fn submit_before_open_fails() {
    let mut sink = FfmpegCaptureSink::new("ffmpeg");
    let frame = FrameRGBA::solid(2, 2, [0, 0, 0, 255]);
    assert!(sink.submit_frame(FrameIndex(0), &frame).is_err());
    assert!(sink.stop().is_err());
}

#[test]
fn open_fails_for_missing_binary() {
    let mut sink = FfmpegCaptureSink::new("/definitely/not/ffmpeg");
    let err = sink.open(cfg(2, false)).unwrap_err();
    assert!(matches!(err, VeilError::Media(_)));
}
