use super::*;

#[test]
fn missing_stream_messages_are_recognized() {
    assert!(is_missing_stream_message(
        "Stream map '0:a:0' matches no streams."
    ));
    assert!(is_missing_stream_message(
        "Output file #0 does not contain any stream"
    ));
    assert!(!is_missing_stream_message("Invalid data found when processing input"));
}

#[test]
fn owned_track_removes_its_file_on_drop() {
    let temp = create_pcm_temp().unwrap();
    std::fs::write(&temp, [0u8; 16]).unwrap();
    let track = AudioTrack::owned_temp(temp);
    let path = track.path().to_path_buf();
    assert!(track.owns_file());
    assert!(path.exists());
    assert_eq!(track.sample_rate(), AUDIO_SAMPLE_RATE);
    assert_eq!(track.channels(), AUDIO_CHANNELS);
    drop(track);
    assert!(!path.exists());
}

#[test]
fn borrowed_track_keeps_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("borrowed.f32le");
    // One second of stereo f32 at 8 Hz.
    std::fs::write(&path, vec![0u8; 8 * 2 * 4]).unwrap();
    let track = AudioTrack::borrowed(&path, 8, 2);
    assert!(!track.owns_file());
    assert!((track.duration_secs() - 1.0).abs() < 1e-9);
    drop(track);
    assert!(path.exists());
}

#[test]
fn pcm_temp_files_are_created_exclusively_and_distinct() {
    let a = create_pcm_temp().unwrap();
    let b = create_pcm_temp().unwrap();
    assert_ne!(a.to_path_buf(), b.to_path_buf());
    assert!(a.exists() && b.exists());
    let name = a.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("veilframe_audio_") && name.ends_with(".f32le"), "{name}");
}
