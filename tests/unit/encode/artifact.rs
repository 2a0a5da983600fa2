use super::*;

#[test]
fn chunks_are_joined_in_sequence_order() {
    let chunks = vec![
        Chunk {
            seq: 1,
            bytes: vec![3, 4],
        },
        Chunk {
            seq: 0,
            bytes: vec![1, 2],
        },
        Chunk {
            seq: 2,
            bytes: vec![5],
        },
    ];
    let a = ExportArtifact::from_chunks("video/webm;codecs=vp9", chunks, 3);
    assert_eq!(a.bytes, vec![1, 2, 3, 4, 5]);
    assert_eq!(a.frames, 3);
    assert_eq!(a.extension(), "webm");
}

#[test]
fn extension_falls_back_for_unknown_types() {
    let a = ExportArtifact::from_chunks("application/octet-stream", Vec::new(), 0);
    assert_eq!(a.extension(), "bin");
    assert!(a.bytes.is_empty());
}

#[test]
fn write_to_creates_parent_dirs() {
    let dir = std::env::temp_dir().join(format!("veilframe_artifact_{}", std::process::id()));
    let path = dir.join("nested").join("out.webm");
    let a = ExportArtifact {
        mime: "video/webm".to_string(),
        bytes: vec![9, 8, 7],
        frames: 1,
    };
    a.write_to(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), vec![9, 8, 7]);
    std::fs::remove_dir_all(&dir).unwrap();
}
