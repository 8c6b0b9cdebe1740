use super::*;

fn sink_cfg() -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
        codec: Codec::Vp9,
        bitrate_bps: 1,
    }
}

#[test]
fn revoking_a_handle_is_seen_by_clones() {
    let artifact = Artifact::new(&sink_cfg(), 0, ArtifactPayload::Frames(Arc::default()));
    let handle = ArtifactHandle::new(artifact);
    let held = handle.clone();
    assert!(held.get().is_some());

    handle.revoke();
    assert!(held.is_revoked());
    assert!(held.get().is_none());
}

#[test]
fn duration_follows_frame_count() {
    let artifact = Artifact::new(&sink_cfg(), 45, ArtifactPayload::Frames(Arc::default()));
    assert!((artifact.duration_secs() - 1.5).abs() < 1e-9);
    assert_eq!(artifact.mime_type(), "video/webm;codecs=vp9");
    assert!(artifact.path().is_none());
    assert!(artifact.read_bytes().is_err());
}

#[test]
fn file_artifact_reads_back_bytes() {
    let path = std::env::temp_dir().join(format!(
        "room213_artifact_test_{}_{}.webm",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::write(&path, b"\x1a\x45\xdf\xa3").unwrap();
    let artifact = Artifact::new(
        &sink_cfg(),
        1,
        ArtifactPayload::File {
            path: path.clone(),
            byte_len: 4,
        },
    );
    assert_eq!(artifact.path(), Some(path.as_path()));
    assert_eq!(artifact.read_bytes().unwrap(), b"\x1a\x45\xdf\xa3");
    std::fs::remove_file(&path).unwrap();
}
