use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context as _;

use crate::config::ARTIFACT_FILE_NAME;
use crate::encode::sink::{Codec, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{StudioError, StudioResult};
use crate::render::frame::FrameRGBA;

/// Where a finished recording lives.
#[derive(Clone, Debug)]
pub enum ArtifactPayload {
    /// Encoded WebM file on disk.
    File {
        /// Final location.
        path: PathBuf,
        /// Size at finalization time.
        byte_len: u64,
    },
    /// Raw frames kept in memory.
    Frames(Arc<Vec<(FrameIndex, FrameRGBA)>>),
}

/// A finished recording.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Download name offered to the user.
    pub file_name: String,
    /// Codec the recording was made with.
    pub codec: Codec,
    /// Output size.
    pub canvas: Canvas,
    /// Frame rate.
    pub fps: Fps,
    /// Number of frames recorded.
    pub frame_count: u64,
    /// Recorded data.
    pub payload: ArtifactPayload,
}

impl Artifact {
    /// Artifact for a session opened with `cfg`.
    pub fn new(cfg: &SinkConfig, frame_count: u64, payload: ArtifactPayload) -> Self {
        Self {
            file_name: ARTIFACT_FILE_NAME.to_string(),
            codec: cfg.codec,
            canvas: cfg.canvas(),
            fps: cfg.fps,
            frame_count,
            payload,
        }
    }

    /// MIME type of the recording.
    pub fn mime_type(&self) -> &'static str {
        self.codec.mime_type()
    }

    /// On-disk location, for file artifacts.
    pub fn path(&self) -> Option<&Path> {
        match &self.payload {
            ArtifactPayload::File { path, .. } => Some(path),
            ArtifactPayload::Frames(_) => None,
        }
    }

    /// In-memory frames, for frame artifacts.
    pub fn frames(&self) -> Option<&[(FrameIndex, FrameRGBA)]> {
        match &self.payload {
            ArtifactPayload::File { .. } => None,
            ArtifactPayload::Frames(frames) => Some(frames),
        }
    }

    /// Nominal playback length.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 * self.fps.frame_duration_secs()
    }

    /// Read the encoded bytes back.
    pub fn read_bytes(&self) -> StudioResult<Vec<u8>> {
        match &self.payload {
            ArtifactPayload::File { path, .. } => Ok(std::fs::read(path)
                .with_context(|| format!("read artifact '{}'", path.display()))?),
            ArtifactPayload::Frames(_) => Err(StudioError::validation(
                "in-memory artifact holds raw frames, not an encoded stream",
            )),
        }
    }

    /// Delete whatever the artifact left on disk.
    pub(crate) fn discard(self) {
        if let ArtifactPayload::File { path, .. } = self.payload {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Shared, revocable reference to the most recent artifact.
///
/// Only one artifact is live at a time. Issuing a new one revokes the previous handle; clones of
/// a handle observe the revocation.
#[derive(Clone, Debug)]
pub struct ArtifactHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    artifact: Artifact,
    revoked: AtomicBool,
}

impl ArtifactHandle {
    pub(crate) fn new(artifact: Artifact) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                artifact,
                revoked: AtomicBool::new(false),
            }),
        }
    }

    /// The artifact, unless a later session replaced it.
    pub fn get(&self) -> Option<&Artifact> {
        if self.is_revoked() {
            None
        } else {
            Some(&self.inner.artifact)
        }
    }

    /// Whether a later artifact superseded this one.
    pub fn is_revoked(&self) -> bool {
        self.inner.revoked.load(Ordering::Acquire)
    }

    pub(crate) fn revoke(&self) {
        self.inner.revoked.store(true, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/artifact.rs"]
mod tests;
