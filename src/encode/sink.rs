use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::EncodeConfig;
use crate::encode::artifact::{Artifact, ArtifactPayload};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{StudioError, StudioResult};
use crate::render::frame::FrameRGBA;

/// Video codecs the recording sink can be asked for. Both are carried in WebM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// VP9, the higher-quality choice.
    Vp9,
    /// VP8, the widely available fallback.
    Vp8,
}

impl Codec {
    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Vp9 => "vp9",
            Self::Vp8 => "vp8",
        }
    }

    /// `ffmpeg` encoder implementing this codec.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Vp9 => "libvpx-vp9",
            Self::Vp8 => "libvpx",
        }
    }

    /// MIME type of a WebM stream using this codec.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Vp9 => "video/webm;codecs=vp9",
            Self::Vp8 => "video/webm;codecs=vp8",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Codec preference for one session: the preferred codec, else the fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodingHint {
    /// Tried first.
    pub preferred: Codec,
    /// Tried when `preferred` is unsupported.
    pub fallback: Option<Codec>,
}

impl EncodingHint {
    /// Hint from encoder settings.
    pub fn from_config(cfg: &EncodeConfig) -> Self {
        Self {
            preferred: cfg.preferred,
            fallback: cfg.fallback,
        }
    }

    /// Pick the codec `sink` will record with.
    ///
    /// Called once per session, before `begin`; the choice holds for every frame of the session.
    pub fn negotiate(&self, sink: &dyn FrameSink) -> StudioResult<Codec> {
        if sink.supports(self.preferred) {
            return Ok(self.preferred);
        }
        if let Some(fallback) = self.fallback
            && sink.supports(fallback)
        {
            tracing::debug!(
                preferred = %self.preferred,
                fallback = %fallback,
                "preferred codec unavailable; using fallback"
            );
            return Ok(fallback);
        }
        Err(StudioError::unsupported_encoding(match self.fallback {
            Some(fallback) => format!("neither {} nor {fallback} is available", self.preferred),
            None => format!("{} is not available", self.preferred),
        }))
    }
}

impl Default for EncodingHint {
    fn default() -> Self {
        Self::from_config(&EncodeConfig::default())
    }
}

/// Configuration provided to a [`FrameSink`] when a session opens it.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Target frame rate.
    pub fps: Fps,
    /// Negotiated codec.
    pub codec: Codec,
    /// Target video bitrate.
    pub bitrate_bps: u64,
}

impl SinkConfig {
    /// Output size as a canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// Shared flag asking a sink to give up on a running `end`.
///
/// Taken from the sink before `end` moves to a worker thread, so the caller can still stop a
/// finalizer that hangs.
#[derive(Clone, Debug, Default)]
pub struct FinalizeStop(Arc<AtomicBool>);

impl FinalizeStop {
    /// Fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the finalizer to stop.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether `stop` was called.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Recording sink contract.
///
/// A session calls `check_ready`, then `begin` once, `push_frame` in strictly increasing
/// `FrameIndex` order, then exactly one of `end` (success) or `abort` (failure or cancellation).
pub trait FrameSink: Send {
    /// Fail with `SinkOpen` when the sink's backend cannot run at all.
    ///
    /// Checked before codec negotiation so a broken backend is not reported as a missing codec.
    fn check_ready(&self) -> StudioResult<()> {
        Ok(())
    }
    /// Whether this sink can record `codec`.
    fn supports(&self, codec: Codec) -> bool;
    /// Open the sink. Errors surface as `SinkOpen` before any frame is produced.
    fn begin(&mut self, cfg: SinkConfig) -> StudioResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StudioResult<()>;
    /// Flush and produce the finished artifact.
    fn end(&mut self) -> StudioResult<Artifact>;
    /// Discard everything written so far. Must leave no artifact behind.
    fn abort(&mut self) {}
    /// Flag that makes a running `end` kill its backend, discard its output and fail.
    ///
    /// `None` for sinks whose `end` cannot hang.
    fn finalize_stop(&self) -> Option<FinalizeStop> {
        None
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    /// Frames in timeline order.
    pub(crate) frames: Vec<(FrameIndex, FrameRGBA)>,
    unsupported: Vec<Codec>,
    aborted: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that reports `codec` as unavailable.
    pub fn without_codec(mut self, codec: Codec) -> Self {
        self.unsupported.push(codec);
        self
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, FrameRGBA)] {
        &self.frames
    }

    /// Whether the last session was aborted.
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn supports(&self, codec: Codec) -> bool {
        !self.unsupported.contains(&codec)
    }

    fn begin(&mut self, cfg: SinkConfig) -> StudioResult<()> {
        cfg.canvas()
            .validate()
            .map_err(|e| StudioError::sink_open(e.to_string()))?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StudioResult<()> {
        let Some(cfg) = self.cfg.as_ref() else {
            return Err(StudioError::sink_write("in-memory sink not started"));
        };
        if frame.canvas() != cfg.canvas() {
            return Err(StudioError::sink_write(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if let Some((last, _)) = self.frames.last()
            && idx <= *last
        {
            return Err(StudioError::sink_write("out-of-order frame index"));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> StudioResult<Artifact> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| StudioError::finalize("in-memory sink not started"))?;
        let frames = std::mem::take(&mut self.frames);
        Ok(Artifact::new(
            &cfg,
            frames.len() as u64,
            ArtifactPayload::Frames(Arc::new(frames)),
        ))
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.frames.clear();
        self.aborted = true;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
