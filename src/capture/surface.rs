use std::path::PathBuf;

use anyhow::Context as _;

use crate::foundation::error::{StudioError, StudioResult};
use crate::render::frame::FrameRGBA;
use crate::timeline::clock::FrameTick;

/// Live presentation target, fed every composited frame alongside the sink.
///
/// Errors are reported to the orchestrator, which logs them and keeps recording.
pub trait PresentSurface: Send {
    /// Show `frame`.
    fn present(&mut self, tick: &FrameTick, frame: &FrameRGBA) -> StudioResult<()>;
}

/// Surface that discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl PresentSurface for NullSurface {
    fn present(&mut self, _tick: &FrameTick, _frame: &FrameRGBA) -> StudioResult<()> {
        Ok(())
    }
}

/// Surface that periodically overwrites a downscaled PNG snapshot.
#[derive(Debug, Clone)]
pub struct PngPreviewSurface {
    path: PathBuf,
    every: u64,
    downscale: u32,
    written: u64,
}

impl PngPreviewSurface {
    /// Write every `every`-th frame to `path`, shrunk by `downscale` on each axis.
    pub fn new(path: impl Into<PathBuf>, every: u64, downscale: u32) -> StudioResult<Self> {
        if every == 0 {
            return Err(StudioError::validation("preview interval must be > 0"));
        }
        if downscale == 0 {
            return Err(StudioError::validation("preview downscale must be > 0"));
        }
        Ok(Self {
            path: path.into(),
            every,
            downscale,
            written: 0,
        })
    }

    /// Snapshot location.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Snapshots written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl PresentSurface for PngPreviewSurface {
    fn present(&mut self, tick: &FrameTick, frame: &FrameRGBA) -> StudioResult<()> {
        if !tick.index.0.is_multiple_of(self.every) {
            return Ok(());
        }
        let img = frame.to_rgba_image()?;
        let w = (frame.width / self.downscale).max(1);
        let h = (frame.height / self.downscale).max(1);
        let small = if self.downscale == 1 {
            img
        } else {
            image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
        };
        small
            .save_with_format(&self.path, image::ImageFormat::Png)
            .with_context(|| format!("write preview '{}'", self.path.display()))?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/surface.rs"]
mod tests;
