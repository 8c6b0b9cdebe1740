//! Studio configuration.
//!
//! Everything has a default matching the shipped 60 s sequence, so an empty JSON object is a
//! valid config. A handful of knobs can also be overridden from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::encode::sink::Codec;
use crate::foundation::core::{Canvas, DEFAULT_DURATION_SECS, DEFAULT_FPS, Fps};
use crate::foundation::error::{StudioError, StudioResult};

/// Top-level configuration for rendering and capture.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    /// Output raster size. The scene is authored at 1080x1920 and scaled to this.
    pub canvas: Canvas,
    /// Target frame rate.
    pub fps: u32,
    /// Sequence length in seconds.
    pub duration_secs: f64,
    /// Trailing wait after the last frame before the sink is finalized.
    pub grace_ms: u64,
    /// Upper bound on sink finalization before the session is marked failed.
    pub finalize_timeout_ms: u64,
    /// Early-acceptance tolerance for frame ticks (absorbs scheduler jitter).
    pub frame_tolerance_ms: u64,
    /// Luminance noise layer.
    pub noise: NoiseConfig,
    /// Caption band and font.
    pub caption: CaptionConfig,
    /// Recording sink output.
    pub encode: EncodeConfig,
}

/// Noise layer settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseConfig {
    /// Peak-to-peak amplitude as a fraction of the 0..255 channel range.
    pub strength: f64,
    /// Fixed seed. `None` draws from OS entropy per session.
    pub seed: Option<u64>,
}

/// Caption settings, in design-space pixels.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionConfig {
    /// Font file to use. `None` resolves a system sans-serif face.
    pub font_path: Option<PathBuf>,
    /// Caption font size.
    pub font_size_px: f32,
    /// Distance between stacked caption lines.
    pub line_height_px: f64,
    /// Wrap width as a fraction of the design width.
    pub max_width_frac: f64,
}

/// Encoder settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeConfig {
    /// Final artifact location.
    pub out_path: PathBuf,
    /// Target video bitrate.
    pub bitrate_bps: u64,
    /// Codec tried first.
    pub preferred: Codec,
    /// Codec used when the preferred one is unavailable.
    pub fallback: Option<Codec>,
    /// Encoder binary.
    pub ffmpeg_bin: PathBuf,
}

/// Fixed artifact filename.
pub const ARTIFACT_FILE_NAME: &str = "room-213.webm";

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::PORTRAIT_1080,
            fps: DEFAULT_FPS,
            duration_secs: DEFAULT_DURATION_SECS,
            grace_ms: 200,
            finalize_timeout_ms: 30_000,
            frame_tolerance_ms: 1,
            noise: NoiseConfig::default(),
            caption: CaptionConfig::default(),
            encode: EncodeConfig::default(),
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            strength: 0.06,
            seed: None,
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size_px: 32.0,
            line_height_px: 38.0,
            max_width_frac: 0.75,
        }
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            out_path: PathBuf::from(ARTIFACT_FILE_NAME),
            bitrate_bps: 6_000_000,
            preferred: Codec::Vp9,
            fallback: Some(Codec::Vp8),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
        }
    }
}

impl StudioConfig {
    /// Load a JSON config and apply environment overrides.
    pub fn from_path(path: impl AsRef<Path>) -> StudioResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let mut cfg: StudioConfig = serde_json::from_slice(&bytes)
            .map_err(|e| StudioError::validation(format!("parse config JSON: {e}")))?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `ROOM213_*` environment overrides. Unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = std::env::var("ROOM213_NOISE_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.noise.seed = Some(seed);
        }
        if let Some(bin) = std::env::var_os("ROOM213_FFMPEG").filter(|v| !v.is_empty()) {
            self.encode.ffmpeg_bin = PathBuf::from(bin);
        }
    }

    /// Check every field is usable. Called once, before any frame is produced.
    pub fn validate(&self) -> StudioResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps, 1)?;
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(StudioError::validation(
                "duration_secs must be finite and > 0",
            ));
        }
        if self.finalize_timeout_ms == 0 {
            return Err(StudioError::validation("finalize_timeout_ms must be > 0"));
        }
        if Duration::from_millis(self.frame_tolerance_ms) >= self.frame_interval() {
            return Err(StudioError::validation(
                "frame_tolerance_ms must be smaller than one frame interval",
            ));
        }
        if !self.noise.strength.is_finite() || !(0.0..=1.0).contains(&self.noise.strength) {
            return Err(StudioError::validation("noise.strength must be within [0, 1]"));
        }
        if !self.caption.font_size_px.is_finite() || self.caption.font_size_px <= 0.0 {
            return Err(StudioError::validation(
                "caption.font_size_px must be finite and > 0",
            ));
        }
        if !self.caption.line_height_px.is_finite() || self.caption.line_height_px <= 0.0 {
            return Err(StudioError::validation(
                "caption.line_height_px must be finite and > 0",
            ));
        }
        if !(self.caption.max_width_frac > 0.0 && self.caption.max_width_frac <= 1.0) {
            return Err(StudioError::validation(
                "caption.max_width_frac must be within (0, 1]",
            ));
        }
        if self.encode.bitrate_bps == 0 {
            return Err(StudioError::validation("encode.bitrate_bps must be > 0"));
        }
        Ok(())
    }

    /// Frame rate as a rational.
    pub fn fps(&self) -> Fps {
        Fps {
            num: self.fps.max(1),
            den: 1,
        }
    }

    /// Nominal interval between frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(self.fps().frame_duration_secs())
    }

    /// Sequence length.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs)
    }

    /// Trailing grace interval.
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// Finalization timeout.
    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }

    /// Frame tick tolerance.
    pub fn frame_tolerance(&self) -> Duration {
        Duration::from_millis(self.frame_tolerance_ms)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
