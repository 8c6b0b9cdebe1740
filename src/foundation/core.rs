use crate::foundation::error::{StudioError, StudioResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Width of the space the scene is authored in. Output canvases are scaled from this.
pub const DESIGN_WIDTH: f64 = 1080.0;
/// Height of the space the scene is authored in.
pub const DESIGN_HEIGHT: f64 = 1920.0;
/// Nominal frame rate of the sequence.
pub const DEFAULT_FPS: u32 = 30;
/// Length of the sequence in seconds.
pub const DEFAULT_DURATION_SECS: f64 = 60.0;

/// 0-based index of an accepted frame within one capture pass.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Rational frames-per-second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator.
    pub num: u32,
    /// Denominator, must be > 0.
    pub den: u32,
}

impl Fps {
    /// Create a validated frame rate.
    pub fn new(num: u32, den: u32) -> StudioResult<Self> {
        if den == 0 {
            return Err(StudioError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(StudioError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Frame rate as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Nominal number of frames in `secs` seconds.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

/// Output raster size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Full-resolution 9:16 portrait canvas.
    pub const PORTRAIT_1080: Canvas = Canvas {
        width: 1080,
        height: 1920,
    };

    /// Check the canvas can be rasterized and encoded.
    pub fn validate(self) -> StudioResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StudioError::validation("canvas width/height must be non-zero"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(StudioError::validation("canvas width/height must fit in u16"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(StudioError::validation(
                "canvas width/height must be even (required for yuv420p output)",
            ));
        }
        Ok(())
    }

    /// Transform from design space into this canvas.
    pub fn design_to_canvas(self) -> Affine {
        Affine::scale_non_uniform(
            f64::from(self.width) / DESIGN_WIDTH,
            f64::from(self.height) / DESIGN_HEIGHT,
        )
    }

    /// Byte length of a tightly packed RGBA8 frame of this size.
    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::PORTRAIT_1080
    }
}

/// The single authoritative time parameter, in seconds, within `[0, duration]`.
///
/// The closed upper bound is deliberate: a capture pass ends on a frame at exactly `duration`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct SceneTime(f64);

impl SceneTime {
    /// Start of the sequence.
    pub const ZERO: SceneTime = SceneTime(0.0);

    /// Validate `secs` against the sequence `duration`.
    pub fn new(secs: f64, duration: f64) -> StudioResult<Self> {
        if !secs.is_finite() {
            return Err(StudioError::invalid_time(format!(
                "scene time must be finite, got {secs}"
            )));
        }
        if secs < 0.0 || secs > duration {
            return Err(StudioError::invalid_time(format!(
                "scene time {secs} is outside [0, {duration}]"
            )));
        }
        Ok(Self(secs))
    }

    /// Clamp an arbitrary (finite or not) value into `[0, duration]`.
    pub fn clamped(secs: f64, duration: f64) -> Self {
        if secs.is_nan() {
            return Self::ZERO;
        }
        Self(secs.clamp(0.0, duration))
    }

    /// Seconds since the start of the sequence.
    pub fn secs(self) -> f64 {
        self.0
    }

    /// Fraction of `duration` elapsed, in `[0, 1]`.
    pub fn progress(self, duration: f64) -> f64 {
        if duration <= 0.0 {
            return 1.0;
        }
        (self.0 / duration).clamp(0.0, 1.0)
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba8Premul {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Premultiply straight-alpha components.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Parse an opaque `#rrggbb` colour.
    pub const fn opaque_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
            a: 255,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
