use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Canvas;
use crate::foundation::error::{StudioError, StudioResult};
use crate::foundation::math::mul_div255_u16;

/// A rendered frame as RGBA8 pixels.
///
/// Scene frames are fully opaque, so premultiplied and straight alpha coincide. The flag is kept
/// explicit at API boundaries anyway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Wrap premultiplied RGBA8 bytes, checking the length matches the size.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> StudioResult<Self> {
        let expected = Canvas { width, height }.rgba_len();
        if data.len() != expected {
            return Err(StudioError::render(format!(
                "frame byte len mismatch (got {}, expected {expected})",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    /// Size of this frame.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel at `(x, y)`; out-of-range coordinates read as transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Mean of the RGB channels over the whole frame.
    pub fn mean_luma(&self) -> f64 {
        let px = self.data.len() / 4;
        if px == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .data
            .chunks_exact(4)
            .map(|p| u64::from(p[0]) + u64::from(p[1]) + u64::from(p[2]))
            .sum();
        sum as f64 / (px as f64 * 3.0)
    }

    /// Source-over `overlay` (premultiplied, same size) onto this frame.
    pub fn composite_over(&mut self, overlay: &[u8]) -> StudioResult<()> {
        if overlay.len() != self.data.len() || !overlay.len().is_multiple_of(4) {
            return Err(StudioError::render(
                "overlay must be an equal-length rgba8 buffer",
            ));
        }
        for (d, s) in self.data.chunks_exact_mut(4).zip(overlay.chunks_exact(4)) {
            let sa = u16::from(s[3]);
            if sa == 0 {
                continue;
            }
            let inv = 255u16 - sa;
            d[3] = s[3].saturating_add(mul_div255_u16(u16::from(d[3]), inv) as u8);
            for c in 0..3 {
                let dc = mul_div255_u16(u16::from(d[c]), inv) as u8;
                d[c] = s[c].saturating_add(dc);
            }
        }
        Ok(())
    }

    /// Convert into an `image` buffer (straight alpha).
    pub fn to_rgba_image(&self) -> StudioResult<image::RgbaImage> {
        let mut bytes = self.data.clone();
        if self.premultiplied {
            unpremultiply_in_place(&mut bytes);
        }
        image::RgbaImage::from_raw(self.width, self.height, bytes)
            .ok_or_else(|| StudioError::render("frame buffer does not match its dimensions"))
    }

    /// Encode as PNG at `path`.
    pub fn save_png(&self, path: impl AsRef<Path>) -> StudioResult<()> {
        let path = path.as_ref();
        self.to_rgba_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in 0..3 {
            px[c] = ((u16::from(px[c]) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
