//! CRT-style luminance noise.
//!
//! The only non-deterministic layer. The random source is always supplied by the caller so a
//! fixed seed reproduces a frame byte for byte.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::render::frame::FrameRGBA;

/// Generator for the noise layer: seeded when `seed` is set, OS entropy otherwise.
pub fn noise_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Largest absolute per-channel offset for a given strength.
pub fn noise_amplitude(strength: f64) -> f64 {
    127.5 * strength.clamp(0.0, 1.0)
}

/// Add one uniform offset in `[-amp, amp)` per pixel to R, G and B, clamping to `0..=255`.
///
/// Alpha is left untouched; frames are opaque so no premultiplication is involved.
pub fn apply_luminance_noise<R: Rng + ?Sized>(frame: &mut FrameRGBA, strength: f64, rng: &mut R) {
    let scale = 255.0 * strength.clamp(0.0, 1.0);
    if scale == 0.0 {
        return;
    }
    for px in frame.data.chunks_exact_mut(4) {
        let n = (rng.random::<f64>() - 0.5) * scale;
        for c in &mut px[..3] {
            *c = (f64::from(*c) + n).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/noise.rs"]
mod tests;
