pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Map an opacity in `[0, 1]` to an 8-bit alpha.
pub(crate) fn alpha_u8(opacity: f64) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Source-over of a straight-alpha colour onto an opaque RGB pixel.
pub(crate) fn blend_over_opaque(dst: [u8; 3], src: [u8; 3], alpha: f64) -> [u8; 3] {
    let a = alpha.clamp(0.0, 1.0);
    let mix = |d: u8, s: u8| -> u8 { lerp(f64::from(d), f64::from(s), a).round() as u8 };
    [mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2])]
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
