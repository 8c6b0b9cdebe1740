use super::*;

#[test]
fn mul_div255_endpoints() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u16(255, 128), 128);
}

#[test]
fn alpha_u8_clamps() {
    assert_eq!(alpha_u8(-1.0), 0);
    assert_eq!(alpha_u8(2.0), 255);
    assert_eq!(alpha_u8(0.55), 140);
}

#[test]
fn blend_over_opaque_endpoints() {
    assert_eq!(blend_over_opaque([10, 20, 30], [200, 200, 200], 0.0), [10, 20, 30]);
    assert_eq!(blend_over_opaque([10, 20, 30], [200, 200, 200], 1.0), [200, 200, 200]);
    assert_eq!(blend_over_opaque([0, 0, 0], [255, 255, 255], 0.5), [128, 128, 128]);
}
