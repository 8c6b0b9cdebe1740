use super::*;

#[test]
fn fps_rejects_zero() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.secs_to_frames_floor(60.0), 1800);
    assert!((fps.frame_duration_secs() - 1.0 / 30.0).abs() < 1e-12);
}

#[test]
fn canvas_validation_catches_bad_values() {
    assert!(Canvas::PORTRAIT_1080.validate().is_ok());
    assert!(Canvas { width: 0, height: 10 }.validate().is_err());
    assert!(Canvas { width: 11, height: 10 }.validate().is_err());
    assert!(
        Canvas {
            width: 70_000,
            height: 10
        }
        .validate()
        .is_err()
    );
}

#[test]
fn design_to_canvas_scales_corners() {
    let canvas = Canvas {
        width: 108,
        height: 192,
    };
    let p = canvas.design_to_canvas() * Point::new(DESIGN_WIDTH, DESIGN_HEIGHT);
    assert!((p.x - 108.0).abs() < 1e-9);
    assert!((p.y - 192.0).abs() < 1e-9);
}

#[test]
fn scene_time_rejects_out_of_range() {
    assert!(SceneTime::new(-0.01, 60.0).is_err());
    assert!(SceneTime::new(60.01, 60.0).is_err());
    assert!(SceneTime::new(f64::NAN, 60.0).is_err());
    assert!(SceneTime::new(f64::INFINITY, 60.0).is_err());
    assert_eq!(SceneTime::new(60.0, 60.0).unwrap().secs(), 60.0);
    assert_eq!(SceneTime::new(0.0, 60.0).unwrap(), SceneTime::ZERO);
}

#[test]
fn scene_time_clamps_and_reports_progress() {
    assert_eq!(SceneTime::clamped(75.0, 60.0).secs(), 60.0);
    assert_eq!(SceneTime::clamped(-3.0, 60.0).secs(), 0.0);
    assert_eq!(SceneTime::clamped(f64::NAN, 60.0).secs(), 0.0);
    assert_eq!(SceneTime::clamped(30.0, 60.0).progress(60.0), 0.5);
}

#[test]
fn hex_colour_parses() {
    let c = Rgba8Premul::opaque_hex(0x1f1f27);
    assert_eq!((c.r, c.g, c.b, c.a), (0x1f, 0x1f, 0x27, 255));
    let half = Rgba8Premul::from_straight_rgba(255, 0, 0, 128);
    assert_eq!((half.r, half.a), (128, 128));
}
