use super::*;
use crate::foundation::core::{FrameIndex, SceneTime};

fn tick(i: u64) -> FrameTick {
    FrameTick {
        index: FrameIndex(i),
        time: SceneTime::ZERO,
        progress: 0.0,
    }
}

fn frame() -> FrameRGBA {
    FrameRGBA::from_premul(8, 16, [30u8, 40, 50, 255].repeat(8 * 16)).unwrap()
}

#[test]
fn null_surface_accepts_everything() {
    assert!(NullSurface.present(&tick(0), &frame()).is_ok());
}

#[test]
fn png_preview_writes_every_nth_frame_downscaled() {
    let path = std::env::temp_dir().join(format!(
        "room213_preview_{}_{}.png",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    let mut s = PngPreviewSurface::new(&path, 3, 2).unwrap();
    for i in 0..7 {
        s.present(&tick(i), &frame()).unwrap();
    }
    assert_eq!(s.written(), 3);

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (4, 8));
    assert_eq!(img.get_pixel(1, 1).0, [30, 40, 50, 255]);
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn unwritable_preview_path_is_an_error() {
    let mut s = PngPreviewSurface::new("/nonexistent-room213-dir/preview.png", 1, 1).unwrap();
    assert!(s.present(&tick(0), &frame()).is_err());
}

#[test]
fn zero_interval_is_rejected() {
    assert!(PngPreviewSurface::new("x.png", 0, 1).is_err());
    assert!(PngPreviewSurface::new("x.png", 1, 0).is_err());
}
