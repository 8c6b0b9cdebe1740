use super::*;

fn small_cfg(seed: Option<u64>) -> StudioConfig {
    let mut cfg = StudioConfig::default();
    cfg.canvas = Canvas {
        width: 108,
        height: 192,
    };
    cfg.noise.seed = seed;
    cfg
}

fn compositor(seed: Option<u64>) -> FrameCompositor {
    FrameCompositor::without_fonts(&small_cfg(seed), NarrationScript::room_213()).unwrap()
}

#[test]
fn fixed_seed_gives_byte_identical_frames() {
    let mut a = compositor(Some(42));
    let mut b = compositor(Some(42));
    assert_eq!(a.compose_at(40.0).unwrap(), b.compose_at(40.0).unwrap());
}

#[test]
fn unseeded_noise_only_perturbs_within_bounds() {
    let mut noisy = compositor(None);
    let mut cfg = small_cfg(Some(1));
    cfg.noise.strength = 0.0;
    let mut clean = FrameCompositor::without_fonts(&cfg, NarrationScript::room_213()).unwrap();

    let a = noisy.compose_at(20.0).unwrap();
    let b = clean.compose_at(20.0).unwrap();
    let amp = crate::render::noise::noise_amplitude(0.06).ceil() as i32;
    for (pa, pb) in a.data.chunks_exact(4).zip(b.data.chunks_exact(4)) {
        for c in 0..3 {
            assert!((i32::from(pa[c]) - i32::from(pb[c])).abs() <= amp + 1);
        }
        assert_eq!(pa[3], 255);
    }
}

#[test]
fn noise_stream_advances_between_frames() {
    let mut c = compositor(Some(5));
    let first = c.compose_at(10.0).unwrap();
    let second = c.compose_at(10.0).unwrap();
    assert_ne!(first, second);
    c.reseed(Some(5));
    assert_eq!(c.compose_at(10.0).unwrap(), first);
}

#[test]
fn out_of_range_time_is_rejected() {
    let mut c = compositor(Some(1));
    assert!(c.compose_at(-0.5).is_err());
    assert!(c.compose_at(60.5).is_err());
    assert!(c.compose_at(f64::NAN).is_err());
    assert!(c.compose_at(60.0).is_ok());
}

#[test]
fn caption_layout_tracks_script_segments() {
    let mut c = compositor(Some(1));
    assert!(c.caption_family().is_none());
    let first = c.caption_layout(SceneTime::ZERO);
    assert_eq!(first.segment, 0);
    assert!(!first.lines.is_empty());
    let last = c.caption_layout(SceneTime::new(60.0, 60.0).unwrap());
    assert_eq!(last.segment, c.script().len() - 1);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let mut cfg = small_cfg(None);
    cfg.duration_secs = -1.0;
    assert!(FrameCompositor::without_fonts(&cfg, NarrationScript::room_213()).is_err());
}
