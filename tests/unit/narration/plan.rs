use super::*;

#[test]
fn rate_is_clamped_to_range() {
    assert_eq!(speech_rate(1000, 60.0), MAX_RATE);
    assert_eq!(speech_rate(10, 60.0), MIN_RATE);
    assert!((speech_rate(180, 60.0) - 1.0).abs() < 1e-12);
}

#[test]
fn room_213_plan_runs_at_the_fast_clamp() {
    let plan = NarrationPlan::new(&NarrationScript::room_213(), 60.0).unwrap();
    assert_eq!(plan.words, 270);
    assert_eq!(plan.rate, 1.4);
    assert_eq!(plan.pitch, 0.9);
    assert_eq!(plan.volume, 1.0);
    assert!(plan.text.starts_with(NarrationScript::room_213().line(0)));
    assert!((plan.estimated_secs() - 270.0 / 4.2).abs() < 1e-9);
}

#[test]
fn espeak_arguments_scale_from_defaults() {
    let plan = NarrationPlan::new(&NarrationScript::room_213(), 60.0).unwrap();
    assert_eq!(plan.espeak_words_per_minute(), 245);
    assert_eq!(plan.espeak_pitch(), 45);
    assert_eq!(plan.espeak_amplitude(), 100);
}

#[test]
fn bad_target_is_rejected() {
    let script = NarrationScript::room_213();
    assert!(NarrationPlan::new(&script, 0.0).is_err());
    assert!(NarrationPlan::new(&script, f64::NAN).is_err());
}
