use super::*;
use crate::timeline::time_source::{SteppedTime, TimeSource};

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

fn drive(clock: &mut TimelineClock, time: &mut SteppedTime) -> Vec<FrameTick> {
    let mut out = Vec::new();
    clock.start(time.now());
    loop {
        match clock.poll(time.now()) {
            Tick::Frame(f) => out.push(f),
            Tick::Wait(d) => time.sleep(d),
            Tick::Complete => break,
        }
    }
    out
}

#[test]
fn full_pass_frame_count_is_approximately_fps_times_duration() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(60), Duration::from_millis(1)).unwrap();
    let mut time = SteppedTime::new();
    let frames = drive(&mut clock, &mut time);

    let n = frames.len() as i64;
    assert!((n - 1800).abs() <= 5, "got {n} frames");
    assert!(clock.is_complete());
}

#[test]
fn times_strictly_increase_and_end_exactly_at_duration() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(2), Duration::from_millis(1)).unwrap();
    let mut time = SteppedTime::new().with_jitter(Duration::from_millis(3));
    let frames = drive(&mut clock, &mut time);

    assert_eq!(frames[0].time.secs(), 0.0);
    for pair in frames.windows(2) {
        assert!(pair[0].time.secs() < pair[1].time.secs());
        assert!(pair[0].progress <= pair[1].progress);
        assert_eq!(pair[0].index.0 + 1, pair[1].index.0);
    }
    let last = frames.last().unwrap();
    assert_eq!(last.time.secs(), 2.0);
    assert_eq!(last.progress, 1.0);
}

#[test]
fn early_poll_within_tolerance_is_accepted() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(1), Duration::from_millis(1)).unwrap();
    clock.start(Duration::ZERO);
    assert!(matches!(clock.poll(Duration::ZERO), Tick::Frame(_)));

    // 32.6 ms is within 1 ms of the 33.3 ms interval.
    assert!(matches!(
        clock.poll(Duration::from_micros(32_600)),
        Tick::Frame(_)
    ));
    match clock.poll(Duration::from_micros(40_000)) {
        Tick::Wait(d) => assert!(d > Duration::ZERO),
        other => panic!("expected wait, got {other:?}"),
    }
}

#[test]
fn late_tick_is_clamped_to_duration_once() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(1), Duration::from_millis(1)).unwrap();
    clock.start(Duration::ZERO);
    let _ = clock.poll(Duration::ZERO);
    match clock.poll(Duration::from_secs(5)) {
        Tick::Frame(f) => assert_eq!(f.time.secs(), 1.0),
        other => panic!("expected final frame, got {other:?}"),
    }
    assert_eq!(clock.poll(Duration::from_secs(6)), Tick::Complete);
    assert_eq!(clock.accepted_frames(), 2);
}

#[test]
fn stop_halts_further_ticks() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(1), Duration::from_millis(1)).unwrap();
    clock.start(Duration::ZERO);
    let _ = clock.poll(Duration::ZERO);
    clock.stop();
    assert!(clock.is_stopped());
    assert!(!clock.is_complete());
    assert_eq!(clock.poll(Duration::from_millis(500)), Tick::Complete);
}

#[test]
fn backwards_time_does_not_reorder_frames() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(1), Duration::from_millis(1)).unwrap();
    clock.start(Duration::from_millis(100));
    let Tick::Frame(first) = clock.poll(Duration::from_millis(100)) else {
        panic!("expected first frame");
    };
    assert!(matches!(
        clock.poll(Duration::from_millis(50)),
        Tick::Wait(_)
    ));
    let Tick::Frame(second) = clock.poll(Duration::from_millis(140)) else {
        panic!("expected second frame");
    };
    assert!(second.time.secs() > first.time.secs());
}

#[test]
fn rejects_bad_parameters() {
    assert!(TimelineClock::new(fps30(), Duration::ZERO, Duration::ZERO).is_err());
    assert!(
        TimelineClock::new(fps30(), Duration::from_secs(1), Duration::from_millis(50)).is_err()
    );
}

#[test]
fn final_frame_is_one_interval_after_the_previous() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(60), Duration::from_millis(1)).unwrap();
    assert_eq!(clock.interval(), Duration::from_nanos(33_333_334));
    let mut time = SteppedTime::new();
    let frames = drive(&mut clock, &mut time);

    assert_eq!(frames.len(), 1801);
    let [.., prev, last] = frames.as_slice() else {
        panic!("expected at least two frames");
    };
    assert_eq!(last.time.secs(), 60.0);
    let gap = last.time.secs() - prev.time.secs();
    let interval = clock.interval().as_secs_f64();
    assert!((gap - interval).abs() < 0.002, "gap={gap}");
}

#[test]
fn tick_just_short_of_the_end_becomes_the_final_frame() {
    let mut clock =
        TimelineClock::new(fps30(), Duration::from_secs(1), Duration::from_millis(1)).unwrap();
    clock.start(Duration::ZERO);
    let _ = clock.poll(Duration::ZERO);
    match clock.poll(Duration::from_micros(999_500)) {
        Tick::Frame(f) => assert_eq!(f.time.secs(), 1.0),
        other => panic!("expected final frame, got {other:?}"),
    }
    assert!(clock.is_complete());
    assert_eq!(clock.poll(Duration::from_secs(2)), Tick::Complete);
}
