use std::path::PathBuf;

use super::*;
use crate::caption::script::NarrationScript;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::sink::{Codec, InMemorySink};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::timeline::time_source::SteppedTime;

fn small_cfg(duration_secs: f64) -> StudioConfig {
    let mut cfg = StudioConfig::default();
    cfg.canvas = Canvas {
        width: 108,
        height: 192,
    };
    cfg.duration_secs = duration_secs;
    cfg.noise.seed = Some(7);
    cfg
}

fn parts(cfg: &StudioConfig) -> (CaptureOrchestrator, FrameCompositor) {
    (
        CaptureOrchestrator::new(cfg).unwrap(),
        FrameCompositor::without_fonts(cfg, NarrationScript::room_213()).unwrap(),
    )
}

#[derive(Clone, Default)]
struct SinkTally {
    pushed: Arc<Mutex<Vec<u64>>>,
    aborted: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

#[derive(Default)]
struct ScriptedSink {
    tally: SinkTally,
    fail_begin: bool,
    fail_push_at: Option<u64>,
    end_delay: Duration,
    hang_until_stopped: bool,
    stop: FinalizeStop,
    inner: InMemorySink,
}

impl FrameSink for ScriptedSink {
    fn supports(&self, codec: Codec) -> bool {
        self.inner.supports(codec)
    }

    fn begin(&mut self, cfg: SinkConfig) -> StudioResult<()> {
        if self.fail_begin {
            return Err(StudioError::sink_open("device busy"));
        }
        self.inner.begin(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StudioResult<()> {
        if self.fail_push_at == Some(idx.0) {
            return Err(StudioError::sink_write("disk full"));
        }
        self.tally.pushed.lock().unwrap().push(idx.0);
        self.inner.push_frame(idx, frame)
    }

    fn end(&mut self) -> StudioResult<Artifact> {
        if self.hang_until_stopped {
            while !self.stop.is_stopped() {
                std::thread::sleep(Duration::from_millis(5));
            }
            self.tally.stopped.store(true, Ordering::SeqCst);
            return Err(StudioError::finalize("stopped"));
        }
        std::thread::sleep(self.end_delay);
        self.tally.ended.store(true, Ordering::SeqCst);
        self.inner.end()
    }

    fn abort(&mut self) {
        self.tally.aborted.store(true, Ordering::SeqCst);
        self.inner.abort();
    }

    fn finalize_stop(&self) -> Option<FinalizeStop> {
        self.hang_until_stopped.then(|| self.stop.clone())
    }
}

struct CountingSurface {
    frames: u64,
    fail: bool,
    cancel_at: Option<(u64, CaptureOrchestrator)>,
    progress: Vec<f64>,
}

impl CountingSurface {
    fn new() -> Self {
        Self {
            frames: 0,
            fail: false,
            cancel_at: None,
            progress: Vec::new(),
        }
    }
}

impl PresentSurface for CountingSurface {
    fn present(&mut self, tick: &FrameTick, _frame: &FrameRGBA) -> StudioResult<()> {
        self.frames += 1;
        if let Some((at, orch)) = &self.cancel_at {
            self.progress.push(orch.progress());
            if tick.index.0 == *at {
                orch.cancel();
            }
        }
        if self.fail {
            return Err(StudioError::render("surface lost"));
        }
        Ok(())
    }
}

#[test]
fn offline_capture_records_one_full_pass() {
    let cfg = small_cfg(2.0);
    let (orch, mut comp) = parts(&cfg);
    let tally = SinkTally::default();
    let sink = ScriptedSink {
        tally: tally.clone(),
        ..Default::default()
    };
    let mut surface = CountingSurface::new();

    let report = orch
        .capture(&mut comp, Box::new(sink), &mut surface, &mut SteppedTime::new())
        .unwrap();

    let pushed = tally.pushed.lock().unwrap().clone();
    assert!((59..=64).contains(&pushed.len()), "pushed {}", pushed.len());
    assert!(pushed.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(surface.frames, pushed.len() as u64);

    let session = &report.session;
    assert_eq!(session.status(), CaptureStatus::Done);
    assert_eq!(
        session.history(),
        [
            CaptureStatus::Idle,
            CaptureStatus::Recording,
            CaptureStatus::Finalizing,
            CaptureStatus::Done
        ]
    );
    assert_eq!(session.frames_pushed(), pushed.len() as u64);
    assert_eq!(session.codec(), Some(Codec::Vp9));
    assert_eq!(orch.progress(), 1.0);
    assert!(!orch.is_busy());

    let artifact = report.artifact.get().unwrap();
    assert_eq!(artifact.frame_count, pushed.len() as u64);
    assert_eq!(artifact.canvas, cfg.canvas);
    assert!(tally.ended.load(Ordering::SeqCst));
    assert!(!tally.aborted.load(Ordering::SeqCst));
}

#[test]
fn final_frame_is_rendered_at_duration() {
    let cfg = small_cfg(1.0);
    let (orch, mut comp) = parts(&cfg);
    let report = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new()),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap();
    let frames = report.artifact.get().unwrap().frames().unwrap().len();
    assert!(frames >= 30);
    assert_eq!(report.session.progress(), 1.0);
}

#[test]
fn falls_back_to_vp8_when_vp9_is_missing() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let sink = InMemorySink::new().without_codec(Codec::Vp9);
    let report = orch
        .capture(
            &mut comp,
            Box::new(sink),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap();
    assert_eq!(report.session.codec(), Some(Codec::Vp8));
    assert_eq!(report.artifact.get().unwrap().codec, Codec::Vp8);
}

#[test]
fn hint_override_selects_the_codec() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let orch = orch.with_hint(EncodingHint {
        preferred: Codec::Vp8,
        fallback: None,
    });
    let report = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new()),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap();
    assert_eq!(report.session.codec(), Some(Codec::Vp8));

    let err = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new().without_codec(Codec::Vp8)),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap_err();
    assert!(matches!(err, StudioError::UnsupportedEncoding(_)));
}

#[test]
fn missing_encoder_binary_is_a_sink_open_failure() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let mut opts = FfmpegSinkOpts::new(std::env::temp_dir().join("room213-never-written.webm"));
    opts.ffmpeg_bin = PathBuf::from("/nonexistent/ffmpeg");
    let mut surface = CountingSurface::new();

    let err = orch
        .capture(
            &mut comp,
            Box::new(FfmpegSink::new(opts)),
            &mut surface,
            &mut SteppedTime::new(),
        )
        .unwrap_err();
    let StudioError::SinkOpen(msg) = &err else {
        panic!("expected sink open failure, got {err:?}");
    };
    assert!(msg.contains("/nonexistent/ffmpeg"), "{msg}");
    assert_eq!(surface.frames, 0);
    assert_eq!(orch.status(), CaptureStatus::Idle);
    assert_eq!(orch.session().id(), 0);
}

#[test]
fn unsupported_encoding_fails_before_any_session() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let sink = InMemorySink::new()
        .without_codec(Codec::Vp9)
        .without_codec(Codec::Vp8);
    let mut surface = CountingSurface::new();
    let err = orch
        .capture(&mut comp, Box::new(sink), &mut surface, &mut SteppedTime::new())
        .unwrap_err();
    assert!(matches!(err, StudioError::UnsupportedEncoding(_)));
    assert_eq!(surface.frames, 0);
    assert_eq!(orch.status(), CaptureStatus::Idle);
    assert_eq!(orch.session().id(), 0);
    assert!(!orch.is_busy());
}

#[test]
fn sink_open_failure_fails_fast() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let sink = ScriptedSink {
        fail_begin: true,
        ..Default::default()
    };
    let mut surface = CountingSurface::new();
    let err = orch
        .capture(&mut comp, Box::new(sink), &mut surface, &mut SteppedTime::new())
        .unwrap_err();
    assert!(matches!(err, StudioError::SinkOpen(_)));
    assert_eq!(surface.frames, 0);
    assert_eq!(orch.status(), CaptureStatus::Idle);
}

#[test]
fn write_failure_fails_session_without_artifact() {
    let cfg = small_cfg(1.0);
    let (orch, mut comp) = parts(&cfg);
    let tally = SinkTally::default();
    let sink = ScriptedSink {
        tally: tally.clone(),
        fail_push_at: Some(10),
        ..Default::default()
    };
    let err = orch
        .capture(
            &mut comp,
            Box::new(sink),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap_err();

    assert!(matches!(err, StudioError::SinkWrite(_)));
    assert_eq!(orch.status(), CaptureStatus::Failed);
    assert!(orch.session().error().unwrap().contains("disk full"));
    assert_eq!(orch.session().frames_pushed(), 10);
    assert!(tally.aborted.load(Ordering::SeqCst));
    assert!(!tally.ended.load(Ordering::SeqCst));
    assert!(orch.artifact().is_none());
    assert!(!orch.is_busy());
}

#[test]
fn failed_session_does_not_block_the_next_one() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let failing = ScriptedSink {
        fail_push_at: Some(0),
        ..Default::default()
    };
    let mut time = SteppedTime::new();
    assert!(
        orch.capture(&mut comp, Box::new(failing), &mut CountingSurface::new(), &mut time)
            .is_err()
    );
    let report = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new()),
            &mut CountingSurface::new(),
            &mut time,
        )
        .unwrap();
    assert_eq!(report.session.id(), 2);
    assert_eq!(orch.status(), CaptureStatus::Done);
}

#[test]
fn new_artifact_revokes_the_previous_one() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let mut time = SteppedTime::new();
    let first = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new()),
            &mut CountingSurface::new(),
            &mut time,
        )
        .unwrap();
    assert!(orch.artifact().is_some());

    let second = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new()),
            &mut CountingSurface::new(),
            &mut time,
        )
        .unwrap();
    assert!(first.artifact.is_revoked());
    assert!(first.artifact.get().is_none());
    assert!(second.artifact.get().is_some());
    assert!(!orch.artifact().unwrap().is_revoked());
}

#[test]
fn overlapping_activity_is_rejected() {
    let cfg = small_cfg(0.5);
    let (orch, _) = parts(&cfg);
    let guard = orch.claim(Activity::Capture).unwrap();
    let err = orch.claim(Activity::Preview).err().unwrap();
    assert!(matches!(err, StudioError::ConcurrentSessionRejected(_)));
    assert!(err.is_recoverable());
    assert!(orch.is_busy());
    drop(guard);
    assert!(orch.claim(Activity::Capture).is_ok());
}

#[test]
fn cancel_stops_capture_and_discards_output() {
    let cfg = small_cfg(2.0);
    let (orch, mut comp) = parts(&cfg);
    let tally = SinkTally::default();
    let sink = ScriptedSink {
        tally: tally.clone(),
        ..Default::default()
    };
    let mut surface = CountingSurface::new();
    surface.cancel_at = Some((5, orch.clone()));

    let err = orch
        .capture(&mut comp, Box::new(sink), &mut surface, &mut SteppedTime::new())
        .unwrap_err();
    assert!(matches!(err, StudioError::Cancelled(_)));
    assert_eq!(surface.frames, 6);
    assert_eq!(tally.pushed.lock().unwrap().len(), 6);
    assert!(tally.aborted.load(Ordering::SeqCst));
    assert_eq!(orch.status(), CaptureStatus::Failed);
    assert!(orch.artifact().is_none());
}

#[test]
fn progress_is_monotonic_during_capture() {
    let cfg = small_cfg(1.0);
    let (orch, mut comp) = parts(&cfg);
    let mut surface = CountingSurface::new();
    surface.cancel_at = Some((u64::MAX, orch.clone()));
    orch.capture(
        &mut comp,
        Box::new(InMemorySink::new()),
        &mut surface,
        &mut SteppedTime::new(),
    )
    .unwrap();
    assert!(surface.progress.windows(2).all(|w| w[1] >= w[0]));
    assert!(surface.progress.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn present_failures_never_abort_capture() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let mut surface = CountingSurface::new();
    surface.fail = true;
    let report = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new()),
            &mut surface,
            &mut SteppedTime::new(),
        )
        .unwrap();
    assert_eq!(report.present_failures, surface.frames);
    assert_eq!(report.session.status(), CaptureStatus::Done);
}

#[test]
fn slow_finalization_times_out_as_failure() {
    let mut cfg = small_cfg(0.2);
    cfg.finalize_timeout_ms = 20;
    let (orch, mut comp) = parts(&cfg);
    let sink = ScriptedSink {
        end_delay: Duration::from_millis(400),
        ..Default::default()
    };
    let err = orch
        .capture(
            &mut comp,
            Box::new(sink),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap_err();
    assert!(matches!(err, StudioError::Finalize(_)));
    assert_eq!(orch.status(), CaptureStatus::Failed);
    assert_eq!(
        orch.session().history().last(),
        Some(&CaptureStatus::Failed)
    );
    assert!(orch.session().history().contains(&CaptureStatus::Finalizing));
    assert!(orch.artifact().is_none());
}

#[test]
fn hung_finalizer_is_stopped_on_timeout() {
    let mut cfg = small_cfg(0.2);
    cfg.finalize_timeout_ms = 20;
    let (orch, mut comp) = parts(&cfg);
    let tally = SinkTally::default();
    let sink = ScriptedSink {
        tally: tally.clone(),
        hang_until_stopped: true,
        ..Default::default()
    };
    let err = orch
        .capture(
            &mut comp,
            Box::new(sink),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap_err();

    assert!(matches!(err, StudioError::Finalize(_)));
    assert!(tally.stopped.load(Ordering::SeqCst));
    assert_eq!(orch.status(), CaptureStatus::Failed);
    assert!(!orch.is_busy());
}

#[test]
fn grace_interval_is_waited_before_finalizing() {
    let mut cfg = small_cfg(0.5);
    cfg.grace_ms = 200;
    let (orch, mut comp) = parts(&cfg);
    let mut time = SteppedTime::new();
    orch.capture(
        &mut comp,
        Box::new(InMemorySink::new()),
        &mut CountingSurface::new(),
        &mut time,
    )
    .unwrap();
    assert!(time.now() >= Duration::from_millis(700));
}

#[test]
fn preview_runs_without_a_sink_or_session() {
    let cfg = small_cfg(0.5);
    let (orch, mut comp) = parts(&cfg);
    let mut surface = CountingSurface::new();
    let report = orch
        .preview(&mut comp, &mut surface, &mut SteppedTime::new())
        .unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.frames, surface.frames);
    assert!(report.frames >= 15);
    assert_eq!(orch.status(), CaptureStatus::Idle);
    assert!(orch.artifact().is_none());
}

#[test]
fn cancelled_preview_reports_partial_pass() {
    let cfg = small_cfg(2.0);
    let (orch, mut comp) = parts(&cfg);
    let mut surface = CountingSurface::new();
    surface.cancel_at = Some((3, orch.clone()));
    let report = orch
        .preview(&mut comp, &mut surface, &mut SteppedTime::new())
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.frames, 4);
}

#[test]
fn mismatched_compositor_duration_is_rejected() {
    let (orch, _) = parts(&small_cfg(1.0));
    let mut comp =
        FrameCompositor::without_fonts(&small_cfg(2.0), NarrationScript::room_213()).unwrap();
    let err = orch
        .capture(
            &mut comp,
            Box::new(InMemorySink::new()),
            &mut CountingSurface::new(),
            &mut SteppedTime::new(),
        )
        .unwrap_err();
    assert!(matches!(err, StudioError::Validation(_)));
    assert_eq!(orch.status(), CaptureStatus::Idle);
}
