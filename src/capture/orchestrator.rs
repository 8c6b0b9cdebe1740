use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::capture::session::{CaptureSession, CaptureStatus};
use crate::capture::surface::PresentSurface;
use crate::config::StudioConfig;
use crate::encode::artifact::{Artifact, ArtifactHandle};
use crate::encode::sink::{EncodingHint, FinalizeStop, FrameSink, SinkConfig};
use crate::foundation::core::Fps;
use crate::foundation::error::{StudioError, StudioResult};
use crate::render::compose::FrameCompositor;
use crate::render::frame::FrameRGBA;
use crate::timeline::clock::{FrameTick, Tick, TimelineClock};
use crate::timeline::time_source::TimeSource;

/// Outcome of a successful capture.
#[derive(Clone, Debug)]
pub struct CaptureReport {
    /// Final session snapshot (status `Done`).
    pub session: CaptureSession,
    /// Handle to the new artifact. Revoked when a later capture succeeds.
    pub artifact: ArtifactHandle,
    /// Frames the display surface failed to show.
    pub present_failures: u64,
}

/// Outcome of a preview pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreviewReport {
    /// Frames rendered and presented.
    pub frames: u64,
    /// Frames the display surface failed to show.
    pub present_failures: u64,
    /// Whether the pass was stopped early.
    pub cancelled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Activity {
    Capture,
    Preview,
}

impl Activity {
    fn name(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Preview => "preview",
        }
    }
}

struct Slot {
    session: CaptureSession,
    activity: Option<Activity>,
    artifact: Option<ArtifactHandle>,
    next_id: u64,
}

struct Shared {
    slot: Mutex<Slot>,
    cancel: AtomicBool,
}

#[derive(Default)]
struct LoopStats {
    frames: u64,
    present_failures: u64,
}

/// Drives the clock, compositor, display surface and recording sink through one pass.
///
/// Cheap to clone; clones share the session state, so another thread can watch `progress`,
/// call `cancel`, or be turned away while a pass is running. Only one capture or preview runs
/// at a time.
#[derive(Clone)]
pub struct CaptureOrchestrator {
    shared: Arc<Shared>,
    fps: Fps,
    duration: Duration,
    tolerance: Duration,
    grace: Duration,
    finalize_timeout: Duration,
    hint: EncodingHint,
    bitrate_bps: u64,
}

impl CaptureOrchestrator {
    /// Orchestrator for the timing and encoder settings in `cfg`.
    pub fn new(cfg: &StudioConfig) -> StudioResult<Self> {
        cfg.validate()?;
        TimelineClock::from_config(cfg)?;
        Ok(Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    session: CaptureSession::new(0),
                    activity: None,
                    artifact: None,
                    next_id: 1,
                }),
                cancel: AtomicBool::new(false),
            }),
            fps: cfg.fps(),
            duration: cfg.duration(),
            tolerance: cfg.frame_tolerance(),
            grace: cfg.grace(),
            finalize_timeout: cfg.finalize_timeout(),
            hint: EncodingHint::from_config(&cfg.encode),
            bitrate_bps: cfg.encode.bitrate_bps,
        })
    }

    /// Replace the codec preference used by later captures.
    pub fn with_hint(mut self, hint: EncodingHint) -> Self {
        self.hint = hint;
        self
    }

    /// Status of the current (or most recent) capture session.
    pub fn status(&self) -> CaptureStatus {
        self.slot().session.status()
    }

    /// Snapshot of the current (or most recent) capture session.
    pub fn session(&self) -> CaptureSession {
        self.slot().session.clone()
    }

    /// Capture progress in `[0, 1]`. Never decreases within a session.
    pub fn progress(&self) -> f64 {
        self.slot().session.progress()
    }

    /// Whether a capture or preview is running.
    pub fn is_busy(&self) -> bool {
        self.slot().activity.is_some()
    }

    /// The live artifact, if the last successful capture has not been superseded.
    pub fn artifact(&self) -> Option<ArtifactHandle> {
        self.slot()
            .artifact
            .as_ref()
            .filter(|h| !h.is_revoked())
            .cloned()
    }

    /// Ask the running pass to stop at its next yield point.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Release);
    }

    /// Record one full pass into `sink`.
    ///
    /// The sink readiness check, codec negotiation and `sink.begin` happen before the clock
    /// starts; if any of them fails no session is created. Any later failure marks the session
    /// `Failed`, aborts the sink and returns the error with no artifact.
    #[tracing::instrument(skip_all)]
    pub fn capture(
        &self,
        compositor: &mut FrameCompositor,
        mut sink: Box<dyn FrameSink>,
        surface: &mut dyn PresentSurface,
        time: &mut dyn TimeSource,
    ) -> StudioResult<CaptureReport> {
        let _busy = self.claim(Activity::Capture)?;
        self.check_compositor(compositor)?;
        let mut clock = self.clock()?;

        sink.check_ready()?;
        let codec = self.hint.negotiate(sink.as_ref())?;
        let canvas = compositor.canvas();
        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps,
            codec,
            bitrate_bps: self.bitrate_bps,
        })
        .map_err(|e| match e {
            StudioError::SinkOpen(_) | StudioError::UnsupportedEncoding(_) => e,
            other => StudioError::sink_open(other.to_string()),
        })?;

        let id = {
            let mut slot = self.slot();
            let id = slot.next_id;
            slot.next_id += 1;
            let mut session = CaptureSession::new(id);
            session.begin_recording(codec, time.now())?;
            slot.session = session;
            id
        };
        tracing::info!(
            session = id,
            %codec,
            width = canvas.width,
            height = canvas.height,
            "capture started"
        );

        clock.start(time.now());
        let mut stats = LoopStats::default();
        let recorded = self.run_clock(
            &mut clock,
            compositor,
            surface,
            time,
            &mut stats,
            |tick, frame| {
                sink.push_frame(tick.index, frame)?;
                self.slot().session.record_frame(tick.progress);
                Ok(())
            },
        );
        if let Err(e) = recorded {
            return Err(self.fail(sink.as_mut(), e));
        }

        self.slot().session.advance(CaptureStatus::Finalizing)?;
        tracing::info!(session = id, frames = stats.frames, "capture finalizing");
        time.sleep(self.grace);
        if self.cancel_requested() {
            return Err(self.fail(
                sink.as_mut(),
                StudioError::cancelled("stopped before finalization"),
            ));
        }

        let artifact = match finalize_with_timeout(sink, self.finalize_timeout) {
            Ok(artifact) => artifact,
            Err(e) => {
                self.slot().session.fail(&e);
                tracing::warn!(session = id, error = %e, "capture failed; no artifact produced");
                return Err(e);
            }
        };

        let handle = ArtifactHandle::new(artifact);
        let session = {
            let mut slot = self.slot();
            if let Some(previous) = slot.artifact.take() {
                previous.revoke();
            }
            slot.artifact = Some(handle.clone());
            slot.session.complete()?;
            slot.session.clone()
        };
        tracing::info!(
            session = id,
            frames = session.frames_pushed(),
            present_failures = stats.present_failures,
            "capture done"
        );
        Ok(CaptureReport {
            session,
            artifact: handle,
            present_failures: stats.present_failures,
        })
    }

    /// Play one pass to `surface` only. Cancellation ends the pass early without an error.
    #[tracing::instrument(skip_all)]
    pub fn preview(
        &self,
        compositor: &mut FrameCompositor,
        surface: &mut dyn PresentSurface,
        time: &mut dyn TimeSource,
    ) -> StudioResult<PreviewReport> {
        let _busy = self.claim(Activity::Preview)?;
        self.check_compositor(compositor)?;
        let mut clock = self.clock()?;

        tracing::info!("preview started");
        clock.start(time.now());
        let mut stats = LoopStats::default();
        let cancelled = match self.run_clock(
            &mut clock,
            compositor,
            surface,
            time,
            &mut stats,
            |_, _| Ok(()),
        ) {
            Ok(()) => false,
            Err(StudioError::Cancelled(_)) => true,
            Err(e) => return Err(e),
        };
        tracing::info!(frames = stats.frames, cancelled, "preview finished");
        Ok(PreviewReport {
            frames: stats.frames,
            present_failures: stats.present_failures,
            cancelled,
        })
    }

    fn run_clock(
        &self,
        clock: &mut TimelineClock,
        compositor: &mut FrameCompositor,
        surface: &mut dyn PresentSurface,
        time: &mut dyn TimeSource,
        stats: &mut LoopStats,
        mut on_frame: impl FnMut(&FrameTick, &FrameRGBA) -> StudioResult<()>,
    ) -> StudioResult<()> {
        let per_second = u64::from((self.fps.num / self.fps.den).max(1));
        loop {
            if self.cancel_requested() {
                clock.stop();
                return Err(StudioError::cancelled(format!(
                    "stopped after {} frames",
                    stats.frames
                )));
            }
            let tick = match clock.poll(time.now()) {
                Tick::Wait(d) => {
                    time.sleep(d);
                    continue;
                }
                Tick::Complete => return Ok(()),
                Tick::Frame(tick) => tick,
            };

            let frame = match compositor.compose(tick.time) {
                Ok(frame) => frame,
                Err(e) => {
                    clock.stop();
                    return Err(e);
                }
            };
            if let Err(e) = surface.present(&tick, &frame) {
                stats.present_failures += 1;
                if stats.present_failures == 1 {
                    tracing::warn!(frame = tick.index.0, error = %e, "present failed; continuing");
                } else {
                    tracing::debug!(frame = tick.index.0, error = %e, "present failed");
                }
            }
            if let Err(e) = on_frame(&tick, &frame) {
                clock.stop();
                return Err(e);
            }
            stats.frames += 1;
            if tick.index.0.is_multiple_of(per_second) {
                tracing::debug!(
                    frame = tick.index.0,
                    t = tick.time.secs(),
                    progress = tick.progress,
                    "tick"
                );
            }
        }
    }

    fn fail(&self, sink: &mut dyn FrameSink, err: StudioError) -> StudioError {
        sink.abort();
        let id = {
            let mut slot = self.slot();
            slot.session.fail(&err);
            slot.session.id()
        };
        tracing::warn!(session = id, error = %err, "capture failed; no artifact produced");
        err
    }

    fn claim(&self, activity: Activity) -> StudioResult<ActivityGuard<'_>> {
        let mut slot = self.slot();
        if let Some(current) = slot.activity {
            return Err(StudioError::concurrent(format!(
                "cannot start {} while a {} is running",
                activity.name(),
                current.name()
            )));
        }
        slot.activity = Some(activity);
        self.shared.cancel.store(false, Ordering::Release);
        Ok(ActivityGuard {
            shared: &self.shared,
        })
    }

    fn check_compositor(&self, compositor: &FrameCompositor) -> StudioResult<()> {
        let want = self.duration.as_secs_f64();
        if (compositor.duration() - want).abs() > 1e-6 {
            return Err(StudioError::validation(format!(
                "compositor duration {}s does not match capture duration {want}s",
                compositor.duration()
            )));
        }
        Ok(())
    }

    fn clock(&self) -> StudioResult<TimelineClock> {
        TimelineClock::new(self.fps, self.duration, self.tolerance)
    }

    fn cancel_requested(&self) -> bool {
        self.shared.cancel.load(Ordering::Acquire)
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct ActivityGuard<'a> {
    shared: &'a Shared,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .activity = None;
    }
}

/// How long a stopped finalizer gets to kill its backend and clean up after a timeout.
const STOP_WAIT: Duration = Duration::from_secs(2);

/// Run `sink.end()` off-thread, giving up after `timeout`.
///
/// On timeout the sink's [`FinalizeStop`] is raised and the finalizer gets [`STOP_WAIT`] to
/// wind down. A finalizer that outlives both discards its artifact when it eventually returns.
fn finalize_with_timeout(
    mut sink: Box<dyn FrameSink>,
    timeout: Duration,
) -> StudioResult<Artifact> {
    let stop: Option<FinalizeStop> = sink.finalize_stop();
    let (tx, rx) = mpsc::channel();
    let abandoned = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&abandoned);

    std::thread::Builder::new()
        .name("room213-finalize".to_string())
        .spawn(move || {
            let result = sink.end();
            let gone = flag.lock().unwrap_or_else(PoisonError::into_inner);
            if *gone {
                if let Ok(artifact) = result {
                    artifact.discard();
                }
            } else {
                let _ = tx.send(result);
            }
        })
        .map_err(|e| StudioError::finalize(format!("spawn finalizer thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            let mut late = stop.and_then(|stop| {
                stop.stop();
                rx.recv_timeout(STOP_WAIT).ok()
            });
            *abandoned.lock().unwrap_or_else(PoisonError::into_inner) = true;
            if late.is_none() {
                late = rx.try_recv().ok();
            }
            if let Some(Ok(artifact)) = late {
                artifact.discard();
            }
            Err(StudioError::finalize(format!(
                "sink did not finish within {} ms",
                timeout.as_millis()
            )))
        }
        Err(RecvTimeoutError::Disconnected) => Err(StudioError::finalize(
            "finalizer exited without a result",
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/orchestrator.rs"]
mod tests;
