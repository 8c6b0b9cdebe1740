use std::time::Duration;

use crate::config::StudioConfig;
use crate::foundation::core::{Fps, FrameIndex, SceneTime};
use crate::foundation::error::{StudioError, StudioResult};

/// One accepted frame request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Sequential index among accepted frames.
    pub index: FrameIndex,
    /// Scene time to render, clamped to `[0, duration]`.
    pub time: SceneTime,
    /// `time / duration`, in `[0, 1]`.
    pub progress: f64,
}

/// Result of polling the clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tick {
    /// Render and deliver this frame now.
    Frame(FrameTick),
    /// Too early for the next frame; yield for roughly this long.
    Wait(Duration),
    /// The pass is over (naturally or via `stop`).
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClockState {
    Idle,
    Running,
    Complete,
    Stopped,
}

/// Converts monotonic ticks into scene time at a fixed target frame rate.
///
/// A frame is accepted once at least `interval - tolerance` has passed since the previous
/// accepted frame. Accepted times are strictly increasing; the last one is exactly `duration`.
#[derive(Clone, Debug)]
pub struct TimelineClock {
    interval: Duration,
    tolerance: Duration,
    duration: Duration,
    state: ClockState,
    started_at: Duration,
    last_accepted: Option<Duration>,
    last_time: Option<f64>,
    accepted: u64,
}

impl TimelineClock {
    /// Create a clock for `duration` at `fps`.
    pub fn new(fps: Fps, duration: Duration, tolerance: Duration) -> StudioResult<Self> {
        let fps = Fps::new(fps.num, fps.den)?;
        if duration.is_zero() {
            return Err(StudioError::validation("clock duration must be > 0"));
        }
        // Rounded up so `n` intervals never fall just short of `n` frame periods.
        let interval = Duration::from_nanos(
            (1_000_000_000 * u64::from(fps.den)).div_ceil(u64::from(fps.num)),
        );
        if tolerance >= interval {
            return Err(StudioError::validation(
                "clock tolerance must be smaller than one frame interval",
            ));
        }
        Ok(Self {
            interval,
            tolerance,
            duration,
            state: ClockState::Idle,
            started_at: Duration::ZERO,
            last_accepted: None,
            last_time: None,
            accepted: 0,
        })
    }

    /// Clock configured from a [`StudioConfig`].
    pub fn from_config(cfg: &StudioConfig) -> StudioResult<Self> {
        Self::new(cfg.fps(), cfg.duration(), cfg.frame_tolerance())
    }

    /// Anchor scene time zero at `now`.
    pub fn start(&mut self, now: Duration) {
        self.state = ClockState::Running;
        self.started_at = now;
        self.last_accepted = None;
        self.last_time = None;
        self.accepted = 0;
    }

    /// Halt the clock; every later poll returns [`Tick::Complete`].
    pub fn stop(&mut self) {
        if self.state != ClockState::Complete {
            self.state = ClockState::Stopped;
        }
    }

    /// Whether the pass reached `duration`.
    pub fn is_complete(&self) -> bool {
        self.state == ClockState::Complete
    }

    /// Whether the clock was halted before reaching `duration`.
    pub fn is_stopped(&self) -> bool {
        self.state == ClockState::Stopped
    }

    /// Frames accepted so far.
    pub fn accepted_frames(&self) -> u64 {
        self.accepted
    }

    /// Nominal interval between frames.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Decide whether a frame should be produced at monotonic time `now`.
    ///
    /// Polling an idle clock starts it at `now`.
    pub fn poll(&mut self, now: Duration) -> Tick {
        match self.state {
            ClockState::Complete | ClockState::Stopped => return Tick::Complete,
            ClockState::Idle => self.start(now),
            ClockState::Running => {}
        }

        // A source that steps backwards is treated as standing still.
        let now = now.max(self.last_accepted.unwrap_or(self.started_at));

        if let Some(last) = self.last_accepted {
            let since = now - last;
            if since + self.tolerance < self.interval {
                return Tick::Wait(self.interval - since);
            }
        }

        let duration_secs = self.duration.as_secs_f64();
        let mut secs = now
            .saturating_sub(self.started_at)
            .as_secs_f64()
            .min(duration_secs);
        // A frame within tolerance of the end is the final frame, not one more before it.
        if duration_secs - secs <= self.tolerance.as_secs_f64() {
            secs = duration_secs;
        }

        if let Some(prev) = self.last_time
            && secs <= prev
        {
            if prev >= duration_secs {
                self.state = ClockState::Complete;
                return Tick::Complete;
            }
            return Tick::Wait(self.interval);
        }

        let index = FrameIndex(self.accepted);
        self.accepted += 1;
        self.last_accepted = Some(now);
        self.last_time = Some(secs);
        if secs >= duration_secs {
            self.state = ClockState::Complete;
        }

        let time = SceneTime::clamped(secs, duration_secs);
        Tick::Frame(FrameTick {
            index,
            time,
            progress: time.progress(duration_secs),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/clock.rs"]
mod tests;
