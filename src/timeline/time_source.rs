use std::time::{Duration, Instant};

/// Monotonic time plus the cooperative yield point used between frames.
///
/// `sleep` is the only place a capture loop suspends; cancellation is checked around it.
pub trait TimeSource: Send {
    /// Time elapsed since this source was created.
    fn now(&self) -> Duration;
    /// Yield for (approximately) `d`.
    fn sleep(&mut self, d: Duration);
}

/// Wall-clock time anchored to an `Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicTime {
    epoch: Instant,
}

impl MonotonicTime {
    /// Anchor a new source at the current instant.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::start()
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&mut self, d: Duration) {
        if !d.is_zero() {
            std::thread::sleep(d);
        }
    }
}

/// Virtual time that only moves when the loop sleeps.
///
/// Drives offline captures and tests: the frame schedule matches a real-time pass, but nothing
/// actually waits.
#[derive(Debug, Clone, Default)]
pub struct SteppedTime {
    now: Duration,
    jitter: Duration,
}

impl SteppedTime {
    /// Virtual clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed oversleep to every `sleep`, mimicking a late scheduler.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Move time forward without going through `sleep`.
    pub fn advance(&mut self, d: Duration) {
        self.now += d;
    }
}

impl TimeSource for SteppedTime {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, d: Duration) {
        self.now += d + self.jitter;
    }
}
