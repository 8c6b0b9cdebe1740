use std::time::Duration;

use crate::encode::sink::Codec;
use crate::foundation::error::{StudioError, StudioResult};

/// Lifecycle of one capture session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    /// No session has run yet.
    Idle,
    /// Frames are being produced and pushed to the sink.
    Recording,
    /// The clock is done; waiting for the sink to produce the artifact.
    Finalizing,
    /// An artifact was produced.
    Done,
    /// The session ended without an artifact.
    Failed,
}

impl CaptureStatus {
    /// Lowercase name, as logged.
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether a session in this state still owns the sink.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Recording | Self::Finalizing)
    }

    /// Whether `self -> next` is a legal step within one session.
    pub fn can_advance_to(self, next: CaptureStatus) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Recording)
                | (Self::Recording, Self::Finalizing)
                | (Self::Recording, Self::Failed)
                | (Self::Finalizing, Self::Done)
                | (Self::Finalizing, Self::Failed)
        )
    }
}

impl std::fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Transient record of one capture attempt.
///
/// Returned by value as a snapshot; only the orchestrator advances it.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSession {
    id: u64,
    status: CaptureStatus,
    history: Vec<CaptureStatus>,
    started_at: Option<Duration>,
    codec: Option<Codec>,
    frames_pushed: u64,
    progress: f64,
    error: Option<String>,
}

impl CaptureSession {
    /// Fresh session in `Idle`.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            status: CaptureStatus::Idle,
            history: vec![CaptureStatus::Idle],
            started_at: None,
            codec: None,
            frames_pushed: 0,
            progress: 0.0,
            error: None,
        }
    }

    /// Sequential id, starting at 1 for the first real session.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current status.
    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    /// Every status this session has been in, in order.
    pub fn history(&self) -> &[CaptureStatus] {
        &self.history
    }

    /// Time-source reading when recording began.
    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    /// Codec negotiated for this session.
    pub fn codec(&self) -> Option<Codec> {
        self.codec
    }

    /// Frames the sink accepted.
    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    /// `time / duration` of the last accepted frame. Never decreases.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Error that failed the session.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn begin_recording(&mut self, codec: Codec, now: Duration) -> StudioResult<()> {
        self.advance(CaptureStatus::Recording)?;
        self.codec = Some(codec);
        self.started_at = Some(now);
        Ok(())
    }

    pub(crate) fn advance(&mut self, next: CaptureStatus) -> StudioResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(StudioError::validation(format!(
                "illegal capture transition {} -> {next}",
                self.status
            )));
        }
        self.status = next;
        self.history.push(next);
        Ok(())
    }

    pub(crate) fn record_frame(&mut self, progress: f64) {
        self.frames_pushed += 1;
        self.progress = self.progress.max(progress.clamp(0.0, 1.0));
    }

    pub(crate) fn complete(&mut self) -> StudioResult<()> {
        self.advance(CaptureStatus::Done)?;
        self.progress = 1.0;
        Ok(())
    }

    pub(crate) fn fail(&mut self, err: &StudioError) {
        if self.status.is_active() {
            self.status = CaptureStatus::Failed;
            self.history.push(CaptureStatus::Failed);
        }
        self.error = Some(err.to_string());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/session.rs"]
mod tests;
