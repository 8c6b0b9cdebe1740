/// Convenience result type used across room213.
pub type StudioResult<T> = Result<T, StudioError>;

/// Top-level error type for room213.
#[derive(thiserror::Error, Debug)]
pub enum StudioError {
    /// Invalid configuration or script, detected at construction time.
    #[error("validation error: {0}")]
    Validation(String),

    /// A scene time outside `[0, DURATION]` (or non-finite) was supplied.
    #[error("invalid time input: {0}")]
    InvalidTimeInput(String),

    /// Rasterization failed.
    #[error("render error: {0}")]
    Render(String),

    /// No acceptable codec is available to the recording sink.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The recording sink could not be opened.
    #[error("sink open failure: {0}")]
    SinkOpen(String),

    /// The recording sink rejected a frame mid-session.
    #[error("sink write failure: {0}")]
    SinkWrite(String),

    /// The recording sink failed to produce an artifact, or did not finish in time.
    #[error("finalize failure: {0}")]
    Finalize(String),

    /// A capture was requested while another one is still active.
    #[error("concurrent session rejected: {0}")]
    ConcurrentSessionRejected(String),

    /// The capture was cancelled before completion.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Catch-all for IO and context-wrapped errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StudioError {
    /// Build a [`StudioError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StudioError::InvalidTimeInput`].
    pub fn invalid_time(msg: impl Into<String>) -> Self {
        Self::InvalidTimeInput(msg.into())
    }

    /// Build a [`StudioError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`StudioError::UnsupportedEncoding`].
    pub fn unsupported_encoding(msg: impl Into<String>) -> Self {
        Self::UnsupportedEncoding(msg.into())
    }

    /// Build a [`StudioError::SinkOpen`].
    pub fn sink_open(msg: impl Into<String>) -> Self {
        Self::SinkOpen(msg.into())
    }

    /// Build a [`StudioError::SinkWrite`].
    pub fn sink_write(msg: impl Into<String>) -> Self {
        Self::SinkWrite(msg.into())
    }

    /// Build a [`StudioError::Finalize`].
    pub fn finalize(msg: impl Into<String>) -> Self {
        Self::Finalize(msg.into())
    }

    /// Build a [`StudioError::ConcurrentSessionRejected`].
    pub fn concurrent(msg: impl Into<String>) -> Self {
        Self::ConcurrentSessionRejected(msg.into())
    }

    /// Build a [`StudioError::Cancelled`].
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Whether the caller may retry the same request later.
    ///
    /// Only a rejected concurrent session is recoverable; everything else aborts the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ConcurrentSessionRejected(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
