//! Room 213 is a procedural 9:16 horror short: a 60 second scene rendered frame by frame from
//! a single time parameter, captioned from a narration script and captured into a WebM.
//!
//! The public API follows the pipeline:
//!
//! - Evaluate and rasterize the scene at a [`SceneTime`] with a [`FrameCompositor`]
//! - Drive one real-time (or virtual-time) pass with a [`CaptureOrchestrator`]
//! - Stream frames into a [`FrameSink`] and collect the finished [`Artifact`]
//! - Optionally start spoken narration through a [`Narrator`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Capture sessions, display surfaces and the orchestrator.
pub mod capture;
/// Narration script and caption layout.
pub mod caption;
/// Studio configuration.
pub mod config;
/// Recording sinks and artifacts.
pub mod encode;
/// Narration planning and text-to-speech boundary.
pub mod narration;
/// Rasterization, noise and frame composition.
pub mod render;
/// Phase classification and per-time scene evaluation.
pub mod scene;
/// Timeline clock and time sources.
pub mod timeline;

pub use crate::foundation::core::{
    Affine, BezPath, Canvas, DESIGN_HEIGHT, DESIGN_WIDTH, Fps, FrameIndex, Point, Rect,
    Rgba8Premul, SceneTime, Vec2,
};
pub use crate::foundation::error::{StudioError, StudioResult};

pub use crate::caption::script::NarrationScript;
pub use crate::caption::segment::{CaptionLayout, CaptionSegmenter, CaptionStyle};
pub use crate::capture::orchestrator::{CaptureOrchestrator, CaptureReport, PreviewReport};
pub use crate::capture::session::{CaptureSession, CaptureStatus};
pub use crate::capture::surface::{NullSurface, PngPreviewSurface, PresentSurface};
pub use crate::config::StudioConfig;
pub use crate::encode::artifact::{Artifact, ArtifactHandle, ArtifactPayload};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{
    Codec, EncodingHint, FinalizeStop, FrameSink, InMemorySink, SinkConfig,
};
pub use crate::narration::espeak::{EspeakNarrator, Narrator, NullNarrator, start_narration};
pub use crate::narration::plan::NarrationPlan;
pub use crate::render::compose::FrameCompositor;
pub use crate::render::cpu::SceneRenderer;
pub use crate::render::frame::FrameRGBA;
pub use crate::render::text::LoadedFont;
pub use crate::scene::phase::Phase;
pub use crate::scene::state::SceneState;
pub use crate::timeline::clock::{FrameTick, Tick, TimelineClock};
pub use crate::timeline::time_source::{MonotonicTime, SteppedTime, TimeSource};
