/// Finished recordings and the single-artifact handle.
pub mod artifact;
/// `ffmpeg`-backed WebM sink.
pub mod ffmpeg;
/// Sink trait, codec negotiation and the in-memory sink.
pub mod sink;
