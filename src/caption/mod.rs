//! Narration script and time-aligned captions.

/// Narration script.
pub mod script;
/// Caption segmenter and word wrap.
pub mod segment;
