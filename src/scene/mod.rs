//! Scene choreography.
//!
//! Maps scene time to phases and to the geometry/opacity of every layer.

/// Named time intervals.
pub mod phase;
/// Per-time scene evaluation.
pub mod state;
