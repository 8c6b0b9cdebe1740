//! Timeline clock.
//!
//! Converts monotonic time into scene time at the target frame rate.

/// Frame-gating clock.
pub mod clock;
/// Monotonic and virtual time sources.
pub mod time_source;
