/// Core value types (canvas, time, colour).
pub mod core;
/// Crate error type.
pub mod error;
pub(crate) mod math;
