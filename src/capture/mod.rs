/// Capture orchestrator: clock, compositor, surface and sink in one pass.
pub mod orchestrator;
/// Capture session state machine.
pub mod session;
/// Live display surfaces.
pub mod surface;
