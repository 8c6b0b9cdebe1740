/// Narrator trait, the espeak-ng narrator and a silent one.
pub mod espeak;
/// Speech rate, pitch and volume for a script.
pub mod plan;
/// Voice selection.
pub mod voice;
