use crate::caption::script::NarrationScript;
use crate::foundation::error::{StudioError, StudioResult};

/// Average speaking speed at rate 1.0 (about 180 words per minute).
pub const WORDS_PER_SEC_AT_RATE_1: f64 = 3.0;
/// Slowest rate the narrator will be asked for.
pub const MIN_RATE: f64 = 0.6;
/// Fastest rate the narrator will be asked for.
pub const MAX_RATE: f64 = 1.4;
/// Narration pitch, relative to the voice default.
pub const PITCH: f64 = 0.9;
/// Narration volume.
pub const VOLUME: f64 = 1.0;

/// espeak-ng speed at rate 1.0, in words per minute.
const ESPEAK_BASE_WPM: f64 = 175.0;
/// espeak-ng pitch at relative pitch 1.0 (range 0..=99).
const ESPEAK_BASE_PITCH: f64 = 50.0;
/// espeak-ng amplitude at volume 1.0 (range 0..=200).
const ESPEAK_BASE_AMPLITUDE: f64 = 100.0;

/// Speech rate that stretches `words` over roughly `target_secs`, clamped to `[0.6, 1.4]`.
pub fn speech_rate(words: usize, target_secs: f64) -> f64 {
    let est_secs_at_rate_1 = words as f64 / WORDS_PER_SEC_AT_RATE_1;
    (est_secs_at_rate_1 / target_secs).clamp(MIN_RATE, MAX_RATE)
}

/// Everything a narrator needs to speak the script once.
///
/// Visual timing never depends on this; the scene runs on its own clock.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct NarrationPlan {
    /// Text to speak, all lines joined.
    pub text: String,
    /// Word count of `text`.
    pub words: usize,
    /// Duration the narration should roughly fill.
    pub target_secs: f64,
    /// Relative speech rate.
    pub rate: f64,
    /// Relative pitch.
    pub pitch: f64,
    /// Volume in `[0, 1]`.
    pub volume: f64,
}

impl NarrationPlan {
    /// Plan for speaking `script` over `target_secs`.
    pub fn new(script: &NarrationScript, target_secs: f64) -> StudioResult<Self> {
        if !target_secs.is_finite() || target_secs <= 0.0 {
            return Err(StudioError::validation(
                "narration target duration must be finite and > 0",
            ));
        }
        let words = script.word_count();
        Ok(Self {
            text: script.combined(),
            words,
            target_secs,
            rate: speech_rate(words, target_secs),
            pitch: PITCH,
            volume: VOLUME,
        })
    }

    /// Expected spoken length at the planned rate.
    pub fn estimated_secs(&self) -> f64 {
        self.words as f64 / (WORDS_PER_SEC_AT_RATE_1 * self.rate)
    }

    /// `-s` argument for espeak-ng.
    pub fn espeak_words_per_minute(&self) -> u32 {
        (ESPEAK_BASE_WPM * self.rate).round() as u32
    }

    /// `-p` argument for espeak-ng.
    pub fn espeak_pitch(&self) -> u32 {
        (ESPEAK_BASE_PITCH * self.pitch).round().clamp(0.0, 99.0) as u32
    }

    /// `-a` argument for espeak-ng.
    pub fn espeak_amplitude(&self) -> u32 {
        (ESPEAK_BASE_AMPLITUDE * self.volume).round().clamp(0.0, 200.0) as u32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/narration/plan.rs"]
mod tests;
