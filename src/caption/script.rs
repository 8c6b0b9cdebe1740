use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{StudioError, StudioResult};

const ROOM_213_LINES: [&str; 27] = [
    "I shouldn't have taken room two-thirteen.",
    "The hallway smells like bleach and something older.",
    "The carpet sighs under my shoes as I reach the door.",
    "Room two-thirteen blinks at me, brass numbers dull, as if tired of being noticed.",
    "The key slides, the lock resists, then gives, like a held breath finally exhaled.",
    "Inside is colder than the corridor. The air tastes metallic.",
    "There's a hum I can't place, low and steady, between the walls.",
    "The bathroom mirror carries a thin film, fingerprints from a hand not quite human.",
    "I whisper hello, to no one. Something whispers back, but it's my voice, too slow.",
    "The lights flicker. The hum turns into a throat clearing in the ceiling.",
    "I step toward the bed. Shadows move where my feet don't.",
    "The numbers two and thirteen are on the alarm clock, even though it's midnight.",
    "The door closes by itself, a soft click that sounds final.",
    "The hum stops. The room listens.",
    "In the silence I hear someone breathing, inside my ear, inside my head.",
    "I turn. In the window, my reflection is a half step late.",
    "It smiles before I do.",
    "I don't remember teaching it that.",
    "Something sits on the mattress. The springs don't move.",
    "I reach for the lamp. My hand goes through the switch like water.",
    "A whisper threads the dark: welcome back.",
    "I run for the door. The handle is warm, like a mouth.",
    "The brass numbers outside are reversed: three-one-two.",
    "There's no hallway. Only another door. Mine.",
    "I knock from inside. I hear knuckles on the other side.",
    "Room two-thirteen inhales.",
    "And the lights finally go out.",
];

/// Ordered, immutable caption lines.
///
/// Always holds at least one line and no blank lines; checked once at construction so nothing
/// can fail per frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrationScript {
    lines: Vec<String>,
}

impl NarrationScript {
    /// Validate and wrap `lines`. Surrounding whitespace is trimmed.
    pub fn new<I, S>(lines: I) -> StudioResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for (i, line) in lines.into_iter().enumerate() {
            let line: String = line.into();
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return Err(StudioError::validation(format!("script line {i} is blank")));
            }
            out.push(trimmed.to_string());
        }
        if out.is_empty() {
            return Err(StudioError::validation("script must have at least one line"));
        }
        Ok(Self { lines: out })
    }

    /// The built-in "Room 213" narration.
    pub fn room_213() -> Self {
        Self {
            lines: ROOM_213_LINES.iter().map(|l| (*l).to_string()).collect(),
        }
    }

    /// Parse a script file: a JSON array of strings, or plain text with one line per row.
    ///
    /// Blank rows in plain text are skipped; blank JSON entries are rejected.
    pub fn from_path(path: impl AsRef<Path>) -> StudioResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read script '{}'", path.display()))?;
        Self::parse(&text)
    }

    /// Parse script text; see [`NarrationScript::from_path`].
    pub fn parse(text: &str) -> StudioResult<Self> {
        if text.trim_start().starts_with('[') {
            let lines: Vec<String> = serde_json::from_str(text)
                .map_err(|e| StudioError::validation(format!("parse script JSON: {e}")))?;
            return Self::new(lines);
        }
        Self::new(text.lines().filter(|l| !l.trim().is_empty()))
    }

    /// Lines in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines (always >= 1).
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line `i`, clamped to the last line.
    pub fn line(&self, i: usize) -> &str {
        let i = i.min(self.lines.len().saturating_sub(1));
        &self.lines[i]
    }

    /// All lines joined with single spaces, as spoken.
    pub fn combined(&self) -> String {
        self.lines.join(" ")
    }

    /// Whitespace-separated word count of the spoken text.
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|l| l.split_whitespace().count()).sum()
    }
}

impl Default for NarrationScript {
    fn default() -> Self {
        Self::room_213()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/caption/script.rs"]
mod tests;
