/// Voices tried first, by exact name.
pub const PREFERRED_VOICES: [&str; 4] = [
    "Google UK English Male",
    "Google US English",
    "Microsoft Aria Online (Natural) - English (United States)",
    "Microsoft Guy Online (Natural) - English (United States)",
];

/// A voice offered by a narrator.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct VoiceInfo {
    /// Display name.
    pub name: String,
    /// BCP 47-ish language tag, e.g. `en-gb`.
    pub lang: String,
}

impl VoiceInfo {
    /// Build a voice entry.
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    /// Whether the language tag is English.
    pub fn is_english(&self) -> bool {
        self.lang.to_ascii_lowercase().starts_with("en")
    }
}

/// Pick a voice: the first preferred name present, else any English voice, else the first.
pub fn choose_voice(voices: &[VoiceInfo]) -> Option<&VoiceInfo> {
    PREFERRED_VOICES
        .iter()
        .find_map(|name| voices.iter().find(|v| v.name == *name))
        .or_else(|| voices.iter().find(|v| v.is_english()))
        .or_else(|| voices.first())
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// Rows look like ` 5  en-gb  --/M  English_(Great_Britain)  gmw/en  (en 2)`; underscores in
/// names stand for spaces.
pub fn parse_espeak_voices(listing: &str) -> Vec<VoiceInfo> {
    listing
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            match cols.as_slice() {
                [_pty, lang, _age_gender, name, ..] => {
                    Some(VoiceInfo::new(name.replace('_', " "), *lang))
                }
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/narration/voice.rs"]
mod tests;
