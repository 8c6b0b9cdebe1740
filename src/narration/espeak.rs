use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::Context as _;

use crate::caption::script::NarrationScript;
use crate::foundation::error::{StudioError, StudioResult};
use crate::narration::plan::NarrationPlan;
use crate::narration::voice::{VoiceInfo, choose_voice, parse_espeak_voices};

/// Spoken-audio playback. Fire and forget: nothing here feeds back into rendering.
pub trait Narrator: Send {
    /// Voices this narrator can use.
    fn voices(&mut self) -> Vec<VoiceInfo>;
    /// Start speaking `plan`, cancelling anything already playing.
    fn speak(&mut self, plan: &NarrationPlan, voice: Option<&VoiceInfo>) -> StudioResult<()>;
    /// Stop playback.
    fn stop(&mut self);
}

/// Plan the script for `target_secs`, pick a voice and start speaking.
pub fn start_narration(
    narrator: &mut dyn Narrator,
    script: &NarrationScript,
    target_secs: f64,
) -> StudioResult<NarrationPlan> {
    let plan = NarrationPlan::new(script, target_secs)?;
    let voices = narrator.voices();
    let voice = choose_voice(&voices);
    tracing::info!(
        words = plan.words,
        rate = plan.rate,
        voice = voice.map(|v| v.name.as_str()).unwrap_or("default"),
        "narration starting"
    );
    narrator.speak(&plan, voice)?;
    Ok(plan)
}

/// Narrator that speaks nothing and remembers what it was asked to say.
#[derive(Debug, Default, Clone)]
pub struct NullNarrator {
    voices: Vec<VoiceInfo>,
    spoken: Vec<(NarrationPlan, Option<VoiceInfo>)>,
    stops: u32,
}

impl NullNarrator {
    /// Narrator with no voices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrator offering `voices`.
    pub fn with_voices(voices: Vec<VoiceInfo>) -> Self {
        Self {
            voices,
            ..Self::default()
        }
    }

    /// Every `speak` call, in order.
    pub fn spoken(&self) -> &[(NarrationPlan, Option<VoiceInfo>)] {
        &self.spoken
    }

    /// Number of `stop` calls, including the implicit one at the start of `speak`.
    pub fn stops(&self) -> u32 {
        self.stops
    }
}

impl Narrator for NullNarrator {
    fn voices(&mut self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn speak(&mut self, plan: &NarrationPlan, voice: Option<&VoiceInfo>) -> StudioResult<()> {
        self.stop();
        self.spoken.push((plan.clone(), voice.cloned()));
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

/// Narrator backed by the `espeak-ng` binary.
///
/// Plays through the default audio device, or writes a WAV file instead when `wav_out` is set.
pub struct EspeakNarrator {
    bin: PathBuf,
    wav_out: Option<PathBuf>,
    child: Option<Child>,
}

impl EspeakNarrator {
    /// Narrator using `espeak-ng` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("espeak-ng")
    }

    /// Narrator using a specific binary.
    pub fn with_binary(bin: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            wav_out: None,
            child: None,
        }
    }

    /// Write speech to `path` instead of playing it.
    pub fn writing_wav(mut self, path: impl Into<PathBuf>) -> Self {
        self.wav_out = Some(path.into());
        self
    }

    /// Binary in use.
    pub fn binary(&self) -> &Path {
        &self.bin
    }

    /// Block until the current utterance finishes.
    pub fn wait(&mut self) -> StudioResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().context("wait for espeak-ng")?;
        if !status.success() {
            return Err(StudioError::Other(anyhow::anyhow!(
                "espeak-ng exited with status {status}"
            )));
        }
        Ok(())
    }

    fn command(&self, plan: &NarrationPlan, voice: Option<&VoiceInfo>) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(voice) = voice {
            cmd.args(["-v", &voice.lang]);
        }
        cmd.args([
            "-s",
            &plan.espeak_words_per_minute().to_string(),
            "-p",
            &plan.espeak_pitch().to_string(),
            "-a",
            &plan.espeak_amplitude().to_string(),
        ]);
        if let Some(wav) = &self.wav_out {
            cmd.arg("-w").arg(wav);
        }
        cmd.arg("--stdin");
        cmd
    }
}

impl Default for EspeakNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Narrator for EspeakNarrator {
    fn voices(&mut self) -> Vec<VoiceInfo> {
        match Command::new(&self.bin)
            .arg("--voices")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(out) if out.status.success() => {
                parse_espeak_voices(&String::from_utf8_lossy(&out.stdout))
            }
            Ok(out) => {
                tracing::warn!(status = %out.status, "espeak-ng voice listing failed");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(bin = %self.bin.display(), error = %e, "espeak-ng not available");
                Vec::new()
            }
        }
    }

    fn speak(&mut self, plan: &NarrationPlan, voice: Option<&VoiceInfo>) -> StudioResult<()> {
        self.stop();
        if let Some(wav) = &self.wav_out {
            crate::encode::ffmpeg::ensure_parent_dir(wav)?;
        }
        let mut child = self
            .command(plan, voice)
            .spawn()
            .with_context(|| format!("spawn '{}'", self.bin.display()))?;
        let Some(mut stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StudioError::Other(anyhow::anyhow!(
                "failed to open espeak-ng stdin"
            )));
        };
        if let Err(e) = stdin.write_all(plan.text.as_bytes()) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StudioError::Other(
                anyhow::Error::new(e).context("write narration text"),
            ));
        }
        drop(stdin);
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for EspeakNarrator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/narration/espeak.rs"]
mod tests;
