use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::EncodeConfig;
use crate::encode::artifact::{Artifact, ArtifactPayload};
use crate::encode::sink::{Codec, FinalizeStop, FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{StudioError, StudioResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;

const EXIT_POLL: Duration = Duration::from_millis(10);

/// Options for [`FfmpegSink`] WebM output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Final WebM file path.
    pub out_path: PathBuf,
    /// Encoder binary.
    pub ffmpeg_bin: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Create options for writing a WebM to `out_path` with `ffmpeg` from `PATH`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }

    /// Options from encoder settings.
    pub fn from_config(cfg: &EncodeConfig) -> Self {
        Self {
            ffmpeg_bin: cfg.ffmpeg_bin.clone(),
            ..Self::new(cfg.out_path.clone())
        }
    }

    /// Where the stream is written while recording. Renamed to `out_path` on success.
    pub fn staging_path(&self) -> PathBuf {
        let mut s: OsString = self.out_path.clone().into_os_string();
        s.push(".partial");
        PathBuf::from(s)
    }
}

/// Sink that spawns `ffmpeg` and streams raw frames to its stdin, producing a WebM.
///
/// The stream is written to a staging file and only moved to the final path once `ffmpeg`
/// exits cleanly, so a failed or aborted session never leaves a playable artifact behind.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    encoders: OnceLock<Result<String, String>>,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    staging: StagingFile,
    stop: FinalizeStop,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
    frames_written: u64,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            encoders: OnceLock::new(),
            child: None,
            stdin: None,
            stderr_drain: None,
            staging: StagingFile(None),
            stop: FinalizeStop::new(),
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            frames_written: 0,
        }
    }

    /// Sink options.
    pub fn opts(&self) -> &FfmpegSinkOpts {
        &self.opts
    }

    fn encoder_list(&self) -> Result<&str, &str> {
        self.encoders
            .get_or_init(|| list_encoders(&self.opts.ffmpeg_bin))
            .as_deref()
            .map_err(String::as_str)
    }

    /// Wait for `child` to exit, killing it if the finalize stop flag is raised first.
    fn wait_or_stop(&self, child: &mut Child) -> StudioResult<Option<ExitStatus>> {
        loop {
            let exited = child.try_wait().map_err(|e| {
                StudioError::finalize(format!("failed to wait for ffmpeg to finish: {e}"))
            })?;
            if let Some(status) = exited {
                return Ok(Some(status));
            }
            if self.stop.is_stopped() {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            std::thread::sleep(EXIT_POLL);
        }
    }

    fn join_stderr(&mut self) -> StudioResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StudioError::finalize("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| StudioError::finalize(format!("ffmpeg stderr read failed: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn reset(&mut self) {
        self.cfg = None;
        self.last_idx = None;
        self.frames_written = 0;
        self.scratch = Vec::new();
    }
}

impl FrameSink for FfmpegSink {
    fn check_ready(&self) -> StudioResult<()> {
        self.encoder_list()
            .map(|_| ())
            .map_err(|e| StudioError::sink_open(e))
    }

    fn supports(&self, codec: Codec) -> bool {
        self.encoder_list()
            .is_ok_and(|list| encoder_listed(list, codec.ffmpeg_encoder()))
    }

    fn begin(&mut self, cfg: SinkConfig) -> StudioResult<()> {
        if self.child.is_some() {
            return Err(StudioError::sink_open("ffmpeg sink already started"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(StudioError::sink_open(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(StudioError::sink_open(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }
        if cfg.bitrate_bps == 0 {
            return Err(StudioError::sink_open("bitrate must be non-zero"));
        }

        ensure_parent_dir(&self.opts.out_path)
            .map_err(|e| StudioError::sink_open(e.to_string()))?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(StudioError::sink_open(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        let staging = self.opts.staging_path();
        let mut cmd = build_command(&self.opts.ffmpeg_bin, &cfg, &staging);
        let mut child = cmd.spawn().map_err(|e| {
            StudioError::sink_open(format!(
                "failed to spawn '{}' (is it installed?): {e}",
                self.opts.ffmpeg_bin.display()
            ))
        })?;
        self.staging = StagingFile(Some(staging));

        let stdin = child.stdin.take();
        let stderr = child.stderr.take();
        let (Some(stdin), Some(mut stderr)) = (stdin, stderr) else {
            let _ = child.kill();
            let _ = child.wait();
            self.staging.discard();
            return Err(StudioError::sink_open("failed to open ffmpeg pipes"));
        };
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            codec = %cfg.codec,
            width = cfg.width,
            height = cfg.height,
            staging = %self.opts.staging_path().display(),
            "ffmpeg sink started"
        );
        self.scratch = vec![0u8; cfg.canvas().rgba_len()];
        self.stop = FinalizeStop::new();
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames_written = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> StudioResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| StudioError::sink_write("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(StudioError::sink_write(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(StudioError::sink_write(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        self.last_idx = Some(idx);

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StudioError::sink_write("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            StudioError::sink_write(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(out = %self.opts.out_path.display()))]
    fn end(&mut self) -> StudioResult<Artifact> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| StudioError::finalize("ffmpeg sink not started"))?;
        let cfg = self
            .cfg
            .clone()
            .ok_or_else(|| StudioError::finalize("ffmpeg sink not started"))?;
        let frames = self.frames_written;
        self.reset();

        let status = self.wait_or_stop(&mut child);
        let stderr_bytes = self.join_stderr();
        let status = match status {
            Ok(Some(status)) => status,
            Ok(None) => {
                self.staging.discard();
                return Err(StudioError::finalize("ffmpeg was stopped before it finished"));
            }
            Err(e) => {
                self.staging.discard();
                return Err(e);
            }
        };
        let stderr_bytes = stderr_bytes?;

        if !status.success() {
            self.staging.discard();
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StudioError::finalize(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        let path = self.staging.commit(&self.opts.out_path)?;
        let byte_len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        tracing::info!(frames, byte_len, "webm finalized");
        Ok(Artifact::new(
            &cfg,
            frames,
            ArtifactPayload::File { path, byte_len },
        ))
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = self.join_stderr();
        self.staging.discard();
        self.reset();
    }

    fn finalize_stop(&self) -> Option<FinalizeStop> {
        Some(self.stop.clone())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

/// Staging output removed on drop unless committed.
struct StagingFile(Option<PathBuf>);

impl StagingFile {
    fn commit(&mut self, to: &Path) -> StudioResult<PathBuf> {
        let from = self
            .0
            .take()
            .ok_or_else(|| StudioError::finalize("no staged output to commit"))?;
        if let Err(e) = std::fs::rename(&from, to) {
            let _ = std::fs::remove_file(&from);
            return Err(StudioError::finalize(format!(
                "move '{}' to '{}': {e}",
                from.display(),
                to.display()
            )));
        }
        Ok(to.to_path_buf())
    }

    fn discard(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        self.discard();
    }
}

fn build_command(bin: &Path, cfg: &SinkConfig, staging: &Path) -> Command {
    let mut cmd = Command::new(bin);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    // Input: raw RGBA8 frames, flattened to opaque in push_frame.
    cmd.args([
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", cfg.width, cfg.height),
    ]);
    push_input_fps(&mut cmd, cfg.fps);
    cmd.args(["-i", "pipe:0"]);

    // Narration is spoken live, never muxed.
    cmd.args([
        "-an",
        "-c:v",
        cfg.codec.ffmpeg_encoder(),
        "-b:v",
        &cfg.bitrate_bps.to_string(),
        "-pix_fmt",
        "yuv420p",
        "-f",
        "webm",
    ]);
    cmd.arg(staging);
    cmd
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input `-r` goes before `-i`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Run `bin -encoders`. The error names the binary and why it could not be used.
fn list_encoders(bin: &Path) -> Result<String, String> {
    let out = Command::new(bin)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| {
            tracing::warn!(bin = %bin.display(), error = %e, "ffmpeg could not be started");
            format!("failed to run encoder '{}' (is it installed?): {e}", bin.display())
        })?;
    if !out.status.success() {
        tracing::warn!(bin = %bin.display(), status = %out.status, "ffmpeg encoder probe failed");
        return Err(format!(
            "encoder '{}' -encoders exited with status {}",
            bin.display(),
            out.status
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Whether an `ffmpeg -encoders` listing names `encoder` as a video encoder.
fn encoder_listed(listing: &str, encoder: &str) -> bool {
    listing.lines().any(|line| {
        let mut cols = line.split_whitespace();
        matches!(
            (cols.next(), cols.next()),
            (Some(flags), Some(name)) if flags.starts_with('V') && name == encoder
        )
    })
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> StudioResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(StudioError::sink_write(
            "frame data does not match the sink's width*height*4",
        ));
    }

    let bg_r = u16::from(bg_rgba[0]);
    let bg_g = u16::from(bg_rgba[1]);
    let bg_b = u16::from(bg_rgba[2]);

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StudioResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
