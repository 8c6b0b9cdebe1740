use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use room213::render::text::{TextBrushRgba8, TextEngine};
use room213::{
    CaptureOrchestrator, EspeakNarrator, FfmpegSink, FfmpegSinkOpts, FrameCompositor, LoadedFont,
    MonotonicTime, NarrationPlan, NarrationScript, NullSurface, PngPreviewSurface, PresentSurface,
    SteppedTime, StudioConfig, TimeSource,
};

#[derive(Parser, Debug)]
#[command(name = "room213", version, about = "Render and capture the Room 213 short")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Studio config JSON. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Narration script (JSON array of strings, or one line per row).
    #[arg(long, global = true)]
    script: Option<PathBuf>,

    /// Fixed noise seed.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print caption/numeral font diagnostics (family name + SHA-256 of font bytes).
    #[arg(long, global = true)]
    dump_fonts: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one composited frame as a PNG.
    Frame(FrameArgs),
    /// Capture the full sequence to WebM (requires `ffmpeg` with libvpx).
    Render(RenderArgs),
    /// Play the sequence without recording.
    Preview(PreviewArgs),
    /// Speak the narration with espeak-ng.
    Narrate(NarrateArgs),
    /// Print the narration plan and caption timing.
    Script,
}

#[derive(Args, Debug)]
struct FrameArgs {
    /// Scene time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Output WebM path.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Use virtual time: same frame schedule, no real-time waiting.
    #[arg(long)]
    offline: bool,

    /// Write a downscaled preview PNG here while recording.
    #[arg(long)]
    preview_png: Option<PathBuf>,

    /// Speak the narration alongside a real-time capture.
    #[arg(long)]
    narrate: bool,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Use virtual time.
    #[arg(long)]
    offline: bool,

    /// Write a downscaled preview PNG here.
    #[arg(long)]
    preview_png: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct NarrateArgs {
    /// Write the narration to a WAV file instead of playing it.
    #[arg(long)]
    wav: Option<PathBuf>,

    /// espeak-ng binary.
    #[arg(long, default_value = "espeak-ng")]
    espeak: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.common)?;
    let script = load_script(&cli.common)?;
    if cli.common.dump_fonts {
        dump_font_diagnostics(&cfg)?;
    }

    match cli.cmd {
        Command::Frame(args) => cmd_frame(&cfg, script, args),
        Command::Render(args) => cmd_render(cfg, script, args),
        Command::Preview(args) => cmd_preview(&cfg, script, args),
        Command::Narrate(args) => cmd_narrate(&cfg, &script, args),
        Command::Script => cmd_script(&cfg, &script),
    }
}

fn load_config(common: &CommonArgs) -> anyhow::Result<StudioConfig> {
    let mut cfg = match &common.config {
        Some(path) => StudioConfig::from_path(path)?,
        None => {
            let mut cfg = StudioConfig::default();
            cfg.apply_env_overrides();
            cfg
        }
    };
    if let Some(seed) = common.seed {
        cfg.noise.seed = Some(seed);
    }
    cfg.validate()?;
    Ok(cfg)
}

fn load_script(common: &CommonArgs) -> anyhow::Result<NarrationScript> {
    Ok(match &common.script {
        Some(path) => NarrationScript::from_path(path)?,
        None => NarrationScript::room_213(),
    })
}

fn preview_surface(path: Option<&Path>) -> anyhow::Result<Box<dyn PresentSurface>> {
    Ok(match path {
        Some(path) => Box::new(PngPreviewSurface::new(path, 30, 4)?),
        None => Box::new(NullSurface),
    })
}

fn time_source(offline: bool) -> Box<dyn TimeSource> {
    if offline {
        Box::new(SteppedTime::new())
    } else {
        Box::new(MonotonicTime::start())
    }
}

fn cmd_frame(cfg: &StudioConfig, script: NarrationScript, args: FrameArgs) -> anyhow::Result<()> {
    let mut compositor = FrameCompositor::new(cfg, script)?;
    let frame = compositor.compose_at(args.time)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame.save_png(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(
    mut cfg: StudioConfig,
    script: NarrationScript,
    args: RenderArgs,
) -> anyhow::Result<()> {
    if let Some(out) = args.out {
        cfg.encode.out_path = out;
    }
    let mut compositor = FrameCompositor::new(&cfg, script.clone())?;
    let orchestrator = CaptureOrchestrator::new(&cfg)?;
    let sink = FfmpegSink::new(FfmpegSinkOpts::from_config(&cfg.encode));
    let mut surface = preview_surface(args.preview_png.as_deref())?;
    let mut time = time_source(args.offline);

    let mut narrator = None;
    if args.narrate {
        if args.offline {
            tracing::warn!("--narrate is ignored for offline captures");
        } else {
            let mut espeak = EspeakNarrator::new();
            match room213::start_narration(&mut espeak, &script, cfg.duration_secs) {
                Ok(_) => narrator = Some(espeak),
                Err(e) => tracing::warn!(error = %e, "narration unavailable; recording silently"),
            }
        }
    }

    let report = orchestrator
        .capture(
            &mut compositor,
            Box::new(sink),
            surface.as_mut(),
            time.as_mut(),
        )
        .context("capture failed; no artifact produced")?;

    let artifact = report
        .artifact
        .get()
        .context("artifact was revoked before it could be reported")?;
    eprintln!(
        "wrote {} ({} frames, {}, {:.1}s)",
        artifact
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| artifact.file_name.clone()),
        artifact.frame_count,
        artifact.mime_type(),
        artifact.duration_secs()
    );
    if report.present_failures > 0 {
        eprintln!("preview failed for {} frames", report.present_failures);
    }
    if let Some(mut espeak) = narrator
        && let Err(e) = espeak.wait()
    {
        tracing::warn!(error = %e, "narration ended with an error");
    }
    Ok(())
}

fn cmd_preview(
    cfg: &StudioConfig,
    script: NarrationScript,
    args: PreviewArgs,
) -> anyhow::Result<()> {
    let mut compositor = FrameCompositor::new(cfg, script)?;
    let orchestrator = CaptureOrchestrator::new(cfg)?;
    let mut surface = preview_surface(args.preview_png.as_deref())?;
    let mut time = time_source(args.offline);

    let report = orchestrator.preview(&mut compositor, surface.as_mut(), time.as_mut())?;
    eprintln!("previewed {} frames", report.frames);
    Ok(())
}

fn cmd_narrate(
    cfg: &StudioConfig,
    script: &NarrationScript,
    args: NarrateArgs,
) -> anyhow::Result<()> {
    let mut narrator = EspeakNarrator::with_binary(args.espeak);
    if let Some(wav) = &args.wav {
        narrator = narrator.writing_wav(wav);
    }
    let plan = room213::start_narration(&mut narrator, script, cfg.duration_secs)?;
    narrator.wait()?;

    match &args.wav {
        Some(wav) => eprintln!("wrote {}", wav.display()),
        None => eprintln!("spoke {} words at rate {:.2}", plan.words, plan.rate),
    }
    Ok(())
}

fn cmd_script(cfg: &StudioConfig, script: &NarrationScript) -> anyhow::Result<()> {
    let plan = NarrationPlan::new(script, cfg.duration_secs)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&plan).context("serialize narration plan")?
    );

    let per_line = cfg.duration_secs / script.len() as f64;
    for (i, line) in script.lines().iter().enumerate() {
        println!("{:>6.2}s  {:>2}  {line}", i as f64 * per_line, i);
    }
    Ok(())
}

fn dump_font_diagnostics(cfg: &StudioConfig) -> anyhow::Result<()> {
    eprintln!("font diagnostics:");
    let caption = LoadedFont::resolve_caption(&cfg.caption);
    let numeral = LoadedFont::system_sans_serif(true);
    for (role, font, size) in [
        ("caption", caption.as_ref(), cfg.caption.font_size_px),
        ("numeral", numeral.as_ref(), 34.0),
    ] {
        let Some(font) = font else {
            eprintln!("- {role}: unresolved (glyphs will not be drawn)");
            continue;
        };
        let engine = TextEngine::new(font, size, TextBrushRgba8::opaque_hex(0xffffff))
            .with_context(|| format!("load {role} font"))?;
        eprintln!(
            "- {role}: family='{}' origin={:?} bytes={} sha256={}",
            engine.family_name(),
            font.origin(),
            font.bytes().len(),
            font.sha256_hex()
        );
    }
    Ok(())
}
