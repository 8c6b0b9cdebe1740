use rand::rngs::StdRng;

use crate::caption::script::NarrationScript;
use crate::caption::segment::{CaptionLayout, CaptionSegmenter, CaptionStyle};
use crate::config::StudioConfig;
use crate::foundation::core::{Canvas, SceneTime};
use crate::foundation::error::StudioResult;
use crate::render::cpu::SceneRenderer;
use crate::render::frame::FrameRGBA;
use crate::render::noise::{apply_luminance_noise, noise_rng};
use crate::render::text::{FixedAdvance, LoadedFont, TextBrushRgba8, TextEngine, TextMeasure};
use crate::scene::state::SceneState;

/// Produces finished frames: scene, then noise, then the caption overlay.
///
/// Owns the noise generator so a capture pass draws one continuous random stream. Everything
/// else is a pure function of scene time.
pub struct FrameCompositor {
    renderer: SceneRenderer,
    captions: CaptionSegmenter,
    caption_text: Option<TextEngine>,
    fallback_measure: FixedAdvance,
    noise_strength: f64,
    rng: StdRng,
    duration: f64,
}

impl FrameCompositor {
    /// Compositor with fonts resolved from the config and the host.
    pub fn new(cfg: &StudioConfig, script: NarrationScript) -> StudioResult<Self> {
        let caption_font = LoadedFont::resolve_caption(&cfg.caption);
        let numeral_font = LoadedFont::system_sans_serif(true).or_else(|| caption_font.clone());
        Self::with_fonts(cfg, script, caption_font.as_ref(), numeral_font.as_ref())
    }

    /// Compositor that draws no glyphs and wraps captions with fixed-advance metrics.
    ///
    /// Output depends only on time, config and seed, never on installed fonts.
    pub fn without_fonts(cfg: &StudioConfig, script: NarrationScript) -> StudioResult<Self> {
        Self::with_fonts(cfg, script, None, None)
    }

    /// Compositor with explicit fonts.
    pub fn with_fonts(
        cfg: &StudioConfig,
        script: NarrationScript,
        caption_font: Option<&LoadedFont>,
        numeral_font: Option<&LoadedFont>,
    ) -> StudioResult<Self> {
        cfg.validate()?;
        let style = CaptionStyle::from_config(&cfg.caption);
        let caption_text = caption_font
            .map(|font| {
                TextEngine::new(
                    font,
                    style.font_size_px,
                    TextBrushRgba8::opaque_hex(style.text_rgb),
                )
            })
            .transpose()?;
        let fallback_measure = FixedAdvance::for_font_size(style.font_size_px);

        Ok(Self {
            renderer: SceneRenderer::new(cfg.canvas, numeral_font)?,
            captions: CaptionSegmenter::new(script, style, cfg.duration_secs)?,
            caption_text,
            fallback_measure,
            noise_strength: cfg.noise.strength,
            rng: noise_rng(cfg.noise.seed),
            duration: cfg.duration_secs,
        })
    }

    /// Restart the noise stream. `None` draws a fresh OS-entropy seed.
    pub fn reseed(&mut self, seed: Option<u64>) {
        self.rng = noise_rng(seed);
    }

    /// Output size.
    pub fn canvas(&self) -> Canvas {
        self.renderer.canvas()
    }

    /// Sequence length in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Script being captioned.
    pub fn script(&self) -> &NarrationScript {
        self.captions.script()
    }

    /// Family of the caption font, if one was resolved.
    pub fn caption_family(&self) -> Option<&str> {
        self.caption_text.as_ref().map(TextEngine::family_name)
    }

    /// Caption layout at `time`, measured with the active caption font.
    pub fn caption_layout(&mut self, time: SceneTime) -> CaptionLayout {
        let measure: &mut dyn TextMeasure = match self.caption_text.as_mut() {
            Some(engine) => engine,
            None => &mut self.fallback_measure,
        };
        self.captions.layout(time, measure)
    }

    /// Render the finished frame at `time`.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn compose(&mut self, time: SceneTime) -> StudioResult<FrameRGBA> {
        let state = SceneState::at(time);
        let mut frame = self.renderer.render_state(&state)?;
        apply_luminance_noise(&mut frame, self.noise_strength, &mut self.rng);

        let layout = self.caption_layout(time);
        self.renderer.draw_caption_overlay(
            &mut frame,
            &layout,
            self.captions.style(),
            self.caption_text.as_mut(),
        )?;
        Ok(frame)
    }

    /// Like [`FrameCompositor::compose`], validating a raw time in seconds first.
    pub fn compose_at(&mut self, secs: f64) -> StudioResult<FrameRGBA> {
        let time = SceneTime::new(secs, self.duration)?;
        self.compose(time)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compose.rs"]
mod tests;
