use crate::caption::script::NarrationScript;
use crate::config::CaptionConfig;
use crate::foundation::core::{DESIGN_HEIGHT, DESIGN_WIDTH, Rect, SceneTime};
use crate::foundation::error::{StudioError, StudioResult};
use crate::render::text::TextMeasure;

/// Caption band placement and typography, in design pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionStyle {
    /// Text size.
    pub font_size_px: f32,
    /// Vertical distance between stacked sub-lines.
    pub line_height_px: f64,
    /// Greedy wrap width.
    pub max_width_px: f64,
    /// Translucent backing band.
    pub band: Rect,
    /// Band opacity over black.
    pub band_alpha: f64,
    /// Bottom of the last sub-line.
    pub bottom_y: f64,
    /// Horizontal centre of every sub-line.
    pub center_x: f64,
    /// Text colour as `0xRRGGBB`.
    pub text_rgb: u32,
}

impl CaptionStyle {
    /// Style for the given caption settings.
    pub fn from_config(cfg: &CaptionConfig) -> Self {
        Self {
            font_size_px: cfg.font_size_px,
            line_height_px: cfg.line_height_px,
            max_width_px: DESIGN_WIDTH * cfg.max_width_frac,
            band: Rect::new(
                DESIGN_WIDTH * 0.1,
                DESIGN_HEIGHT * 0.82,
                DESIGN_WIDTH * 0.9,
                DESIGN_HEIGHT * 0.82 + 140.0,
            ),
            band_alpha: 0.55,
            bottom_y: DESIGN_HEIGHT * 0.93,
            center_x: DESIGN_WIDTH / 2.0,
            text_rgb: 0xe9e6dc,
        }
    }
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self::from_config(&CaptionConfig::default())
    }
}

/// One wrapped sub-line.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLine {
    /// Text of the sub-line.
    pub text: String,
    /// Measured width.
    pub width: f64,
    /// Bottom edge; the text is centred horizontally on the style's `center_x`.
    pub bottom_y: f64,
}

/// Caption for one frame. Recomputed every frame, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLayout {
    /// Index of the active script line.
    pub segment: usize,
    /// Backing band.
    pub band: Rect,
    /// Sub-lines, top to bottom; the last one is lowest.
    pub lines: Vec<CaptionLine>,
}

/// Active script line for `secs`: `floor(secs / duration * n)`, clamped to `[0, n-1]`.
pub fn segment_index(secs: f64, duration: f64, n: usize) -> usize {
    if n == 0 || duration <= 0.0 || !secs.is_finite() {
        return 0;
    }
    let raw = (secs / duration * n as f64).floor();
    if raw <= 0.0 {
        return 0;
    }
    (raw as usize).min(n - 1)
}

/// Greedy word wrap.
///
/// A word joins the current sub-line unless that would exceed `max_width` and the sub-line is
/// non-empty. A single word wider than `max_width` therefore gets a sub-line of its own.
pub fn wrap_words(text: &str, max_width: f64, measure: &mut dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };
        if !line.is_empty() && measure.measure(&candidate) > max_width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Maps scene time to the active script line and its wrapped layout.
#[derive(Clone, Debug)]
pub struct CaptionSegmenter {
    script: NarrationScript,
    style: CaptionStyle,
    duration: f64,
}

impl CaptionSegmenter {
    /// Segmenter over `script` for a sequence of `duration` seconds.
    pub fn new(script: NarrationScript, style: CaptionStyle, duration: f64) -> StudioResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(StudioError::validation(
                "caption duration must be finite and > 0",
            ));
        }
        if !style.max_width_px.is_finite() || style.max_width_px <= 0.0 {
            return Err(StudioError::validation("caption max width must be > 0"));
        }
        Ok(Self {
            script,
            style,
            duration,
        })
    }

    /// Script being captioned.
    pub fn script(&self) -> &NarrationScript {
        &self.script
    }

    /// Style in use.
    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    /// Index of the line active at `time`.
    pub fn segment_index(&self, time: SceneTime) -> usize {
        segment_index(time.secs(), self.duration, self.script.len())
    }

    /// Wrapped layout of the line active at `time`.
    pub fn layout(&self, time: SceneTime, measure: &mut dyn TextMeasure) -> CaptionLayout {
        let segment = self.segment_index(time);
        let wrapped = wrap_words(self.script.line(segment), self.style.max_width_px, measure);
        let n = wrapped.len();
        let lines = wrapped
            .into_iter()
            .enumerate()
            .map(|(i, text)| CaptionLine {
                width: measure.measure(&text),
                bottom_y: self.style.bottom_y - (n - 1 - i) as f64 * self.style.line_height_px,
                text,
            })
            .collect();
        CaptionLayout {
            segment,
            band: self.style.band,
            lines,
        }
    }

    /// Like [`CaptionSegmenter::layout`], validating a raw time in seconds first.
    pub fn layout_at(
        &self,
        secs: f64,
        measure: &mut dyn TextMeasure,
    ) -> StudioResult<CaptionLayout> {
        let time = SceneTime::new(secs, self.duration)?;
        Ok(self.layout(time, measure))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/caption/segment.rs"]
mod tests;
