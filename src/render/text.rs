//! Font resolution and text layout for captions and the door numeral.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::Context as _;
use sha2::Digest as _;

use crate::config::CaptionConfig;
use crate::foundation::error::{StudioError, StudioResult};

/// Width measurement used for greedy word wrapping.
pub trait TextMeasure {
    /// Advance width of `text` on one line, in design pixels.
    fn measure(&mut self, text: &str) -> f64;
}

/// Monospace approximation: every char advances by the same amount.
///
/// Used when no font could be resolved, and in tests where metrics must not depend on the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedAdvance {
    /// Advance per char in design pixels.
    pub advance_px: f64,
}

impl FixedAdvance {
    /// Rough advance for a proportional sans-serif at `font_size_px`.
    pub fn for_font_size(font_size_px: f32) -> Self {
        Self {
            advance_px: f64::from(font_size_px) * 0.5,
        }
    }
}

impl TextMeasure for FixedAdvance {
    fn measure(&mut self, text: &str) -> f64 {
        text.chars().count() as f64 * self.advance_px
    }
}

/// Where a font's bytes came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontOrigin {
    /// Explicit font file.
    File(PathBuf),
    /// System font database lookup.
    System,
}

/// Raw font bytes plus the face to use within them.
#[derive(Clone, Debug)]
pub struct LoadedFont {
    bytes: Arc<Vec<u8>>,
    index: u32,
    family_hint: Option<String>,
    origin: FontOrigin,
}

impl LoadedFont {
    /// Read a TTF/OTF file.
    pub fn from_path(path: impl AsRef<Path>) -> StudioResult<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        if bytes.is_empty() {
            return Err(StudioError::validation(format!(
                "font file '{}' is empty",
                path.display()
            )));
        }
        Ok(Self {
            bytes: Arc::new(bytes),
            index: 0,
            family_hint: None,
            origin: FontOrigin::File(path.to_path_buf()),
        })
    }

    /// Closest system sans-serif face, bold or regular.
    pub fn system_sans_serif(bold: bool) -> Option<Self> {
        let db = system_font_db();
        let weight = if bold {
            usvg::fontdb::Weight::BOLD
        } else {
            usvg::fontdb::Weight::NORMAL
        };
        let query = usvg::fontdb::Query {
            families: &[usvg::fontdb::Family::SansSerif],
            weight,
            stretch: usvg::fontdb::Stretch::Normal,
            style: usvg::fontdb::Style::Normal,
        };
        let id = db.query(&query).or_else(|| db.faces().next().map(|f| f.id))?;
        let family_hint = db
            .face(id)
            .and_then(|f| f.families.first().map(|(name, _)| name.clone()));
        let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        Some(Self {
            bytes: Arc::new(bytes),
            index,
            family_hint,
            origin: FontOrigin::System,
        })
    }

    /// Caption font: configured file first, then the system sans-serif.
    ///
    /// Returns `None` (and logs) when neither is usable; captions then fall back to
    /// [`FixedAdvance`] metrics and draw only the band.
    pub fn resolve_caption(cfg: &CaptionConfig) -> Option<Self> {
        if let Some(path) = &cfg.font_path {
            match Self::from_path(path) {
                Ok(font) => return Some(font),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "caption font unreadable")
                }
            }
        }
        let font = Self::system_sans_serif(false);
        if font.is_none() {
            tracing::warn!("no system sans-serif font found; captions will render without text");
        }
        font
    }

    /// Font bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Where the bytes came from.
    pub fn origin(&self) -> &FontOrigin {
        &self.origin
    }

    /// SHA-256 of the font bytes, lowercase hex.
    pub fn sha256_hex(&self) -> String {
        let digest = sha2::Sha256::digest(self.bytes.as_slice());
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }

    fn font_data(&self) -> vello_cpu::peniko::FontData {
        vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(self.bytes.as_ref().clone()),
            self.index,
        )
    }
}

fn system_font_db() -> &'static usvg::fontdb::Database {
    static DB: OnceLock<usvg::fontdb::Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "loaded system font database");
        db
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl TextBrushRgba8 {
    /// Opaque brush from `#rrggbb`.
    pub const fn opaque_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
            a: 255,
        }
    }
}

/// Single-font, single-size Parley layout engine.
///
/// The font is registered once; each call lays out one unbroken line.
pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    font: vello_cpu::peniko::FontData,
    size_px: f32,
    brush: TextBrushRgba8,
}

impl TextEngine {
    /// Register `font` and fix the size and colour of all layouts.
    pub fn new(font: &LoadedFont, size_px: f32, brush: TextBrushRgba8) -> StudioResult<Self> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(StudioError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes.as_ref().clone()), None);

        let mut family_name = None;
        for (id, _) in &families {
            let Some(name) = font_ctx.collection.family_name(*id) else {
                continue;
            };
            if family_name.is_none() || font.family_hint.as_deref() == Some(name) {
                family_name = Some(name.to_string());
            }
        }
        let family_name = family_name
            .ok_or_else(|| StudioError::validation("no font families registered from font bytes"))?;

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            font: font.font_data(),
            size_px,
            brush,
        })
    }

    /// Family name the engine lays out with.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Font size in design pixels.
    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    pub(crate) fn font_data(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    /// Shape `text` as a single line.
    pub fn layout_line(&mut self, text: &str) -> parley::Layout<TextBrushRgba8> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(self.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(self.brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }
}

impl TextMeasure for TextEngine {
    fn measure(&mut self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        f64::from(self.layout_line(text).width())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
