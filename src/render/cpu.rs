use std::sync::Arc;

use vello_cpu::kurbo::Shape as _;

use crate::caption::segment::{CaptionLayout, CaptionStyle};
use crate::foundation::core::{
    Affine, Canvas, DESIGN_HEIGHT, DESIGN_WIDTH, Point, Rect, Rgba8Premul, SceneTime,
};
use crate::foundation::error::{StudioError, StudioResult};
use crate::foundation::math::{alpha_u8, blend_over_opaque, lerp};
use crate::render::frame::FrameRGBA;
use crate::render::text::{LoadedFont, TextBrushRgba8, TextEngine};
use crate::scene::state::{
    BED_BASE, BED_HEADBOARD, DoorGeometry, HORIZON_Y, LAMP_LIGHT_CENTER, LAMP_LIGHT_RADII,
    LAMP_SHADE, LAMP_STEM, SceneState, SilhouetteState,
};

const BACKGROUND_TOP: u32 = 0x050508;
const BACKGROUND_BOTTOM: u32 = 0x0b0b0e;
const FLOOR: u32 = 0x121217;
const WALL: u32 = 0x0f0f14;
const DOOR: u32 = 0x1f1f27;
const DOOR_FRAME: u32 = 0x2b2b36;
const PLATE: u32 = 0x272733;
const PLATE_BORDER: u32 = 0x3a3a48;
const NUMERAL: u32 = 0xc5b36a;
const BED: u32 = 0x1a1a22;
const HEADBOARD: u32 = 0x22222b;
const LAMP: u32 = 0x25252e;
const LAMP_LIGHT: [u8; 3] = [240, 235, 210];

const VIGNETTE_MAX_ALPHA: f64 = 0.75;
const SHADOW_ALPHA: f64 = 0.35;
const SILHOUETTE_ALPHA: f64 = 0.7;
const DOOR_FRAME_WIDTH: f64 = 6.0;
const PLATE_BORDER_WIDTH: f64 = 3.0;
const NUMERAL_SIZE_PX: f32 = 34.0;
const NUMERAL_TEXT: &str = "213";

#[derive(Clone)]
struct Sprite {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

/// Rasterizes [`SceneState`]s with `vello_cpu`.
///
/// Time-invariant layers (background gradient, vignette, lamp falloff) are baked once at the
/// output resolution; everything else is drawn as vector geometry in design space.
pub struct SceneRenderer {
    canvas: Canvas,
    to_canvas: Affine,
    ctx: Option<vello_cpu::RenderContext>,
    backdrop: Sprite,
    lamp_light: Sprite,
    numeral: Option<TextEngine>,
}

impl SceneRenderer {
    /// Prepare a renderer for `canvas`.
    ///
    /// `numeral_font` draws the "213" plate label; without it the plate is left blank.
    pub fn new(canvas: Canvas, numeral_font: Option<&LoadedFont>) -> StudioResult<Self> {
        canvas.validate()?;
        let numeral = match numeral_font {
            Some(font) => Some(TextEngine::new(
                font,
                NUMERAL_SIZE_PX,
                TextBrushRgba8::opaque_hex(NUMERAL),
            )?),
            None => {
                tracing::warn!("no numeral font; door plate renders without its label");
                None
            }
        };
        Ok(Self {
            canvas,
            to_canvas: canvas.design_to_canvas(),
            ctx: None,
            backdrop: bake_backdrop(canvas)?,
            lamp_light: bake_lamp_light(canvas)?,
            numeral,
        })
    }

    /// Output size.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Render the noise-free scene at `time`.
    pub fn render(&mut self, time: SceneTime) -> StudioResult<FrameRGBA> {
        self.render_state(&SceneState::at(time))
    }

    /// Render a pre-evaluated scene state, without noise or captions.
    pub fn render_state(&mut self, state: &SceneState) -> StudioResult<FrameRGBA> {
        let data = self.with_ctx_mut(|this, ctx| {
            this.paint_scene(ctx, state);
            Ok(())
        })?;
        FrameRGBA::from_premul(self.canvas.width, self.canvas.height, data)
    }

    /// Draw the caption band and its text over `frame`.
    ///
    /// Without a text engine only the band is drawn.
    pub fn draw_caption_overlay(
        &mut self,
        frame: &mut FrameRGBA,
        layout: &CaptionLayout,
        style: &CaptionStyle,
        text: Option<&mut TextEngine>,
    ) -> StudioResult<()> {
        if frame.canvas() != self.canvas {
            return Err(StudioError::render("caption overlay canvas mismatch"));
        }
        let overlay = self.with_ctx_mut(|this, ctx| {
            ctx.set_transform(affine_to_cpu(this.to_canvas));
            set_solid(ctx, 0x000000, style.band_alpha);
            ctx.fill_rect(&rect_to_cpu(layout.band));

            if let Some(engine) = text {
                for line in &layout.lines {
                    let shaped = engine.layout_line(&line.text);
                    let origin = Point::new(
                        style.center_x - f64::from(shaped.width()) / 2.0,
                        line.bottom_y - f64::from(shaped.height()),
                    );
                    draw_layout(
                        ctx,
                        &shaped,
                        engine.font_data(),
                        this.to_canvas * Affine::translate(origin.to_vec2()),
                    );
                }
            }
            Ok(())
        })?;
        frame.composite_over(&overlay)
    }

    fn with_ctx_mut(
        &mut self,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> StudioResult<()>,
    ) -> StudioResult<Vec<u8>> {
        let (w, h) = canvas_u16(self.canvas)?;
        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        let res = f(self, &mut ctx);
        let out = res.map(|()| {
            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(w, h);
            ctx.render_to_pixmap(&mut pixmap);
            pixmap.data_as_u8_slice().to_vec()
        });
        self.ctx = Some(ctx);
        out
    }

    fn paint_scene(&mut self, ctx: &mut vello_cpu::RenderContext, state: &SceneState) {
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        draw_sprite(ctx, &self.backdrop, Affine::IDENTITY);

        let world = self.to_canvas * Affine::translate(state.sway);
        ctx.set_transform(affine_to_cpu(world));

        set_solid(ctx, FLOOR, 1.0);
        ctx.fill_rect(&rect_to_cpu(Rect::new(
            0.0,
            HORIZON_Y,
            DESIGN_WIDTH,
            DESIGN_HEIGHT,
        )));
        set_solid(ctx, WALL, 1.0);
        ctx.fill_path(&polygon(&[
            Point::new(0.0, 0.0),
            Point::new(DESIGN_WIDTH * 0.2, HORIZON_Y),
            Point::new(0.0, DESIGN_HEIGHT),
        ]));
        ctx.fill_path(&polygon(&[
            Point::new(DESIGN_WIDTH, 0.0),
            Point::new(DESIGN_WIDTH * 0.8, HORIZON_Y),
            Point::new(DESIGN_WIDTH, DESIGN_HEIGHT),
        ]));

        self.paint_door(ctx, &state.door, world);

        let wash = state.flicker_wash_alpha();
        if wash > 0.0 {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            set_solid(ctx, 0xffffff, wash);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(self.canvas.width),
                f64::from(self.canvas.height),
            ));
            ctx.set_transform(affine_to_cpu(world));
        }

        set_solid(ctx, 0x000000, SHADOW_ALPHA);
        ctx.fill_rect(&rect_to_cpu(state.shadow_band));

        if let Some(lamp) = state.lamp {
            set_solid(ctx, BED, 1.0);
            ctx.fill_rect(&rect_to_cpu(BED_BASE));
            set_solid(ctx, HEADBOARD, 1.0);
            ctx.fill_rect(&rect_to_cpu(BED_HEADBOARD));
            set_solid(ctx, LAMP, 1.0);
            ctx.fill_rect(&rect_to_cpu(LAMP_STEM));
            ctx.fill_path(&polygon(&LAMP_SHADE));

            let r = LAMP_LIGHT_RADII.1;
            let corner = Point::new(LAMP_LIGHT_CENTER.x - r, LAMP_LIGHT_CENTER.y - r)
                + state.sway;
            let at = self.to_canvas * corner;
            ctx.push_opacity_layer(lamp.light_alpha as f32);
            draw_sprite(ctx, &self.lamp_light, Affine::translate(at.to_vec2()));
            ctx.pop_layer();
            ctx.set_transform(affine_to_cpu(world));
        }

        if let Some(sil) = state.silhouette {
            paint_silhouette(ctx, &sil, world);
        }
    }

    fn paint_door(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        door: &DoorGeometry,
        world: Affine,
    ) {
        set_solid(ctx, DOOR, 1.0);
        ctx.fill_rect(&rect_to_cpu(door.rect));
        set_solid(ctx, DOOR_FRAME, 1.0);
        fill_outline(ctx, door.rect, DOOR_FRAME_WIDTH);

        set_solid(ctx, PLATE, 1.0);
        ctx.fill_rect(&rect_to_cpu(door.plate));
        set_solid(ctx, PLATE_BORDER, 1.0);
        fill_outline(ctx, door.plate, PLATE_BORDER_WIDTH);

        if let Some(engine) = self.numeral.as_mut() {
            let shaped = engine.layout_line(NUMERAL_TEXT);
            let origin = Point::new(
                door.label_center.x - f64::from(shaped.width()) / 2.0,
                door.label_center.y - f64::from(shaped.height()) / 2.0,
            );
            draw_layout(
                ctx,
                &shaped,
                engine.font_data(),
                world * Affine::translate(origin.to_vec2()),
            );
            ctx.set_transform(affine_to_cpu(world));
        }
    }
}

fn paint_silhouette(ctx: &mut vello_cpu::RenderContext, sil: &SilhouetteState, world: Affine) {
    ctx.set_transform(affine_to_cpu(world * Affine::translate(sil.anchor.to_vec2())));
    set_solid(ctx, 0x000000, SILHOUETTE_ALPHA);

    let head = vello_cpu::kurbo::Ellipse::new((0.0, -90.0), (40.0, 54.0), 0.0);
    ctx.fill_path(&head.to_path(0.1));
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(-28.0, -90.0, 28.0, 50.0));
    for side in [-1.0, 1.0] {
        ctx.fill_path(&polygon(&[
            Point::new(28.0 * side, -50.0),
            Point::new(80.0 * side, 10.0),
            Point::new(70.0 * side, 20.0),
            Point::new(18.0 * side, -40.0),
        ]));
    }
    ctx.set_transform(affine_to_cpu(world));
}

fn draw_layout(
    ctx: &mut vello_cpu::RenderContext,
    layout: &parley::Layout<TextBrushRgba8>,
    font: &vello_cpu::peniko::FontData,
    transform: Affine,
) {
    ctx.set_transform(affine_to_cpu(transform));
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn draw_sprite(ctx: &mut vello_cpu::RenderContext, sprite: &Sprite, at: Affine) {
    ctx.set_transform(affine_to_cpu(at));
    ctx.set_paint(sprite.paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(sprite.w),
        f64::from(sprite.h),
    ));
}

fn set_solid(ctx: &mut vello_cpu::RenderContext, rgb: u32, alpha: f64) {
    let c = Rgba8Premul::opaque_hex(rgb);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        c.r,
        c.g,
        c.b,
        alpha_u8(alpha),
    ));
}

/// Stroke centred on the edges of `r`, drawn as four filled bands.
fn fill_outline(ctx: &mut vello_cpu::RenderContext, r: Rect, width: f64) {
    let hw = width / 2.0;
    let o = r.inflate(hw, hw);
    let i = r.inflate(-hw, -hw);
    for band in [
        Rect::new(o.x0, o.y0, o.x1, i.y0),
        Rect::new(o.x0, i.y1, o.x1, o.y1),
        Rect::new(o.x0, i.y0, i.x0, i.y1),
        Rect::new(i.x1, i.y0, o.x1, i.y1),
    ] {
        ctx.fill_rect(&rect_to_cpu(band));
    }
}

fn polygon(points: &[Point]) -> vello_cpu::kurbo::BezPath {
    let mut path = vello_cpu::kurbo::BezPath::new();
    for (i, p) in points.iter().enumerate() {
        let p = vello_cpu::kurbo::Point::new(p.x, p.y);
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path.close_path();
    path
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn canvas_u16(canvas: Canvas) -> StudioResult<(u16, u16)> {
    let w: u16 = canvas
        .width
        .try_into()
        .map_err(|_| StudioError::render("canvas width exceeds u16"))?;
    let h: u16 = canvas
        .height
        .try_into()
        .map_err(|_| StudioError::render("canvas height exceeds u16"))?;
    Ok((w, h))
}

/// Vertical gradient with the radial vignette already multiplied in.
fn bake_backdrop(canvas: Canvas) -> StudioResult<Sprite> {
    let (w, h) = (canvas.width, canvas.height);
    let top = Rgba8Premul::opaque_hex(BACKGROUND_TOP);
    let bottom = Rgba8Premul::opaque_hex(BACKGROUND_BOTTOM);
    let sx = DESIGN_WIDTH / f64::from(w);
    let sy = DESIGN_HEIGHT / f64::from(h);
    let center = Point::new(DESIGN_WIDTH / 2.0, DESIGN_HEIGHT / 2.0);
    let r0 = DESIGN_WIDTH.min(DESIGN_HEIGHT) * 0.2;
    let r1 = DESIGN_WIDTH.max(DESIGN_HEIGHT) * 0.75;

    let mut bytes = vec![0u8; canvas.rgba_len()];
    for y in 0..h {
        let t = (f64::from(y) + 0.5) / f64::from(h);
        let mix = |a: u8, b: u8| lerp(f64::from(a), f64::from(b), t).round() as u8;
        let base = [mix(top.r, bottom.r), mix(top.g, bottom.g), mix(top.b, bottom.b)];
        let dy = (f64::from(y) + 0.5) * sy - center.y;
        for x in 0..w {
            let dx = (f64::from(x) + 0.5) * sx - center.x;
            let d = dx.hypot(dy);
            let v = ((d - r0) / (r1 - r0)).clamp(0.0, 1.0);
            let rgb = blend_over_opaque(base, [0, 0, 0], VIGNETTE_MAX_ALPHA * v);
            let idx = ((y as usize) * (w as usize) + (x as usize)) * 4;
            bytes[idx..idx + 4].copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
    }
    sprite_from_premul(bytes, w, h)
}

/// Unit-opacity lamp falloff covering the light's bounding square, at canvas resolution.
fn bake_lamp_light(canvas: Canvas) -> StudioResult<Sprite> {
    let (inner, outer) = LAMP_LIGHT_RADII;
    let scale_x = f64::from(canvas.width) / DESIGN_WIDTH;
    let scale_y = f64::from(canvas.height) / DESIGN_HEIGHT;
    let w = ((2.0 * outer * scale_x).ceil() as u32).max(1);
    let h = ((2.0 * outer * scale_y).ceil() as u32).max(1);

    let mut bytes = vec![0u8; Canvas { width: w, height: h }.rgba_len()];
    for y in 0..h {
        let dy = (f64::from(y) + 0.5) / scale_y - outer;
        for x in 0..w {
            let dx = (f64::from(x) + 0.5) / scale_x - outer;
            let t = ((dx.hypot(dy) - inner) / (outer - inner)).clamp(0.0, 1.0);
            let px = Rgba8Premul::from_straight_rgba(
                LAMP_LIGHT[0],
                LAMP_LIGHT[1],
                LAMP_LIGHT[2],
                alpha_u8(1.0 - t),
            );
            let idx = ((y as usize) * (w as usize) + (x as usize)) * 4;
            bytes[idx..idx + 4].copy_from_slice(&[px.r, px.g, px.b, px.a]);
        }
    }
    sprite_from_premul(bytes, w, h)
}

fn sprite_from_premul(bytes: Vec<u8>, width: u32, height: u32) -> StudioResult<Sprite> {
    let (w, h) = canvas_u16(Canvas { width, height })?;
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect::<Vec<_>>();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Ok(Sprite {
        paint: vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        },
        w: width,
        h: height,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
