use crate::assets::color::{Rgba8, parse_color};
use crate::assets::text::{TextBrushRgba8, TextLayoutEngine};
use crate::config::ExportConfig;
use crate::effects::blur::BlurCache;
use crate::foundation::error::{VeilError, VeilResult};
use crate::foundation::math::blend_premul_over_opaque;
use crate::geometry::mapper::{self, PixelRect};
use crate::model::entities::{MosaicRegion, TextOverlay};
use crate::render::frame::FrameRGBA;

/// An entity that could not be drawn on a frame and was left out.
#[derive(Debug)]
pub struct SkippedEntity {
    pub id: String,
    pub error: VeilError,
}

/// Output of [`EffectRenderer::render_frame`].
#[derive(Debug)]
pub struct RenderedFrame {
    pub frame: FrameRGBA,
    /// Entities dropped from this frame; the frame itself is still valid.
    pub skipped: Vec<SkippedEntity>,
}

/// Composites mosaic blurs and text overlays onto decoded frames.
///
/// Mosaics are painted largest-area first so a smaller region overlapping a larger one ends up
/// on top. Text overlays follow in the order given. A failing entity is skipped and reported in
/// [`RenderedFrame::skipped`]; it never fails the frame.
pub struct EffectRenderer {
    text: TextLayoutEngine,
    blur: BlurCache,
    default_blur_strength: f64,
    text_padding_px: u32,
}

impl EffectRenderer {
    /// Build a renderer from config, loading `font_path` when set.
    pub fn new(config: &ExportConfig) -> VeilResult<Self> {
        let mut text = TextLayoutEngine::new();
        if let Some(path) = &config.font_path {
            text.load_font_file(path)?;
        }
        Ok(Self {
            text,
            blur: BlurCache::new(),
            default_blur_strength: config.default_blur_strength,
            text_padding_px: config.text_padding_px,
        })
    }

    /// Use raw font bytes for text overlays, replacing any font loaded from config.
    pub fn with_font_bytes(mut self, bytes: Vec<u8>) -> VeilResult<Self> {
        self.text.load_font_bytes(bytes)?;
        Ok(self)
    }

    pub fn has_font(&self) -> bool {
        self.text.has_font()
    }

    pub fn render_frame(
        &mut self,
        frame: &FrameRGBA,
        mosaics: &[&MosaicRegion],
        texts: &[&TextOverlay],
    ) -> VeilResult<RenderedFrame> {
        let canvas = frame.canvas();
        if canvas.width == 0 || canvas.height == 0 {
            return Err(VeilError::validation("cannot render onto an empty frame"));
        }
        let mut out = frame.clone();
        let mut skipped = Vec::new();

        let mut ordered: Vec<(&MosaicRegion, PixelRect)> = mosaics
            .iter()
            .map(|r| (*r, mapper::clamp(mapper::region_to_pixels(r, canvas), canvas)))
            .collect();
        // Stable: equal areas keep their list order.
        ordered.sort_by_key(|(_, rect)| std::cmp::Reverse(rect.area()));

        for (region, rect) in ordered {
            if let Err(error) = self.draw_mosaic(&mut out, region, rect) {
                tracing::warn!(id = %region.id, error = %error, "skipping mosaic region");
                skipped.push(SkippedEntity {
                    id: region.id.clone(),
                    error,
                });
            }
        }

        for overlay in texts {
            if let Err(error) = self.draw_text(&mut out, overlay) {
                tracing::warn!(id = %overlay.id, error = %error, "skipping text overlay");
                skipped.push(SkippedEntity {
                    id: overlay.id.clone(),
                    error,
                });
            }
        }

        Ok(RenderedFrame {
            frame: out,
            skipped,
        })
    }

    fn draw_mosaic(
        &mut self,
        frame: &mut FrameRGBA,
        region: &MosaicRegion,
        rect: PixelRect,
    ) -> VeilResult<()> {
        let strength = region.blur_strength_or(self.default_blur_strength);
        if !strength.is_finite() || strength < 0.0 {
            return Err(VeilError::render_entity(format!(
                "mosaic '{}' has invalid blur strength {strength}",
                region.id
            )));
        }
        let patch = frame.crop(rect).map_err(entity_err)?;
        let blurred = self
            .blur
            .blur_patch(&patch, rect.width as u32, rect.height as u32, strength)
            .map_err(entity_err)?;
        frame.paste(rect, &blurred).map_err(entity_err)
    }

    fn draw_text(&mut self, frame: &mut FrameRGBA, overlay: &TextOverlay) -> VeilResult<()> {
        let color = parse_color(&overlay.font_color).map_err(entity_err)?;
        let background = overlay
            .background_color
            .as_deref()
            .map(parse_color)
            .transpose()
            .map_err(entity_err)?;
        let size = overlay.font_size as f32;

        let brush = TextBrushRgba8 {
            r: color.r,
            g: color.g,
            b: color.b,
            a: color.a,
        };
        let layout = self
            .text
            .layout_line(&overlay.text, size, brush)
            .map_err(entity_err)?;
        let font = self
            .text
            .font()
            .map(|f| f.data.clone())
            .ok_or_else(|| VeilError::render_entity("no font loaded for text overlays"))?;

        let pad = f64::from(self.text_padding_px);
        let text_w = f64::from(layout.width()).ceil();
        let text_h = f64::from(layout.height()).max(overlay.font_size * 1.2).ceil();
        let box_w = text_w + 2.0 * pad;
        let box_h = text_h + 2.0 * pad;
        let (px, py) = mapper::overlay_to_pixels(overlay, frame.canvas());
        let origin_x = px - self.text_padding_px as i64;
        let origin_y = py - self.text_padding_px as i64;

        let w16: u16 = (box_w as u32)
            .max(1)
            .try_into()
            .map_err(|_| VeilError::render_entity("text box width exceeds u16"))?;
        let h16: u16 = (box_h as u32)
            .max(1)
            .try_into()
            .map_err(|_| VeilError::render_entity("text box height exceeds u16"))?;

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);

        if let Some(Rgba8 { r, g, b, a }) = background {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, box_w, box_h));
        }

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((pad, pad)));
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
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        composite_premul(frame, pixmap.data_as_u8_slice(), w16, h16, origin_x, origin_y);
        Ok(())
    }
}

fn entity_err(e: VeilError) -> VeilError {
    match e {
        VeilError::RenderEntity(_) => e,
        other => VeilError::render_entity(other.to_string()),
    }
}

/// Source-over a premultiplied patch onto the frame at `(ox, oy)`, clipping to the frame.
fn composite_premul(frame: &mut FrameRGBA, patch: &[u8], pw: u16, ph: u16, ox: i64, oy: i64) {
    let fw = i64::from(frame.width);
    let fh = i64::from(frame.height);
    let pw = i64::from(pw);
    let ph = i64::from(ph);
    for py in 0..ph {
        let fy = oy + py;
        if fy < 0 || fy >= fh {
            continue;
        }
        for px in 0..pw {
            let fx = ox + px;
            if fx < 0 || fx >= fw {
                continue;
            }
            let si = ((py * pw + px) * 4) as usize;
            let di = ((fy * fw + fx) * 4) as usize;
            let src = [patch[si], patch[si + 1], patch[si + 2], patch[si + 3]];
            blend_premul_over_opaque(&mut frame.data[di..di + 4], src);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/renderer.rs"]
mod tests;
