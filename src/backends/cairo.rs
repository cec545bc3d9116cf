//! Cairo backend behind the optional `cairo` crate feature.
//!
//! Draws into a cairo image surface at device resolution and mirrors it into
//! a packed buffer in the surface's [`PixelFormat`] on demand. Cairo has no
//! shadow support of its own, so shadows are synthesized by the context.

use cairo::{Context, Extend, Filter, FontSlant, FontWeight, Format, ImageSurface, SurfacePattern};

use crate::api::storage::PixelStorage;
use crate::api::{
    Capabilities, ImageView, Operator, PixelFormat, PixelSurface, RenderMode, RenderParams,
    Surface, TextRun,
};
use crate::error::{PenumbraError, Result};
use crate::geometry::{Path, PathComponent, Point, arc_sweep};
use crate::style::{Font, GradientKind, Style};
use crate::text::{BlockGlyphs, TextEngine, TextMetrics, place_text};

pub struct CairoSurface {
    logical_width: u32,
    logical_height: u32,
    format: PixelFormat,
    surface: ImageSurface,
    memory: Vec<u8>,
    memory_stale: bool,
    surface_stale: bool,
}

impl CairoSurface {
    pub fn new(
        logical_width: u32,
        logical_height: u32,
        scale: f64,
        format: PixelFormat,
    ) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(PenumbraError::InvalidDimensions {
                width: logical_width,
                height: logical_height,
            });
        }
        Self::with_sizes(
            logical_width,
            logical_height,
            (logical_width as f64 * scale).round() as u32,
            (logical_height as f64 * scale).round() as u32,
            format,
        )
    }

    fn with_sizes(
        logical_width: u32,
        logical_height: u32,
        actual_width: u32,
        actual_height: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        if logical_width == 0 || logical_height == 0 || actual_width == 0 || actual_height == 0 {
            return Err(PenumbraError::InvalidDimensions {
                width: actual_width,
                height: actual_height,
            });
        }
        let surface = ImageSurface::create(
            cairo_format(format),
            actual_width as i32,
            actual_height as i32,
        )?;
        Ok(Self {
            logical_width,
            logical_height,
            format,
            surface,
            memory: vec![0; format.buffer_len(actual_width, actual_height)],
            memory_stale: false,
            surface_stale: false,
        })
    }

    /// Writes the packed buffer back into the cairo surface if it was changed.
    fn sync_surface(&mut self) -> Result<()> {
        if !self.surface_stale {
            return Ok(());
        }
        let width = self.surface.width() as usize;
        let stride = self.surface.stride() as usize;
        let format = self.format;
        self.surface.flush();
        {
            let mut data = self.surface.data()?;
            let bpp = format.bytes_per_pixel();
            for (row, packed) in data
                .chunks_mut(stride)
                .zip(self.memory.chunks_exact(width * bpp))
            {
                for (x, px) in packed.chunks_exact(bpp).enumerate() {
                    match format {
                        PixelFormat::Alpha8 => row[x] = px[0],
                        PixelFormat::Rgb8 => {
                            let v = u32::from_be_bytes([0xff, px[0], px[1], px[2]]);
                            row[x * 4..x * 4 + 4].copy_from_slice(&v.to_ne_bytes());
                        }
                        PixelFormat::Rgba8 => {
                            let v = u32::from_be_bytes([px[3], px[0], px[1], px[2]]);
                            row[x * 4..x * 4 + 4].copy_from_slice(&v.to_ne_bytes());
                        }
                    }
                }
            }
        }
        self.surface.mark_dirty();
        self.surface_stale = false;
        Ok(())
    }

    /// Cairo context in logical units with the clip and operator applied.
    fn context(&mut self, params: &RenderParams) -> Result<Context> {
        self.sync_surface()?;
        let ctx = Context::new(&self.surface)?;
        let scale = self.display_scale();
        ctx.scale(scale, scale);
        if !params.clip.is_empty() {
            trace_path(&ctx, params.clip);
            ctx.clip();
        }
        ctx.set_operator(match params.op {
            Operator::SourceOver => cairo::Operator::Over,
            Operator::Copy => cairo::Operator::Source,
        });
        self.memory_stale = true;
        Ok(ctx)
    }
}

impl Surface for CairoSurface {
    type Scratch = CairoSurface;

    fn logical_width(&self) -> u32 {
        self.logical_width
    }

    fn logical_height(&self) -> u32 {
        self.logical_height
    }

    fn actual_width(&self) -> u32 {
        self.surface.width() as u32
    }

    fn actual_height(&self) -> u32 {
        self.surface.height() as u32
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    fn create_scratch(
        &self,
        logical_width: u32,
        logical_height: u32,
        format: PixelFormat,
    ) -> Result<CairoSurface> {
        CairoSurface::new(logical_width, logical_height, self.display_scale(), format)
    }

    fn resize(
        &mut self,
        logical_width: u32,
        logical_height: u32,
        actual_width: u32,
        actual_height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        *self = Self::with_sizes(
            logical_width,
            logical_height,
            actual_width,
            actual_height,
            format,
        )?;
        Ok(())
    }

    fn render_path(
        &mut self,
        mode: RenderMode,
        path: &Path,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()> {
        if path.is_empty() {
            return Ok(());
        }
        let ctx = self.context(params)?;
        apply_style(&ctx, style, params.global_alpha)?;
        trace_path(&ctx, path);
        match mode {
            RenderMode::Fill => ctx.fill()?,
            RenderMode::Stroke => {
                ctx.set_line_width(params.line_width);
                ctx.stroke()?;
            }
        }
        Ok(())
    }

    fn render_text(
        &mut self,
        mode: RenderMode,
        run: &TextRun,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()> {
        let metrics = self.measure_text(run.font, run.text);
        let origin = place_text(&metrics, run.origin, run.align, run.baseline);
        let ctx = self.context(params)?;
        apply_font(&ctx, run.font);
        apply_style(&ctx, style, params.global_alpha)?;
        ctx.move_to(origin.x, origin.y);
        match mode {
            RenderMode::Fill => ctx.show_text(run.text)?,
            RenderMode::Stroke => {
                ctx.set_line_width(params.line_width);
                ctx.text_path(run.text);
                ctx.stroke()?;
            }
        }
        Ok(())
    }

    /// Measured with cairo's toy font API, falling back to block glyph
    /// metrics when cairo cannot provide extents.
    fn measure_text(&self, font: &Font, text: &str) -> TextMetrics {
        toy_metrics(&self.surface, font, text).unwrap_or_else(|err| {
            log::debug!(target: "penumbra", "cairo text extents unavailable: {}", err);
            BlockGlyphs.measure(font, text)
        })
    }

    fn draw_image(
        &mut self,
        image: &ImageView,
        origin: Point,
        width: f64,
        height: f64,
        params: &RenderParams,
    ) -> Result<()> {
        if image.width == 0 || image.height == 0 || width <= 0.0 || height <= 0.0 {
            return Ok(());
        }
        let source = image_surface_from_view(image)?;
        let pattern = SurfacePattern::create(&source);
        pattern.set_filter(if params.image_smoothing {
            Filter::Good
        } else {
            Filter::Nearest
        });
        pattern.set_extend(Extend::None);

        let ctx = self.context(params)?;
        ctx.translate(origin.x, origin.y);
        ctx.scale(width / image.width as f64, height / image.height as f64);
        ctx.set_source(&pattern)?;
        ctx.rectangle(0.0, 0.0, image.width as f64, image.height as f64);
        ctx.clip();
        ctx.paint_with_alpha(params.global_alpha)?;
        Ok(())
    }
}

impl PixelSurface for CairoSurface {}

impl PixelStorage for CairoSurface {
    fn flush(&mut self) -> Result<()> {
        if !self.memory_stale {
            return Ok(());
        }
        let width = self.surface.width() as usize;
        let stride = self.surface.stride() as usize;
        let format = self.format;
        let bpp = format.bytes_per_pixel();
        self.surface.flush();
        let data = self.surface.data()?;
        for (row, packed) in data
            .chunks(stride)
            .zip(self.memory.chunks_exact_mut(width * bpp))
        {
            for (x, px) in packed.chunks_exact_mut(bpp).enumerate() {
                if format == PixelFormat::Alpha8 {
                    px[0] = row[x];
                    continue;
                }
                let mut word = [0u8; 4];
                word.copy_from_slice(&row[x * 4..x * 4 + 4]);
                let [a, r, g, b] = u32::from_ne_bytes(word).to_be_bytes();
                px[..3].copy_from_slice(&[r, g, b]);
                if format == PixelFormat::Rgba8 {
                    px[3] = a;
                }
            }
        }
        self.memory_stale = false;
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.surface_stale = true;
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

fn cairo_format(format: PixelFormat) -> Format {
    match format {
        PixelFormat::Alpha8 => Format::A8,
        PixelFormat::Rgb8 => Format::Rgb24,
        PixelFormat::Rgba8 => Format::ARgb32,
    }
}

fn trace_path(ctx: &Context, path: &Path) {
    ctx.new_path();
    for component in path.components() {
        match *component {
            PathComponent::MoveTo { x, y } => ctx.move_to(x, y),
            PathComponent::LineTo { x, y } => ctx.line_to(x, y),
            PathComponent::Arc {
                x,
                y,
                radius,
                start_angle,
                end_angle,
                anticlockwise,
            } => {
                let sweep = arc_sweep(start_angle, end_angle, anticlockwise);
                if sweep >= 0.0 {
                    ctx.arc(x, y, radius.max(0.0), start_angle, start_angle + sweep);
                } else {
                    ctx.arc_negative(x, y, radius.max(0.0), start_angle, start_angle + sweep);
                }
            }
            PathComponent::Close => ctx.close_path(),
        }
    }
}

fn apply_style(ctx: &Context, style: &Style, global_alpha: f64) -> Result<()> {
    match style {
        Style::Color(c) => {
            ctx.set_source_rgba(
                c.red as f64,
                c.green as f64,
                c.blue as f64,
                c.alpha as f64 * global_alpha,
            );
        }
        Style::Gradient(grad) => {
            let add_stops = |pattern: &cairo::Gradient| {
                for stop in grad.stops() {
                    let c = stop.color;
                    pattern.add_color_stop_rgba(
                        stop.offset,
                        c.red as f64,
                        c.green as f64,
                        c.blue as f64,
                        c.alpha as f64 * global_alpha,
                    );
                }
            };
            match grad.kind {
                GradientKind::Linear { x0, y0, x1, y1 } => {
                    let pattern = cairo::LinearGradient::new(x0, y0, x1, y1);
                    add_stops(&pattern);
                    ctx.set_source(&pattern)?;
                }
                GradientKind::Radial {
                    x0,
                    y0,
                    r0,
                    x1,
                    y1,
                    r1,
                } => {
                    let pattern = cairo::RadialGradient::new(x0, y0, r0, x1, y1, r1);
                    add_stops(&pattern);
                    ctx.set_source(&pattern)?;
                }
            }
        }
    }
    Ok(())
}

fn apply_font(ctx: &Context, font: &Font) {
    ctx.select_font_face(&font.family, FontSlant::Normal, FontWeight::Normal);
    ctx.set_font_size(font.size);
}

fn toy_metrics(surface: &ImageSurface, font: &Font, text: &str) -> Result<TextMetrics> {
    let ctx = Context::new(surface)?;
    apply_font(&ctx, font);
    let extents = ctx.text_extents(text)?;
    let font_extents = ctx.font_extents()?;
    Ok(TextMetrics {
        width: extents.x_advance(),
        ascent: font_extents.ascent(),
        descent: font_extents.descent(),
    })
}

/// Cairo ARgb32 expects premultiplied alpha with native-endian (BGRA on little-endian).
fn image_surface_from_view(image: &ImageView) -> Result<ImageSurface> {
    let width = image.width as usize;
    let stride = Format::ARgb32.stride_for_width(image.width)? as usize;
    let mut buf = vec![0u8; stride * image.height as usize];
    let rgba = image.to_rgba();
    for (row, src) in buf.chunks_exact_mut(stride).zip(rgba.chunks_exact(width * 4)) {
        for (x, px) in src.chunks_exact(4).enumerate() {
            let v = u32::from_be_bytes([px[3], px[0], px[1], px[2]]);
            row[x * 4..x * 4 + 4].copy_from_slice(&v.to_ne_bytes());
        }
    }
    Ok(ImageSurface::create_for_data(
        buf,
        Format::ARgb32,
        image.width as i32,
        image.height as i32,
        stride as i32,
    )?)
}
