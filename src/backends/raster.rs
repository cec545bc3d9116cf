//! Software backend on tiny-skia.
//!
//! Drawing happens in a premultiplied RGBA pixmap at device resolution. The
//! surface also keeps a packed buffer in its own [`PixelFormat`]; the two are
//! synchronized lazily: rendering marks the buffer stale, and a write lock
//! marks the pixmap stale.

use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

use tiny_skia::{
    BlendMode, FillRule, FilterQuality, GradientStop, LinearGradient, Mask, Paint, PathBuilder,
    Pixmap, PixmapPaint, PixmapRef, RadialGradient, Shader, SpreadMode, Stroke, Transform,
};

use crate::api::storage::PixelStorage;
use crate::api::{
    Capabilities, ImageView, Operator, PixelFormat, PixelSurface, RenderMode, RenderParams,
    Surface, TextRun,
};
use crate::error::{PenumbraError, Result};
use crate::geometry::{Path, PathComponent, Point, arc_sweep};
use crate::image::Image;
use crate::style::{Color, Font, Gradient, GradientKind, Style};
use crate::text::{BlockGlyphs, TextEngine, TextMetrics};

pub struct RasterSurface {
    logical_width: u32,
    logical_height: u32,
    format: PixelFormat,
    pixmap: Pixmap,
    memory: Vec<u8>,
    memory_stale: bool,
    pixmap_stale: bool,
    text: Rc<dyn TextEngine>,
}

impl RasterSurface {
    /// Blank surface of `logical_width x logical_height` units at `scale`
    /// device pixels per unit.
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
        let actual_width = (logical_width as f64 * scale).round() as u32;
        let actual_height = (logical_height as f64 * scale).round() as u32;
        Self::with_sizes(
            logical_width,
            logical_height,
            actual_width,
            actual_height,
            format,
            Rc::new(BlockGlyphs),
        )
    }

    fn with_sizes(
        logical_width: u32,
        logical_height: u32,
        actual_width: u32,
        actual_height: u32,
        format: PixelFormat,
        text: Rc<dyn TextEngine>,
    ) -> Result<Self> {
        if logical_width == 0 || logical_height == 0 {
            return Err(PenumbraError::InvalidDimensions {
                width: logical_width,
                height: logical_height,
            });
        }
        let pixmap = Pixmap::new(actual_width, actual_height).ok_or(
            PenumbraError::InvalidDimensions {
                width: actual_width,
                height: actual_height,
            },
        )?;
        Ok(Self {
            logical_width,
            logical_height,
            format,
            pixmap,
            memory: vec![0; format.buffer_len(actual_width, actual_height)],
            memory_stale: false,
            pixmap_stale: false,
            text,
        })
    }

    /// Surface holding a copy of a decoded image, one unit per pixel.
    pub fn from_image(image: &Image) -> Result<Self> {
        let mut surface = Self::with_sizes(
            image.width(),
            image.height(),
            image.width(),
            image.height(),
            image.format(),
            Rc::new(BlockGlyphs),
        )?;
        surface.memory.copy_from_slice(image.data());
        surface.pixmap_stale = true;
        Ok(surface)
    }

    /// Decodes PNG, JPEG or GIF bytes into a new surface.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_image(&Image::from_bytes(bytes)?)
    }

    pub fn with_text_engine(mut self, engine: Rc<dyn TextEngine>) -> Self {
        self.text = engine;
        self
    }

    /// Uploads the packed buffer into the pixmap if it was written.
    fn sync_pixmap(&mut self) {
        if !self.pixmap_stale {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        for (dst, src) in self
            .pixmap
            .data_mut()
            .chunks_exact_mut(4)
            .zip(self.memory.chunks_exact(bpp))
        {
            match self.format {
                PixelFormat::Alpha8 => dst.copy_from_slice(&[0, 0, 0, src[0]]),
                PixelFormat::Rgb8 => dst.copy_from_slice(&[src[0], src[1], src[2], 255]),
                PixelFormat::Rgba8 => dst.copy_from_slice(src),
            }
        }
        self.pixmap_stale = false;
    }

    fn clip_mask(&self, clip: &Path, scale: f64) -> Option<Mask> {
        if clip.is_empty() {
            return None;
        }
        let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height())?;
        if let Some(path) = build_path(clip, scale) {
            mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
        }
        Some(mask)
    }
}

impl Surface for RasterSurface {
    type Scratch = RasterSurface;

    fn logical_width(&self) -> u32 {
        self.logical_width
    }

    fn logical_height(&self) -> u32 {
        self.logical_height
    }

    fn actual_width(&self) -> u32 {
        self.pixmap.width()
    }

    fn actual_height(&self) -> u32 {
        self.pixmap.height()
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
    ) -> Result<RasterSurface> {
        Ok(RasterSurface::new(logical_width, logical_height, self.display_scale(), format)?
            .with_text_engine(Rc::clone(&self.text)))
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
            Rc::clone(&self.text),
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
        let scale = self.display_scale();
        let Some(skia_path) = build_path(path, scale) else {
            return Ok(());
        };
        let Some(paint) = make_paint(style, params, scale) else {
            return Ok(());
        };
        self.sync_pixmap();
        let mask = self.clip_mask(params.clip, scale);
        match mode {
            RenderMode::Fill => self.pixmap.fill_path(
                &skia_path,
                &paint,
                FillRule::Winding,
                Transform::identity(),
                mask.as_ref(),
            ),
            RenderMode::Stroke => {
                let stroke = Stroke {
                    width: (params.line_width * scale) as f32,
                    ..Stroke::default()
                };
                self.pixmap.stroke_path(
                    &skia_path,
                    &paint,
                    &stroke,
                    Transform::identity(),
                    mask.as_ref(),
                )
            }
        }
        self.memory_stale = true;
        Ok(())
    }

    fn render_text(
        &mut self,
        mode: RenderMode,
        run: &TextRun,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()> {
        let outline = self.text.outline(run);
        self.render_path(mode, &outline, style, params)
    }

    fn measure_text(&self, font: &Font, text: &str) -> TextMetrics {
        self.text.measure(font, text)
    }

    fn draw_image(
        &mut self,
        image: &ImageView,
        origin: Point,
        width: f64,
        height: f64,
        params: &RenderParams,
    ) -> Result<()> {
        let rgba = image.to_rgba();
        let Some(source) = PixmapRef::from_bytes(&rgba, image.width, image.height) else {
            return Ok(());
        };
        let scale = self.display_scale();
        let transform = Transform::from_row(
            (width * scale / image.width as f64) as f32,
            0.0,
            0.0,
            (height * scale / image.height as f64) as f32,
            (origin.x * scale) as f32,
            (origin.y * scale) as f32,
        );
        let paint = PixmapPaint {
            opacity: params.global_alpha as f32,
            blend_mode: blend_mode(params.op),
            quality: if params.image_smoothing {
                FilterQuality::Bilinear
            } else {
                FilterQuality::Nearest
            },
        };
        self.sync_pixmap();
        let mask = self.clip_mask(params.clip, scale);
        self.pixmap
            .draw_pixmap(0, 0, source, &paint, transform, mask.as_ref());
        self.memory_stale = true;
        Ok(())
    }
}

impl PixelSurface for RasterSurface {}

impl PixelStorage for RasterSurface {
    fn flush(&mut self) -> Result<()> {
        if !self.memory_stale {
            return Ok(());
        }
        let bpp = self.format.bytes_per_pixel();
        for (dst, src) in self
            .memory
            .chunks_exact_mut(bpp)
            .zip(self.pixmap.data().chunks_exact(4))
        {
            match self.format {
                PixelFormat::Alpha8 => dst[0] = src[3],
                PixelFormat::Rgb8 => dst.copy_from_slice(&src[..3]),
                PixelFormat::Rgba8 => dst.copy_from_slice(src),
            }
        }
        self.memory_stale = false;
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.pixmap_stale = true;
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

fn blend_mode(op: Operator) -> BlendMode {
    match op {
        Operator::SourceOver => BlendMode::SourceOver,
        Operator::Copy => BlendMode::Source,
    }
}

fn skia_color(color: Color, global_alpha: f64) -> tiny_skia::Color {
    let [r, g, b, a] = color.with_alpha(color.alpha * global_alpha as f32).to_rgba8();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

fn make_paint(style: &Style, params: &RenderParams, scale: f64) -> Option<Paint<'static>> {
    let mut paint = Paint {
        anti_alias: true,
        blend_mode: blend_mode(params.op),
        ..Paint::default()
    };
    match style {
        Style::Color(color) => paint.set_color(skia_color(*color, params.global_alpha)),
        Style::Gradient(gradient) => {
            paint.shader = gradient_shader(gradient, params.global_alpha, scale)?;
        }
    }
    Some(paint)
}

fn gradient_shader(gradient: &Gradient, global_alpha: f64, scale: f64) -> Option<Shader<'static>> {
    if gradient.stops().is_empty() {
        return None;
    }
    let stops: Vec<GradientStop> = gradient
        .stops()
        .iter()
        .map(|stop| GradientStop::new(stop.offset as f32, skia_color(stop.color, global_alpha)))
        .collect();
    let point = |x: f64, y: f64| tiny_skia::Point::from_xy((x * scale) as f32, (y * scale) as f32);
    match gradient.kind {
        GradientKind::Linear { x0, y0, x1, y1 } => LinearGradient::new(
            point(x0, y0),
            point(x1, y1),
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ),
        // tiny-skia only knows two-point gradients with a zero start radius
        GradientKind::Radial {
            x0, y0, x1, y1, r1, ..
        } => RadialGradient::new(
            point(x0, y0),
            point(x1, y1),
            (r1 * scale) as f32,
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ),
    }
}

/// Converts a logical path to a device-space tiny-skia path.
fn build_path(path: &Path, scale: f64) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    let mut has_point = false;
    for component in path.components() {
        match *component {
            PathComponent::MoveTo { x, y } => {
                pb.move_to((x * scale) as f32, (y * scale) as f32);
                has_point = true;
            }
            PathComponent::LineTo { x, y } => {
                pb.line_to((x * scale) as f32, (y * scale) as f32);
                has_point = true;
            }
            PathComponent::Arc {
                x,
                y,
                radius,
                start_angle,
                end_angle,
                anticlockwise,
            } => {
                append_arc(
                    &mut pb,
                    Point::new(x * scale, y * scale),
                    radius * scale,
                    start_angle,
                    end_angle,
                    anticlockwise,
                    has_point,
                );
                has_point = true;
            }
            PathComponent::Close => pb.close(),
        }
    }
    pb.finish()
}

/// Appends a circular arc as cubic segments of at most a quarter turn. With
/// `connect` the arc is joined to the current point by a line.
fn append_arc(
    pb: &mut PathBuilder,
    center: Point,
    radius: f64,
    start: f64,
    end: f64,
    anticlockwise: bool,
    connect: bool,
) {
    let at = |angle: f64| {
        (
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        )
    };

    let sweep = arc_sweep(start, end, anticlockwise);
    let (sx, sy) = at(start);
    if connect {
        pb.line_to(sx as f32, sy as f32);
    } else {
        pb.move_to(sx as f32, sy as f32);
    }
    if radius <= 0.0 || sweep == 0.0 {
        return;
    }

    let segments = (sweep.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / segments as f64;
    let k = 4.0 / 3.0 * (step / 4.0).tan();
    for i in 0..segments {
        let a1 = start + step * i as f64;
        let a2 = a1 + step;
        let (x1, y1) = (a1.cos(), a1.sin());
        let (x2, y2) = (a2.cos(), a2.sin());
        let c1 = (
            center.x + radius * (x1 - k * y1),
            center.y + radius * (y1 + k * x1),
        );
        let c2 = (
            center.x + radius * (x2 + k * y2),
            center.y + radius * (y2 - k * x2),
        );
        let (ex, ey) = at(a2);
        pb.cubic_to(
            c1.0 as f32,
            c1.1 as f32,
            c2.0 as f32,
            c2.1 as f32,
            ex as f32,
            ey as f32,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn params(clip: &Path) -> RenderParams<'_> {
        RenderParams {
            line_width: 1.0,
            op: Operator::SourceOver,
            display_scale: 1.0,
            global_alpha: 1.0,
            shadow: crate::api::Shadow::NONE,
            clip,
            image_smoothing: true,
        }
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Path {
        let mut path = Path::new();
        path.rect(x, y, w, h);
        path
    }

    fn pixel(surface: &mut RasterSurface, x: u32, y: u32) -> [u8; 4] {
        let lock = surface.lock_memory().unwrap();
        lock.view().rgba_at(x, y)
    }

    const RED: Style = Style::Color(Color {
        red: 1.0,
        green: 0.0,
        blue: 0.0,
        alpha: 1.0,
    });

    #[test]
    fn rejects_zero_sizes() {
        assert!(RasterSurface::new(0, 5, 1.0, PixelFormat::Rgba8).is_err());
        assert!(RasterSurface::new(5, 5, 0.0, PixelFormat::Rgba8).is_err());
    }

    #[test]
    fn fills_rectangles() {
        let mut s = RasterSurface::new(10, 10, 1.0, PixelFormat::Rgba8).unwrap();
        let no_clip = Path::new();
        s.render_path(RenderMode::Fill, &rect(2.0, 2.0, 4.0, 4.0), &RED, &params(&no_clip))
            .unwrap();
        assert_eq!(pixel(&mut s, 3, 3), [255, 0, 0, 255]);
        assert_eq!(pixel(&mut s, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&mut s, 7, 7), [0, 0, 0, 0]);
    }

    #[test]
    fn alpha_surfaces_keep_coverage_only() {
        let mut s = RasterSurface::new(8, 8, 1.0, PixelFormat::Alpha8).unwrap();
        let no_clip = Path::new();
        s.render_path(RenderMode::Fill, &rect(0.0, 0.0, 4.0, 8.0), &RED, &params(&no_clip))
            .unwrap();
        let lock = s.lock_memory().unwrap();
        assert_eq!(lock.len(), 64);
        assert_eq!(lock[1], 255);
        assert_eq!(lock[6], 0);
    }

    #[test]
    fn display_scale_maps_logical_units() {
        let mut s = RasterSurface::new(5, 5, 2.0, PixelFormat::Rgba8).unwrap();
        assert_eq!((s.actual_width(), s.actual_height()), (10, 10));
        let no_clip = Path::new();
        s.render_path(RenderMode::Fill, &rect(1.0, 1.0, 2.0, 2.0), &RED, &params(&no_clip))
            .unwrap();
        assert_eq!(pixel(&mut s, 2, 2)[3], 255);
        assert_eq!(pixel(&mut s, 5, 5)[3], 255);
        assert_eq!(pixel(&mut s, 1, 1)[3], 0);
        assert_eq!(pixel(&mut s, 6, 6)[3], 0);
    }

    #[test]
    fn written_pixels_survive_later_rendering() {
        let mut s = RasterSurface::new(4, 4, 1.0, PixelFormat::Rgb8).unwrap();
        s.with_pixels_mut(|px| px[..3].copy_from_slice(&[1, 2, 3])).unwrap();
        let no_clip = Path::new();
        s.render_path(RenderMode::Fill, &rect(2.0, 2.0, 2.0, 2.0), &RED, &params(&no_clip))
            .unwrap();
        assert_eq!(pixel(&mut s, 0, 0), [1, 2, 3, 255]);
        assert_eq!(pixel(&mut s, 3, 3), [255, 0, 0, 255]);
    }

    #[test]
    fn clip_limits_drawing() {
        let mut s = RasterSurface::new(10, 10, 1.0, PixelFormat::Rgba8).unwrap();
        let clip = rect(0.0, 0.0, 5.0, 10.0);
        s.render_path(RenderMode::Fill, &rect(0.0, 0.0, 10.0, 10.0), &RED, &params(&clip))
            .unwrap();
        assert_eq!(pixel(&mut s, 2, 5)[3], 255);
        assert_eq!(pixel(&mut s, 8, 5)[3], 0);
    }

    #[test]
    fn copy_operator_replaces_pixels() {
        let mut s = RasterSurface::new(10, 10, 1.0, PixelFormat::Rgba8).unwrap();
        let no_clip = Path::new();
        s.render_path(RenderMode::Fill, &rect(0.0, 0.0, 10.0, 10.0), &RED, &params(&no_clip))
            .unwrap();
        let clear = RenderParams {
            op: Operator::Copy,
            ..params(&no_clip)
        };
        s.render_path(
            RenderMode::Fill,
            &rect(2.0, 2.0, 4.0, 4.0),
            &Style::Color(Color::TRANSPARENT),
            &clear,
        )
        .unwrap();
        assert_eq!(pixel(&mut s, 3, 3), [0, 0, 0, 0]);
        assert_eq!(pixel(&mut s, 8, 8), [255, 0, 0, 255]);
    }

    #[test]
    fn full_circle_arc_fills_disc() {
        let mut s = RasterSurface::new(20, 20, 1.0, PixelFormat::Alpha8).unwrap();
        let mut path = Path::new();
        path.arc(10.0, 10.0, 8.0, 0.0, 2.0 * PI, false);
        let no_clip = Path::new();
        s.render_path(RenderMode::Fill, &path, &RED, &params(&no_clip))
            .unwrap();
        let lock = s.lock_memory().unwrap();
        assert_eq!(lock[10 * 20 + 10], 255);
        assert_eq!(lock[10 * 20 + 4], 255);
        assert_eq!(lock[0], 0);
        assert_eq!(lock[19 * 20 + 19], 0);
    }

    #[test]
    fn draws_images_without_smoothing() {
        let mut s = RasterSurface::new(4, 4, 1.0, PixelFormat::Rgba8).unwrap();
        let data = [0, 0, 255, 255];
        let image = ImageView::new(1, 1, PixelFormat::Rgba8, &data).unwrap();
        let no_clip = Path::new();
        let p = RenderParams {
            image_smoothing: false,
            ..params(&no_clip)
        };
        s.draw_image(&image, Point::new(1.0, 1.0), 2.0, 2.0, &p).unwrap();
        assert_eq!(pixel(&mut s, 1, 1), [0, 0, 255, 255]);
        assert_eq!(pixel(&mut s, 2, 2), [0, 0, 255, 255]);
        assert_eq!(pixel(&mut s, 0, 0), [0, 0, 0, 0]);
        assert_eq!(pixel(&mut s, 3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn surfaces_load_from_images() {
        let image = Image::new(2, 1, PixelFormat::Rgb8, vec![9, 8, 7, 6, 5, 4]).unwrap();
        let mut s = RasterSurface::from_image(&image).unwrap();
        assert_eq!(s.format(), PixelFormat::Rgb8);
        assert_eq!(pixel(&mut s, 1, 0), [6, 5, 4, 255]);
        let png = crate::image::encode_png(&image.view()).unwrap();
        let mut decoded = RasterSurface::from_bytes(&png).unwrap();
        assert_eq!(pixel(&mut decoded, 0, 0), [9, 8, 7, 255]);
    }

    #[test]
    fn scratch_surfaces_share_scale() {
        let s = RasterSurface::new(10, 10, 2.0, PixelFormat::Rgba8).unwrap();
        let scratch = s.create_scratch(14, 14, PixelFormat::Alpha8).unwrap();
        assert_eq!(scratch.actual_width(), 28);
        assert_eq!(scratch.format(), PixelFormat::Alpha8);
    }
}
