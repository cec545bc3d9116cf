//! Backend contract. Every drawing target implements [`Surface`]; targets that
//! own addressable pixels also implement [`PixelSurface`], which provides the
//! software blur and colorize filters used for shadow synthesis.

use std::ops::{Deref, DerefMut};

use crate::error::{PenumbraError, Result};
use crate::filter;
use crate::geometry::{Path, Point};
use crate::style::{Color, Font, Style, TextAlign, TextBaseline};
use crate::text::TextMetrics;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Alpha8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Alpha8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    pub const fn can_be_shadow_mask(self) -> bool {
        matches!(self, PixelFormat::Alpha8)
    }

    pub const fn is_composite_target(self) -> bool {
        matches!(self, PixelFormat::Rgb8 | PixelFormat::Rgba8)
    }

    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

/// Composition operator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Operator {
    /// Alpha-blend over the destination.
    #[default]
    SourceOver,
    /// Replace destination pixels outright.
    Copy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Fill,
    Stroke,
}

/// What a backend can do without help from the context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub native_shadows: bool,
    pub native_blur: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        native_shadows: false,
        native_blur: false,
    };
    pub const NATIVE: Capabilities = Capabilities {
        native_shadows: true,
        native_blur: true,
    };
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shadow {
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub color: Color,
}

impl Default for Shadow {
    fn default() -> Self {
        Self::NONE
    }
}

impl Shadow {
    pub const NONE: Shadow = Shadow {
        blur: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
        color: Color::TRANSPARENT,
    };

    /// A shadow is cast when it is blurred or displaced.
    pub fn is_active(&self) -> bool {
        self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0
    }

    /// Integer padding around a shadow mask, `ceil(blur)`.
    pub fn inset(&self) -> u32 {
        if self.blur > 0.0 {
            self.blur.ceil() as u32
        } else {
            0
        }
    }
}

/// Everything a backend needs besides the geometry and the paint.
#[derive(Clone, Copy, Debug)]
pub struct RenderParams<'a> {
    pub line_width: f64,
    pub op: Operator,
    pub display_scale: f64,
    pub global_alpha: f64,
    pub shadow: Shadow,
    /// Logical-space clip. An empty path does not clip.
    pub clip: &'a Path,
    pub image_smoothing: bool,
}

impl<'a> RenderParams<'a> {
    pub fn without_shadow(self) -> Self {
        Self {
            shadow: Shadow::NONE,
            ..self
        }
    }

    pub fn with_clip(self, clip: &'a Path) -> Self {
        Self { clip, ..self }
    }
}

/// Single line of text anchored at `origin` in logical space.
#[derive(Clone, Copy, Debug)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub origin: Point,
    pub font: &'a Font,
    pub align: TextAlign,
    pub baseline: TextBaseline,
}

impl TextRun<'_> {
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            origin: self.origin.offset(dx, dy),
            ..self
        }
    }
}

/// Borrowed pixels in the crate's packed layout (see [`PixelFormat`]).
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl<'a> ImageView<'a> {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: &'a [u8]) -> Result<Self> {
        let expected = format.buffer_len(width, height);
        if data.len() != expected {
            return Err(PenumbraError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Premultiplied RGBA of the pixel at `(x, y)`.
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let bpp = self.format.bytes_per_pixel();
        let i = (y as usize * self.width as usize + x as usize) * bpp;
        match self.format {
            PixelFormat::Alpha8 => [0, 0, 0, self.data[i]],
            PixelFormat::Rgb8 => [self.data[i], self.data[i + 1], self.data[i + 2], 255],
            PixelFormat::Rgba8 => [
                self.data[i],
                self.data[i + 1],
                self.data[i + 2],
                self.data[i + 3],
            ],
        }
    }

    /// Expands to premultiplied RGBA regardless of the source format.
    pub fn to_rgba(&self) -> Vec<u8> {
        if self.format == PixelFormat::Rgba8 {
            return self.data.to_vec();
        }
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                out.extend_from_slice(&self.rgba_at(x, y));
            }
        }
        out
    }
}

/// A drawing target.
pub trait Surface {
    /// Pixel-backed surface used for offscreen shadow masks.
    type Scratch: PixelSurface;

    /// Width in display-independent units.
    fn logical_width(&self) -> u32;
    /// Height in display-independent units.
    fn logical_height(&self) -> u32;
    /// Width in device pixels.
    fn actual_width(&self) -> u32;
    /// Height in device pixels.
    fn actual_height(&self) -> u32;
    fn format(&self) -> PixelFormat;

    /// Device pixels per logical unit.
    fn display_scale(&self) -> f64 {
        if self.logical_width() == 0 {
            return 1.0;
        }
        self.actual_width() as f64 / self.logical_width() as f64
    }

    fn capabilities(&self) -> Capabilities;

    /// Creates a blank pixel surface at this surface's display scale.
    fn create_scratch(
        &self,
        logical_width: u32,
        logical_height: u32,
        format: PixelFormat,
    ) -> Result<Self::Scratch>;

    /// Reallocates backing storage. Previous contents are discarded.
    fn resize(
        &mut self,
        logical_width: u32,
        logical_height: u32,
        actual_width: u32,
        actual_height: u32,
        format: PixelFormat,
    ) -> Result<()>;

    /// Fills or strokes a logical-space path. Shadow parameters are honored
    /// only by backends with native shadow support.
    fn render_path(
        &mut self,
        mode: RenderMode,
        path: &Path,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()>;

    fn render_text(
        &mut self,
        mode: RenderMode,
        run: &TextRun,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()>;

    fn measure_text(&self, font: &Font, text: &str) -> TextMetrics;

    /// Draws `image` scaled into the logical rectangle at `origin`.
    fn draw_image(
        &mut self,
        image: &ImageView,
        origin: Point,
        width: f64,
        height: f64,
        params: &RenderParams,
    ) -> Result<()>;
}

pub(crate) mod storage {
    use crate::error::Result;

    /// Raw buffer access behind [`PixelSurface`](super::PixelSurface). Not
    /// nameable outside the crate, so callers go through the pixel locks.
    pub trait PixelStorage {
        /// Brings memory up to date with pending native rendering.
        fn flush(&mut self) -> Result<()>;
        /// Records that memory was written so native state must be re-derived.
        fn mark_dirty(&mut self);
        fn memory(&self) -> &[u8];
        fn memory_mut(&mut self) -> &mut [u8];
    }
}

use storage::PixelStorage;

/// A surface whose pixels can be read and written directly.
///
/// Pixels are only reachable through a lock. A [`PixelLock`] is read-only:
///
/// ```compile_fail
/// use penumbra::{PixelFormat, PixelSurface, RasterSurface};
///
/// let mut surface = RasterSurface::new(2, 2, 1.0, PixelFormat::Rgba8).unwrap();
/// let mut lock = surface.lock_memory().unwrap();
/// lock[0] = 255;
/// ```
///
/// Writes go through a [`PixelLockMut`], which marks the surface dirty when
/// dropped.
pub trait PixelSurface: Surface + PixelStorage + Sized {
    /// Flushes pending rendering and hands out read-only pixel access.
    fn lock_memory(&mut self) -> Result<PixelLock<'_, Self>> {
        self.flush()?;
        Ok(PixelLock { surface: self })
    }

    /// Flushes pending rendering and hands out writable pixel access.
    fn lock_memory_mut(&mut self) -> Result<PixelLockMut<'_, Self>> {
        self.flush()?;
        Ok(PixelLockMut { surface: self })
    }

    fn with_pixels<R>(&mut self, f: impl FnOnce(&PixelLock<'_, Self>) -> R) -> Result<R> {
        let lock = self.lock_memory()?;
        Ok(f(&lock))
    }

    fn with_pixels_mut<R>(
        &mut self,
        f: impl FnOnce(&mut PixelLockMut<'_, Self>) -> R,
    ) -> Result<R> {
        let mut lock = self.lock_memory_mut()?;
        Ok(f(&mut lock))
    }

    /// Separable Gaussian blur over every channel, radii in device pixels.
    fn gaussian_blur(&mut self, h_radius: f64, v_radius: f64) -> Result<()> {
        let (width, height) = (self.actual_width(), self.actual_height());
        let bpp = self.format().bytes_per_pixel();
        self.with_pixels_mut(|pixels| {
            filter::gaussian_blur(pixels, width, height, bpp, h_radius, v_radius)
        })?
    }

    /// Per-pixel reference blur; same output as [`PixelSurface::gaussian_blur`].
    fn slow_blur(&mut self, h_radius: f64, v_radius: f64) -> Result<()> {
        let (width, height) = (self.actual_width(), self.actual_height());
        let bpp = self.format().bytes_per_pixel();
        self.with_pixels_mut(|pixels| {
            filter::slow_blur(pixels, width, height, bpp, h_radius, v_radius)
        })?
    }

    /// Uses `self` as an alpha mask and writes `color` premultiplied by the
    /// mask into `dest`, which must have the same device size.
    fn colorize<D: PixelSurface>(&mut self, color: Color, dest: &mut D) -> Result<()> {
        if self.actual_width() != dest.actual_width()
            || self.actual_height() != dest.actual_height()
        {
            return Err(PenumbraError::SizeMismatch {
                source_width: self.actual_width(),
                source_height: self.actual_height(),
                target_width: dest.actual_width(),
                target_height: dest.actual_height(),
            });
        }
        let (mask_format, dest_format) = (self.format(), dest.format());
        let mask = self.lock_memory()?;
        let mut target = dest.lock_memory_mut()?;
        filter::colorize(&mask, mask_format, color, &mut target, dest_format);
        Ok(())
    }
}

fn view_of<S: PixelSurface>(surface: &S) -> ImageView<'_> {
    ImageView {
        width: surface.actual_width(),
        height: surface.actual_height(),
        format: surface.format(),
        data: surface.memory(),
    }
}

/// Read-only pixel access. Derefs to the surface's packed bytes.
pub struct PixelLock<'a, S: PixelSurface> {
    surface: &'a S,
}

impl<S: PixelSurface> PixelLock<'_, S> {
    pub fn view(&self) -> ImageView<'_> {
        view_of(self.surface)
    }
}

impl<S: PixelSurface> Deref for PixelLock<'_, S> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.surface.memory()
    }
}

/// Writable pixel access. Dropping it marks the surface dirty.
pub struct PixelLockMut<'a, S: PixelSurface> {
    surface: &'a mut S,
}

impl<S: PixelSurface> PixelLockMut<'_, S> {
    pub fn view(&self) -> ImageView<'_> {
        view_of(&*self.surface)
    }
}

impl<S: PixelSurface> Deref for PixelLockMut<'_, S> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.surface.memory()
    }
}

impl<S: PixelSurface> DerefMut for PixelLockMut<'_, S> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.surface.memory_mut()
    }
}

impl<S: PixelSurface> Drop for PixelLockMut<'_, S> {
    fn drop(&mut self) {
        self.surface.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PixelFormat::Alpha8, 1, true, false)]
    #[case(PixelFormat::Rgb8, 3, false, true)]
    #[case(PixelFormat::Rgba8, 4, false, true)]
    fn pixel_format_table(
        #[case] format: PixelFormat,
        #[case] bpp: usize,
        #[case] mask: bool,
        #[case] target: bool,
    ) {
        assert_eq!(format.bytes_per_pixel(), bpp);
        assert_eq!(format.can_be_shadow_mask(), mask);
        assert_eq!(format.is_composite_target(), target);
        assert_eq!(format.buffer_len(3, 2), 6 * bpp);
    }

    #[test]
    fn shadow_activity() {
        assert!(!Shadow::NONE.is_active());
        let blurred = Shadow {
            blur: 0.5,
            ..Shadow::NONE
        };
        assert!(blurred.is_active());
        assert_eq!(blurred.inset(), 1);
        let offset = Shadow {
            offset_y: -1.0,
            ..Shadow::NONE
        };
        assert!(offset.is_active());
        assert_eq!(offset.inset(), 0);
    }

    #[test]
    fn writes_through_the_lock_survive_later_rendering() {
        use crate::backends::raster::RasterSurface;
        use crate::context::Context;

        let mut surface = RasterSurface::new(4, 2, 1.0, PixelFormat::Rgba8).unwrap();
        {
            let mut lock = surface.lock_memory_mut().unwrap();
            lock[..4].copy_from_slice(&[0, 0, 255, 255]);
        }
        let mut ctx = Context::new(surface);
        ctx.set_fill_style(Color::new(0.0, 1.0, 0.0, 1.0));
        ctx.fill_rect(2.0, 0.0, 2.0, 2.0).unwrap();

        let (written, drawn, untouched) = ctx
            .surface_mut()
            .with_pixels(|px| {
                let view = px.view();
                (view.rgba_at(0, 0), view.rgba_at(3, 1), view.rgba_at(1, 1))
            })
            .unwrap();
        assert_eq!(written, [0, 0, 255, 255]);
        assert_eq!(drawn, [0, 255, 0, 255]);
        assert_eq!(untouched, [0, 0, 0, 0]);
    }

    #[test]
    fn image_view_checks_length_and_expands() {
        assert!(ImageView::new(2, 2, PixelFormat::Rgb8, &[0; 11]).is_err());
        let data = [10, 20, 30, 40, 50, 60];
        let view = ImageView::new(2, 1, PixelFormat::Rgb8, &data).unwrap();
        assert_eq!(view.to_rgba(), vec![10, 20, 30, 255, 40, 50, 60, 255]);
        let alpha = [7u8];
        let view = ImageView::new(1, 1, PixelFormat::Alpha8, &alpha).unwrap();
        assert_eq!(view.rgba_at(0, 0), [0, 0, 0, 7]);
    }
}
