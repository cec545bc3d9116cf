//! The stateful drawing API.
//!
//! A [`Context`] owns its default surface, the current drawing state and a
//! save/restore stack of state snapshots. Coordinates handed to path
//! building and text/image calls are mapped through the current transform
//! before they reach the surface, so surfaces only ever see logical space.
//!
//! Every mark goes through one decision: a surface with native shadows gets
//! the shadow parameters as-is; otherwise an active shadow is synthesized in
//! software (mask, blur, colorize, composite) before the mark is drawn with
//! the shadow zeroed.

use crate::api::{
    ImageView, Operator, PixelFormat, PixelSurface, RenderMode, RenderParams, Shadow, Surface,
    TextRun,
};
use crate::error::{PenumbraError, Result};
use crate::geometry::{Path, Point, Rect, Transform};
use crate::image::{Image, encode_png};
use crate::style::{Color, Font, Style, TextAlign, TextBaseline};
use crate::text::TextMetrics;

/// Everything `save()` snapshots and `restore()` brings back. The current
/// path is not part of it.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextState {
    pub transform: Transform,
    pub clip_path: Path,
    pub fill_style: Style,
    pub stroke_style: Style,
    pub line_width: f64,
    pub font: Font,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub global_alpha: f64,
    pub shadow: Shadow,
    pub operator: Operator,
    pub image_smoothing_enabled: bool,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            clip_path: Path::new(),
            fill_style: Style::default(),
            stroke_style: Style::default(),
            line_width: 1.0,
            font: Font::default(),
            text_align: TextAlign::default(),
            text_baseline: TextBaseline::default(),
            global_alpha: 1.0,
            shadow: Shadow::NONE,
            operator: Operator::SourceOver,
            image_smoothing_enabled: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HitRegion {
    pub id: String,
    pub bounds: Rect,
}

/// One drawing operation, independent of the surface it lands on.
enum Mark<'a> {
    Path {
        mode: RenderMode,
        path: &'a Path,
        style: &'a Style,
    },
    Text {
        mode: RenderMode,
        run: TextRun<'a>,
        style: &'a Style,
    },
    Image {
        image: &'a ImageView<'a>,
        origin: Point,
        width: f64,
        height: f64,
    },
}

impl Mark<'_> {
    fn is_visible(&self) -> bool {
        match self {
            Mark::Path { path, style, .. } => !path.is_empty() && style.is_renderable(),
            Mark::Text { run, style, .. } => !run.text.is_empty() && style.is_renderable(),
            Mark::Image { width, height, .. } => *width != 0.0 && *height != 0.0,
        }
    }

    fn draw<T: Surface>(&self, target: &mut T, params: &RenderParams) -> Result<()> {
        match self {
            Mark::Path { mode, path, style } => target.render_path(*mode, path, style, params),
            Mark::Text { mode, run, style } => target.render_text(*mode, run, style, params),
            Mark::Image {
                image,
                origin,
                width,
                height,
            } => target.draw_image(image, *origin, *width, *height, params),
        }
    }

    /// Draws the mark's silhouette in opaque black, displaced by `(dx, dy)`.
    fn draw_silhouette<T: Surface>(
        &self,
        target: &mut T,
        dx: f64,
        dy: f64,
        params: &RenderParams,
    ) -> Result<()> {
        let black = Style::Color(Color::BLACK);
        match self {
            Mark::Path { mode, path, .. } => {
                target.render_path(*mode, &path.translated(dx, dy), &black, params)
            }
            Mark::Text { mode, run, .. } => {
                target.render_text(*mode, &run.offset(dx, dy), &black, params)
            }
            Mark::Image {
                image,
                origin,
                width,
                height,
            } => target.draw_image(image, origin.offset(dx, dy), *width, *height, params),
        }
    }
}

pub struct Context<S: Surface> {
    surface: S,
    state: ContextState,
    stack: Vec<ContextState>,
    current_path: Path,
    hit_regions: Vec<HitRegion>,
}

impl<S: Surface> Context<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: ContextState::default(),
            stack: Vec::new(),
            current_path: Path::new(),
            hit_regions: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn state(&self) -> &ContextState {
        &self.state
    }

    pub fn display_scale(&self) -> f64 {
        self.surface.display_scale()
    }

    // --- State stack ---

    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// Pops the last saved state. Does nothing when nothing was saved.
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Resizes the default surface, keeping its display scale and format.
    /// Hit regions are dropped since they are position-indexed.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(PenumbraError::InvalidDimensions { width, height });
        }
        let scale = self.surface.display_scale();
        let actual_width = (width as f64 * scale).round().max(1.0) as u32;
        let actual_height = (height as f64 * scale).round().max(1.0) as u32;
        let format = self.surface.format();
        log::debug!(
            target: "penumbra",
            "resize to {}x{} ({}x{} device)",
            width,
            height,
            actual_width,
            actual_height
        );
        self.surface
            .resize(width, height, actual_width, actual_height, format)?;
        self.hit_regions.clear();
        Ok(())
    }

    // --- Styles and compositing ---

    pub fn set_fill_style(&mut self, style: impl Into<Style>) {
        self.state.fill_style = style.into();
    }

    pub fn fill_style(&self) -> &Style {
        &self.state.fill_style
    }

    pub fn set_stroke_style(&mut self, style: impl Into<Style>) {
        self.state.stroke_style = style.into();
    }

    pub fn stroke_style(&self) -> &Style {
        &self.state.stroke_style
    }

    /// Non-positive and non-finite widths are ignored.
    pub fn set_line_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    pub fn line_width(&self) -> f64 {
        self.state.line_width
    }

    /// Values outside `[0, 1]` are ignored.
    pub fn set_global_alpha(&mut self, alpha: f64) {
        if (0.0..=1.0).contains(&alpha) {
            self.state.global_alpha = alpha;
        }
    }

    pub fn global_alpha(&self) -> f64 {
        self.state.global_alpha
    }

    pub fn set_global_composite_operation(&mut self, op: Operator) {
        self.state.operator = op;
    }

    pub fn global_composite_operation(&self) -> Operator {
        self.state.operator
    }

    pub fn set_image_smoothing_enabled(&mut self, enabled: bool) {
        self.state.image_smoothing_enabled = enabled;
    }

    pub fn image_smoothing_enabled(&self) -> bool {
        self.state.image_smoothing_enabled
    }

    pub fn set_font(&mut self, font: Font) {
        self.state.font = font;
    }

    pub fn font(&self) -> &Font {
        &self.state.font
    }

    pub fn set_text_align(&mut self, align: TextAlign) {
        self.state.text_align = align;
    }

    pub fn text_align(&self) -> TextAlign {
        self.state.text_align
    }

    pub fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state.text_baseline = baseline;
    }

    pub fn text_baseline(&self) -> TextBaseline {
        self.state.text_baseline
    }

    // --- Shadows ---

    pub fn set_shadow(&mut self, shadow: Shadow) {
        self.state.shadow = shadow;
    }

    pub fn shadow(&self) -> Shadow {
        self.state.shadow
    }

    /// Negative and non-finite radii are ignored.
    pub fn set_shadow_blur(&mut self, blur: f64) {
        if blur.is_finite() && blur >= 0.0 {
            self.state.shadow.blur = blur;
        }
    }

    pub fn set_shadow_offset_x(&mut self, offset: f64) {
        if offset.is_finite() {
            self.state.shadow.offset_x = offset;
        }
    }

    pub fn set_shadow_offset_y(&mut self, offset: f64) {
        if offset.is_finite() {
            self.state.shadow.offset_y = offset;
        }
    }

    pub fn set_shadow_color(&mut self, color: Color) {
        self.state.shadow.color = color;
    }

    pub fn has_shadow(&self) -> bool {
        self.state.shadow.is_active()
    }

    pub fn has_native_shadows(&self) -> bool {
        self.surface.capabilities().native_shadows
    }

    pub fn has_native_blur(&self) -> bool {
        self.surface.capabilities().native_blur
    }

    // --- Transforms ---

    pub fn current_transform(&self) -> Transform {
        self.state.transform
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.apply_transform(Transform::translation(x, y));
    }

    pub fn scale(&mut self, x: f64, y: f64) {
        self.apply_transform(Transform::scaling(x, y));
    }

    pub fn rotate(&mut self, radians: f64) {
        self.apply_transform(Transform::rotation(radians));
    }

    pub fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.apply_transform(Transform::new(a, b, c, d, e, f));
    }

    pub fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.state.transform = Transform::new(a, b, c, d, e, f);
    }

    pub fn reset_transform(&mut self) {
        self.state.transform = Transform::IDENTITY;
    }

    fn apply_transform(&mut self, m: Transform) {
        self.state.transform = self.state.transform.multiply(&m);
    }

    // --- Path building ---

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    pub fn begin_path(&mut self) {
        self.current_path.clear();
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        let p = self.state.transform.apply(x, y);
        self.current_path.move_to(p.x, p.y);
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        let p = self.state.transform.apply(x, y);
        self.current_path.line_to(p.x, p.y);
    }

    /// Adds a circular arc. A negative radius is ignored.
    ///
    /// Paths store circular arcs only, so under a non-uniform scale or skew
    /// the arc stays a circle with the radius scaled by the transform's
    /// geometric mean scale instead of becoming an ellipse.
    pub fn arc(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) {
        if !(radius >= 0.0) {
            log::warn!(target: "penumbra", "arc with invalid radius {}", radius);
            return;
        }
        let t = self.state.transform;
        let (sx, sy) = t.axis_scales();
        if (sx - sy).abs() > 1e-9 * sx.max(sy) {
            log::debug!(
                target: "penumbra",
                "arc under non-uniform scale ({}, {}) drawn as a circle",
                sx,
                sy
            );
        }
        let center = t.apply(x, y);
        let rotation = t.rotation_angle();
        let (start, end, anticlockwise) = if t.determinant() < 0.0 {
            (rotation - start_angle, rotation - end_angle, !anticlockwise)
        } else {
            (rotation + start_angle, rotation + end_angle, anticlockwise)
        };
        self.current_path.arc(
            center.x,
            center.y,
            radius * t.scale_factor(),
            start,
            end,
            anticlockwise,
        );
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        self.move_to(x, y);
        self.line_to(x + w, y);
        self.line_to(x + w, y + h);
        self.line_to(x, y + h);
        self.close_path();
    }

    pub fn close_path(&mut self) {
        self.current_path.close();
    }

    pub fn fill(&mut self) -> Result<()> {
        let mark = Mark::Path {
            mode: RenderMode::Fill,
            path: &self.current_path,
            style: &self.state.fill_style,
        };
        Self::paint(&mut self.surface, &self.state, mark, self.state.operator)
    }

    pub fn stroke(&mut self) -> Result<()> {
        let mark = Mark::Path {
            mode: RenderMode::Stroke,
            path: &self.current_path,
            style: &self.state.stroke_style,
        };
        Self::paint(&mut self.surface, &self.state, mark, self.state.operator)
    }

    /// Replaces the clip region with the current path.
    pub fn clip(&mut self) {
        self.state.clip_path = self.current_path.clone();
    }

    // --- Rectangles ---

    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.begin_path();
        self.rect(x, y, w, h);
        self.fill()
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.begin_path();
        self.rect(x, y, w, h);
        self.stroke()
    }

    /// Overwrites the rectangle with transparent pixels. Ignores the fill
    /// style, the composition operator, global alpha and the shadow.
    pub fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.begin_path();
        self.rect(x, y, w, h);
        let params = RenderParams {
            line_width: self.state.line_width,
            op: Operator::Copy,
            display_scale: self.surface.display_scale(),
            global_alpha: 1.0,
            shadow: Shadow::NONE,
            clip: &self.state.clip_path,
            image_smoothing: self.state.image_smoothing_enabled,
        };
        self.surface.render_path(
            RenderMode::Fill,
            &self.current_path,
            &Style::Color(Color::TRANSPARENT),
            &params,
        )
    }

    // --- Text ---

    pub fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        let origin = self.state.transform.apply(x, y);
        self.render_text(RenderMode::Fill, None, text, origin, self.state.operator)
    }

    pub fn stroke_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        let origin = self.state.transform.apply(x, y);
        self.render_text(RenderMode::Stroke, None, text, origin, self.state.operator)
    }

    pub fn measure_text(&self, text: &str) -> TextMetrics {
        self.surface.measure_text(&self.state.font, text)
    }

    // --- Images ---

    pub fn draw_image(&mut self, image: &Image, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.draw_image_view(&image.view(), x, y, w, h)
    }

    /// Draws the current pixels of another surface.
    pub fn draw_surface<P: PixelSurface>(
        &mut self,
        source: &mut P,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) -> Result<()> {
        let lock = source.lock_memory()?;
        let view = lock.view();
        self.draw_image_view(&view, x, y, w, h)
    }

    pub fn draw_image_view(
        &mut self,
        image: &ImageView,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) -> Result<()> {
        let origin = self.state.transform.apply(x, y);
        let (sx, sy) = self.state.transform.axis_scales();
        let mark = Mark::Image {
            image,
            origin,
            width: w * sx,
            height: h * sy,
        };
        Self::paint(&mut self.surface, &self.state, mark, self.state.operator)
    }

    // --- Low-level entry points ---

    /// Renders a path already in logical space.
    pub fn render_path(
        &mut self,
        mode: RenderMode,
        path: &Path,
        style: &Style,
        op: Operator,
    ) -> Result<()> {
        let mark = Mark::Path { mode, path, style };
        Self::paint(&mut self.surface, &self.state, mark, op)
    }

    /// Renders a text run anchored at a logical-space point using the current
    /// font and alignment. `None` picks the fill or stroke style for `mode`.
    pub fn render_text(
        &mut self,
        mode: RenderMode,
        style: Option<&Style>,
        text: &str,
        origin: Point,
        op: Operator,
    ) -> Result<()> {
        let style = style.unwrap_or(match mode {
            RenderMode::Fill => &self.state.fill_style,
            RenderMode::Stroke => &self.state.stroke_style,
        });
        let run = TextRun {
            text,
            origin,
            font: &self.state.font,
            align: self.state.text_align,
            baseline: self.state.text_baseline,
        };
        let mark = Mark::Text { mode, run, style };
        Self::paint(&mut self.surface, &self.state, mark, op)
    }

    fn paint(surface: &mut S, state: &ContextState, mark: Mark<'_>, op: Operator) -> Result<()> {
        if !mark.is_visible() {
            return Ok(());
        }
        let params = RenderParams {
            line_width: state.line_width * state.transform.scale_factor(),
            op,
            display_scale: surface.display_scale(),
            global_alpha: state.global_alpha,
            shadow: state.shadow,
            clip: &state.clip_path,
            image_smoothing: state.image_smoothing_enabled,
        };

        if surface.capabilities().native_shadows {
            return mark.draw(surface, &params);
        }
        if state.shadow.is_active() {
            cast_shadow(surface, &mark, &params)?;
        }
        mark.draw(surface, &params.without_shadow())
    }

    // --- Hit regions ---

    /// Registers the bounds of the current path under `id`. Returns false
    /// when the path is empty.
    pub fn add_hit_region(&mut self, id: impl Into<String>) -> bool {
        match self.current_path.bounds() {
            Some(bounds) => {
                self.hit_regions.push(HitRegion {
                    id: id.into(),
                    bounds,
                });
                true
            }
            None => false,
        }
    }

    /// Most recently added region containing the logical point.
    pub fn hit_region_at(&self, x: f64, y: f64) -> Option<&str> {
        self.hit_regions
            .iter()
            .rev()
            .find(|r| r.bounds.contains(x, y))
            .map(|r| r.id.as_str())
    }

    pub fn hit_regions(&self) -> &[HitRegion] {
        &self.hit_regions
    }
}

impl<S: PixelSurface> Context<S> {
    pub fn to_png(&mut self) -> Result<Vec<u8>> {
        let lock = self.surface.lock_memory()?;
        let view = lock.view();
        encode_png(&view)
    }
}

/// Software shadow: silhouette into a padded alpha mask, blur, colorize,
/// then composite behind the mark.
fn cast_shadow<S: Surface>(surface: &mut S, mark: &Mark<'_>, params: &RenderParams) -> Result<()> {
    let shadow = params.shadow;
    let inset = shadow.inset();
    let padded = |side: u32| inset.checked_mul(2).and_then(|p| side.checked_add(p));
    let (width, height) = match (
        padded(surface.logical_width()),
        padded(surface.logical_height()),
    ) {
        (Some(width), Some(height)) => (width, height),
        _ => {
            return Err(PenumbraError::InvalidDimensions {
                width: surface.logical_width(),
                height: surface.logical_height(),
            });
        }
    };
    let pad = inset as f64;

    let mut mask = surface.create_scratch(width, height, PixelFormat::Alpha8)?;
    let mut colored = surface.create_scratch(width, height, PixelFormat::Rgba8)?;
    log::debug!(
        target: "penumbra",
        "emulating shadow: blur {} offset ({}, {}) scratch {}x{}",
        shadow.blur,
        shadow.offset_x,
        shadow.offset_y,
        width,
        height
    );

    let unclipped = Path::new();
    let mask_params = RenderParams {
        op: Operator::SourceOver,
        clip: &unclipped,
        ..*params
    }
    .without_shadow();
    mark.draw_silhouette(
        &mut mask,
        shadow.offset_x + pad,
        shadow.offset_y + pad,
        &mask_params,
    )?;

    let radius = shadow.blur * params.display_scale;
    if radius > 0.0 {
        mask.gaussian_blur(radius, radius)?;
    }
    mask.colorize(shadow.color, &mut colored)?;

    let composite = RenderParams {
        op: Operator::SourceOver,
        global_alpha: 1.0,
        image_smoothing: false,
        ..*params
    }
    .without_shadow();
    let pixels = colored.lock_memory()?;
    let view = pixels.view();
    surface.draw_image(
        &view,
        Point::new(-pad, -pad),
        width as f64,
        height as f64,
        &composite,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::raster::RasterSurface;
    use crate::geometry::PathComponent;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn context() -> Context<RasterSurface> {
        Context::new(RasterSurface::new(20, 20, 1.0, PixelFormat::Rgba8).unwrap())
    }

    fn assert_almost_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn save_restore_round_trip() {
        let mut ctx = context();
        let before = ctx.state().clone();
        ctx.save();
        ctx.set_fill_style(Color::WHITE);
        ctx.set_line_width(4.0);
        ctx.translate(3.0, 4.0);
        ctx.set_shadow_blur(2.0);
        ctx.set_global_composite_operation(Operator::Copy);
        ctx.set_font("20px Serif".parse().unwrap());
        ctx.rect(0.0, 0.0, 5.0, 5.0);
        ctx.clip();
        assert_ne!(ctx.state(), &before);
        ctx.restore();
        assert_eq!(ctx.state(), &before);
        assert_eq!(ctx.stack_depth(), 0);
    }

    #[test]
    fn restore_on_empty_stack_is_noop() {
        let mut ctx = context();
        ctx.set_global_alpha(0.25);
        let before = ctx.state().clone();
        ctx.restore();
        assert_eq!(ctx.state(), &before);
    }

    #[test]
    fn invalid_setter_values_are_ignored() {
        let mut ctx = context();
        ctx.set_global_alpha(1.5);
        ctx.set_line_width(-1.0);
        ctx.set_shadow_blur(f64::NAN);
        assert_eq!(ctx.global_alpha(), 1.0);
        assert_eq!(ctx.line_width(), 1.0);
        assert!(!ctx.has_shadow());
    }

    #[test]
    fn path_points_follow_the_transform() {
        let mut ctx = context();
        ctx.translate(10.0, 5.0);
        ctx.scale(2.0, 2.0);
        ctx.move_to(1.0, 1.0);
        ctx.line_to(2.0, 1.0);
        assert_eq!(
            ctx.current_path().components(),
            &[
                PathComponent::MoveTo { x: 12.0, y: 7.0 },
                PathComponent::LineTo { x: 14.0, y: 7.0 },
            ]
        );
    }

    #[test]
    fn arcs_are_mapped_through_rotation_and_reflection() {
        let mut ctx = context();
        ctx.rotate(FRAC_PI_2);
        ctx.scale(2.0, 2.0);
        ctx.arc(1.0, 0.0, 3.0, 0.0, PI, false);
        match ctx.current_path().components()[0] {
            PathComponent::Arc {
                x,
                y,
                radius,
                start_angle,
                end_angle,
                anticlockwise,
            } => {
                assert_almost_eq(x, 0.0);
                assert_almost_eq(y, 2.0);
                assert_almost_eq(radius, 6.0);
                assert_almost_eq(start_angle, FRAC_PI_2);
                assert_almost_eq(end_angle, FRAC_PI_2 + PI);
                assert!(!anticlockwise);
            }
            other => panic!("unexpected component {other:?}"),
        }

        ctx.reset_transform();
        ctx.begin_path();
        ctx.scale(1.0, -1.0);
        ctx.arc(0.0, 0.0, 1.0, 0.0, FRAC_PI_2, false);
        match ctx.current_path().components()[0] {
            PathComponent::Arc {
                end_angle,
                anticlockwise,
                ..
            } => {
                assert_almost_eq(end_angle, -FRAC_PI_2);
                assert!(anticlockwise);
            }
            other => panic!("unexpected component {other:?}"),
        }
    }

    #[test]
    fn hit_regions_prefer_latest_and_clear_on_resize() {
        let mut ctx = context();
        ctx.rect(0.0, 0.0, 10.0, 10.0);
        assert!(ctx.add_hit_region("outer"));
        ctx.begin_path();
        ctx.rect(2.0, 2.0, 3.0, 3.0);
        assert!(ctx.add_hit_region("inner"));
        assert_eq!(ctx.hit_region_at(3.0, 3.0), Some("inner"));
        assert_eq!(ctx.hit_region_at(8.0, 8.0), Some("outer"));
        assert_eq!(ctx.hit_region_at(15.0, 15.0), None);

        ctx.resize(30, 30).unwrap();
        assert!(ctx.hit_regions().is_empty());
        assert_eq!(ctx.surface().logical_width(), 30);
        ctx.begin_path();
        assert!(!ctx.add_hit_region("empty"));
    }

    #[test]
    fn resize_rejects_zero_dimensions() {
        let mut ctx = context();
        let err = ctx.resize(0, 10).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidDimensions);
        assert_eq!(ctx.surface().logical_width(), 20);
    }

    #[test]
    fn resize_keeps_display_scale() {
        let surface = RasterSurface::new(10, 10, 2.0, PixelFormat::Rgba8).unwrap();
        let mut ctx = Context::new(surface);
        ctx.resize(15, 5).unwrap();
        assert_eq!(ctx.surface().actual_width(), 30);
        assert_eq!(ctx.surface().actual_height(), 10);
        assert_almost_eq(ctx.display_scale(), 2.0);
    }

    #[test]
    fn empty_gradient_fill_draws_nothing() {
        let mut ctx = context();
        ctx.set_fill_style(crate::style::Gradient::linear(0.0, 0.0, 20.0, 0.0));
        ctx.fill_rect(0.0, 0.0, 20.0, 20.0).unwrap();
        let png_pixels = ctx.surface_mut().lock_memory().unwrap().to_vec();
        assert!(png_pixels.iter().all(|&b| b == 0));
    }

    #[rstest::rstest]
    #[case(3.0e9)]
    #[case(2.0e9)]
    #[case(1.0e12)]
    fn oversized_shadow_blur_is_an_error(#[case] blur: f64) {
        let mut ctx = Context::new(RasterSurface::new(10, 10, 1.0, PixelFormat::Rgba8).unwrap());
        ctx.set_shadow_blur(blur);
        ctx.set_shadow_color(Color::BLACK);
        let err = ctx.fill_rect(1.0, 1.0, 2.0, 2.0).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidDimensions);
    }

    #[test]
    fn arc_under_non_uniform_scale_stays_circular() {
        let mut ctx = context();
        ctx.scale(2.0, 0.5);
        ctx.arc(0.0, 0.0, 4.0, 0.0, FRAC_PI_2, false);
        match ctx.current_path().components()[0] {
            PathComponent::Arc { radius, .. } => assert_almost_eq(radius, 4.0),
            other => panic!("unexpected component {other:?}"),
        }
    }
}
