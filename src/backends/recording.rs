//! Backend that records every call it receives instead of drawing.
//!
//! Useful for checking what a [`Context`](crate::context::Context) hands to
//! its surface, in particular whether shadows were passed through to a
//! native-capable backend or synthesized beforehand.

use crate::api::{
    Capabilities, ImageView, Operator, PixelFormat, RenderMode, RenderParams, Shadow, Surface,
    TextRun,
};
use crate::backends::raster::RasterSurface;
use crate::error::{PenumbraError, Result};
use crate::geometry::{Path, Point};
use crate::style::{Font, Style, TextAlign, TextBaseline};
use crate::text::{BlockGlyphs, TextEngine, TextMetrics};

/// Owned copy of the [`RenderParams`] a call was made with.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub line_width: f64,
    pub op: Operator,
    pub display_scale: f64,
    pub global_alpha: f64,
    pub shadow: Shadow,
    pub clip: Path,
    pub image_smoothing: bool,
}

impl From<&RenderParams<'_>> for Snapshot {
    fn from(params: &RenderParams<'_>) -> Self {
        Self {
            line_width: params.line_width,
            op: params.op,
            display_scale: params.display_scale,
            global_alpha: params.global_alpha,
            shadow: params.shadow,
            clip: params.clip.clone(),
            image_smoothing: params.image_smoothing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    RenderPath {
        mode: RenderMode,
        path: Path,
        style: Style,
        state: Snapshot,
    },
    RenderText {
        mode: RenderMode,
        text: String,
        origin: Point,
        font: Font,
        align: TextAlign,
        baseline: TextBaseline,
        style: Style,
        state: Snapshot,
    },
    DrawImage {
        source_width: u32,
        source_height: u32,
        source_format: PixelFormat,
        origin: Point,
        width: f64,
        height: f64,
        state: Snapshot,
    },
    Resize {
        logical_width: u32,
        logical_height: u32,
        actual_width: u32,
        actual_height: u32,
        format: PixelFormat,
    },
}

impl DrawOp {
    pub fn state(&self) -> Option<&Snapshot> {
        match self {
            DrawOp::RenderPath { state, .. }
            | DrawOp::RenderText { state, .. }
            | DrawOp::DrawImage { state, .. } => Some(state),
            DrawOp::Resize { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    logical_width: u32,
    logical_height: u32,
    actual_width: u32,
    actual_height: u32,
    format: PixelFormat,
    capabilities: Capabilities,
}

impl RecordingSurface {
    /// RGBA surface at scale 1 without native capabilities.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            ops: Vec::new(),
            logical_width: width,
            logical_height: height,
            actual_width: width,
            actual_height: height,
            format: PixelFormat::Rgba8,
            capabilities: Capabilities::NONE,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.actual_width = (self.logical_width as f64 * scale).round() as u32;
        self.actual_height = (self.logical_height as f64 * scale).round() as u32;
        self
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl Surface for RecordingSurface {
    type Scratch = RasterSurface;

    fn logical_width(&self) -> u32 {
        self.logical_width
    }

    fn logical_height(&self) -> u32 {
        self.logical_height
    }

    fn actual_width(&self) -> u32 {
        self.actual_width
    }

    fn actual_height(&self) -> u32 {
        self.actual_height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_scratch(
        &self,
        logical_width: u32,
        logical_height: u32,
        format: PixelFormat,
    ) -> Result<RasterSurface> {
        RasterSurface::new(logical_width, logical_height, self.display_scale(), format)
    }

    fn resize(
        &mut self,
        logical_width: u32,
        logical_height: u32,
        actual_width: u32,
        actual_height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        if actual_width == 0 || actual_height == 0 {
            return Err(PenumbraError::InvalidDimensions {
                width: actual_width,
                height: actual_height,
            });
        }
        self.logical_width = logical_width;
        self.logical_height = logical_height;
        self.actual_width = actual_width;
        self.actual_height = actual_height;
        self.format = format;
        self.ops.push(DrawOp::Resize {
            logical_width,
            logical_height,
            actual_width,
            actual_height,
            format,
        });
        Ok(())
    }

    fn render_path(
        &mut self,
        mode: RenderMode,
        path: &Path,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()> {
        self.ops.push(DrawOp::RenderPath {
            mode,
            path: path.clone(),
            style: style.clone(),
            state: params.into(),
        });
        Ok(())
    }

    fn render_text(
        &mut self,
        mode: RenderMode,
        run: &TextRun,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()> {
        self.ops.push(DrawOp::RenderText {
            mode,
            text: run.text.to_string(),
            origin: run.origin,
            font: run.font.clone(),
            align: run.align,
            baseline: run.baseline,
            style: style.clone(),
            state: params.into(),
        });
        Ok(())
    }

    fn measure_text(&self, font: &Font, text: &str) -> TextMetrics {
        BlockGlyphs.measure(font, text)
    }

    fn draw_image(
        &mut self,
        image: &ImageView,
        origin: Point,
        width: f64,
        height: f64,
        params: &RenderParams,
    ) -> Result<()> {
        self.ops.push(DrawOp::DrawImage {
            source_width: image.width,
            source_height: image.height,
            source_format: image.format,
            origin,
            width,
            height,
            state: params.into(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::geometry::PathComponent;
    use crate::style::Color;

    fn assert_almost_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn records_fill_rect() {
        let mut ctx = Context::new(RecordingSurface::new(50, 50));
        ctx.set_fill_style(Color::new(1.0, 0.0, 0.0, 1.0));
        ctx.fill_rect(1.0, 2.0, 3.0, 4.0).unwrap();
        let ops = ctx.surface().ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            DrawOp::RenderPath {
                mode, path, style, ..
            } => {
                assert_eq!(*mode, RenderMode::Fill);
                assert_eq!(path.components().len(), 5);
                assert_eq!(path.components()[2], PathComponent::LineTo { x: 4.0, y: 6.0 });
                assert_eq!(*style, Style::Color(Color::new(1.0, 0.0, 0.0, 1.0)));
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn records_transformed_text_and_line_width() {
        let mut ctx = Context::new(RecordingSurface::new(50, 50));
        ctx.translate(5.0, 6.0);
        ctx.scale(2.0, 2.0);
        ctx.set_text_align(TextAlign::Center);
        ctx.fill_text("hi", 1.0, 1.0).unwrap();
        ctx.move_to(0.0, 0.0);
        ctx.line_to(1.0, 1.0);
        ctx.stroke().unwrap();

        let ops = ctx.surface().ops();
        match &ops[0] {
            DrawOp::RenderText {
                text,
                origin,
                align,
                ..
            } => {
                assert_eq!(text, "hi");
                assert_almost_eq(origin.x, 7.0);
                assert_almost_eq(origin.y, 8.0);
                assert_eq!(*align, TextAlign::Center);
            }
            other => panic!("unexpected op {other:?}"),
        }
        let state = ops[1].state().unwrap();
        assert_almost_eq(state.line_width, 2.0);
    }

    #[test]
    fn clear_rect_uses_copy_and_ignores_shadow() {
        let mut ctx = Context::new(RecordingSurface::new(50, 50));
        ctx.set_shadow_offset_x(3.0);
        ctx.set_fill_style(Color::WHITE);
        ctx.clear_rect(0.0, 0.0, 10.0, 10.0).unwrap();
        let ops = ctx.surface().ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            DrawOp::RenderPath { style, state, .. } => {
                assert_eq!(*style, Style::Color(Color::TRANSPARENT));
                assert_eq!(state.op, Operator::Copy);
                assert_eq!(state.shadow, Shadow::NONE);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn records_resize() {
        let mut ctx = Context::new(RecordingSurface::new(10, 10).with_scale(2.0));
        ctx.resize(20, 5).unwrap();
        assert_eq!(
            ctx.surface().ops(),
            &[DrawOp::Resize {
                logical_width: 20,
                logical_height: 5,
                actual_width: 40,
                actual_height: 10,
                format: PixelFormat::Rgba8,
            }]
        );
    }
}
