//! SVG backend using a streaming XML writer.
//!
//! Shadows and blur are expressed natively through `feDropShadow` filters,
//! so a [`Context`](crate::context::Context) hands them through untouched.

use std::f64::consts::PI;
use std::fmt::Write as _;
use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::api::{
    Capabilities, ImageView, Operator, PixelFormat, RenderMode, RenderParams, Shadow, Surface,
    TextRun,
};
use crate::backends::raster::RasterSurface;
use crate::error::{PenumbraError, Result};
use crate::geometry::{Path, PathComponent, Point, arc_sweep};
use crate::image::encode_png;
use crate::style::{Font, Gradient, GradientKind, Style, TextAlign, TextBaseline};
use crate::text::{BlockGlyphs, TextEngine, TextMetrics};

pub struct SvgSurface<W: Write> {
    writer: Writer<W>,
    open_root: bool,
    width: u32,
    height: u32,
    gradient_counter: usize,
    clip_counter: usize,
    filter_counter: usize,
}

impl<W: Write> SvgSurface<W> {
    /// Create a new SVG surface that writes into the provided sink, emitting the root `<svg>`.
    /// Width/height are expressed in CSS pixels; a matching `viewBox` is set.
    pub fn new(inner: W, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PenumbraError::InvalidDimensions { width, height });
        }
        let mut writer = Writer::new_with_indent(inner, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let width_attr = width.to_string();
        let height_attr = height.to_string();
        let view_box_attr = format!("0 0 {} {}", width, height);

        let mut start = BytesStart::new("svg");
        start.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
        start.push_attribute(("version", "1.1"));
        start.push_attribute(("width", width_attr.as_str()));
        start.push_attribute(("height", height_attr.as_str()));
        start.push_attribute(("viewBox", view_box_attr.as_str()));
        writer.write_event(Event::Start(start))?;

        Ok(Self {
            writer,
            open_root: true,
            width,
            height,
            gradient_counter: 0,
            clip_counter: 0,
            filter_counter: 0,
        })
    }

    /// Finish the document, closing the root element and returning the inner writer.
    pub fn finish(mut self) -> Result<W> {
        if self.open_root {
            self.writer.write_event(Event::End(BytesEnd::new("svg")))?;
            self.open_root = false;
        }
        Ok(self.writer.into_inner())
    }

    fn write_empty(&mut self, elem: BytesStart<'_>) -> Result<()> {
        self.writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn paint_to_str(&mut self, style: &Style) -> Result<String> {
        match style {
            Style::Color(c) => Ok(c.to_css()),
            Style::Gradient(g) => {
                let id = format!("grad{}", self.gradient_counter);
                self.gradient_counter += 1;
                self.write_gradient_def(&id, g)?;
                Ok(format!("url(#{})", id))
            }
        }
    }

    fn write_gradient_def(&mut self, id: &str, gradient: &Gradient) -> Result<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new("defs")))?;

        let tag = match gradient.kind {
            GradientKind::Linear { x0, y0, x1, y1 } => {
                let mut elem = BytesStart::new("linearGradient");
                elem.push_attribute(("id", id));
                elem.push_attribute(("gradientUnits", "userSpaceOnUse"));
                push_number(&mut elem, "x1", x0);
                push_number(&mut elem, "y1", y0);
                push_number(&mut elem, "x2", x1);
                push_number(&mut elem, "y2", y1);
                self.writer.write_event(Event::Start(elem))?;
                "linearGradient"
            }
            GradientKind::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            } => {
                let mut elem = BytesStart::new("radialGradient");
                elem.push_attribute(("id", id));
                elem.push_attribute(("gradientUnits", "userSpaceOnUse"));
                push_number(&mut elem, "cx", x1);
                push_number(&mut elem, "cy", y1);
                push_number(&mut elem, "r", r1);
                push_number(&mut elem, "fx", x0);
                push_number(&mut elem, "fy", y0);
                push_number(&mut elem, "fr", r0);
                self.writer.write_event(Event::Start(elem))?;
                "radialGradient"
            }
        };

        for stop in gradient.stops() {
            let mut stop_elem = BytesStart::new("stop");
            push_number(&mut stop_elem, "offset", stop.offset);
            let color = stop.color.to_css();
            stop_elem.push_attribute(("stop-color", color.as_str()));
            self.writer.write_event(Event::Empty(stop_elem))?;
        }

        self.writer.write_event(Event::End(BytesEnd::new(tag)))?;
        self.writer.write_event(Event::End(BytesEnd::new("defs")))?;
        Ok(())
    }

    fn write_clip_def(&mut self, clip: &Path) -> Result<String> {
        let id = format!("clip{}", self.clip_counter);
        self.clip_counter += 1;

        self.writer
            .write_event(Event::Start(BytesStart::new("defs")))?;
        let mut clip_elem = BytesStart::new("clipPath");
        clip_elem.push_attribute(("id", id.as_str()));
        self.writer.write_event(Event::Start(clip_elem))?;
        let mut path_elem = BytesStart::new("path");
        let d = path_data(clip);
        path_elem.push_attribute(("d", d.as_str()));
        self.write_empty(path_elem)?;
        self.writer
            .write_event(Event::End(BytesEnd::new("clipPath")))?;
        self.writer.write_event(Event::End(BytesEnd::new("defs")))?;
        Ok(id)
    }

    /// `stdDeviation` follows the blur kernel's sigma of a third of the radius.
    fn write_shadow_def(&mut self, shadow: &Shadow) -> Result<String> {
        let id = format!("shadow{}", self.filter_counter);
        self.filter_counter += 1;

        self.writer
            .write_event(Event::Start(BytesStart::new("defs")))?;
        let mut filter = BytesStart::new("filter");
        filter.push_attribute(("id", id.as_str()));
        filter.push_attribute(("x", "-50%"));
        filter.push_attribute(("y", "-50%"));
        filter.push_attribute(("width", "200%"));
        filter.push_attribute(("height", "200%"));
        self.writer.write_event(Event::Start(filter))?;

        let mut drop = BytesStart::new("feDropShadow");
        push_number(&mut drop, "dx", shadow.offset_x);
        push_number(&mut drop, "dy", shadow.offset_y);
        push_number(&mut drop, "stdDeviation", shadow.blur / 3.0);
        let [r, g, b, _] = shadow.color.to_rgba8();
        let flood = format!("rgb({},{},{})", r, g, b);
        drop.push_attribute(("flood-color", flood.as_str()));
        push_number(&mut drop, "flood-opacity", shadow.color.alpha as f64);
        self.write_empty(drop)?;

        self.writer.write_event(Event::End(BytesEnd::new("filter")))?;
        self.writer.write_event(Event::End(BytesEnd::new("defs")))?;
        Ok(id)
    }

    /// Writes the defs a draw call depends on and returns the attributes that
    /// reference them. SVG applies the filter before clipping and opacity.
    fn state_attributes(&mut self, params: &RenderParams) -> Result<Vec<(&'static str, String)>> {
        let mut attrs = Vec::new();
        if params.op == Operator::Copy {
            log::warn!(target: "penumbra", "svg: copy operator drawn as source-over");
        }
        if params.shadow.is_active() {
            let id = self.write_shadow_def(&params.shadow)?;
            attrs.push(("filter", format!("url(#{})", id)));
        }
        if !params.clip.is_empty() {
            let id = self.write_clip_def(params.clip)?;
            attrs.push(("clip-path", format!("url(#{})", id)));
        }
        if params.global_alpha < 1.0 {
            attrs.push(("opacity", params.global_alpha.to_string()));
        }
        Ok(attrs)
    }

    fn paint_attributes(
        &mut self,
        mode: RenderMode,
        style: &Style,
        params: &RenderParams,
    ) -> Result<Vec<(&'static str, String)>> {
        let paint = self.paint_to_str(style)?;
        Ok(match mode {
            RenderMode::Fill => vec![("fill", paint)],
            RenderMode::Stroke => vec![
                ("fill", "none".to_string()),
                ("stroke", paint),
                ("stroke-width", params.line_width.to_string()),
            ],
        })
    }
}

impl<W: Write> Surface for SvgSurface<W> {
    type Scratch = RasterSurface;

    fn logical_width(&self) -> u32 {
        self.width
    }

    fn logical_height(&self) -> u32 {
        self.height
    }

    fn actual_width(&self) -> u32 {
        self.width
    }

    fn actual_height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NATIVE
    }

    fn create_scratch(
        &self,
        logical_width: u32,
        logical_height: u32,
        format: PixelFormat,
    ) -> Result<RasterSurface> {
        RasterSurface::new(logical_width, logical_height, self.display_scale(), format)
    }

    fn resize(&mut self, _: u32, _: u32, _: u32, _: u32, _: PixelFormat) -> Result<()> {
        Err(PenumbraError::Unsupported("resizing an svg document"))
    }

    fn render_path(
        &mut self,
        mode: RenderMode,
        path: &Path,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()> {
        let mut attrs = self.paint_attributes(mode, style, params)?;
        attrs.extend(self.state_attributes(params)?);

        let mut elem = BytesStart::new("path");
        let d = path_data(path);
        elem.push_attribute(("d", d.as_str()));
        for (name, value) in &attrs {
            elem.push_attribute((*name, value.as_str()));
        }
        self.write_empty(elem)
    }

    fn render_text(
        &mut self,
        mode: RenderMode,
        run: &TextRun,
        style: &Style,
        params: &RenderParams,
    ) -> Result<()> {
        let mut attrs = self.paint_attributes(mode, style, params)?;
        attrs.extend(self.state_attributes(params)?);

        let mut elem = BytesStart::new("text");
        push_number(&mut elem, "x", run.origin.x);
        push_number(&mut elem, "y", run.origin.y);
        push_number(&mut elem, "font-size", run.font.size);
        elem.push_attribute(("font-family", run.font.family.as_str()));
        elem.push_attribute((
            "text-anchor",
            match run.align {
                TextAlign::Left | TextAlign::Start => "start",
                TextAlign::Center => "middle",
                TextAlign::Right | TextAlign::End => "end",
            },
        ));
        elem.push_attribute((
            "dominant-baseline",
            match run.baseline {
                TextBaseline::Top => "text-before-edge",
                TextBaseline::Hanging => "hanging",
                TextBaseline::Middle => "middle",
                TextBaseline::Alphabetic => "alphabetic",
                TextBaseline::Ideographic => "ideographic",
                TextBaseline::Bottom => "text-after-edge",
            },
        ));
        for (name, value) in &attrs {
            elem.push_attribute((*name, value.as_str()));
        }
        self.writer.write_event(Event::Start(elem))?;
        self.writer.write_event(Event::Text(BytesText::new(run.text)))?;
        self.writer.write_event(Event::End(BytesEnd::new("text")))?;
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
        let href = encode_image_as_data_uri(image)?;
        let attrs = self.state_attributes(params)?;

        let mut elem = BytesStart::new("image");
        push_number(&mut elem, "x", origin.x);
        push_number(&mut elem, "y", origin.y);
        push_number(&mut elem, "width", width);
        push_number(&mut elem, "height", height);
        elem.push_attribute(("href", href.as_str()));
        elem.push_attribute(("preserveAspectRatio", "none"));
        if !params.image_smoothing {
            elem.push_attribute(("image-rendering", "pixelated"));
        }
        for (name, value) in &attrs {
            elem.push_attribute((*name, value.as_str()));
        }
        self.write_empty(elem)
    }
}

fn push_number(elem: &mut BytesStart<'_>, name: &str, value: f64) {
    let text = value.to_string();
    elem.push_attribute((name, text.as_str()));
}

fn encode_image_as_data_uri(image: &ImageView) -> Result<String> {
    let png = encode_png(image)?;
    Ok(format!("data:image/png;base64,{}", BASE64_STANDARD.encode(png)))
}

/// Path data for `d` attributes. Arcs become one `A` command, or two for a
/// full turn since a single elliptical arc cannot close on itself.
fn path_data(path: &Path) -> String {
    let mut d = String::new();
    let mut has_point = false;
    for component in path.components() {
        match *component {
            PathComponent::MoveTo { x, y } => {
                let _ = write!(d, "M{} {} ", x, y);
                has_point = true;
            }
            PathComponent::LineTo { x, y } => {
                let _ = write!(d, "L{} {} ", x, y);
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
                let at = |angle: f64| (x + radius * angle.cos(), y + radius * angle.sin());
                let (sx, sy) = at(start_angle);
                let _ = write!(d, "{}{} {} ", if has_point { "L" } else { "M" }, sx, sy);
                has_point = true;

                let sweep = arc_sweep(start_angle, end_angle, anticlockwise);
                if radius <= 0.0 || sweep == 0.0 {
                    continue;
                }
                let flag = if sweep > 0.0 { 1 } else { 0 };
                if sweep.abs() >= 2.0 * PI {
                    let (mx, my) = at(start_angle + sweep / 2.0);
                    let _ = write!(d, "A{r} {r} 0 0 {flag} {mx} {my} ", r = radius);
                    let _ = write!(d, "A{r} {r} 0 0 {flag} {sx} {sy} ", r = radius);
                } else {
                    let large = if sweep.abs() > PI { 1 } else { 0 };
                    let (ex, ey) = at(start_angle + sweep);
                    let _ = write!(d, "A{r} {r} 0 {large} {flag} {ex} {ey} ", r = radius);
                }
            }
            PathComponent::Close => d.push_str("Z "),
        }
    }
    d.truncate(d.trim_end().len());
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::style::Color;

    fn svg_output<F>(draw: F) -> String
    where
        F: FnOnce(&mut Context<SvgSurface<Vec<u8>>>) -> Result<()>,
    {
        let mut ctx = Context::new(SvgSurface::new(Vec::new(), 10, 10).unwrap());
        draw(&mut ctx).unwrap();
        let buf = ctx.into_surface().finish().unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn writes_svg_root() {
        let out = svg_output(|_| Ok(()));

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(out.contains("viewBox=\"0 0 10 10\""));
        assert!(out.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn writes_filled_rect_path() {
        let out = svg_output(|ctx| {
            ctx.set_fill_style(Color::new(1.0, 0.0, 0.0, 1.0));
            ctx.fill_rect(1.0, 2.0, 3.0, 4.0)
        });

        assert!(out.contains("d=\"M1 2 L4 2 L4 6 L1 6 Z\""));
        assert!(out.contains("fill=\"rgba(255,0,0,1)\""));
        assert!(!out.contains("filter="));
    }

    #[test]
    fn strokes_with_line_width() {
        let out = svg_output(|ctx| {
            ctx.set_line_width(3.0);
            ctx.move_to(0.0, 0.0);
            ctx.line_to(5.0, 5.0);
            ctx.stroke()
        });

        assert!(out.contains("fill=\"none\""));
        assert!(out.contains("stroke=\"rgba(0,0,0,1)\""));
        assert!(out.contains("stroke-width=\"3\""));
    }

    #[test]
    fn writes_gradient_defs_and_usage() {
        let out = svg_output(|ctx| {
            let gradient = Gradient::linear(0.0, 0.0, 10.0, 0.0)
                .with_stop(0.0, Color::BLACK)?
                .with_stop(1.0, Color::WHITE)?;
            ctx.set_fill_style(gradient);
            ctx.fill_rect(0.0, 0.0, 10.0, 10.0)
        });

        assert!(out.contains("<linearGradient id=\"grad0\""));
        assert!(out.contains("<stop offset=\"1\" stop-color=\"rgba(255,255,255,1)\"/>"));
        assert!(out.contains("fill=\"url(#grad0)\""));
    }

    #[test]
    fn shadows_become_drop_shadow_filters() {
        let out = svg_output(|ctx| {
            ctx.set_shadow_blur(6.0);
            ctx.set_shadow_offset_x(2.0);
            ctx.set_shadow_offset_y(3.0);
            ctx.set_shadow_color(Color::new(0.0, 0.0, 0.0, 0.5));
            ctx.fill_rect(1.0, 1.0, 4.0, 4.0)
        });

        assert!(out.contains("<filter id=\"shadow0\""));
        assert!(out.contains("dx=\"2\" dy=\"3\" stdDeviation=\"2\""));
        assert!(out.contains("flood-opacity=\"0.5\""));
        assert!(out.contains("filter=\"url(#shadow0)\""));
        assert!(!out.contains("<image"));
        assert_eq!(out.matches("<path").count(), 1);
    }

    #[test]
    fn clip_becomes_clip_path() {
        let out = svg_output(|ctx| {
            ctx.rect(0.0, 0.0, 5.0, 5.0);
            ctx.clip();
            ctx.fill_rect(0.0, 0.0, 10.0, 10.0)
        });

        assert!(out.contains("<clipPath id=\"clip0\">"));
        assert!(out.contains("clip-path=\"url(#clip0)\""));
    }

    #[test]
    fn arcs_use_arc_commands() {
        let out = svg_output(|ctx| {
            ctx.arc(5.0, 5.0, 2.0, 0.0, 2.0 * PI, false);
            ctx.fill()
        });

        assert!(out.contains("M7 5 A2 2 0 0 1 3 5"));
        assert_eq!(out.matches(" A2 2").count() + out.matches("\"A2 2").count(), 2);
    }

    #[test]
    fn text_carries_font_and_alignment() {
        let out = svg_output(|ctx| {
            ctx.set_font("12px serif".parse()?);
            ctx.set_text_align(TextAlign::Center);
            ctx.set_text_baseline(TextBaseline::Middle);
            ctx.fill_text("a<b", 4.0, 5.0)
        });

        assert!(out.contains("font-size=\"12\" font-family=\"serif\""));
        assert!(out.contains("text-anchor=\"middle\""));
        assert!(out.contains("dominant-baseline=\"middle\""));
        assert!(out.contains(">a&lt;b</text>"));
    }

    #[test]
    fn draw_image_inlines_png_data_uri() {
        let out = svg_output(|ctx| {
            let pixels = [255u8, 0, 0, 255];
            let view = ImageView::new(1, 1, PixelFormat::Rgba8, &pixels)?;
            ctx.set_image_smoothing_enabled(false);
            ctx.draw_image_view(&view, 2.0, 3.0, 1.0, 1.0)
        });

        assert!(out.contains("<image"));
        assert!(out.contains("x=\"2\" y=\"3\" width=\"1\" height=\"1\""));
        assert!(out.contains("href=\"data:image/png;base64,"));
        assert!(out.contains("image-rendering=\"pixelated\""));
    }

    #[test]
    fn resize_is_unsupported() {
        let mut ctx = Context::new(SvgSurface::new(Vec::new(), 10, 10).unwrap());
        let err = ctx.resize(20, 20).unwrap_err();
        assert!(matches!(err, PenumbraError::Unsupported(_)));
    }
}
