use std::fmt;
use std::str::FromStr;

use crate::error::{PenumbraError, Result};

/// Straight (non-premultiplied) sRGB color with channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba_const(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba_const(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba_const(0.0, 0.0, 0.0, 0.0);

    const fn rgba_const(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Channels are clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self {
            red: clamp(red),
            green: clamp(green),
            blue: clamp(blue),
            alpha: clamp(alpha),
        }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self::new(self.red, self.green, self.blue, alpha)
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            to_byte(self.red),
            to_byte(self.green),
            to_byte(self.blue),
            to_byte(self.alpha),
        ]
    }

    pub fn to_premultiplied_rgba8(&self) -> [u8; 4] {
        [
            to_byte(self.red * self.alpha),
            to_byte(self.green * self.alpha),
            to_byte(self.blue * self.alpha),
            to_byte(self.alpha),
        ]
    }

    /// CSS `rgba()` notation, used by text-based backends.
    pub fn to_css(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("rgba({},{},{},{})", r, g, b, self.alpha)
    }
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl FromStr for Color {
    type Err = PenumbraError;

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`, `rgba(r,g,b,a)`
    /// and a handful of keywords.
    fn from_str(s: &str) -> Result<Self> {
        let c = s.trim();
        let err = || PenumbraError::ColorParse(s.to_string());
        if let Some(hex) = c.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(err());
            }
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            let nibble = |i: usize| {
                u8::from_str_radix(&hex[i..i + 1], 16)
                    .map(|v| v * 17)
                    .map_err(|_| err())
            };
            return match hex.len() {
                3 => Ok(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
                6 => Ok(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
                8 => Ok(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
                _ => Err(err()),
            };
        }

        let lower = c.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() != 3 && parts.len() != 4 {
                return Err(err());
            }
            let channel = |p: &str| p.parse::<f32>().map(|v| v / 255.0).map_err(|_| err());
            let alpha = match parts.get(3) {
                Some(p) => p.parse::<f32>().map_err(|_| err())?,
                None => 1.0,
            };
            return Ok(Color::new(
                channel(parts[0])?,
                channel(parts[1])?,
                channel(parts[2])?,
                alpha,
            ));
        }

        match lower.as_str() {
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "transparent" => Ok(Color::TRANSPARENT),
            "red" => Ok(Color::new(1.0, 0.0, 0.0, 1.0)),
            "green" => Ok(Color::from_rgba8(0, 128, 0, 255)),
            "blue" => Ok(Color::new(0.0, 0.0, 1.0, 1.0)),
            _ => Err(err()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Color,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GradientKind {
    Linear {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
    },
    Radial {
        x0: f64,
        y0: f64,
        r0: f64,
        x1: f64,
        y1: f64,
        r1: f64,
    },
}

/// Gradient with stops kept sorted by strictly increasing offset.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    stops: Vec<ColorStop>,
}

impl Gradient {
    pub fn linear(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            kind: GradientKind::Linear { x0, y0, x1, y1 },
            stops: Vec::new(),
        }
    }

    pub fn radial(x0: f64, y0: f64, r0: f64, x1: f64, y1: f64, r1: f64) -> Self {
        Self {
            kind: GradientKind::Radial {
                x0,
                y0,
                r0,
                x1,
                y1,
                r1,
            },
            stops: Vec::new(),
        }
    }

    /// Inserts a stop in offset order. A stop at an existing offset replaces it.
    pub fn add_color_stop(&mut self, offset: f64, color: Color) -> Result<()> {
        if !offset.is_finite() || !(0.0..=1.0).contains(&offset) {
            return Err(PenumbraError::InvalidGradientStop(offset));
        }
        let stop = ColorStop { offset, color };
        match self
            .stops
            .binary_search_by(|s| s.offset.total_cmp(&offset))
        {
            Ok(i) => self.stops[i] = stop,
            Err(i) => self.stops.insert(i, stop),
        }
        Ok(())
    }

    pub fn with_stop(mut self, offset: f64, color: Color) -> Result<Self> {
        self.add_color_stop(offset, color)?;
        Ok(self)
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Maps a gradient's anchor points through `dx, dy`.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        match &mut self.kind {
            GradientKind::Linear { x0, y0, x1, y1 }
            | GradientKind::Radial { x0, y0, x1, y1, .. } => {
                *x0 += dx;
                *y0 += dy;
                *x1 += dx;
                *y1 += dy;
            }
        }
    }
}

/// Fill or stroke paint.
#[derive(Clone, Debug, PartialEq)]
pub enum Style {
    Color(Color),
    Gradient(Gradient),
}

impl Default for Style {
    fn default() -> Self {
        Style::Color(Color::BLACK)
    }
}

impl From<Color> for Style {
    fn from(color: Color) -> Self {
        Style::Color(color)
    }
}

impl From<Gradient> for Style {
    fn from(gradient: Gradient) -> Self {
        Style::Gradient(gradient)
    }
}

impl Style {
    /// A gradient without stops paints nothing.
    pub fn is_renderable(&self) -> bool {
        match self {
            Style::Color(_) => true,
            Style::Gradient(g) => !g.stops().is_empty(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub size: f64,
    pub family: String,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            size: 10.0,
            family: "sans-serif".to_string(),
        }
    }
}

impl Font {
    pub fn new(size: f64, family: impl Into<String>) -> Self {
        Self {
            size,
            family: family.into(),
        }
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size, self.family)
    }
}

impl FromStr for Font {
    type Err = PenumbraError;

    /// Minimal parser for strings like `"16px Sans"` or `"bold 12px Open Sans"`.
    fn from_str(s: &str) -> Result<Self> {
        let mut size = None;
        let mut family = Vec::new();
        for part in s.split_whitespace() {
            if size.is_none() {
                if let Some(px) = part.strip_suffix("px") {
                    let v = px
                        .parse::<f64>()
                        .map_err(|_| PenumbraError::FontParse(s.to_string()))?;
                    if !v.is_finite() || v <= 0.0 {
                        return Err(PenumbraError::FontParse(s.to_string()));
                    }
                    size = Some(v);
                }
                continue;
            }
            family.push(part);
        }
        let size = size.ok_or_else(|| PenumbraError::FontParse(s.to_string()))?;
        let family = if family.is_empty() {
            Font::default().family
        } else {
            family.join(" ")
        };
        Ok(Font { size, family })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    Hanging,
    Middle,
    #[default]
    Alphabetic,
    Ideographic,
    Bottom,
}
