//! Decoded images and the PNG codec glue.
//!
//! Decoding goes through the `image` crate after a signature check, so that
//! callers can tell "not an image we handle" apart from "a broken PNG".

use std::path::Path as FsPath;

use ::image::{DynamicImage, ImageFormat};

use crate::api::{ImageView, PixelFormat};
use crate::error::{PenumbraError, Result};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const XML_PREFIXES: &[&[u8]] = &[b"<?xml", b"<svg", b"<!doctype", b"<html"];

/// Side length of [`Image::placeholder`].
pub const PLACEHOLDER_SIZE: u32 = 16;

/// Encoded formats recognized by [`sniff`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodedFormat {
    Png,
    Jpeg,
    Gif,
    /// XML or HTML markup. Recognized only so it can be rejected.
    Markup,
}

/// Identifies an encoded buffer from its leading bytes.
pub fn sniff(bytes: &[u8]) -> Option<EncodedFormat> {
    if bytes.starts_with(PNG_SIGNATURE) {
        return Some(EncodedFormat::Png);
    }
    if bytes.starts_with(JPEG_SIGNATURE) {
        return Some(EncodedFormat::Jpeg);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(EncodedFormat::Gif);
    }
    let trimmed = bytes.trim_ascii_start();
    let is_markup = XML_PREFIXES.iter().any(|prefix| {
        trimmed.len() >= prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
    });
    if is_markup {
        return Some(EncodedFormat::Markup);
    }
    None
}

/// Owned pixels in the crate layout. `Rgba8` data is premultiplied.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Image {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PenumbraError::InvalidDimensions { width, height });
        }
        ImageView::new(width, height, format, &data)?;
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Decodes a PNG, JPEG or GIF buffer. Images with an alpha channel become
    /// premultiplied `Rgba8`, opaque ones `Rgb8`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = match sniff(bytes) {
            Some(EncodedFormat::Png) => ImageFormat::Png,
            Some(EncodedFormat::Jpeg) => ImageFormat::Jpeg,
            Some(EncodedFormat::Gif) => ImageFormat::Gif,
            Some(EncodedFormat::Markup) | None => {
                return Err(PenumbraError::UnsupportedImageFormat {
                    signature: bytes.iter().take(8).copied().collect(),
                });
            }
        };
        let decoded = ::image::load_from_memory_with_format(bytes, format)
            .map_err(|e| PenumbraError::DecodeFailure(e.to_string()))?;
        log::debug!(
            target: "penumbra",
            "decoded {:?} image {}x{}",
            format,
            decoded.width(),
            decoded.height()
        );
        Self::from_dynamic(decoded)
    }

    pub fn open(path: impl AsRef<FsPath>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Fully transparent 16x16 image for callers that prefer to keep drawing
    /// when decoding fails.
    pub fn placeholder() -> Self {
        let side = PLACEHOLDER_SIZE as usize;
        Self {
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            format: PixelFormat::Rgba8,
            data: vec![0; side * side * 4],
        }
    }

    fn from_dynamic(decoded: DynamicImage) -> Result<Self> {
        let (width, height) = (decoded.width(), decoded.height());
        if decoded.color().has_alpha() {
            let mut data = decoded.to_rgba8().into_raw();
            premultiply(&mut data);
            Self::new(width, height, PixelFormat::Rgba8, data)
        } else {
            Self::new(width, height, PixelFormat::Rgb8, decoded.to_rgb8().into_raw())
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            width: self.width,
            height: self.height,
            format: self.format,
            data: &self.data,
        }
    }
}

fn scale_channel(value: u8, alpha: u8) -> u8 {
    ((value as u16 * alpha as u16 + 127) / 255) as u8
}

/// Straight RGBA to premultiplied, in place.
pub fn premultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3];
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = scale_channel(*c, a);
        }
    }
}

/// Premultiplied RGBA to straight, in place.
pub fn unpremultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

/// Encodes a view as an 8-bit PNG with straight alpha.
pub fn encode_png(view: &ImageView) -> Result<Vec<u8>> {
    let (color, data) = match view.format {
        PixelFormat::Alpha8 => (png::ColorType::Grayscale, view.data.to_vec()),
        PixelFormat::Rgb8 => (png::ColorType::Rgb, view.data.to_vec()),
        PixelFormat::Rgba8 => {
            let mut data = view.data.to_vec();
            unpremultiply(&mut data);
            (png::ColorType::Rgba, data)
        }
    };

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, view.width, view.height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
    }
    Ok(buf)
}
