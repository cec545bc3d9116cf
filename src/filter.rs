//! Software filters over packed pixel buffers: the separable blur and the
//! mask colorizer used to synthesize shadows.
//!
//! Blur output is only computed where the whole kernel window fits inside the
//! row or column: the window starting at `i` is evaluated when
//! `i + size < len` and written to `i + size / 2`. Every other pixel of the
//! pass is zero, which leaves a dead band along both edges.

use crate::api::PixelFormat;
use crate::error::{PenumbraError, Result};
use crate::style::Color;

/// Largest kernel half-width, in pixels.
pub const MAX_KERNEL_RADIUS: u32 = 1 << 20;

/// Integer Gaussian weights for `radius`, with `sigma = radius / 3` and the
/// center weight scaled to exactly 1. Non-positive, NaN or infinite radii give
/// `[1]`; radii above [`MAX_KERNEL_RADIUS`] are rejected.
pub fn make_kernel(radius: f64) -> Result<Vec<u32>> {
    if !(radius > 0.0) || !radius.is_finite() {
        return Ok(vec![1]);
    }
    let half = radius.ceil();
    if half > f64::from(MAX_KERNEL_RADIUS) {
        return Err(PenumbraError::BlurRadius(radius));
    }
    let half = half as i64;
    let sigma = radius / 3.0;
    let denom = 2.0 * sigma * sigma;
    let kernel = (-half..=half)
        .map(|i| {
            let x = i as f64;
            (-(x * x) / denom).exp().round() as u32
        })
        .collect();
    Ok(kernel)
}

/// Two-pass blur in place: rows with the horizontal kernel, then columns with
/// the vertical kernel.
pub fn gaussian_blur(
    data: &mut [u8],
    width: u32,
    height: u32,
    bpp: usize,
    h_radius: f64,
    v_radius: f64,
) -> Result<()> {
    let (width, height) = (width as usize, height as usize);
    debug_assert_eq!(data.len(), width * height * bpp);

    let hkernel = make_kernel(h_radius)?;
    let vkernel = make_kernel(v_radius)?;
    let hsum: u32 = hkernel.iter().sum();
    let vsum: u32 = vkernel.iter().sum();
    let (hsize, vsize) = (hkernel.len(), vkernel.len());

    let mut tmp = vec![0u8; data.len()];
    for row in 0..height {
        let base = row * width;
        let mut col = 0;
        while col + hsize < width {
            let out = (base + col + hsize / 2) * bpp;
            for ch in 0..bpp {
                let sum: u32 = hkernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * data[(base + col + k) * bpp + ch] as u32)
                    .sum();
                tmp[out + ch] = (sum / hsum) as u8;
            }
            col += 1;
        }
    }

    data.fill(0);
    for col in 0..width {
        let mut row = 0;
        while row + vsize < height {
            let out = ((row + vsize / 2) * width + col) * bpp;
            for ch in 0..bpp {
                let sum: u32 = vkernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * tmp[((row + k) * width + col) * bpp + ch] as u32)
                    .sum();
                data[out + ch] = (sum / vsum) as u8;
            }
            row += 1;
        }
    }
    Ok(())
}

/// Reference blur evaluating the full 2D window for every output pixel.
/// Produces the same bytes as [`gaussian_blur`].
pub fn slow_blur(
    data: &mut [u8],
    width: u32,
    height: u32,
    bpp: usize,
    h_radius: f64,
    v_radius: f64,
) -> Result<()> {
    let (width, height) = (width as usize, height as usize);
    let hkernel = make_kernel(h_radius)?;
    let vkernel = make_kernel(v_radius)?;
    let hsum: u32 = hkernel.iter().sum();
    let vsum: u32 = vkernel.iter().sum();
    let (hhalf, vhalf) = (hkernel.len() / 2, vkernel.len() / 2);

    let src = data.to_vec();
    // Horizontal pass value at (x, y), zero outside the computed band.
    let horizontal = |x: usize, y: usize, ch: usize| -> u32 {
        if x < hhalf || x - hhalf + hkernel.len() >= width {
            return 0;
        }
        let start = x - hhalf;
        let sum: u32 = hkernel
            .iter()
            .enumerate()
            .map(|(k, w)| w * src[(y * width + start + k) * bpp + ch] as u32)
            .sum();
        sum / hsum
    };

    for y in 0..height {
        for x in 0..width {
            for ch in 0..bpp {
                let i = (y * width + x) * bpp + ch;
                if y < vhalf || y - vhalf + vkernel.len() >= height {
                    data[i] = 0;
                    continue;
                }
                let start = y - vhalf;
                let sum: u32 = vkernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * horizontal(x, start + k, ch))
                    .sum();
                data[i] = (sum / vsum) as u8;
            }
        }
    }
    Ok(())
}

fn mask_alpha(mask: &[u8], format: PixelFormat, pixel: usize) -> u8 {
    match format {
        PixelFormat::Alpha8 => mask[pixel],
        PixelFormat::Rgb8 => 255,
        PixelFormat::Rgba8 => mask[pixel * 4 + 3],
    }
}

/// Writes `color` scaled by the mask's alpha into `dest` as premultiplied
/// pixels. Both buffers must describe the same number of pixels.
pub fn colorize(
    mask: &[u8],
    mask_format: PixelFormat,
    color: Color,
    dest: &mut [u8],
    dest_format: PixelFormat,
) {
    let pixels = mask.len() / mask_format.bytes_per_pixel();
    let dbpp = dest_format.bytes_per_pixel();
    debug_assert_eq!(pixels, dest.len() / dbpp);

    for p in 0..pixels.min(dest.len() / dbpp) {
        let coverage = mask_alpha(mask, mask_format, p) as f32 / 255.0;
        let alpha = color.alpha * coverage;
        let px = Color {
            alpha,
            ..color
        }
        .to_premultiplied_rgba8();
        let out = &mut dest[p * dbpp..(p + 1) * dbpp];
        match dest_format {
            PixelFormat::Alpha8 => out[0] = px[3],
            PixelFormat::Rgb8 => out.copy_from_slice(&px[..3]),
            PixelFormat::Rgba8 => out.copy_from_slice(&px),
        }
    }
}
