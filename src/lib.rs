//! Canvas-style 2D drawing over interchangeable surfaces.
//!
//! A [`Context`] keeps the drawing state (styles, transform, clip, shadow)
//! and turns calls into primitive operations on a [`Surface`]. Surfaces
//! that cannot draw shadows themselves get them synthesized from an alpha
//! mask, a separable Gaussian blur and a colorize pass, see [`filter`].

pub mod api;
pub mod backends;
pub mod context;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod logging;
pub mod style;
pub mod text;
pub mod texture;

pub use api::{
    Capabilities, ImageView, Operator, PixelFormat, PixelLock, PixelLockMut, PixelSurface,
    RenderMode, RenderParams, Shadow, Surface, TextRun,
};
pub use backends::raster::RasterSurface;
pub use backends::recording::RecordingSurface;
#[cfg(feature = "svg")]
pub use backends::svg::SvgSurface;
#[cfg(feature = "cairo")]
pub use backends::cairo::CairoSurface;
pub use context::{Context, ContextState, HitRegion};
pub use error::{ErrorKind, PenumbraError, Result};
pub use geometry::{Path, PathComponent, Point, Rect, Transform};
pub use crate::image::Image;
pub use logging::{LoggingConfig, init_logging};
pub use style::{Color, ColorStop, Font, Gradient, GradientKind, Style, TextAlign, TextBaseline};
pub use text::{BlockGlyphs, TextEngine, TextMetrics};
