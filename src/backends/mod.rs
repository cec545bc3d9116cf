//! Surface implementations.

#[cfg(feature = "cairo")]
pub mod cairo;
pub mod raster;
pub mod recording;
#[cfg(feature = "svg")]
pub mod svg;
