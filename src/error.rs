use thiserror::Error;

pub type Result<T> = std::result::Result<T, PenumbraError>;

/// Coarse classification of a [`PenumbraError`], for callers that pick a
/// recovery policy (placeholder image, skip the draw, abort) by category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedImageFormat,
    DecodeFailure,
    InvalidDimensions,
    InvalidInput,
    Unsupported,
    Backend,
    Io,
}

#[derive(Debug, Error)]
pub enum PenumbraError {
    /// The byte buffer does not start with a PNG, JPEG or GIF signature.
    #[error("unsupported image format (leading bytes {signature:02x?})")]
    UnsupportedImageFormat { signature: Vec<u8> },

    /// The signature was recognized but the decoder rejected the payload.
    #[error("failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("invalid surface dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("surface size mismatch: {source_width}x{source_height} vs {target_width}x{target_height}")]
    SizeMismatch {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
    },

    #[error("invalid gradient stop offset: {0} (must be within 0.0-1.0)")]
    InvalidGradientStop(f64),

    #[error("blur radius {0} is too large")]
    BlurRadius(f64),

    #[error("failed to parse color: {0}")]
    ColorParse(String),

    #[error("failed to parse font: {0}")]
    FontParse(String),

    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PenumbraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PenumbraError::UnsupportedImageFormat { .. } => ErrorKind::UnsupportedImageFormat,
            PenumbraError::DecodeFailure(_) => ErrorKind::DecodeFailure,
            PenumbraError::InvalidDimensions { .. } => ErrorKind::InvalidDimensions,
            PenumbraError::BufferSize { .. }
            | PenumbraError::SizeMismatch { .. }
            | PenumbraError::InvalidGradientStop(_)
            | PenumbraError::BlurRadius(_)
            | PenumbraError::ColorParse(_)
            | PenumbraError::FontParse(_) => ErrorKind::InvalidInput,
            PenumbraError::Unsupported(_) => ErrorKind::Unsupported,
            PenumbraError::Backend(_) => ErrorKind::Backend,
            PenumbraError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<png::EncodingError> for PenumbraError {
    fn from(err: png::EncodingError) -> Self {
        PenumbraError::Backend(Box::new(err))
    }
}

#[cfg(feature = "cairo")]
impl From<cairo::Error> for PenumbraError {
    fn from(err: cairo::Error) -> Self {
        PenumbraError::Backend(Box::new(err))
    }
}

#[cfg(feature = "cairo")]
impl From<cairo::BorrowError> for PenumbraError {
    fn from(err: cairo::BorrowError) -> Self {
        PenumbraError::Backend(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_classify_image_failures() {
        let err = PenumbraError::UnsupportedImageFormat {
            signature: vec![0x00, 0x01],
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedImageFormat);
        assert!(err.to_string().contains("00"));

        let err = PenumbraError::DecodeFailure("truncated".into());
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert_eq!(err.to_string(), "failed to decode image: truncated");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PenumbraError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
