//! Error types for the conversion pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a conversion.
///
/// Degenerate geometry is not an error: unusable rings are dropped and
/// logged, and an input with no recoverable outline simply yields no
/// pieces.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid DXF: {message}")]
    Dxf { message: String },
    #[error("invalid SVG: {message}")]
    Svg { message: String },
    #[error("unsupported input format for {path:?} (expected .dxf or .svg)")]
    UnsupportedFormat { path: PathBuf },
    #[error("shape {index} not found ({available} available)")]
    PieceNotFound { index: usize, available: usize },
    #[error("invalid gauge: {name} must be a positive number, got {value}")]
    InvalidGauge { name: &'static str, value: f64 },
    #[error("invalid transform: {message}")]
    InvalidTransform { message: String },
    #[error("invalid unit scale: must be a positive number, got {value}")]
    InvalidUnitScale { value: f64 },
    #[error("invalid yarn symbol: must be a digit from 1 to 9, got {value}")]
    InvalidYarnSymbol { value: u8 },
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn svg(message: impl Into<String>) -> Self {
        Self::Svg {
            message: message.into(),
        }
    }

    /// The input could not be read as a drawing.
    pub fn is_input_format(&self) -> bool {
        matches!(
            self,
            Self::Dxf { .. } | Self::Svg { .. } | Self::UnsupportedFormat { .. }
        )
    }

    /// A requested piece index does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PieceNotFound { .. })
    }

    /// Caller-supplied parameters were rejected.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Self::InvalidGauge { .. }
                | Self::InvalidTransform { .. }
                | Self::InvalidUnitScale { .. }
                | Self::InvalidYarnSymbol { .. }
        )
    }
}
