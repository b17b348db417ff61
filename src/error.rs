//! Error types for the pvstream crate.

use std::fmt;

use crate::core::types::FrameShape;

/// Errors raised while building or configuring phase-vocoder nodes.
///
/// Per-block processing never fails: out-of-range bins are dropped locally
/// and parameter corrections are logged, so these only surface from
/// constructors, setters, and file helpers.
#[derive(Debug, Clone, PartialEq)]
pub enum PvocError {
    /// A parameter is outside the range the node can work with.
    InvalidParameter(String),
    /// A lookup table was supplied without any data.
    EmptyTable(&'static str),
    /// Two-input operator wired to streams of different shape.
    ShapeMismatch {
        expected: FrameShape,
        found: FrameShape,
    },
    /// Malformed chain description or audio file.
    InvalidFormat(String),
    /// I/O error.
    IoError(String),
}

impl fmt::Display for PvocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PvocError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            PvocError::EmptyTable(which) => write!(f, "{} table is empty", which),
            PvocError::ShapeMismatch { expected, found } => write!(
                f,
                "frame stream shape mismatch: expected {}x{}, found {}x{}",
                expected.fft_size, expected.overlaps, found.fft_size, found.overlaps
            ),
            PvocError::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            PvocError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for PvocError {}

impl From<std::io::Error> for PvocError {
    fn from(err: std::io::Error) -> Self {
        PvocError::IoError(err.to_string())
    }
}
