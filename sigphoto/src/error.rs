//! Pipeline error taxonomy
//!
//! Every variant is recoverable: the caller reports it and asks for another
//! file. None of them leave partial state behind.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Raw payload exceeds the byte ceiling. Raised before any decoding.
    #[error("file rejected: photo is {observed_kb}KB, the limit is {limit_kb}KB")]
    FileTooLarge { observed_kb: u64, limit_kb: u64 },

    /// Decoded image exceeds the per-axis pixel ceiling.
    #[error(
        "resolution too high: {observed_width}x{observed_height}px, the limit is {limit_pixels}px"
    )]
    ResolutionTooHigh {
        observed_width: u32,
        observed_height: u32,
        limit_pixels: u32,
    },

    #[error("invalid or corrupt image: {reason}")]
    DecodeFailed { reason: String },

    #[error("failed to encode photo: {reason}")]
    EncodeFailed { reason: String },
}

/// A drawing surface of the requested size could not be obtained.
///
/// Not a pipeline failure: the masker's caller falls back to the unmasked
/// square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no {side}x{side} drawing surface available")]
pub struct SurfaceUnavailable {
    pub side: u32,
}
