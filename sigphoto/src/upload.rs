//! Raw uploads and the pre-decode validator

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use std::path::Path;
use std::str::FromStr;

use crate::error::ValidationError;

/// Raster types the picker offers. Anything else is let through to the
/// decoder with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum AcceptedMime {
    #[strum(to_string = "image/png")]
    Png,
    #[strum(to_string = "image/jpeg", serialize = "image/jpg")]
    Jpeg,
}

impl AcceptedMime {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(AcceptedMime::Png),
            "jpg" | "jpeg" => Some(AcceptedMime::Jpeg),
            _ => None,
        }
    }
}

/// Bytes exactly as the user picked them
#[derive(Debug, Clone)]
pub struct RawUpload {
    data: Vec<u8>,
    declared_mime: Option<String>,
}

impl RawUpload {
    pub fn new(data: Vec<u8>, declared_mime: Option<String>) -> Self {
        RawUpload {
            data,
            declared_mime,
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let declared_mime = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(AcceptedMime::from_extension)
            .map(|mime| mime.as_str().to_string());

        Ok(RawUpload::new(data, declared_mime))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn declared_mime(&self) -> Option<&str> {
        self.declared_mime.as_deref()
    }

    pub fn accepted_mime(&self) -> Option<AcceptedMime> {
        self.declared_mime
            .as_deref()
            .and_then(|mime| AcceptedMime::from_str(mime.trim()).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    /// Byte ceiling checked before decoding
    pub max_file_size_bytes: u64,
    /// Per-axis pixel ceiling checked after decoding
    pub max_dimension_pixels: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 500 * 1024,
            max_dimension_pixels: 2500,
        }
    }
}

impl ValidationLimits {
    pub fn limit_kb(&self) -> u64 {
        kilobytes(self.max_file_size_bytes)
    }
}

fn kilobytes(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}

/// Reject uploads that are not worth decoding
pub fn validate(raw: &RawUpload, limits: &ValidationLimits) -> Result<(), ValidationError> {
    let size = raw.byte_len();
    if size > limits.max_file_size_bytes {
        log::debug!(
            "Rejecting {size} byte upload (limit {} bytes)",
            limits.max_file_size_bytes
        );
        return Err(ValidationError::FileTooLarge {
            observed_kb: kilobytes(size),
            limit_kb: limits.limit_kb(),
        });
    }

    if raw.accepted_mime().is_none() {
        log::warn!(
            "Declared type {:?} is not PNG or JPEG, trying to decode anyway",
            raw.declared_mime()
        );
    }

    Ok(())
}
