//! Photo normalization pipeline: validate, decode, crop, resize, mask, encode

pub mod decode;
pub mod encode;
pub mod mask;
pub mod transform;

// Re-export public API
pub use encode::{compress_to_jpeg, compress_to_png, compress_to_webp, data_uri, PngCompression};
pub use mask::{HeapSurface, Surface};

use imageproc::image::{DynamicImage, Rgb};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::config::PhotoConfig;
use crate::error::{SurfaceUnavailable, ValidationError};
use crate::upload::{self, RawUpload};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ImageFormat {
    Jpeg { quality: u8 },
    Png { compression: PngCompression },
    WebP { quality: u8 },
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg { .. } => "jpg",
            ImageFormat::Png { .. } => "png",
            ImageFormat::WebP { .. } => "webp",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg { .. } => "image/jpeg",
            ImageFormat::Png { .. } => "image/png",
            ImageFormat::WebP { .. } => "image/webp",
        }
    }
}

/// Square, fixed-size, corner-rounded photo ready to embed
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPhoto {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl NormalizedPhoto {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn to_data_uri(&self) -> String {
        data_uri(self.mime(), &self.data)
    }
}

/// Whether the rounded corners made it into the pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Masking {
    Rounded,
    /// No surface to draw on, the square went through unmasked
    Skipped(SurfaceUnavailable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub photo: NormalizedPhoto,
    pub masking: Masking,
}

/// Runs uploads through every stage in order, stopping at the first failure
#[derive(Debug, Clone)]
pub struct Normalizer<S = HeapSurface> {
    config: PhotoConfig,
    surface: S,
}

impl Normalizer {
    pub fn new(config: PhotoConfig) -> Self {
        Normalizer::with_surface(config, HeapSurface)
    }
}

impl<S: Surface> Normalizer<S> {
    pub fn with_surface(config: PhotoConfig, surface: S) -> Self {
        Normalizer { config, surface }
    }

    pub fn config(&self) -> &PhotoConfig {
        &self.config
    }

    pub fn run(&self, raw: &RawUpload) -> Result<Normalized, ValidationError> {
        let c = &self.config;

        upload::validate(raw, &c.limits)?;
        let decoded = decode::decode(raw, &c.limits)?;
        let square = transform::normalize(decoded, &c.spec);

        let background = Rgb(c.background);
        let (pixels, masking) =
            match mask::mask(&square, c.spec.corner_radius, background, &self.surface) {
                Ok(masked) => (masked, Masking::Rounded),
                Err(unavailable) => {
                    log::warn!("{unavailable}, keeping square corners");
                    (
                        mask::flatten(square, background),
                        Masking::Skipped(unavailable),
                    )
                }
            };

        let (width, height) = pixels.dimensions();
        let data = encode::encode(&DynamicImage::ImageRgba8(pixels), c.image_format).map_err(
            |e| ValidationError::EncodeFailed {
                reason: format!("{e:#}"),
            },
        )?;

        log::debug!(
            "Normalized {} byte upload into {width}x{height} {} ({} bytes)",
            raw.byte_len(),
            c.image_format.mime(),
            data.len()
        );

        Ok(Normalized {
            photo: NormalizedPhoto {
                data,
                format: c.image_format,
                width,
                height,
            },
            masking,
        })
    }
}

/// Normalize many uploads in parallel, results in input order
pub fn process_batch(
    uploads: &[RawUpload],
    config: &PhotoConfig,
) -> Vec<Result<Normalized, ValidationError>> {
    log::info!("Processing {} uploads", uploads.len());

    let normalizer = Normalizer::new(config.clone());
    uploads.par_iter().map(|raw| normalizer.run(raw)).collect()
}
