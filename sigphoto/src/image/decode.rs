//! Image decoding

use imageproc::image::{DynamicImage, ImageReader, RgbaImage};

use std::io::Cursor;

use crate::error::ValidationError;
use crate::upload::{RawUpload, ValidationLimits};

/// Decoded pixels, always RGBA8 with non-zero dimensions
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbaImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        DecodedImage { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }
}

impl From<DynamicImage> for DecodedImage {
    fn from(img: DynamicImage) -> Self {
        DecodedImage::new(img.into_rgba8())
    }
}

/// Decode an upload, rejecting anything over the pixel ceiling
///
/// The format is sniffed from the bytes. Dimensions come from the header,
/// so an oversized image is refused before its pixels are allocated.
pub fn decode(raw: &RawUpload, limits: &ValidationLimits) -> Result<DecodedImage, ValidationError> {
    let (width, height) = reader(raw.data())?
        .into_dimensions()
        .map_err(decode_failed)?;
    check_resolution(width, height, limits)?;

    let img = reader(raw.data())?.decode().map_err(decode_failed)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(ValidationError::DecodeFailed {
            reason: format!("image has no pixels ({}x{})", img.width(), img.height()),
        });
    }

    log::debug!("Decoded {}x{} {:?}", img.width(), img.height(), img.color());
    Ok(img.into())
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, ValidationError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(decode_failed)?;

    if reader.format().is_none() {
        return Err(ValidationError::DecodeFailed {
            reason: "unrecognized image format".to_string(),
        });
    }

    Ok(reader)
}

fn check_resolution(
    width: u32,
    height: u32,
    limits: &ValidationLimits,
) -> Result<(), ValidationError> {
    let limit = limits.max_dimension_pixels;
    if width > limit || height > limit {
        return Err(ValidationError::ResolutionTooHigh {
            observed_width: width,
            observed_height: height,
            limit_pixels: limit,
        });
    }
    Ok(())
}

fn decode_failed(e: impl std::fmt::Display) -> ValidationError {
    ValidationError::DecodeFailed {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::image::{ImageFormat, Rgb, RgbImage, Rgba};

    fn encoded(img: DynamicImage, format: ImageFormat) -> RawUpload {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        RawUpload::new(buf, None)
    }

    #[test]
    fn decodes_png_and_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 200, 30])));
        let limits = ValidationLimits::default();

        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            let decoded = decode(&encoded(img.clone(), format), &limits).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (40, 30));
        }
    }

    #[test]
    fn keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 0])));
        let decoded = decode(&encoded(img, ImageFormat::Png), &ValidationLimits::default()).unwrap();
        assert_eq!(decoded.pixels().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn garbage_fails_to_decode() {
        let raw = RawUpload::new(b"definitely not an image".to_vec(), None);
        let err = decode(&raw, &ValidationLimits::default()).unwrap_err();
        assert!(matches!(err, ValidationError::DecodeFailed { .. }));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([9, 9, 9])));
        let mut raw = encoded(img, ImageFormat::Png).data().to_vec();
        raw.truncate(raw.len() / 2);

        let err = decode(&RawUpload::new(raw, None), &ValidationLimits::default()).unwrap_err();
        assert!(matches!(err, ValidationError::DecodeFailed { .. }));
    }

    #[test]
    fn either_axis_over_the_limit_is_rejected() {
        let limits = ValidationLimits {
            max_dimension_pixels: 50,
            ..ValidationLimits::default()
        };

        let tall = DynamicImage::ImageRgb8(RgbImage::new(20, 51));
        let err = decode(&encoded(tall, ImageFormat::Png), &limits).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ResolutionTooHigh {
                observed_width: 20,
                observed_height: 51,
                limit_pixels: 50
            }
        );

        let exact = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        assert!(decode(&encoded(exact, ImageFormat::Png), &limits).is_ok());
    }
}
