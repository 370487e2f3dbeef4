//! Geometric normalization: centered square crop and fixed-size resize

use fast_image_resize as fr;
use fr::images::Image as FrImage;
use imageproc::image::RgbaImage;

use super::decode::DecodedImage;
use crate::config::NormalizationSpec;

/// Largest centered square inside a `width x height` source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareCrop {
    pub offset_x: u32,
    pub offset_y: u32,
    pub side: u32,
}

impl SquareCrop {
    pub fn centered(width: u32, height: u32) -> Self {
        let side = width.min(height);
        // Equal margins on the longer axis, odd remainders truncate
        SquareCrop {
            offset_x: (width - side) / 2,
            offset_y: (height - side) / 2,
            side,
        }
    }
}

/// Crop the decoded image to its centered square and resample it to
/// `target_size x target_size`
pub fn normalize(img: DecodedImage, spec: &NormalizationSpec) -> RgbaImage {
    let (width, height) = (img.width(), img.height());
    let crop = SquareCrop::centered(width, height);
    let target = spec.target_size.max(1);

    log::trace!("Center crop of {width}x{height}: {crop:?} -> {target}x{target}");

    // Downscaling: Lanczos3 preserves detail, upscaling: CatmullRom is smoother
    let algorithm = if crop.side > target {
        fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3)
    } else {
        fr::ResizeAlg::Convolution(fr::FilterType::CatmullRom)
    };

    let src_buffer = img.into_pixels().into_raw();
    let src_image = FrImage::from_vec_u8(width, height, src_buffer, fr::PixelType::U8x4)
        .expect("RGBA buffer matches its dimensions");

    let mut dst_image = FrImage::new(target, target, fr::PixelType::U8x4);

    let options = fr::ResizeOptions::new().resize_alg(algorithm).crop(
        crop.offset_x as f64,
        crop.offset_y as f64,
        crop.side as f64,
        crop.side as f64,
    );

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .expect("RGBA to RGBA resize with an in-bounds crop");

    RgbaImage::from_raw(target, target, dst_image.into_vec())
        .expect("destination buffer matches target size")
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::image::Rgba;

    fn solid(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255])))
    }

    #[test]
    fn wide_crop_is_centered_horizontally() {
        assert_eq!(
            SquareCrop::centered(200, 100),
            SquareCrop {
                offset_x: 50,
                offset_y: 0,
                side: 100
            }
        );
    }

    #[test]
    fn tall_crop_is_centered_vertically() {
        assert_eq!(
            SquareCrop::centered(300, 400),
            SquareCrop {
                offset_x: 0,
                offset_y: 50,
                side: 300
            }
        );
    }

    #[test]
    fn odd_margins_truncate() {
        assert_eq!(
            SquareCrop::centered(101, 100),
            SquareCrop {
                offset_x: 0,
                offset_y: 0,
                side: 100
            }
        );
        assert_eq!(SquareCrop::centered(1, 4).offset_y, 1);
    }

    #[test]
    fn square_at_target_size_is_not_cropped() {
        assert_eq!(
            SquareCrop::centered(92, 92),
            SquareCrop {
                offset_x: 0,
                offset_y: 0,
                side: 92
            }
        );
    }

    #[test]
    fn every_aspect_ratio_lands_on_target_size() {
        let spec = NormalizationSpec::default();
        for (w, h) in [(400, 300), (300, 400), (92, 92), (500, 1), (1, 1), (3, 700)] {
            let out = normalize(solid(w, h), &spec);
            assert_eq!(out.dimensions(), (92, 92), "input {w}x{h}");
        }
    }

    #[test]
    fn crop_keeps_the_center_content() {
        // Left and right thirds red, middle square blue
        let mut img = RgbaImage::from_pixel(300, 100, Rgba([255, 0, 0, 255]));
        for y in 0..100 {
            for x in 100..200 {
                img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }

        let out = normalize(DecodedImage::new(img), &NormalizationSpec::default());
        let center = out.get_pixel(46, 46);
        assert!(center[2] > 200 && center[0] < 50, "{center:?}");
        let edge = out.get_pixel(5, 46);
        assert!(edge[2] > edge[0], "{edge:?}");
    }
}
