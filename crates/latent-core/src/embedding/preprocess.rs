//! Image preprocessing for CLIP embedding generation.
//!
//! CLIP ViT-B/32 expects:
//! - Centered square crop of the shortest side, resized to 224×224 (bicubic)
//! - Pixels scaled to [0, 1], then normalized per channel with CLIP's mean/std
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Number of color channels (RGB).
const CHANNELS: usize = 3;

/// CLIP normalization mean (per-channel, RGB).
const NORM_MEAN: [f32; CHANNELS] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std (per-channel, RGB).
const NORM_STD: [f32; CHANNELS] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Preprocess an image for CLIP inference.
///
/// Center-crops the largest square in source pixels, resizes it to
/// `image_size`, converts to RGB, normalizes, and returns an NCHW tensor for
/// ONNX Runtime. Cropping first keeps memory bounded by the source image even
/// for extreme aspect ratios.
pub fn preprocess(image: &DynamicImage, image_size: u32) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let side = width.min(height).max(1);
    let left = width.saturating_sub(side) / 2;
    let top = height.saturating_sub(side) / 2;

    let rgb = image
        .crop_imm(left, top, side, side)
        .resize_exact(image_size, image_size, FilterType::CatmullRom)
        .to_rgb8();

    let size = image_size as usize;
    Array4::from_shape_fn((1, CHANNELS, size, size), |(_, c, y, x)| {
        let val = rgb.get_pixel(x as u32, y as u32)[c];
        (val as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_preprocess_shape_landscape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let tensor = preprocess(&img, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_shape_tiny_portrait() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(3, 17));
        let tensor = preprocess(&img, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_normalization() {
        // White: (1.0 - mean) / std per channel
        let img =
            DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255])));
        let tensor = preprocess(&img, 32);
        for c in 0..CHANNELS {
            let expected = (1.0 - NORM_MEAN[c]) / NORM_STD[c];
            assert!((tensor[[0, c, 5, 5]] - expected).abs() < 1e-3);
        }

        // Black: -mean / std per channel
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, image::Rgb([0, 0, 0])));
        let tensor = preprocess(&img, 32);
        for c in 0..CHANNELS {
            let expected = -NORM_MEAN[c] / NORM_STD[c];
            assert!((tensor[[0, c, 0, 0]] - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn test_preprocess_extreme_aspect_ratio() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(1, 10_000, |_, y| {
            if y == 4_999 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        }));
        let tensor = preprocess(&img, 224);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);

        // The single source pixel at the center fills the whole crop
        let white = (1.0 - NORM_MEAN[0]) / NORM_STD[0];
        assert!((tensor[[0, 0, 0, 0]] - white).abs() < 1e-3);
        assert!((tensor[[0, 0, 223, 223]] - white).abs() < 1e-3);
    }

    #[test]
    fn test_preprocess_crops_center_of_landscape() {
        // Red left third, green middle, blue right third
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 10, |x, _| match x {
            0..=9 => image::Rgb([255, 0, 0]),
            10..=19 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([0, 0, 255]),
        }));
        let tensor = preprocess(&img, 10);
        let green = (1.0 - NORM_MEAN[1]) / NORM_STD[1];
        assert!((tensor[[0, 1, 5, 0]] - green).abs() < 1e-3);
        assert!((tensor[[0, 1, 5, 9]] - green).abs() < 1e-3);
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(50, 30, |x, y| {
            image::Rgb([(x * 5) as u8, (y * 8) as u8, 128])
        }));
        assert_eq!(preprocess(&img, 16), preprocess(&img, 16));
    }
}
