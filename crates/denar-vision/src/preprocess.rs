//! Image preprocessing ahead of detection.

use image::{imageops::FilterType, DynamicImage, GenericImageView, RgbImage};
use imageproc::filter::median_filter;

/// Preprocessed image plus the factor it was resized by (`new / old`).
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub image: DynamicImage,
    pub scale: f32,
}

/// Image preparation applied before the binary stage.
pub trait Preprocess: Send + Sync {
    fn preprocess(&self, image: &DynamicImage) -> Preprocessed;
}

/// Leaves the image untouched at scale 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreprocessor;

impl Preprocess for IdentityPreprocessor {
    fn preprocess(&self, image: &DynamicImage) -> Preprocessed {
        Preprocessed {
            image: image.clone(),
            scale: 1.0,
        }
    }
}

/// Downscale, stretch contrast and denoise.
#[derive(Debug, Clone, Copy)]
pub struct StandardPreprocessor {
    /// Longest side after resizing
    pub max_side: u32,
    /// Fraction of luma samples clipped at each end of the histogram
    pub clip_fraction: f32,
}

impl Default for StandardPreprocessor {
    fn default() -> Self {
        Self {
            max_side: 1280,
            clip_fraction: 0.01,
        }
    }
}

impl StandardPreprocessor {
    pub fn new(max_side: u32) -> Self {
        Self {
            max_side,
            ..Self::default()
        }
    }

    fn resize(&self, image: &DynamicImage) -> (RgbImage, f32) {
        let (width, height) = image.dimensions();
        let longest = width.max(height);
        if self.max_side == 0 || longest <= self.max_side {
            return (image.to_rgb8(), 1.0);
        }

        let scale = self.max_side as f32 / longest as f32;
        let new_w = ((width as f32 * scale).round() as u32).max(1);
        let new_h = ((height as f32 * scale).round() as u32).max(1);
        let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
        (resized.to_rgb8(), scale)
    }
}

impl Preprocess for StandardPreprocessor {
    fn preprocess(&self, image: &DynamicImage) -> Preprocessed {
        let (mut rgb, scale) = self.resize(image);
        if rgb.width() == 0 || rgb.height() == 0 {
            return Preprocessed {
                image: DynamicImage::ImageRgb8(rgb),
                scale,
            };
        }

        stretch_contrast(&mut rgb, self.clip_fraction);
        let denoised = median_filter(&rgb, 1, 1);

        Preprocessed {
            image: DynamicImage::ImageRgb8(denoised),
            scale,
        }
    }
}

/// Percentile auto-levels on the luma histogram, applied to every channel.
fn stretch_contrast(rgb: &mut RgbImage, clip_fraction: f32) {
    let (low, high) = luma_bounds(rgb, clip_fraction);
    if high <= low {
        return;
    }

    let range = (high - low) as f32;
    let lut: Vec<u8> = (0..=255u16)
        .map(|v| {
            let stretched = (v as f32 - low as f32) * 255.0 / range;
            stretched.round().clamp(0.0, 255.0) as u8
        })
        .collect();

    for pixel in rgb.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = lut[*channel as usize];
        }
    }
}

/// Luma values at the `clip_fraction` and `1 - clip_fraction` quantiles.
fn luma_bounds(rgb: &RgbImage, clip_fraction: f32) -> (u8, u8) {
    let mut histogram = [0u64; 256];
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        histogram[luma.round().clamp(0.0, 255.0) as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    let clip = (total as f32 * clip_fraction.clamp(0.0, 0.5)) as u64;

    let mut seen = 0u64;
    let mut low = 0u8;
    for (value, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > clip {
            low = value as u8;
            break;
        }
    }

    seen = 0;
    let mut high = 255u8;
    for (value, count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > clip {
            high = value as u8;
            break;
        }
    }

    (low, high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, _| {
            let v = 60 + (x * 100 / width.max(1)) as u8;
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_identity_keeps_scale() {
        let img = gradient(50, 40);
        let out = IdentityPreprocessor.preprocess(&img);
        assert_eq!(out.scale, 1.0);
        assert_eq!(out.image.dimensions(), (50, 40));
    }

    #[test]
    fn test_small_image_not_resized() {
        let out = StandardPreprocessor::new(1280).preprocess(&gradient(200, 100));
        assert_eq!(out.scale, 1.0);
        assert_eq!(out.image.dimensions(), (200, 100));
    }

    #[test]
    fn test_large_image_downscaled() {
        let out = StandardPreprocessor::new(100).preprocess(&gradient(400, 200));
        assert!((out.scale - 0.25).abs() < 1e-6);
        assert_eq!(out.image.dimensions(), (100, 50));
    }

    #[test]
    fn test_contrast_stretched_to_full_range() {
        let out = StandardPreprocessor::new(1280).preprocess(&gradient(256, 8));
        let luma = out.image.to_luma8();
        let min = luma.pixels().map(|p| p.0[0]).min().unwrap();
        let max = luma.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(min < 10, "min was {}", min);
        assert!(max > 245, "max was {}", max);
    }

    #[test]
    fn test_flat_image_unchanged() {
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 20, Rgb([128, 128, 128])));
        let out = StandardPreprocessor::default().preprocess(&flat);
        assert_eq!(out.image.to_rgb8().get_pixel(10, 10), &Rgb([128, 128, 128]));
    }
}
