//! Cropping detected currency out of the source image for display.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat, Luma, RgbaImage};
use imageproc::drawing::draw_filled_ellipse_mut;
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use denar_models::{BoundingBox, CurrencyType, DetectionResult};

use crate::error::VisionResult;

/// Pixels added around a detection box before cropping.
pub const DEFAULT_PADDING: u32 = 10;

/// Side of the placeholder returned for empty crops.
const EMPTY_CROP_SIDE: u32 = 100;

/// Coin mask half-axes as a fraction of the crop size.
const COIN_MASK_AXIS: f32 = 0.48;

/// One extracted detection.
#[derive(Debug, Clone)]
pub struct ExtractedCurrency {
    /// Position in the result
    pub id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub image: DynamicImage,
}

/// Crop `bbox` (plus `padding`) out of `image`.
///
/// Coins get an elliptical transparency mask; banknotes get a light contrast
/// and sharpness boost. An empty crop yields a black 100x100 image.
pub fn extract_currency(
    image: &DynamicImage,
    bbox: &BoundingBox,
    currency_type: CurrencyType,
    padding: u32,
) -> DynamicImage {
    let (width, height) = image.dimensions();
    let pad = padding as i64;
    let x1 = (bbox.x1() as i64 - pad).clamp(0, width as i64) as u32;
    let y1 = (bbox.y1() as i64 - pad).clamp(0, height as i64) as u32;
    let x2 = (bbox.x2() as i64 + pad).clamp(0, width as i64) as u32;
    let y2 = (bbox.y2() as i64 + pad).clamp(0, height as i64) as u32;

    if x2 <= x1 || y2 <= y1 {
        return DynamicImage::new_rgb8(EMPTY_CROP_SIDE, EMPTY_CROP_SIDE);
    }

    let cropped = image.crop_imm(x1, y1, x2 - x1, y2 - y1);
    match currency_type {
        CurrencyType::Coin => mask_coin(&cropped),
        CurrencyType::Note => enhance_banknote(&cropped),
    }
}

/// Extract every detection of a successful result.
pub fn extract_detections(image: &DynamicImage, result: &DetectionResult) -> Vec<ExtractedCurrency> {
    let Some(currency_type) = result.currency_type else {
        return Vec::new();
    };

    result
        .detections
        .iter()
        .enumerate()
        .map(|(i, det)| ExtractedCurrency {
            id: i,
            class_name: det.class_name().to_string(),
            confidence: det.effective_confidence(),
            image: extract_currency(image, det.bbox(), currency_type, DEFAULT_PADDING),
        })
        .collect()
}

/// Encode as a `data:image/png;base64,...` URL.
pub fn encode_png_data_url(image: &DynamicImage) -> VisionResult<String> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&buf)))
}

/// Write extracted images as `{prefix}_{id}_{class}_{confidence}.png` into `dir`.
pub fn save_extracted(
    dir: &Path,
    prefix: &str,
    extracted: &[ExtractedCurrency],
) -> VisionResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(extracted.len());
    for item in extracted {
        let file_name = format!(
            "{}_{}_{}_{:.2}.png",
            prefix, item.id, item.class_name, item.confidence
        );
        let path = dir.join(file_name);
        item.image.save_with_format(&path, ImageFormat::Png)?;
        debug!(path = %path.display(), "Saved extracted currency");
        written.push(path);
    }
    Ok(written)
}

fn mask_coin(cropped: &DynamicImage) -> DynamicImage {
    let (w, h) = cropped.dimensions();
    let mut mask = GrayImage::new(w, h);
    let center = ((w / 2) as i32, (h / 2) as i32);
    let rx = ((w as f32 * COIN_MASK_AXIS) as i32).max(1);
    let ry = ((h as f32 * COIN_MASK_AXIS) as i32).max(1);
    draw_filled_ellipse_mut(&mut mask, center, rx, ry, Luma([255u8]));
    let mask = gaussian_blur_f32(&mask, 1.5);

    let mut rgba: RgbaImage = cropped.to_rgba8();
    for (x, y, pixel) in rgba.enumerate_pixels_mut() {
        pixel.0[3] = mask.get_pixel(x, y).0[0];
    }
    DynamicImage::ImageRgba8(rgba)
}

fn enhance_banknote(cropped: &DynamicImage) -> DynamicImage {
    cropped.adjust_contrast(12.0).unsharpen(1.0, 2)
}
