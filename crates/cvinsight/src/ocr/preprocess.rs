//! Image preprocessing ahead of recognition.
//!
//! The chain is deskew -> denoise -> adaptive threshold -> binarize. Each
//! step is toggled by [`PreprocessingConfig`]. Blank detection runs after
//! denoising and before thresholding, since a thresholded page of uniform
//! background is not reliably uniform any more.

use crate::core::config::PreprocessingConfig;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{adaptive_threshold, otsu_level};
use imageproc::filter::median_filter;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

const MAX_SKEW_DEGREES: f32 = 10.0;
const SKEW_STEP_DEGREES: f32 = 0.25;
const MIN_SKEW_CORRECTION_DEGREES: f32 = 0.5;
const SKEW_ANALYSIS_WIDTH: u32 = 1000;
const ADAPTIVE_BLOCK_RADIUS: u32 = 5;

/// Pages whose intensity range is below this are treated as blank.
const BLANK_MIN_RANGE: u8 = 32;
/// Pages with fewer dark pixels than this share are treated as blank.
const BLANK_MAX_INK_RATIO: f64 = 0.0005;

/// Result of running the preprocessing chain on one page image.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub image: GrayImage,
    pub blank: bool,
    pub skew_degrees: f32,
}

/// Run the configured chain over an image.
pub fn prepare(image: &DynamicImage, config: &PreprocessingConfig) -> PreparedImage {
    let mut gray = image.to_luma8();
    let mut skew_degrees = 0.0;

    if config.deskew {
        skew_degrees = estimate_skew_degrees(&gray);
        if skew_degrees.abs() >= MIN_SKEW_CORRECTION_DEGREES {
            gray = rotate_about_center(
                &gray,
                -skew_degrees.to_radians(),
                Interpolation::Bilinear,
                Luma([255]),
            );
        }
    }

    if config.denoise {
        gray = median_filter(&gray, 1, 1);
    }

    let blank = is_blank(&gray);
    if blank {
        return PreparedImage {
            image: gray,
            blank,
            skew_degrees,
        };
    }

    if config.adaptive_threshold {
        gray = adaptive_threshold(&gray, ADAPTIVE_BLOCK_RADIUS);
    }

    if config.binarization {
        binarize(&mut gray);
    }

    PreparedImage {
        image: gray,
        blank,
        skew_degrees,
    }
}

/// Whether a grayscale page carries no ink worth recognizing.
pub fn is_blank(gray: &GrayImage) -> bool {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return true;
    }

    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max.saturating_sub(min) < BLANK_MIN_RANGE {
        return true;
    }

    let mid = ((min as u16 + max as u16) / 2) as u8;
    let dark = gray.pixels().filter(|p| p[0] < mid).count() as f64;
    dark / (total as f64) < BLANK_MAX_INK_RATIO
}

/// Global Otsu binarization in place.
pub fn binarize(gray: &mut GrayImage) {
    let level = otsu_level(gray);
    for pixel in gray.pixels_mut() {
        pixel[0] = if pixel[0] > level { 255 } else { 0 };
    }
}

/// Estimate the rotation of text lines in degrees.
///
/// Dark pixels are projected onto the axis perpendicular to each candidate
/// angle; the angle whose projection histogram is most concentrated wins.
/// The returned angle is the clockwise rotation that was applied to the
/// page, so rotating by its negation straightens it.
pub fn estimate_skew_degrees(gray: &GrayImage) -> f32 {
    let sample = if gray.width() > SKEW_ANALYSIS_WIDTH {
        let height = (gray.height() as u64 * SKEW_ANALYSIS_WIDTH as u64 / gray.width() as u64).max(1) as u32;
        image::imageops::resize(gray, SKEW_ANALYSIS_WIDTH, height, FilterType::Triangle)
    } else {
        gray.clone()
    };

    if is_blank(&sample) {
        return 0.0;
    }

    let level = otsu_level(&sample);
    let points: Vec<(f32, f32)> = sample
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] <= level)
        .map(|(x, y, _)| (x as f32, y as f32))
        .collect();
    if points.len() < 50 {
        return 0.0;
    }

    let diagonal = ((sample.width() as f32).powi(2) + (sample.height() as f32).powi(2)).sqrt();
    let offset = diagonal.ceil() as i64;
    let bins = (2 * offset + 1) as usize;
    let mut histogram = vec![0u32; bins];

    let steps = (MAX_SKEW_DEGREES / SKEW_STEP_DEGREES).round() as i32;
    let mut best_angle = 0.0f32;
    let mut best_score = 0u64;

    for step in -steps..=steps {
        let angle = step as f32 * SKEW_STEP_DEGREES;
        let (sin, cos) = angle.to_radians().sin_cos();
        histogram.iter_mut().for_each(|b| *b = 0);

        for &(x, y) in &points {
            let projected = (y * cos - x * sin).round() as i64 + offset;
            if (0..bins as i64).contains(&projected) {
                histogram[projected as usize] += 1;
            }
        }

        let score: u64 = histogram.iter().map(|&c| (c as u64) * (c as u64)).sum();
        if score > best_score || (score == best_score && angle.abs() < best_angle.abs()) {
            best_score = score;
            best_angle = angle;
        }
    }

    best_angle
}

/// Upscale an image whose effective resolution is below `target_dpi`.
///
/// The factor is capped at 4x.
pub fn scale_to_dpi(image: DynamicImage, source_dpi: f32, target_dpi: u32) -> DynamicImage {
    if source_dpi <= 0.0 || target_dpi == 0 || source_dpi >= target_dpi as f32 {
        return image;
    }
    let factor = (target_dpi as f32 / source_dpi).min(4.0);
    let width = (image.width() as f32 * factor).round() as u32;
    let height = (image.height() as f32 * factor).round() as u32;
    image.resize_exact(width.max(1), height.max(1), FilterType::CatmullRom)
}
