//! Placeholder images for trying the pipeline on an empty gallery.

use crate::error::AppError;
use crate::exif_writer::{self, ExifEdit};
use crate::thumbnails;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use image::{DynamicImage, GrayImage, Luma};
use std::path::{Path, PathBuf};

const WHITE: Luma<u8> = Luma([255]);

/// Seven-segment masks, bit 0 = top segment through bit 6 = middle segment.
const DIGIT_SEGMENTS: [u8; 10] = [0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F];

fn sample_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn fill_rect(image: &mut GrayImage, x: u32, y: u32, width: u32, height: u32) {
    let x_end = (x + width).min(image.width());
    let y_end = (y + height).min(image.height());
    for py in y.min(y_end)..y_end {
        for px in x.min(x_end)..x_end {
            image.put_pixel(px, py, WHITE);
        }
    }
}

fn draw_digit(image: &mut GrayImage, digit: usize, x: u32, y: u32, width: u32, height: u32) {
    let stroke = (height / 10).max(1);
    let half = height / 2;
    let segments = [
        (x, y, width, stroke),
        (x + width - stroke, y, stroke, half),
        (x + width - stroke, y + half, stroke, height - half),
        (x, y + height - stroke, width, stroke),
        (x, y + half, stroke, height - half),
        (x, y, stroke, half),
        (x, y + half - stroke / 2, width, stroke),
    ];
    let mask = DIGIT_SEGMENTS[digit % 10];
    for (bit, (sx, sy, sw, sh)) in segments.into_iter().enumerate() {
        if mask & (1 << bit) != 0 {
            fill_rect(image, sx, sy, sw, sh);
        }
    }
}

/// Black canvas with a white frame and `index` drawn in the middle.
pub fn render_sample(index: usize, width: u32, height: u32) -> GrayImage {
    let mut image = GrayImage::new(width, height);

    let short_side = width.min(height);
    let margin = short_side / 40;
    let band = (short_side / 30).max(1);
    fill_rect(&mut image, margin, margin, width.saturating_sub(2 * margin), band);
    fill_rect(&mut image, margin, height.saturating_sub(margin + band), width.saturating_sub(2 * margin), band);
    fill_rect(&mut image, margin, margin, band, height.saturating_sub(2 * margin));
    fill_rect(&mut image, width.saturating_sub(margin + band), margin, band, height.saturating_sub(2 * margin));

    let digits: Vec<usize> = index
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as usize)
        .collect();
    let count = digits.len() as u32;
    // Digits are half as wide as tall, separated by a third of their width.
    let digit_height = (height / 3).min(width * 6 / 10 * 6 / (count * 4).saturating_sub(1).max(1));
    if digit_height < 10 {
        return image;
    }
    let digit_width = digit_height / 2;
    let gap = digit_width / 3;
    let total_width = count * digit_width + count.saturating_sub(1) * gap;
    let mut x = width.saturating_sub(total_width) / 2;
    let y = height.saturating_sub(digit_height) / 2;
    for digit in digits {
        draw_digit(&mut image, digit, x, y, digit_width, digit_height);
        x += digit_width + gap;
    }
    image
}

/// Writes `0.jpg` .. `(count-1).jpg` into `dir`. Each gets a capture time one
/// second after the previous so capture order matches the index.
pub fn create_sample_images(
    dir: &Path,
    count: usize,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<PathBuf>, AppError> {
    log::info!("Creating {} sample images in {:?}", count, dir);
    let epoch = sample_epoch();
    let mut created = Vec::with_capacity(count);
    for index in 0..count {
        let path = dir.join(format!("{}.jpg", index));
        let image = DynamicImage::ImageLuma8(render_sample(index, width, height));
        thumbnails::save_jpeg(&image, &path, quality)?;

        let taken = epoch + Duration::seconds(index as i64);
        exif_writer::write_exif(
            &path,
            &ExifEdit {
                date_time_original: Some(taken.format("%Y:%m:%d %H:%M:%S").to_string()),
                software: Some(env!("CARGO_PKG_NAME").to_string()),
                ..Default::default()
            },
        )?;
        log::trace!("Created sample {:?}", path);
        created.push(path);
    }
    Ok(created)
}
