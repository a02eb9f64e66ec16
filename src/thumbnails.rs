use crate::error::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use std::path::Path;

/// Encodes `image` as a JPEG at `quality` (1-100). Grayscale stays grayscale.
/// Nothing is written to `path` unless encoding succeeds.
pub fn save_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), AppError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    match image {
        DynamicImage::ImageLuma8(gray) => {
            encoder.encode(gray.as_raw(), gray.width(), gray.height(), ColorType::L8)?
        }
        other => {
            let rgb = other.to_rgb8();
            encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?
        }
    }
    std::fs::write(path, &buffer)?;
    Ok(())
}

/// Decodes `source`, shrinks it to fit `max_width` x `max_height` keeping the
/// aspect ratio, and writes it to `target`.
pub fn create_thumbnail(
    source: &Path,
    target: &Path,
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> Result<(), AppError> {
    log::trace!("Opening image for thumbnail generation: {:?}", source);
    let image = image::open(source).map_err(|e| {
        log::warn!("Could not open image for thumbnail generation {:?}: {}", source, e);
        e
    })?;
    let thumbnail = image.thumbnail(max_width, max_height);
    save_jpeg(&thumbnail, target, quality)?;
    log::debug!(
        "Thumbnail {}x{} saved to: {:?}",
        thumbnail.width(),
        thumbnail.height(),
        target
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn thumbnail_fits_inside_bounds() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("full.jpg");
        let target = dir.path().join("thumb.jpg");
        image::RgbImage::from_pixel(800, 400, image::Rgb([10, 20, 30]))
            .save(&source)
            .unwrap();

        create_thumbnail(&source, &target, 400, 300, 80).unwrap();

        let thumb = image::open(&target).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (400, 200));
    }

    #[test]
    fn unreadable_source_fails() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"not a jpeg").unwrap();
        let target = dir.path().join("thumb.jpg");
        assert!(create_thumbnail(&source, &target, 40, 30, 80).is_err());
        assert!(!target.exists());
    }

    #[test]
    fn failed_encode_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.jpg");
        let wide = DynamicImage::ImageLuma8(image::GrayImage::new(65_536, 1));
        assert!(save_jpeg(&wide, &path, 80).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn grayscale_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gray.jpg");
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(16, 16));
        save_jpeg(&gray, &path, 90).unwrap();
        assert!(matches!(image::open(&path).unwrap(), DynamicImage::ImageLuma8(_)));
    }
}
