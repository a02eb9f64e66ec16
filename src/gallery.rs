use crate::error::AppError;
use crate::metadata::{self, FlatTags, ERROR_KEY};
use crate::walker;
use exif::Tag;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// One card on the listing page.
#[derive(Serialize, Debug, Clone)]
pub struct GalleryEntry {
    pub filename: String,
    pub exif: FlatTags,
}

/// Response of the per-file lookup used to prefill the edit form.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    pub filename: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every allowed image in `dir` with its decoded tags. A file whose EXIF
/// cannot be read gets an `Error` entry instead of failing the listing.
pub fn list_gallery(dir: &Path, extensions: &HashSet<String>) -> Result<Vec<GalleryEntry>, AppError> {
    let entries = walker::list_images(dir, extensions)?
        .into_iter()
        .map(|path| {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let exif = match metadata::read_exif(&path) {
                Ok(exif) => exif.map(|e| metadata::gallery_fields(&e)).unwrap_or_default(),
                Err(e) => {
                    log::warn!("Error reading EXIF for {}: {}", filename, e);
                    let mut fields = FlatTags::new();
                    fields.insert(ERROR_KEY.to_string(), format!("Could not read EXIF: {}", e));
                    fields
                }
            };
            GalleryEntry { filename, exif }
        })
        .collect();
    Ok(entries)
}

/// GPS, artist and copyright of `filename` inside `dir`.
pub fn lookup(dir: &Path, filename: &str) -> Result<ExifSummary, AppError> {
    let path = dir.join(filename);
    if !walker::is_plain_filename(filename) || !path.is_file() {
        return Err(AppError::NotFound(format!("File '{}' not found", filename)));
    }

    let mut summary = ExifSummary {
        filename: filename.to_string(),
        ..Default::default()
    };
    let exif = match metadata::read_exif(&path) {
        Ok(Some(exif)) => exif,
        Ok(None) => return Ok(summary),
        Err(e) => {
            summary.error = Some(format!("Could not read EXIF: {}", e));
            return Ok(summary);
        }
    };

    summary.artist = metadata::ascii_field(&exif, Tag::Artist);
    summary.copyright = metadata::ascii_field(&exif, Tag::Copyright);
    match metadata::gps_position(&exif) {
        Ok(Some((latitude, longitude))) => {
            summary.latitude = Some(latitude);
            summary.longitude = Some(longitude);
        }
        Ok(None) => {}
        Err(e) => summary.error = Some(format!("Could not read GPS: {}", e)),
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif_writer::{write_exif, ExifEdit};
    use tempfile::TempDir;

    fn extensions() -> HashSet<String> {
        ["jpg", "png"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_directory_is_empty_gallery() {
        let dir = TempDir::new().unwrap();
        assert!(list_gallery(dir.path(), &extensions()).unwrap().is_empty());
    }

    /// JPEG whose EXIF block has a Make tag and a two-component latitude.
    fn write_jpeg_with_short_latitude(path: &Path) {
        use exif::{Field, In, Rational, Value};
        use img_parts::{jpeg::Jpeg, Bytes, ImageEXIF};

        image::RgbImage::new(8, 8).save(path).unwrap();
        let fields = [
            Field { tag: Tag::Make, ifd_num: In::PRIMARY, value: Value::Ascii(vec![b"Canon".to_vec()]) },
            Field {
                tag: Tag::GPSLatitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![Rational { num: 40, denom: 1 }, Rational { num: 42, denom: 1 }]),
            },
            Field {
                tag: Tag::GPSLongitude,
                ifd_num: In::PRIMARY,
                value: Value::Rational(vec![Rational { num: 2, denom: 1 }; 3]),
            },
        ];
        let mut writer = exif::experimental::Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut tiff = std::io::Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();

        let mut jpeg = Jpeg::from_bytes(Bytes::from(std::fs::read(path).unwrap())).unwrap();
        jpeg.set_exif(Some(Bytes::from(tiff.into_inner())));
        std::fs::write(path, jpeg.encoder().bytes()).unwrap();
    }

    #[test]
    fn malformed_gps_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        write_jpeg_with_short_latitude(&dir.path().join("c.jpg"));

        let gallery = list_gallery(dir.path(), &extensions()).unwrap();
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery[0].exif["Make"], "Canon");
        assert!(gallery[0].exif[ERROR_KEY].starts_with("Could not read GPS"));
        assert!(!gallery[0].exif.contains_key("GPSLatitude"));
    }

    #[test]
    fn entries_carry_decoded_fields_or_errors() {
        let dir = TempDir::new().unwrap();
        let tagged = dir.path().join("a.jpg");
        image::RgbImage::new(8, 8).save(&tagged).unwrap();
        write_exif(
            &tagged,
            &ExifEdit {
                position: Some((51.5074, -0.1278)),
                artist: Some("Someone".into()),
                ..Default::default()
            },
        )
        .unwrap();

        // Valid JPEG markers around a garbage EXIF segment.
        let broken = dir.path().join("b.jpg");
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x0E];
        bytes.extend_from_slice(b"Exif\0\0MM\0*\0\0");
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        std::fs::write(&broken, bytes).unwrap();

        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let gallery = list_gallery(dir.path(), &extensions()).unwrap();
        assert_eq!(gallery.len(), 2);

        assert_eq!(gallery[0].filename, "a.jpg");
        assert_eq!(gallery[0].exif["Artist"], "Someone");
        assert_eq!(gallery[0].exif["GPSLatitude"], "51.507400");
        assert_eq!(gallery[0].exif["GPSLongitude"], "-0.127800");

        assert_eq!(gallery[1].filename, "b.jpg");
        assert!(gallery[1].exif[ERROR_KEY].starts_with("Could not read EXIF"));
    }

    #[test]
    fn lookup_reports_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.jpg");
        image::RgbImage::new(8, 8).save(&path).unwrap();

        let empty = lookup(dir.path(), "x.jpg").unwrap();
        assert_eq!(empty.latitude, None);
        assert_eq!(empty.error, None);

        write_exif(
            &path,
            &ExifEdit {
                position: Some((-33.8688, 151.2093)),
                copyright: Some("mine".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let summary = lookup(dir.path(), "x.jpg").unwrap();
        assert!((summary.latitude.unwrap() + 33.8688).abs() < 1e-4);
        assert!((summary.longitude.unwrap() - 151.2093).abs() < 1e-4);
        assert_eq!(summary.copyright.as_deref(), Some("mine"));
    }

    #[test]
    fn lookup_of_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(lookup(dir.path(), "nope.jpg"), Err(AppError::NotFound(_))));
        assert!(matches!(lookup(dir.path(), "../etc"), Err(AppError::NotFound(_))));
    }
}
