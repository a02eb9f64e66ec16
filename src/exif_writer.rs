use crate::error::AppError;
use crate::gps::{self, Axis};
use exif::{Field, In, Rational, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use std::io::Cursor;
use std::path::Path;

const GPS_TAGS: &[Tag] = &[
    Tag::GPSVersionID,
    Tag::GPSLatitudeRef,
    Tag::GPSLatitude,
    Tag::GPSLongitudeRef,
    Tag::GPSLongitude,
    Tag::GPSAltitudeRef,
    Tag::GPSAltitude,
];

/// Fields to overwrite. `None` leaves the existing value untouched.
#[derive(Debug, Clone, Default)]
pub struct ExifEdit {
    /// Decimal `(latitude, longitude)`.
    pub position: Option<(f64, f64)>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub software: Option<String>,
    /// Already formatted as `YYYY:MM:DD HH:MM:SS`.
    pub date_time_original: Option<String>,
}

impl ExifEdit {
    fn replaces(&self, tag: Tag) -> bool {
        (self.position.is_some() && GPS_TAGS.contains(&tag))
            || (self.artist.is_some() && tag == Tag::Artist)
            || (self.copyright.is_some() && tag == Tag::Copyright)
            || (self.software.is_some() && tag == Tag::Software)
            || (self.date_time_original.is_some() && tag == Tag::DateTimeOriginal)
    }

    fn new_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();

        if let Some((latitude, longitude)) = self.position {
            let lat_ref = gps::hemisphere(latitude, Axis::Latitude);
            let lon_ref = gps::hemisphere(longitude, Axis::Longitude);
            fields.push(primary(Tag::GPSVersionID, Value::Byte(vec![2, 0, 0, 0])));
            fields.push(primary(Tag::GPSLatitudeRef, ascii(&lat_ref.to_string())));
            fields.push(primary(
                Tag::GPSLatitude,
                Value::Rational(gps::decimal_to_dms(latitude).to_vec()),
            ));
            fields.push(primary(Tag::GPSLongitudeRef, ascii(&lon_ref.to_string())));
            fields.push(primary(
                Tag::GPSLongitude,
                Value::Rational(gps::decimal_to_dms(longitude).to_vec()),
            ));
            fields.push(primary(Tag::GPSAltitudeRef, Value::Byte(vec![0])));
            fields.push(primary(
                Tag::GPSAltitude,
                Value::Rational(vec![Rational { num: 0, denom: 1 }]),
            ));
        }
        if let Some(artist) = &self.artist {
            fields.push(primary(Tag::Artist, ascii(artist)));
        }
        if let Some(copyright) = &self.copyright {
            fields.push(primary(Tag::Copyright, ascii(copyright)));
        }
        if let Some(software) = &self.software {
            fields.push(primary(Tag::Software, ascii(software)));
        }
        if let Some(date) = &self.date_time_original {
            fields.push(primary(Tag::DateTimeOriginal, ascii(date)));
        }
        fields
    }
}

fn primary(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(text: &str) -> Value {
    Value::Ascii(vec![text.as_bytes().to_vec()])
}

enum Container {
    Jpeg,
    Png,
}

fn container_for(path: &Path) -> Result<Container, AppError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| AppError::InvalidInput(format!("{:?} has no extension", path)))?;
    match extension.as_str() {
        "jpg" | "jpeg" => Ok(Container::Jpeg),
        "png" => Ok(Container::Png),
        other => Err(AppError::InvalidInput(format!(
            "Unsupported file extension '.{}' for EXIF writing",
            other
        ))),
    }
}

/// Applies `edit` to the EXIF block of `path` and overwrites the file in place.
///
/// Every primary-image field the edit does not touch is carried over. Pixel
/// data is not re-encoded; only the EXIF segment is replaced. There is no
/// backup: a failure while writing can leave the file truncated.
pub fn write_exif(path: &Path, edit: &ExifEdit) -> Result<(), AppError> {
    let container = container_for(path)?;
    let image_bytes = std::fs::read(path)?;

    let mut fields: Vec<Field> = match Reader::new().read_from_container(&mut Cursor::new(&image_bytes)) {
        Ok(existing) => existing
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .filter(|f| !matches!(f.value, Value::Unknown(..)))
            .filter(|f| !edit.replaces(f.tag))
            .cloned()
            .collect(),
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF in {:?}, starting from an empty tag set", path);
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };
    log::trace!("Keeping {} existing EXIF fields for {:?}", fields.len(), path);
    fields.extend(edit.new_fields());

    let mut exif_buffer = Cursor::new(Vec::new());
    let mut writer = exif::experimental::Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    writer.write(&mut exif_buffer, false)?;
    let exif_bytes = Bytes::from(exif_buffer.into_inner());

    let output = match container {
        Container::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(Bytes::from(image_bytes))?;
            jpeg.set_exif(Some(exif_bytes));
            jpeg.encoder().bytes()
        }
        Container::Png => {
            let mut png = Png::from_bytes(Bytes::from(image_bytes))?;
            png.set_exif(Some(exif_bytes));
            png.encoder().bytes()
        }
    };
    std::fs::write(path, &output)?;
    log::debug!("Rewrote EXIF for {:?}", path);
    Ok(())
}
