// src/metadata.rs

use crate::error::AppError;
use crate::gps;
use chrono::NaiveDateTime;
use exif::{Exif, Field, In, Reader, Tag, Value};
use lazy_static::lazy_static;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Flattened tag name -> stringified value.
pub type FlatTags = BTreeMap<String, String>;

/// Key used to record a per-image failure.
pub const ERROR_KEY: &str = "Error";

lazy_static! {
    /// Containers kamadak-exif knows how to search for an EXIF block.
    static ref EXIF_CONTAINERS: HashSet<&'static str> =
        ["jpg", "jpeg", "png", "tif", "tiff", "webp", "heic", "heif"]
            .into_iter()
            .collect();
}

/// Tags shown on the listing page, keyed the way the edit form expects.
const GALLERY_TAGS: &[(Tag, &str)] = &[
    (Tag::Make, "Make"),
    (Tag::Model, "Model"),
    (Tag::DateTime, "DateTime"),
    (Tag::Artist, "Artist"),
    (Tag::Copyright, "Copyright"),
];

/// Tags exported to the aggregate metadata file, named `"<IFD> <Tag>"`.
const CATALOG_TAGS: &[(Tag, &str)] = &[
    (Tag::Make, "Image Make"),
    (Tag::Model, "Image Model"),
    (Tag::DateTime, "Image DateTime"),
    (Tag::Artist, "Image Artist"),
    (Tag::Copyright, "Image Copyright"),
    (Tag::Software, "Image Software"),
    (Tag::Orientation, "Image Orientation"),
    (Tag::DateTimeOriginal, "EXIF DateTimeOriginal"),
    (Tag::ExposureTime, "EXIF ExposureTime"),
    (Tag::FNumber, "EXIF FNumber"),
    (Tag::PhotographicSensitivity, "EXIF ISOSpeedRatings"),
    (Tag::FocalLength, "EXIF FocalLength"),
    (Tag::LensModel, "EXIF LensModel"),
    (Tag::GPSLatitudeRef, "GPS GPSLatitudeRef"),
    (Tag::GPSLatitude, "GPS GPSLatitude"),
    (Tag::GPSLongitudeRef, "GPS GPSLongitudeRef"),
    (Tag::GPSLongitude, "GPS GPSLongitude"),
    (Tag::GPSAltitudeRef, "GPS GPSAltitudeRef"),
    (Tag::GPSAltitude, "GPS GPSAltitude"),
];

/// EXIF tags to try for the capture time, in priority order
const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Reads the EXIF block of `path`. `Ok(None)` means the file simply has none.
pub fn read_exif(path: &Path) -> Result<Option<Exif>, AppError> {
    let container = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !EXIF_CONTAINERS.contains(container.as_str()) {
        log::trace!("No EXIF container for {:?}", path);
        return Ok(None);
    }

    let file = File::open(path)?;
    let mut buf_reader = BufReader::new(file);
    match Reader::new().read_from_container(&mut buf_reader) {
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF data found for {:?}", path);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Fields for the listing page: decoded text plus decimal GPS coordinates.
/// Malformed GPS data adds an `Error` entry next to the text fields.
pub fn gallery_fields(exif: &Exif) -> FlatTags {
    let mut fields = FlatTags::new();
    for (tag, name) in GALLERY_TAGS {
        if let Some(text) = ascii_field(exif, *tag) {
            fields.insert(name.to_string(), text);
        }
    }
    match gps_position(exif) {
        Ok(Some((latitude, longitude))) => {
            fields.insert("GPSLatitude".to_string(), format!("{:.6}", latitude));
            fields.insert("GPSLongitude".to_string(), format!("{:.6}", longitude));
        }
        Ok(None) => {}
        Err(e) => {
            log::warn!("Ignoring unreadable GPS data: {}", e);
            fields.insert(ERROR_KEY.to_string(), format!("Could not read GPS: {}", e));
        }
    }
    fields
}

/// Allowlisted fields for the aggregate metadata file. Missing tags are omitted.
pub fn catalog_fields(exif: &Exif) -> FlatTags {
    CATALOG_TAGS
        .iter()
        .filter_map(|(tag, name)| {
            exif.get_field(*tag, In::PRIMARY)
                .map(|field| (name.to_string(), format_field(field)))
        })
        .collect()
}

/// Decimal `(latitude, longitude)` when both coordinates are present.
pub fn gps_position(exif: &Exif) -> Result<Option<(f64, f64)>, AppError> {
    let latitude = exif.get_field(Tag::GPSLatitude, In::PRIMARY);
    let longitude = exif.get_field(Tag::GPSLongitude, In::PRIMARY);
    let (latitude, longitude) = match (latitude, longitude) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Ok(None),
    };

    let lat_ref = ascii_field(exif, Tag::GPSLatitudeRef).unwrap_or_else(|| "N".to_string());
    let lon_ref = ascii_field(exif, Tag::GPSLongitudeRef).unwrap_or_else(|| "E".to_string());

    let latitude = gps::dms_to_decimal(rationals(latitude)?, &lat_ref)?;
    let longitude = gps::dms_to_decimal(rationals(longitude)?, &lon_ref)?;
    Ok(Some((latitude, longitude)))
}

/// Capture time from the first parsable date tag.
pub fn capture_time(exif: &Exif) -> Option<NaiveDateTime> {
    DATE_TAGS.iter().find_map(|tag| {
        ascii_field(exif, *tag).and_then(|text| parse_exif_datetime(&text))
    })
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

pub fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(parts) => parts.first().map(|bytes| decode_text(bytes)),
        Value::Undefined(bytes, _) | Value::Byte(bytes) => Some(decode_text(bytes)),
        _ => None,
    }
}

fn rationals(field: &Field) -> Result<&[exif::Rational], AppError> {
    match &field.value {
        Value::Rational(values) => Ok(values.as_slice()),
        other => Err(AppError::Gps(format!(
            "{} is not rational: {:?}",
            field.tag, other
        ))),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

/// Stringifies a field: text for byte strings, rounded decimals for rationals,
/// `[a, b, c]` for multi-valued fields.
pub fn format_field(field: &Field) -> String {
    match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|bytes| decode_text(bytes))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Rational(values) => format_list(values.iter().map(|r| {
            if r.denom == 0 {
                format!("{}/{}", r.num, r.denom)
            } else {
                format_decimal(r.to_f64())
            }
        })),
        Value::SRational(values) => format_list(values.iter().map(|r| {
            if r.denom == 0 {
                format!("{}/{}", r.num, r.denom)
            } else {
                format_decimal(r.to_f64())
            }
        })),
        Value::Byte(values) => format_list(values.iter().map(|v| v.to_string())),
        Value::Short(values) => format_list(values.iter().map(|v| v.to_string())),
        Value::Long(values) => format_list(values.iter().map(|v| v.to_string())),
        Value::SByte(values) => format_list(values.iter().map(|v| v.to_string())),
        Value::SShort(values) => format_list(values.iter().map(|v| v.to_string())),
        Value::SLong(values) => format_list(values.iter().map(|v| v.to_string())),
        Value::Float(values) => format_list(values.iter().map(|v| format_decimal(*v as f64))),
        Value::Double(values) => format_list(values.iter().map(|v| format_decimal(*v))),
        _ => field.display_value().to_string(),
    }
}

fn format_list(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    if items.len() == 1 {
        items.into_iter().next().unwrap_or_default()
    } else {
        format!("[{}]", items.join(", "))
    }
}

/// Rounds to six decimals and drops trailing zeros.
pub fn format_decimal(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
