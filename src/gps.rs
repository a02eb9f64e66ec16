//! Conversion between decimal degrees and the EXIF degrees/minutes/seconds
//! representation.
//!
//! EXIF stores a coordinate as three unsigned rationals plus a hemisphere
//! reference letter. Seconds are written with a denominator of 10000, so a
//! round trip is exact to roughly 3e-8 degrees.

use crate::error::AppError;
use exif::Rational;

/// Denominator used for the seconds component.
pub const SECONDS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn limit(self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }
}

/// Splits the absolute value of `decimal` into `(deg,1)`, `(min,1)`,
/// `(sec*10000,10000)`. The sign is carried separately by [`hemisphere`].
pub fn decimal_to_dms(decimal: f64) -> [Rational; 3] {
    let abs_degrees = decimal.abs();

    let degrees = abs_degrees.trunc();
    let minutes_float = (abs_degrees - degrees) * 60.0;
    let minutes = minutes_float.trunc();
    let seconds_float = (minutes_float - minutes) * 60.0;
    let seconds = (seconds_float * SECONDS_DENOMINATOR as f64).trunc();

    [
        Rational { num: degrees as u32, denom: 1 },
        Rational { num: minutes as u32, denom: 1 },
        Rational { num: seconds as u32, denom: SECONDS_DENOMINATOR },
    ]
}

/// Inverse of [`decimal_to_dms`]. `reference` is the hemisphere letter; `S`
/// and `W` produce a negative result.
pub fn dms_to_decimal(dms: &[Rational], reference: &str) -> Result<f64, AppError> {
    if dms.len() < 3 {
        return Err(AppError::Gps(format!(
            "expected 3 rational components, found {}",
            dms.len()
        )));
    }
    if let Some(r) = dms[..3].iter().find(|r| r.denom == 0) {
        return Err(AppError::Gps(format!("zero denominator in {}/{}", r.num, r.denom)));
    }

    let degrees = dms[0].to_f64();
    let minutes = dms[1].to_f64();
    let seconds = dms[2].to_f64();
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;

    match reference.trim().chars().next() {
        Some('S') | Some('W') | Some('s') | Some('w') => Ok(-decimal),
        _ => Ok(decimal),
    }
}

/// Hemisphere letter for a signed coordinate.
pub fn hemisphere(decimal: f64, axis: Axis) -> char {
    match (axis, decimal >= 0.0) {
        (Axis::Latitude, true) => 'N',
        (Axis::Latitude, false) => 'S',
        (Axis::Longitude, true) => 'E',
        (Axis::Longitude, false) => 'W',
    }
}

pub fn validate_position(latitude: f64, longitude: f64) -> Result<(), AppError> {
    for (value, axis) in [(latitude, Axis::Latitude), (longitude, Axis::Longitude)] {
        let limit = axis.limit();
        if !value.is_finite() || value < -limit || value > limit {
            let name = match axis {
                Axis::Latitude => "Latitude",
                Axis::Longitude => "Longitude",
            };
            return Err(AppError::Gps(format!(
                "{} out of range: {} (must be -{} to {})",
                name, value, limit, limit
            )));
        }
    }
    Ok(())
}
