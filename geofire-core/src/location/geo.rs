//! Geohash encoding and radius geometry.
//!
//! Radius queries work the way geohash-indexed stores usually do: pick the
//! longest geohash whose cell is at least as large as the query radius, take
//! the cell containing the center plus its eight neighbours, range-scan those
//! prefixes, then filter the candidates by great-circle distance.

use super::types::Coordinate;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.008_8;

/// Geohash length stored with every entry (~1.2m × 0.6m cell).
pub const ENTRY_GEOHASH_PRECISION: usize = 10;

/// Kilometres per degree of arc on the mean-radius sphere.
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// Encodes a coordinate as a geohash of the given length.
///
/// Returns an empty string if the coordinate is out of range; callers pass
/// validated [`Coordinate`] values, so this does not happen in practice.
///
/// # Examples
///
/// ```
/// use geofire_core::location::{location_to_geohash, Coordinate};
///
/// let hash = location_to_geohash(Coordinate::new(37.7749, -122.4194).unwrap(), 8);
/// assert_eq!(hash.len(), 8);
/// ```
#[must_use]
pub fn location_to_geohash(coordinate: Coordinate, precision: usize) -> String {
    geohash::encode(
        geohash::Coord {
            x: coordinate.longitude,
            y: coordinate.latitude,
        },
        precision,
    )
    .unwrap_or_default()
}

/// Great-circle distance between two coordinates in kilometres (haversine).
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Returns whether `point` lies within `radius_km` of `center`.
#[must_use]
pub fn within_radius(center: Coordinate, radius_km: f64, point: Coordinate) -> bool {
    distance_km(center, point) <= radius_km
}

/// Returns the geohash prefixes whose cells cover the query circle.
///
/// `None` means no prefix set covers the circle (it reaches a pole or is
/// wider than a level-1 cell) and the caller must scan every entry.
#[must_use]
pub fn query_prefixes(center: Coordinate, radius_km: f64) -> Option<Vec<String>> {
    let radius_deg = radius_km / KM_PER_DEGREE;
    let angular = radius_km / EARTH_RADIUS_KM;
    let cos_lat = center.latitude.to_radians().cos();

    if center.latitude.abs() + radius_deg >= 90.0 || angular.sin() >= cos_lat {
        return None;
    }
    let lon_extent_deg = (angular.sin() / cos_lat).asin().to_degrees();

    let precision = (1..=ENTRY_GEOHASH_PRECISION).rev().find(|&len| {
        let (cell_lat, cell_lon) = cell_size_deg(len);
        cell_lat >= radius_deg && cell_lon >= lon_extent_deg
    })?;

    let center_hash = location_to_geohash(center, precision);
    let (cell_center, lon_err, lat_err) = geohash::decode(&center_hash).ok()?;

    let mut prefixes = Vec::with_capacity(9);
    for dy in [-1.0, 0.0, 1.0] {
        let lat = 2.0f64.mul_add(lat_err * dy, cell_center.y);
        if !(-90.0..=90.0).contains(&lat) {
            continue;
        }
        for dx in [-1.0, 0.0, 1.0] {
            let lon = wrap_longitude(2.0f64.mul_add(lon_err * dx, cell_center.x));
            let hash = geohash::encode(geohash::Coord { x: lon, y: lat }, precision).ok()?;
            if !prefixes.contains(&hash) {
                prefixes.push(hash);
            }
        }
    }
    Some(prefixes)
}

/// Cell height and width in degrees for a geohash of `len` characters.
fn cell_size_deg(len: usize) -> (f64, f64) {
    let bits = u32::try_from(len * 5).unwrap_or(u32::MAX);
    let lat_bits = bits / 2;
    let lon_bits = bits - lat_bits;
    (
        180.0 / f64::from(2u32.saturating_pow(lat_bits)),
        360.0 / f64::from(2u32.saturating_pow(lon_bits)),
    )
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}
