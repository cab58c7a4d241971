//! Location data types.

use serde::{Deserialize, Serialize};

use super::geo::{location_to_geohash, ENTRY_GEOHASH_PRECISION};
use crate::error::{GeofireError, Result};

/// A validated latitude/longitude pair in degrees.
///
/// Construct through [`Coordinate::new`] to get range checking. The fields
/// stay public so stores can rebuild values they persisted themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, -90.0 to 90.0.
    pub latitude: f64,
    /// Longitude in degrees, -180.0 to 180.0.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate after checking both components.
    ///
    /// # Errors
    ///
    /// Returns [`GeofireError::InvalidArguments`] if either component is
    /// NaN, infinite, or outside its valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use geofire_core::location::Coordinate;
    ///
    /// assert!(Coordinate::new(37.0, -122.0).is_ok());
    /// assert!(Coordinate::new(200.0, 0.0).is_err());
    /// assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeofireError::InvalidArguments(format!(
                "latitude {latitude} is not within [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeofireError::InvalidArguments(format!(
                "longitude {longitude} is not within [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Returns whether both components are finite and in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Self::new(self.latitude, self.longitude).is_ok()
    }
}

/// One user's last known location as held by the geo store.
///
/// Serializes to the persisted layout `{latitude, longitude, timestamp, g}`.
/// The key is the path segment under the node and is not part of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedEntry {
    /// User identifier the entry is stored under.
    #[serde(skip)]
    pub key: String,

    /// Stored position.
    #[serde(flatten)]
    pub coordinate: Coordinate,

    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// Geohash of `coordinate`, used by the radius index.
    #[serde(rename = "g")]
    pub geohash: String,
}

impl LocatedEntry {
    /// Creates an entry, deriving its geohash from the coordinate.
    #[must_use]
    pub fn new(key: impl Into<String>, coordinate: Coordinate, timestamp: i64) -> Self {
        Self {
            key: key.into(),
            geohash: location_to_geohash(coordinate, ENTRY_GEOHASH_PRECISION),
            coordinate,
            timestamp,
        }
    }

    /// Parses the persisted JSON value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or missing required fields.
    pub fn from_json(key: impl Into<String>, json: &str) -> serde_json::Result<Self> {
        let mut entry: Self = serde_json::from_str(json)?;
        entry.key = key.into();
        Ok(entry)
    }

    /// Converts this entry to its persisted JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One element of a radius query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    /// Key of the entry that entered the query area.
    pub key: String,
    /// Latitude reported by the store.
    pub latitude: f64,
    /// Longitude reported by the store.
    pub longitude: f64,
}

impl QueryHit {
    /// Creates a hit from a key and its coordinate.
    #[must_use]
    pub fn new(key: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            key: key.into(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_accepts_valid_boundaries() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn coordinate_rejects_out_of_range_latitude() {
        let err = Coordinate::new(200.0, 0.0).unwrap_err();
        assert!(matches!(err, GeofireError::InvalidArguments(_)));
        assert!(Coordinate::new(-90.5, 0.0).is_err());
    }

    #[test]
    fn coordinate_rejects_out_of_range_longitude() {
        assert!(Coordinate::new(0.0, 180.1).is_err());
        assert!(Coordinate::new(0.0, -181.0).is_err());
    }

    #[test]
    fn coordinate_rejects_non_finite() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::NAN).is_err());
        assert!(Coordinate::new(f64::INFINITY, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn is_valid_detects_hand_built_values() {
        let bad = Coordinate {
            latitude: 95.0,
            longitude: 0.0,
        };
        assert!(!bad.is_valid());
        assert!(Coordinate::new(1.0, 2.0).unwrap().is_valid());
    }

    #[test]
    fn located_entry_derives_geohash() {
        let entry = LocatedEntry::new("u1", Coordinate::new(37.7749, -122.4194).unwrap(), 1);
        assert_eq!(entry.geohash.len(), ENTRY_GEOHASH_PRECISION);
        assert!(entry.geohash.starts_with("9q8yy"));
    }

    #[test]
    fn located_entry_json_layout() {
        let entry = LocatedEntry::new("u1", Coordinate::new(37.0, -122.0).unwrap(), 1_700_000);
        let json = entry.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["latitude"], 37.0);
        assert_eq!(value["longitude"], -122.0);
        assert_eq!(value["timestamp"], 1_700_000);
        assert_eq!(value["g"], entry.geohash.as_str());
        assert!(value.get("key").is_none());

        let parsed = LocatedEntry::from_json("u1", &json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn query_hit_copies_coordinate() {
        let hit = QueryHit::new("u1", Coordinate::new(37.0, -122.0).unwrap());
        assert_eq!(hit.key, "u1");
        assert_eq!(hit.latitude, 37.0);
        assert_eq!(hit.longitude, -122.0);
    }
}
