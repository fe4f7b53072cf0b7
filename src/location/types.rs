//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a location was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    /// Caller supplied raw latitude/longitude.
    Direct,
    /// Embedded city table compiled into the binary.
    Builtin,
    /// Memoized result of an earlier geocoder hit.
    Cache,
    /// OpenStreetMap Nominatim lookup.
    Geocoder,
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "Direct"),
            Self::Builtin => write!(f, "Built-in"),
            Self::Cache => write!(f, "Cache"),
            Self::Geocoder => write!(f, "Geocoder"),
        }
    }
}

/// What a caller handed us: either a city name to look up, or raw
/// coordinates to validate and pass through. When both shapes could be
/// built from a request, coordinates win and the city name is kept only
/// as a display label.
#[derive(Debug, Clone)]
pub enum LocationQuery {
    City {
        name: String,
        /// ISO 3166-1 alpha-2 filter (e.g. "CN").
        country_code: Option<String>,
    },
    Coordinates {
        latitude: f64,
        longitude: f64,
        timezone: Option<String>,
    },
}

/// A fully resolved location: the sole input the astrology engine needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    /// Display label: canonical city name, or "lat, lon" for direct input.
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name (e.g. "Asia/Shanghai").
    pub timezone: String,
    pub source: LocationSource,
    /// ISO 3166-1 alpha-2 country code, when known.
    #[serde(default)]
    pub country_code: Option<String>,
}

/// Location resolution errors. All request-level: reported to the caller,
/// never fatal to the process, never retried automatically.
#[derive(Debug)]
pub enum LocationError {
    /// Latitude outside [-90, 90] or longitude outside [-180, 180].
    InvalidCoordinates { latitude: f64, longitude: f64 },
    /// Direct coordinates without a timezone; nothing to infer from offline.
    MissingTimezone,
    /// Supplied timezone is not a known IANA name.
    InvalidTimezone(String),
    /// No embedded match and the geocoder failed or was unavailable.
    NotFound(String),
    Network(String),
    InvalidResponse(String),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoordinates { latitude, longitude } => write!(
                f,
                "Invalid coordinates ({}, {}). Lat: -90..90, Lon: -180..180",
                latitude, longitude
            ),
            Self::MissingTimezone => {
                write!(f, "Coordinates given without a timezone. Pass an IANA name (e.g. Asia/Shanghai)")
            }
            Self::InvalidTimezone(tz) => {
                write!(f, "Unknown timezone '{}'. Use IANA format (e.g. Europe/Rome)", tz)
            }
            Self::NotFound(q) => write!(f, "Location not found: '{}'", q),
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid geocoder response: {}", msg),
        }
    }
}

impl std::error::Error for LocationError {}

/// Validate an IANA timezone name against the chrono-tz database.
pub fn validate_timezone(tz: &str) -> Result<(), LocationError> {
    tz.parse::<chrono_tz::Tz>()
        .map(|_| ())
        .map_err(|_| LocationError::InvalidTimezone(tz.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_timezone_known() {
        assert!(validate_timezone("Asia/Shanghai").is_ok());
        assert!(validate_timezone("Europe/Rome").is_ok());
        assert!(validate_timezone("UTC").is_ok());
    }

    #[test]
    fn test_validate_timezone_unknown() {
        let err = validate_timezone("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, LocationError::InvalidTimezone(_)));
    }

    #[test]
    fn test_error_display() {
        let err = LocationError::InvalidCoordinates { latitude: 91.0, longitude: 0.0 };
        assert!(format!("{}", err).contains("91"));
        let err = LocationError::NotFound("atlantis".into());
        assert!(format!("{}", err).contains("atlantis"));
    }
}
