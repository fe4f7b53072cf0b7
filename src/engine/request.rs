//! Birth payloads: what callers send, and what the engine receives.

use crate::location::{LocationQuery, ResolvedLocation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A birth event as it arrives over the wire. Field names match the public
/// tool schemas (`nation`, `tz_str`). Either a city (plus optional nation)
/// or explicit latitude/longitude must be present; when both are,
/// coordinates win and the city is kept as a display label only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirthInput {
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    #[serde(default)]
    pub city: Option<String>,
    /// ISO 3166-1 alpha-2 country code (e.g. "CN").
    #[serde(default)]
    pub nation: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tz_str: Option<String>,
    /// "Tropical" (default) or "Sidereal".
    #[serde(default)]
    pub zodiac_type: Option<String>,
    /// Ayanamsha, used when zodiac_type is "Sidereal" (e.g. "LAHIRI").
    #[serde(default)]
    pub sidereal_mode: Option<String>,
    /// House system code (e.g. "P" for Placidus).
    #[serde(default)]
    pub houses_system: Option<String>,
    /// Observation perspective (e.g. "Apparent Geocentric").
    #[serde(default)]
    pub perspective: Option<String>,
}

/// Validation failures on a birth payload, before any engine call.
#[derive(Debug)]
pub enum BirthInputError {
    EmptyName,
    BadMonth(u32),
    BadDay(u32),
    BadHour(u32),
    BadMinute(u32),
    BadZodiacType(String),
    NoLocation,
}

impl fmt::Display for BirthInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Name must not be empty"),
            Self::BadMonth(m) => write!(f, "Month must be 1-12, got {}", m),
            Self::BadDay(d) => write!(f, "Day must be 1-31, got {}", d),
            Self::BadHour(h) => write!(f, "Hour must be 0-23, got {}", h),
            Self::BadMinute(m) => write!(f, "Minute must be 0-59, got {}", m),
            Self::BadZodiacType(z) => {
                write!(f, "Zodiac type must be 'Tropical' or 'Sidereal', got '{}'", z)
            }
            Self::NoLocation => {
                write!(f, "Provide a city name or latitude+longitude")
            }
        }
    }
}

impl std::error::Error for BirthInputError {}

impl BirthInput {
    /// Range-check the calendar fields and the option strings.
    pub fn validate(&self) -> Result<(), BirthInputError> {
        if self.name.trim().is_empty() {
            return Err(BirthInputError::EmptyName);
        }
        if !(1..=12).contains(&self.month) {
            return Err(BirthInputError::BadMonth(self.month));
        }
        if !(1..=31).contains(&self.day) {
            return Err(BirthInputError::BadDay(self.day));
        }
        if self.hour > 23 {
            return Err(BirthInputError::BadHour(self.hour));
        }
        if self.minute > 59 {
            return Err(BirthInputError::BadMinute(self.minute));
        }
        if let Some(ref z) = self.zodiac_type {
            if z != "Tropical" && z != "Sidereal" {
                return Err(BirthInputError::BadZodiacType(z.clone()));
            }
        }
        if self.latitude.is_none() && self.longitude.is_none() && self.city.is_none() {
            return Err(BirthInputError::NoLocation);
        }
        Ok(())
    }

    /// Derive the location query. Complete coordinates take precedence over
    /// the city name; a lone latitude or longitude falls back to the city.
    pub fn location_query(&self) -> Result<LocationQuery, BirthInputError> {
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            return Ok(LocationQuery::Coordinates {
                latitude,
                longitude,
                timezone: self.tz_str.clone(),
            });
        }
        match self.city {
            Some(ref city) => Ok(LocationQuery::City {
                name: city.clone(),
                country_code: self.nation.clone(),
            }),
            None => Err(BirthInputError::NoLocation),
        }
    }

    /// Combine the payload with its resolved location into an engine input.
    pub fn chart_request(&self, location: &ResolvedLocation) -> ChartRequest {
        ChartRequest {
            name: self.name.clone(),
            year: self.year,
            month: self.month,
            day: self.day,
            hour: self.hour,
            minute: self.minute,
            city: self.city.clone().unwrap_or_else(|| location.name.clone()),
            latitude: location.latitude,
            longitude: location.longitude,
            timezone: location.timezone.clone(),
            zodiac_type: self.zodiac_type.clone().unwrap_or_else(|| "Tropical".into()),
            sidereal_mode: self.sidereal_mode.clone(),
            houses_system: self.houses_system.clone().unwrap_or_else(|| "P".into()),
            perspective: self.perspective.clone().unwrap_or_else(|| "Apparent Geocentric".into()),
        }
    }
}

/// Fully normalized engine input: location resolved, defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub name: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    /// Display label only; coordinates below are authoritative.
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub zodiac_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidereal_mode: Option<String>,
    pub houses_system: String,
    pub perspective: String,
}
