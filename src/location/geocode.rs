//! Network geocoding: the best-effort fallback behind the embedded table.
//!
//! The capability is a trait so the resolver can run with a stub in tests
//! and so offline mode can skip it entirely.

use super::types::{LocationError, LocationSource, ResolvedLocation};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("Stellium/", env!("CARGO_PKG_VERSION"), " (astrology-chart-bridge)");
const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

/// Outbound geocoding capability. One narrow method: name → location.
pub trait GeocodingLookup {
    fn lookup(
        &self,
        name: &str,
        country_code: Option<&str>,
    ) -> Result<ResolvedLocation, LocationError>;
}

/// OpenStreetMap Nominatim-backed geocoder.
pub struct NominatimGeocoder;

#[derive(Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

impl GeocodingLookup for NominatimGeocoder {
    fn lookup(
        &self,
        name: &str,
        country_code: Option<&str>,
    ) -> Result<ResolvedLocation, LocationError> {
        let country_param = match country_code {
            Some(cc) => format!("&countrycodes={}", urlencode(&cc.to_lowercase())),
            None => String::new(),
        };
        let url = format!(
            "https://nominatim.openstreetmap.org/search?q={}&format=json&limit=1&addressdetails=0{}",
            urlencode(name),
            country_param,
        );

        let response = ureq::get(&url)
            .set("User-Agent", USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .call()
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let results: Vec<NominatimResult> = response
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        let top = results
            .into_iter()
            .next()
            .ok_or_else(|| LocationError::NotFound(name.to_string()))?;

        let latitude: f64 = top
            .lat
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad latitude '{}'", top.lat)))?;
        let longitude: f64 = top
            .lon
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad longitude '{}'", top.lon)))?;

        let short_name = top
            .display_name
            .split(',')
            .next()
            .unwrap_or(name)
            .trim()
            .to_string();

        Ok(ResolvedLocation {
            name: short_name,
            latitude,
            longitude,
            timezone: timezone_for_coords(latitude, longitude),
            source: LocationSource::Geocoder,
            country_code: country_code.map(|c| c.to_uppercase()),
        })
    }
}

/// IANA timezone for a coordinate pair. Asks the remote tz API first; on any
/// failure falls back to a rough longitude-offset estimate so the geocode
/// path still produces a usable zone without a second network dependency.
pub fn timezone_for_coords(latitude: f64, longitude: f64) -> String {
    match timezone_from_api(latitude, longitude) {
        Ok(tz) => tz,
        Err(_) => timezone_from_longitude(longitude),
    }
}

fn timezone_from_api(latitude: f64, longitude: f64) -> Result<String, LocationError> {
    let url = format!(
        "https://www.timeapi.io/api/timezone/coordinate?latitude={}&longitude={}",
        latitude, longitude
    );

    let response = ureq::get(&url)
        .set("User-Agent", USER_AGENT)
        .timeout(Duration::from_secs(3))
        .call()
        .map_err(|e| LocationError::Network(e.to_string()))?;

    let val: serde_json::Value = response
        .into_json()
        .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

    val.get("timeZone")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LocationError::InvalidResponse("no timeZone field".into()))
}

/// Rough offline estimate: 15 degrees of longitude per hour of offset,
/// mapped to a representative IANA zone.
pub(crate) fn timezone_from_longitude(longitude: f64) -> String {
    let offset_hours = (longitude / 15.0).round() as i32;
    match offset_hours {
        -12..=-10 => "Pacific/Honolulu".into(),
        -9 => "America/Anchorage".into(),
        -8 => "America/Los_Angeles".into(),
        -7 => "America/Denver".into(),
        -6 => "America/Chicago".into(),
        -5 => "America/New_York".into(),
        -4 => "America/Halifax".into(),
        -3 => "America/Sao_Paulo".into(),
        -2..=-1 => "Atlantic/Azores".into(),
        0 => "Europe/London".into(),
        1 => "Europe/Paris".into(),
        2 => "Europe/Helsinki".into(),
        3 => "Europe/Moscow".into(),
        4 => "Asia/Dubai".into(),
        5 => "Asia/Karachi".into(),
        6 => "Asia/Dhaka".into(),
        7 => "Asia/Bangkok".into(),
        8 => "Asia/Shanghai".into(),
        9 => "Asia/Tokyo".into(),
        10 => "Australia/Sydney".into(),
        11 => "Pacific/Noumea".into(),
        12 => "Pacific/Auckland".into(),
        _ => "UTC".into(),
    }
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            '&' => "%26".to_string(),
            '=' => "%3D".to_string(),
            '+' => "%2B".to_string(),
            ',' => "%2C".to_string(),
            _ if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '~' => {
                c.to_string()
            }
            _ => format!("%{:02X}", c as u32),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timezone_from_longitude() {
        assert_eq!(timezone_from_longitude(116.4), "Asia/Shanghai");
        assert_eq!(timezone_from_longitude(-74.0), "America/New_York");
        assert_eq!(timezone_from_longitude(0.0), "Europe/London");
        assert_eq!(timezone_from_longitude(151.2), "Australia/Sydney");
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("new york"), "new%20york");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
        assert_eq!(urlencode("plain-name_1.x~"), "plain-name_1.x~");
    }
}
