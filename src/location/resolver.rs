//! Location resolver — orchestrates the lookup chain.
//!
//! Coordinates flow:  range check → timezone check → pass through
//! City flow:         embedded table → geocode cache → geocoder → error

use super::cache::GeocodeCache;
use super::dataset;
use super::geocode::{GeocodingLookup, NominatimGeocoder};
use super::types::{validate_timezone, LocationError, LocationQuery, LocationSource, ResolvedLocation};

/// The location resolver with its fallback pipeline.
pub struct LocationResolver {
    cache: GeocodeCache,
    geocoder: Box<dyn GeocodingLookup + Send>,
    offline: bool,
}

impl LocationResolver {
    pub fn new() -> Self {
        Self {
            cache: GeocodeCache::load(),
            geocoder: Box::new(NominatimGeocoder),
            offline: false,
        }
    }

    /// Build a resolver from explicit parts (for testing).
    pub fn with_parts(cache: GeocodeCache, geocoder: Box<dyn GeocodingLookup + Send>) -> Self {
        Self { cache, geocoder, offline: false }
    }

    /// Offline mode: never touch the network.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Resolve a query into coordinates + timezone.
    pub fn resolve(&mut self, query: &LocationQuery) -> Result<ResolvedLocation, LocationError> {
        match query {
            LocationQuery::Coordinates { latitude, longitude, timezone } => {
                Self::from_coordinates(*latitude, *longitude, timezone.as_deref())
            }
            LocationQuery::City { name, country_code } => {
                self.resolve_city(name, country_code.as_deref())
            }
        }
    }

    /// Direct-coordinate path: pure validation, no I/O, no table.
    pub fn from_coordinates(
        latitude: f64,
        longitude: f64,
        timezone: Option<&str>,
    ) -> Result<ResolvedLocation, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidCoordinates { latitude, longitude });
        }

        // No offline inference: a guessed zone poisons every chart computed
        // from it. The caller must say where "4:32 pm" happened.
        let tz = timezone.ok_or(LocationError::MissingTimezone)?;
        validate_timezone(tz)?;

        Ok(ResolvedLocation {
            name: format!("{:.4}, {:.4}", latitude, longitude),
            latitude,
            longitude,
            timezone: tz.to_string(),
            source: LocationSource::Direct,
            country_code: None,
        })
    }

    fn resolve_city(
        &mut self,
        name: &str,
        country_code: Option<&str>,
    ) -> Result<ResolvedLocation, LocationError> {
        // 1. Embedded table: fast, deterministic, always available.
        if let Some(loc) = dataset::lookup(name, country_code) {
            return Ok(loc);
        }

        // 2. Memo of earlier geocoder answers.
        if let Some(loc) = self.cache.get(name, country_code) {
            return Ok(loc);
        }

        // 3. Network geocoder, best-effort. Any failure here ends the
        //    request as "not found"; nothing is retried.
        if !self.offline {
            match self.geocoder.lookup(name, country_code) {
                Ok(loc) => {
                    self.cache.put(name, country_code, &loc);
                    return Ok(loc);
                }
                Err(_) => {}
            }
        }

        Err(LocationError::NotFound(name.to_string()))
    }
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Geocoder stub that answers a fixed location, or always fails.
    struct StubGeocoder {
        answer: Option<ResolvedLocation>,
        calls: Arc<AtomicUsize>,
    }

    impl StubGeocoder {
        fn failing() -> Self {
            Self { answer: None, calls: Arc::new(AtomicUsize::new(0)) }
        }

        fn answering(loc: ResolvedLocation) -> Self {
            Self { answer: Some(loc), calls: Arc::new(AtomicUsize::new(0)) }
        }
    }

    impl GeocodingLookup for StubGeocoder {
        fn lookup(
            &self,
            name: &str,
            _country_code: Option<&str>,
        ) -> Result<ResolvedLocation, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .clone()
                .ok_or_else(|| LocationError::Network(format!("unreachable for '{}'", name)))
        }
    }

    fn offline_resolver() -> (LocationResolver, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = GeocodeCache::load_from(dir.path().join("geocache.json"));
        let mut resolver = LocationResolver::with_parts(cache, Box::new(StubGeocoder::failing()));
        resolver.set_offline(true);
        (resolver, dir)
    }

    fn geocoded_lhasa() -> ResolvedLocation {
        ResolvedLocation {
            name: "Lhasa".into(),
            latitude: 29.6520,
            longitude: 91.1721,
            timezone: "Asia/Shanghai".into(),
            source: LocationSource::Geocoder,
            country_code: Some("CN".into()),
        }
    }

    #[test]
    fn test_direct_coordinates_pass_through() {
        let loc = LocationResolver::from_coordinates(39.9042, 116.4074, Some("Asia/Shanghai")).unwrap();
        assert_eq!(loc.latitude, 39.9042);
        assert_eq!(loc.longitude, 116.4074);
        assert_eq!(loc.timezone, "Asia/Shanghai");
        assert_eq!(loc.source, LocationSource::Direct);
    }

    #[test]
    fn test_direct_coordinates_out_of_range() {
        for (lat, lon) in [(90.1, 0.0), (-91.0, 0.0), (0.0, 180.5), (0.0, -181.0)] {
            let err = LocationResolver::from_coordinates(lat, lon, Some("UTC")).unwrap_err();
            assert!(matches!(err, LocationError::InvalidCoordinates { .. }), "({}, {})", lat, lon);
        }
    }

    #[test]
    fn test_direct_coordinates_boundary_ok() {
        assert!(LocationResolver::from_coordinates(90.0, 180.0, Some("UTC")).is_ok());
        assert!(LocationResolver::from_coordinates(-90.0, -180.0, Some("UTC")).is_ok());
    }

    #[test]
    fn test_direct_coordinates_missing_timezone() {
        let err = LocationResolver::from_coordinates(39.9, 116.4, None).unwrap_err();
        assert!(matches!(err, LocationError::MissingTimezone));
    }

    #[test]
    fn test_direct_coordinates_bad_timezone() {
        let err = LocationResolver::from_coordinates(39.9, 116.4, Some("Nowhere/Atlantis")).unwrap_err();
        assert!(matches!(err, LocationError::InvalidTimezone(_)));
    }

    #[test]
    fn test_coordinates_win_over_city() {
        let (mut resolver, _dir) = offline_resolver();
        let query = LocationQuery::Coordinates {
            latitude: 1.0,
            longitude: 2.0,
            timezone: Some("UTC".into()),
        };
        let loc = resolver.resolve(&query).unwrap();
        assert_eq!(loc.source, LocationSource::Direct);
    }

    #[test]
    fn test_city_from_builtin_no_network() {
        let dir = TempDir::new().unwrap();
        let cache = GeocodeCache::load_from(dir.path().join("geocache.json"));
        let stub = StubGeocoder::answering(geocoded_lhasa());
        let calls = stub.calls.clone();
        let mut resolver = LocationResolver::with_parts(cache, Box::new(stub));

        let query = LocationQuery::City { name: "Beijing".into(), country_code: Some("CN".into()) };
        let loc = resolver.resolve(&query).unwrap();
        assert_eq!(loc.source, LocationSource::Builtin);
        assert_eq!(loc.timezone, "Asia/Shanghai");
        // A table hit must never reach the geocoder.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_city_offline_not_found() {
        let (mut resolver, _dir) = offline_resolver();
        let query = LocationQuery::City { name: "xyznonexistentcity123".into(), country_code: None };
        let err = resolver.resolve(&query).unwrap_err();
        assert!(matches!(err, LocationError::NotFound(_)));
    }

    #[test]
    fn test_unknown_city_network_failure_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = GeocodeCache::load_from(dir.path().join("geocache.json"));
        let mut resolver = LocationResolver::with_parts(cache, Box::new(StubGeocoder::failing()));

        let query = LocationQuery::City { name: "xyznonexistentcity123".into(), country_code: None };
        let err = resolver.resolve(&query).unwrap_err();
        assert!(matches!(err, LocationError::NotFound(_)));
    }

    #[test]
    fn test_geocoder_hit_is_cached() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("geocache.json");
        let cache = GeocodeCache::load_from(cache_path.clone());
        let stub = Box::new(StubGeocoder::answering(geocoded_lhasa()));
        let mut resolver = LocationResolver::with_parts(cache, stub);

        let query = LocationQuery::City { name: "Lhasa".into(), country_code: None };
        let first = resolver.resolve(&query).unwrap();
        assert_eq!(first.source, LocationSource::Geocoder);

        // A fresh resolver with a failing geocoder answers from the memo.
        let cache = GeocodeCache::load_from(cache_path);
        let mut resolver = LocationResolver::with_parts(cache, Box::new(StubGeocoder::failing()));
        let second = resolver.resolve(&query).unwrap();
        assert_eq!(second.source, LocationSource::Cache);
        assert_eq!(second.name, "Lhasa");
    }

    #[test]
    fn test_builtin_case_insensitive_identical() {
        let (mut resolver, _dir) = offline_resolver();
        let a = resolver
            .resolve(&LocationQuery::City { name: "beijing".into(), country_code: None })
            .unwrap();
        let b = resolver
            .resolve(&LocationQuery::City { name: "Beijing".into(), country_code: None })
            .unwrap();
        assert_eq!(a, b);
    }
}
