//! Location subsystem for Stellium.
//!
//! Normalizes a human-supplied birth place — city name or raw coordinates —
//! into the `{latitude, longitude, timezone}` tuple the astrology engine
//! requires. Embedded offline city table first, network geocoding second.

pub mod cache;
pub mod dataset;
pub mod geocode;
pub mod resolver;
pub mod types;

pub use dataset::{city_list, CityInfo};
pub use geocode::{GeocodingLookup, NominatimGeocoder};
pub use resolver::LocationResolver;
pub use types::{LocationError, LocationQuery, LocationSource, ResolvedLocation};
