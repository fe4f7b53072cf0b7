//! File-based memo of geocoder results at ~/.stellium/geocache.json.
//!
//! Only network hits are cached; the embedded table never goes through
//! here, so table-over-network priority is unaffected. TTL: 30 days.
//! Keys are lowercase query + optional country code.

use super::types::{LocationSource, ResolvedLocation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const CACHE_TTL_MS: i64 = 30 * 24 * 3600 * 1000;

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    name: String,
    latitude: f64,
    longitude: f64,
    timezone: String,
    #[serde(default)]
    country_code: Option<String>,
    timestamp: i64,
}

/// The geocode result cache.
pub struct GeocodeCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

impl GeocodeCache {
    /// Load from the default location (~/.stellium/geocache.json).
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load from a specific path (for testing).
    pub fn load_from(path: PathBuf) -> Self {
        let entries = Self::read_file(&path).unwrap_or_default();
        Self { path, entries }
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stellium")
            .join("geocache.json")
    }

    fn read_file(path: &PathBuf) -> Option<HashMap<String, CacheEntry>> {
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    fn key(query: &str, country_code: Option<&str>) -> String {
        match country_code {
            Some(cc) => format!("{}|{}", query.trim().to_lowercase(), cc.trim().to_uppercase()),
            None => query.trim().to_lowercase(),
        }
    }

    /// Look up a cached geocode result. Returns None if missing or expired.
    pub fn get(&self, query: &str, country_code: Option<&str>) -> Option<ResolvedLocation> {
        let entry = self.entries.get(&Self::key(query, country_code))?;

        let now = chrono::Utc::now().timestamp_millis();
        if now - entry.timestamp > CACHE_TTL_MS {
            return None; // expired
        }

        Some(ResolvedLocation {
            name: entry.name.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            timezone: entry.timezone.clone(),
            source: LocationSource::Cache,
            country_code: entry.country_code.clone(),
        })
    }

    /// Store a geocoder hit under the query it answered and persist to disk.
    pub fn put(&mut self, query: &str, country_code: Option<&str>, resolved: &ResolvedLocation) {
        let entry = CacheEntry {
            name: resolved.name.clone(),
            latitude: resolved.latitude,
            longitude: resolved.longitude,
            timezone: resolved.timezone.clone(),
            country_code: resolved.country_code.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        self.entries.insert(Self::key(query, country_code), entry);
        self.persist();
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&self.entries) {
            let _ = fs::write(&self.path, json);
        }
    }

    /// Number of entries (for testing).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
