//! Embedded city dataset: the offline fast path for location resolution.
//!
//! Lookup is case-insensitive over canonical names and aliases, optionally
//! filtered by country code. When a bare name matches several records
//! (e.g. "london"), the first record in declaration order wins — the
//! tie-break is the table order below, nothing smarter.

use super::types::{LocationSource, ResolvedLocation};

pub(crate) struct CityRecord {
    /// Canonical name first, aliases after.
    names: &'static [&'static str],
    country_code: &'static str,
    latitude: f64,
    longitude: f64,
    timezone: &'static str,
}

const CITIES: &[CityRecord] = &[
    CityRecord {
        names: &["beijing", "peking"],
        country_code: "CN",
        latitude: 39.9042, longitude: 116.4074, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["shanghai"],
        country_code: "CN",
        latitude: 31.2304, longitude: 121.4737, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["guangzhou", "canton"],
        country_code: "CN",
        latitude: 23.1291, longitude: 113.2644, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["shenzhen"],
        country_code: "CN",
        latitude: 22.5431, longitude: 114.0579, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["chengdu"],
        country_code: "CN",
        latitude: 30.5728, longitude: 104.0668, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["chongqing"],
        country_code: "CN",
        latitude: 29.5630, longitude: 106.5516, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["wuhan"],
        country_code: "CN",
        latitude: 30.5928, longitude: 114.3055, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["xian", "xi'an"],
        country_code: "CN",
        latitude: 34.3416, longitude: 108.9398, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["hangzhou"],
        country_code: "CN",
        latitude: 30.2741, longitude: 120.1551, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["nanjing", "nanking"],
        country_code: "CN",
        latitude: 32.0603, longitude: 118.7969, timezone: "Asia/Shanghai",
    },
    CityRecord {
        names: &["hong kong", "hongkong", "hk"],
        country_code: "HK",
        latitude: 22.3193, longitude: 114.1694, timezone: "Asia/Hong_Kong",
    },
    CityRecord {
        names: &["taipei"],
        country_code: "TW",
        latitude: 25.0330, longitude: 121.5654, timezone: "Asia/Taipei",
    },
    CityRecord {
        names: &["tokyo"],
        country_code: "JP",
        latitude: 35.6762, longitude: 139.6503, timezone: "Asia/Tokyo",
    },
    CityRecord {
        names: &["seoul"],
        country_code: "KR",
        latitude: 37.5665, longitude: 126.9780, timezone: "Asia/Seoul",
    },
    CityRecord {
        names: &["singapore"],
        country_code: "SG",
        latitude: 1.3521, longitude: 103.8198, timezone: "Asia/Singapore",
    },
    CityRecord {
        names: &["mumbai", "bombay"],
        country_code: "IN",
        latitude: 19.0760, longitude: 72.8777, timezone: "Asia/Kolkata",
    },
    CityRecord {
        names: &["delhi", "new delhi"],
        country_code: "IN",
        latitude: 28.6139, longitude: 77.2090, timezone: "Asia/Kolkata",
    },
    CityRecord {
        names: &["dubai"],
        country_code: "AE",
        latitude: 25.2048, longitude: 55.2708, timezone: "Asia/Dubai",
    },
    CityRecord {
        names: &["istanbul"],
        country_code: "TR",
        latitude: 41.0082, longitude: 28.9784, timezone: "Europe/Istanbul",
    },
    CityRecord {
        names: &["moscow", "moskva"],
        country_code: "RU",
        latitude: 55.7558, longitude: 37.6173, timezone: "Europe/Moscow",
    },
    // GB London is declared before CA London on purpose: a bare "london"
    // must always pick the same record.
    CityRecord {
        names: &["london"],
        country_code: "GB",
        latitude: 51.5074, longitude: -0.1278, timezone: "Europe/London",
    },
    CityRecord {
        names: &["london"],
        country_code: "CA",
        latitude: 42.9849, longitude: -81.2453, timezone: "America/Toronto",
    },
    CityRecord {
        names: &["paris"],
        country_code: "FR",
        latitude: 48.8566, longitude: 2.3522, timezone: "Europe/Paris",
    },
    CityRecord {
        names: &["berlin"],
        country_code: "DE",
        latitude: 52.5200, longitude: 13.4050, timezone: "Europe/Berlin",
    },
    CityRecord {
        names: &["rome", "roma"],
        country_code: "IT",
        latitude: 41.9028, longitude: 12.4964, timezone: "Europe/Rome",
    },
    CityRecord {
        names: &["madrid"],
        country_code: "ES",
        latitude: 40.4168, longitude: -3.7038, timezone: "Europe/Madrid",
    },
    CityRecord {
        names: &["stockholm"],
        country_code: "SE",
        latitude: 59.3293, longitude: 18.0686, timezone: "Europe/Stockholm",
    },
    CityRecord {
        names: &["amsterdam"],
        country_code: "NL",
        latitude: 52.3676, longitude: 4.9041, timezone: "Europe/Amsterdam",
    },
    CityRecord {
        names: &["zurich", "zürich"],
        country_code: "CH",
        latitude: 47.3769, longitude: 8.5417, timezone: "Europe/Zurich",
    },
    CityRecord {
        names: &["cairo", "al-qahirah"],
        country_code: "EG",
        latitude: 30.0444, longitude: 31.2357, timezone: "Africa/Cairo",
    },
    CityRecord {
        names: &["lagos"],
        country_code: "NG",
        latitude: 6.5244, longitude: 3.3792, timezone: "Africa/Lagos",
    },
    CityRecord {
        names: &["johannesburg", "joburg"],
        country_code: "ZA",
        latitude: -26.2041, longitude: 28.0473, timezone: "Africa/Johannesburg",
    },
    CityRecord {
        names: &["new york", "newyork", "nyc"],
        country_code: "US",
        latitude: 40.7128, longitude: -74.0060, timezone: "America/New_York",
    },
    CityRecord {
        names: &["los angeles", "la"],
        country_code: "US",
        latitude: 34.0522, longitude: -118.2437, timezone: "America/Los_Angeles",
    },
    CityRecord {
        names: &["chicago"],
        country_code: "US",
        latitude: 41.8781, longitude: -87.6298, timezone: "America/Chicago",
    },
    CityRecord {
        names: &["toronto"],
        country_code: "CA",
        latitude: 43.6532, longitude: -79.3832, timezone: "America/Toronto",
    },
    CityRecord {
        names: &["mexico city", "ciudad de mexico", "cdmx"],
        country_code: "MX",
        latitude: 19.4326, longitude: -99.1332, timezone: "America/Mexico_City",
    },
    CityRecord {
        names: &["sao paulo", "são paulo"],
        country_code: "BR",
        latitude: -23.5505, longitude: -46.6333, timezone: "America/Sao_Paulo",
    },
    CityRecord {
        names: &["buenos aires"],
        country_code: "AR",
        latitude: -34.6037, longitude: -58.3816, timezone: "America/Argentina/Buenos_Aires",
    },
    CityRecord {
        names: &["sydney"],
        country_code: "AU",
        latitude: -33.8688, longitude: 151.2093, timezone: "Australia/Sydney",
    },
    CityRecord {
        names: &["auckland"],
        country_code: "NZ",
        latitude: -36.8509, longitude: 174.7645, timezone: "Pacific/Auckland",
    },
];

/// Compute edit distance between two strings (Levenshtein).
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Look up a city in the embedded table, optionally filtered by country code.
///
/// Match order: exact name/alias, then substring, then fuzzy (edit distance
/// <= 2). Within each stage, declaration order decides.
pub fn lookup(name: &str, country_code: Option<&str>) -> Option<ResolvedLocation> {
    let q = name.trim().to_lowercase();
    if q.is_empty() {
        return None;
    }
    let country_filter = country_code.map(|c| c.trim().to_uppercase());

    let candidates: Vec<&CityRecord> = match country_filter {
        Some(ref cc) => CITIES.iter().filter(|c| c.country_code == cc.as_str()).collect(),
        None => CITIES.iter().collect(),
    };

    // Exact match
    for city in &candidates {
        if city.names.iter().any(|n| *n == q) {
            return Some(to_resolved(city));
        }
    }

    // Substring match
    for city in &candidates {
        if city.names.iter().any(|n| n.contains(&q) || q.contains(n)) {
            return Some(to_resolved(city));
        }
    }

    // Fuzzy match
    let mut best: Option<(&CityRecord, usize)> = None;
    for city in &candidates {
        for n in city.names {
            let dist = edit_distance(&q, n);
            if dist <= 2 && best.map_or(true, |(_, d)| dist < d) {
                best = Some((city, dist));
            }
        }
    }
    best.map(|(city, _)| to_resolved(city))
}

fn to_resolved(city: &CityRecord) -> ResolvedLocation {
    ResolvedLocation {
        name: city.names[0].to_string(),
        latitude: city.latitude,
        longitude: city.longitude,
        timezone: city.timezone.to_string(),
        source: LocationSource::Builtin,
        country_code: Some(city.country_code.to_string()),
    }
}

/// A city entry for the public city list API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CityInfo {
    pub name: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

/// The full embedded city list (for the /api/cities endpoint).
pub fn city_list() -> Vec<CityInfo> {
    CITIES
        .iter()
        .map(|c| CityInfo {
            name: c.names[0].to_string(),
            country_code: c.country_code.to_string(),
            latitude: c.latitude,
            longitude: c.longitude,
            timezone: c.timezone.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lookup_exact() {
        let loc = lookup("Beijing", Some("CN")).unwrap();
        assert_eq!(loc.name, "beijing");
        assert_relative_eq!(loc.latitude, 39.9042, epsilon = 1e-4);
        assert_relative_eq!(loc.longitude, 116.4074, epsilon = 1e-4);
        assert_eq!(loc.timezone, "Asia/Shanghai");
        assert_eq!(loc.source, LocationSource::Builtin);
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let lower = lookup("beijing", None).unwrap();
        let mixed = lookup("Beijing", None).unwrap();
        let upper = lookup("BEIJING", None).unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_lookup_alias() {
        let loc = lookup("peking", None).unwrap();
        assert_eq!(loc.name, "beijing");
        let loc = lookup("NYC", None).unwrap();
        assert_eq!(loc.name, "new york");
    }

    #[test]
    fn test_lookup_country_disambiguates() {
        let gb = lookup("london", Some("GB")).unwrap();
        assert_eq!(gb.country_code, Some("GB".to_string()));
        assert_eq!(gb.timezone, "Europe/London");

        let ca = lookup("london", Some("CA")).unwrap();
        assert_eq!(ca.country_code, Some("CA".to_string()));
        assert_eq!(ca.timezone, "America/Toronto");
    }

    #[test]
    fn test_lookup_bare_duplicate_is_first_declared() {
        // Declaration order pins the winner: GB London comes first.
        for _ in 0..3 {
            let loc = lookup("london", None).unwrap();
            assert_eq!(loc.country_code, Some("GB".to_string()));
        }
    }

    #[test]
    fn test_lookup_fuzzy() {
        // One-character typo still matches.
        let loc = lookup("bejing", None).unwrap();
        assert_eq!(loc.name, "beijing");
    }

    #[test]
    fn test_lookup_not_found() {
        assert!(lookup("xyznonexistentcity123", None).is_none());
    }

    #[test]
    fn test_lookup_wrong_country_misses() {
        assert!(lookup("beijing", Some("US")).is_none());
    }

    #[test]
    fn test_lookup_empty_query() {
        assert!(lookup("  ", None).is_none());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("beijing", "bejing"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
    }

    #[test]
    fn test_city_list_covers_table() {
        let list = city_list();
        assert!(list.len() >= 40);
        assert!(list.iter().any(|c| c.name == "beijing" && c.country_code == "CN"));
    }
}
