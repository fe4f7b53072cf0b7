//! The chart operations exposed over every transport.
//!
//! Each operation returns the caller-facing envelope directly:
//! `{"success": true, "data": ..}` or `{"success": false, "error": ".."}`.
//! Failures never escape as Rust errors past this layer; a request that
//! cannot be served becomes an error envelope, and the serving loop moves on.

use crate::engine::{AstrologyEngine, BirthInput, ChartRequest};
use crate::location::{LocationResolver, ResolvedLocation};
use chrono::{Datelike, Local, Timelike};
use serde_json::{json, Value};

pub fn success(data: Value) -> Value {
    json!({"success": true, "data": data})
}

pub fn failure(message: impl std::fmt::Display) -> Value {
    json!({"success": false, "error": message.to_string()})
}

/// Current local time report.
pub fn current_time() -> Value {
    let now = Local::now();
    success(json!({
        "year": now.year(),
        "month": now.month(),
        "day": now.day(),
        "hour": now.hour(),
        "minute": now.minute(),
        "second": now.second(),
        "datetime_str": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        "weekday": now.format("%A").to_string(),
        "timestamp": now.timestamp(),
    }))
}

/// Validate a birth payload and resolve its location into an engine input.
fn prepare(
    resolver: &mut LocationResolver,
    input: &BirthInput,
) -> Result<(ChartRequest, ResolvedLocation), String> {
    input.validate().map_err(|e| e.to_string())?;
    let query = input.location_query().map_err(|e| e.to_string())?;
    let location = resolver.resolve(&query).map_err(|e| e.to_string())?;
    Ok((input.chart_request(&location), location))
}

/// Echo of the normalized input, reported back alongside engine output.
fn input_echo(input: &BirthInput, location: &ResolvedLocation) -> Value {
    json!({
        "name": input.name,
        "year": input.year,
        "month": input.month,
        "day": input.day,
        "hour": input.hour,
        "minute": input.minute,
        "city": input.city.as_deref().unwrap_or(&location.name),
        "nation": input.nation,
        "latitude": location.latitude,
        "longitude": location.longitude,
        "tz_str": location.timezone,
        "location_source": location.source.to_string(),
        "used_coordinates": input.latitude.is_some() && input.longitude.is_some(),
    })
}

/// Full chart for one subject.
pub fn create_subject(
    resolver: &mut LocationResolver,
    engine: &dyn AstrologyEngine,
    input: &BirthInput,
) -> Value {
    let (request, location) = match prepare(resolver, input) {
        Ok(pair) => pair,
        Err(e) => return failure(e),
    };
    match engine.natal_chart(&request) {
        Ok(chart) => success(json!({
            "input": input_echo(input, &location),
            "astrological_data": chart,
        })),
        Err(e) => failure(e),
    }
}

/// Chart plus aspect list for one subject.
pub fn natal_aspects(
    resolver: &mut LocationResolver,
    engine: &dyn AstrologyEngine,
    input: &BirthInput,
) -> Value {
    let (request, location) = match prepare(resolver, input) {
        Ok(pair) => pair,
        Err(e) => return failure(e),
    };
    match engine.natal_aspects(&request) {
        Ok(report) => success(json!({
            "input": input_echo(input, &location),
            "astrological_data": report.chart,
            "aspects_count": report.aspects.len(),
            "aspects": report.aspects,
        })),
        Err(e) => failure(e),
    }
}

/// Cross-chart aspects between two subjects.
pub fn synastry_aspects(
    resolver: &mut LocationResolver,
    engine: &dyn AstrologyEngine,
    first: &BirthInput,
    second: &BirthInput,
) -> Value {
    let (first_request, first_location) = match prepare(resolver, first) {
        Ok(pair) => pair,
        Err(e) => return failure(e),
    };
    let (second_request, second_location) = match prepare(resolver, second) {
        Ok(pair) => pair,
        Err(e) => return failure(e),
    };
    match engine.synastry_aspects(&first_request, &second_request) {
        Ok(report) => success(json!({
            "person1_input": input_echo(first, &first_location),
            "person2_input": input_echo(second, &second_location),
            "person1_astrological_data": report.first_chart,
            "person2_astrological_data": report.second_chart,
            "aspects_count": report.aspects.len(),
            "aspects": report.aspects,
        })),
        Err(e) => failure(e),
    }
}

/// Midpoint composite chart for two subjects.
pub fn composite_chart(
    resolver: &mut LocationResolver,
    engine: &dyn AstrologyEngine,
    first: &BirthInput,
    second: &BirthInput,
) -> Value {
    let (first_request, first_location) = match prepare(resolver, first) {
        Ok(pair) => pair,
        Err(e) => return failure(e),
    };
    let (second_request, second_location) = match prepare(resolver, second) {
        Ok(pair) => pair,
        Err(e) => return failure(e),
    };
    match engine.composite_chart(&first_request, &second_request) {
        Ok(report) => success(json!({
            "person1_input": input_echo(first, &first_location),
            "person2_input": input_echo(second, &second_location),
            "person1_astrological_data": report.first_chart,
            "person2_astrological_data": report.second_chart,
            "composite_name": format!("{} & {} Composite", first.name, second.name),
            "composite_astrological_data": report.composite_chart,
        })),
        Err(e) => failure(e),
    }
}
