use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::engine::BirthInput;
use crate::location::types::LocationError;
use crate::location::{city_list, CityInfo, LocationQuery, LocationResolver};
use crate::tools;

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

fn log_request(route: &str, detail: &str, start: Instant) {
    eprintln!(
        "[{}] {} {} ({:.1}ms)",
        Utc::now().format("%H:%M:%S"),
        route,
        detail,
        start.elapsed().as_secs_f64() * 1000.0,
    );
}

// ─── GET /api/time ───────────────────────────────────────────────

pub async fn current_time() -> Json<Value> {
    Json(tools::current_time())
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub city: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tz: Option<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

fn location_status(err: &LocationError) -> StatusCode {
    match err {
        LocationError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let start = Instant::now();

    let query = if let (Some(lat), Some(lon)) = (params.lat, params.lon) {
        LocationQuery::Coordinates {
            latitude: lat,
            longitude: lon,
            timezone: params.tz.clone(),
        }
    } else if let Some(ref city) = params.city {
        LocationQuery::City {
            name: city.clone(),
            country_code: params.country.clone(),
        }
    } else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Provide 'city' or 'lat'+'lon' parameters",
        ));
    };

    let resolved = {
        let mut resolver = state.resolver.lock().unwrap();
        resolver.resolve(&query)
    }
    .map_err(|e| api_error(location_status(&e), e.to_string()))?;

    log_request("GET /api/resolve", &resolved.name, start);

    Ok(Json(ResolveResponse {
        name: resolved.name.clone(),
        latitude: resolved.latitude,
        longitude: resolved.longitude,
        timezone: resolved.timezone.clone(),
        source: resolved.source.to_string(),
        country_code: resolved.country_code,
    }))
}

// ─── GET /api/cities ─────────────────────────────────────────────

pub async fn cities() -> Json<Vec<CityInfo>> {
    Json(city_list())
}

// ─── POST chart operations ───────────────────────────────────────

#[derive(Deserialize)]
pub struct PairBody {
    pub person1_data: BirthInput,
    pub person2_data: BirthInput,
}

/// Unwrap a tool envelope into an HTTP response: success data straight
/// through, failures as 422 (the request parsed but cannot be served).
fn envelope_response(envelope: Value) -> Result<Json<Value>, ApiError> {
    if envelope.get("success") == Some(&Value::Bool(true)) {
        Ok(Json(envelope))
    } else {
        let msg = envelope
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string();
        Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, msg))
    }
}

fn with_resolver<T>(state: &AppState, f: impl FnOnce(&mut LocationResolver) -> T) -> T {
    let mut resolver = state.resolver.lock().unwrap();
    f(&mut resolver)
}

pub async fn natal_chart(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BirthInput>,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();
    let envelope = with_resolver(&state, |resolver| {
        tools::create_subject(resolver, state.engine.as_ref(), &input)
    });
    log_request("POST /api/chart", &input.name, start);
    envelope_response(envelope)
}

pub async fn natal_aspects(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BirthInput>,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();
    let envelope = with_resolver(&state, |resolver| {
        tools::natal_aspects(resolver, state.engine.as_ref(), &input)
    });
    log_request("POST /api/aspects/natal", &input.name, start);
    envelope_response(envelope)
}

pub async fn synastry_aspects(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PairBody>,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();
    let envelope = with_resolver(&state, |resolver| {
        tools::synastry_aspects(
            resolver,
            state.engine.as_ref(),
            &body.person1_data,
            &body.person2_data,
        )
    });
    log_request("POST /api/aspects/synastry", &body.person1_data.name, start);
    envelope_response(envelope)
}

pub async fn composite_chart(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PairBody>,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();
    let envelope = with_resolver(&state, |resolver| {
        tools::composite_chart(
            resolver,
            state.engine.as_ref(),
            &body.person1_data,
            &body.person2_data,
        )
    });
    log_request("POST /api/composite", &body.person1_data.name, start);
    envelope_response(envelope)
}
