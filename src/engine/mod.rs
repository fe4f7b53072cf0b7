//! The astrology engine capability.
//!
//! All astronomical computation — ephemeris positions, house systems,
//! aspect geometry, composite midpoints — happens behind this trait, in an
//! external engine. Engine documents are carried as `serde_json::Value` and
//! passed through to callers untouched; this crate never interprets them.

pub mod request;
pub mod subprocess;

pub use request::{BirthInput, BirthInputError, ChartRequest};
pub use subprocess::SubprocessEngine;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A natal chart plus the aspects found within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectReport {
    /// Engine-native chart document.
    pub chart: Value,
    pub aspects: Vec<Value>,
}

/// Cross-chart aspects between two subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynastryReport {
    pub first_chart: Value,
    pub second_chart: Value,
    pub aspects: Vec<Value>,
}

/// A midpoint-composite chart derived from two subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeReport {
    pub first_chart: Value,
    pub second_chart: Value,
    pub composite_chart: Value,
}

/// The external astrology engine. One method per chart operation; inputs are
/// fully resolved (coordinates and timezone already normalized).
pub trait AstrologyEngine: Send + Sync {
    fn natal_chart(&self, request: &ChartRequest) -> Result<Value, EngineError>;

    fn natal_aspects(&self, request: &ChartRequest) -> Result<AspectReport, EngineError>;

    fn synastry_aspects(
        &self,
        first: &ChartRequest,
        second: &ChartRequest,
    ) -> Result<SynastryReport, EngineError>;

    fn composite_chart(
        &self,
        first: &ChartRequest,
        second: &ChartRequest,
    ) -> Result<CompositeReport, EngineError>;
}

/// Engine invocation errors. Request-level, like everything else here.
#[derive(Debug)]
pub enum EngineError {
    /// The engine command could not be started.
    Spawn(String),
    Io(String),
    /// The engine answered, but not in the agreed wire shape.
    Protocol(String),
    /// The engine ran and reported a computation failure.
    Engine(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(msg) => write!(f, "Cannot start astrology engine: {}", msg),
            Self::Io(msg) => write!(f, "Engine I/O error: {}", msg),
            Self::Protocol(msg) => write!(f, "Malformed engine response: {}", msg),
            Self::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use serde_json::json;

    /// In-memory engine returning canned documents, or a fixed failure.
    pub struct MockEngine {
        pub fail_with: Option<String>,
    }

    impl MockEngine {
        pub fn ok() -> Self {
            Self { fail_with: None }
        }

        pub fn failing(msg: &str) -> Self {
            Self { fail_with: Some(msg.to_string()) }
        }

        fn check(&self) -> Result<(), EngineError> {
            match &self.fail_with {
                Some(msg) => Err(EngineError::Engine(msg.clone())),
                None => Ok(()),
            }
        }

        fn chart_doc(request: &ChartRequest) -> Value {
            json!({
                "name": request.name,
                "latitude": request.latitude,
                "longitude": request.longitude,
                "timezone": request.timezone,
                "sun": {"sign": "Ari", "position": 12.34},
            })
        }
    }

    impl AstrologyEngine for MockEngine {
        fn natal_chart(&self, request: &ChartRequest) -> Result<Value, EngineError> {
            self.check()?;
            Ok(Self::chart_doc(request))
        }

        fn natal_aspects(&self, request: &ChartRequest) -> Result<AspectReport, EngineError> {
            self.check()?;
            Ok(AspectReport {
                chart: Self::chart_doc(request),
                aspects: vec![json!({"p1_name": "Sun", "p2_name": "Moon", "aspect": "trine"})],
            })
        }

        fn synastry_aspects(
            &self,
            first: &ChartRequest,
            second: &ChartRequest,
        ) -> Result<SynastryReport, EngineError> {
            self.check()?;
            Ok(SynastryReport {
                first_chart: Self::chart_doc(first),
                second_chart: Self::chart_doc(second),
                aspects: vec![json!({"p1_name": "Venus", "p2_name": "Mars", "aspect": "square"})],
            })
        }

        fn composite_chart(
            &self,
            first: &ChartRequest,
            second: &ChartRequest,
        ) -> Result<CompositeReport, EngineError> {
            self.check()?;
            Ok(CompositeReport {
                first_chart: Self::chart_doc(first),
                second_chart: Self::chart_doc(second),
                composite_chart: json!({"name": "composite", "sun": {"sign": "Tau"}}),
            })
        }
    }
}
