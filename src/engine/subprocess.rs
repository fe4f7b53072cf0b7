//! Subprocess-backed engine: JSON over the child's stdin/stdout.
//!
//! One process per call, one request object in, one response object out:
//!
//!   → {"op": "natal_chart", "subject": {..}}
//!   ← {"success": true, "data": {..}}  |  {"success": false, "error": ".."}
//!
//! The engine command is whatever shim wraps the actual astrology library;
//! this side only speaks the envelope.

use super::{AspectReport, AstrologyEngine, CompositeReport, EngineError, SynastryReport};
use crate::engine::ChartRequest;
use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Stdio};

pub struct SubprocessEngine {
    program: String,
    args: Vec<String>,
}

impl SubprocessEngine {
    /// Build from a shell-ish command line: first word is the program,
    /// the rest are fixed arguments.
    pub fn from_command(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?.to_string();
        Some(Self {
            program,
            args: parts.map(String::from).collect(),
        })
    }

    fn call(&self, request: Value) -> Result<Value, EngineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {}", self.program, e)))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| EngineError::Io("engine stdin unavailable".into()))?;
            let line = serde_json::to_string(&request)
                .map_err(|e| EngineError::Protocol(e.to_string()))?;
            stdin
                .write_all(line.as_bytes())
                .and_then(|_| stdin.write_all(b"\n"))
                .map_err(|e| EngineError::Io(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| EngineError::Io(e.to_string()))?;
        if !output.status.success() {
            return Err(EngineError::Engine(format!(
                "engine exited with {}",
                output.status
            )));
        }

        let response: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        unwrap_envelope(response)
    }
}

/// Pull `data` out of the engine envelope, or surface its error.
fn unwrap_envelope(response: Value) -> Result<Value, EngineError> {
    match response.get("success").and_then(Value::as_bool) {
        Some(true) => response
            .get("data")
            .cloned()
            .ok_or_else(|| EngineError::Protocol("success response without data".into())),
        Some(false) => {
            let msg = response
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unspecified engine failure");
            Err(EngineError::Engine(msg.to_string()))
        }
        None => Err(EngineError::Protocol("response missing 'success' field".into())),
    }
}

impl AstrologyEngine for SubprocessEngine {
    fn natal_chart(&self, request: &ChartRequest) -> Result<Value, EngineError> {
        self.call(json!({"op": "natal_chart", "subject": request}))
    }

    fn natal_aspects(&self, request: &ChartRequest) -> Result<AspectReport, EngineError> {
        let data = self.call(json!({"op": "natal_aspects", "subject": request}))?;
        serde_json::from_value(data).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    fn synastry_aspects(
        &self,
        first: &ChartRequest,
        second: &ChartRequest,
    ) -> Result<SynastryReport, EngineError> {
        let data = self.call(json!({"op": "synastry_aspects", "first": first, "second": second}))?;
        serde_json::from_value(data).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    fn composite_chart(
        &self,
        first: &ChartRequest,
        second: &ChartRequest,
    ) -> Result<CompositeReport, EngineError> {
        let data = self.call(json!({"op": "composite_chart", "first": first, "second": second}))?;
        serde_json::from_value(data).map_err(|e| EngineError::Protocol(e.to_string()))
    }
}
