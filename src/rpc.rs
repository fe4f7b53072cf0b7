//! stdio JSON-RPC 2.0 transport.
//!
//! One request per line on stdin, one response per line on stdout. Methods:
//! `initialize`, `tools/list`, `tools/call`. Everything else is -32601.
//! Unparseable lines get -32700; a panic-free -32603 covers the rest.
//! Tool failures are not protocol errors: they come back as a normal
//! result with `isError: true`, so a bad birth date never kills the session.

use crate::engine::{AstrologyEngine, BirthInput};
use crate::location::LocationResolver;
use crate::tools;
use serde_json::{json, Value};
use std::io::{BufRead, Write};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub struct RpcServer {
    resolver: LocationResolver,
    engine: Box<dyn AstrologyEngine>,
}

impl RpcServer {
    pub fn new(resolver: LocationResolver, engine: Box<dyn AstrologyEngine>) -> Self {
        Self { resolver, engine }
    }

    /// Serve until the reader is exhausted. Responses go out one per line.
    pub fn serve<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> std::io::Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let response = match serde_json::from_str::<Value>(&line) {
                Ok(request) => self.handle(&request),
                Err(_) => error_response(Value::Null, -32700, "Parse error"),
            };
            writeln!(writer, "{}", response)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Dispatch one request.
    pub fn handle(&mut self, request: &Value) -> Value {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        match request.get("method").and_then(Value::as_str) {
            Some("initialize") => initialize_response(id),
            Some("tools/list") => tools_list_response(id),
            Some("tools/call") => self.tools_call(id, request.get("params")),
            Some(_) => error_response(id, -32601, "Method not found"),
            None => error_response(id, -32600, "Invalid request: no method"),
        }
    }

    fn tools_call(&mut self, id: Value, params: Option<&Value>) -> Value {
        let params = params.cloned().unwrap_or_else(|| json!({}));
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let envelope = match name {
            "get_current_time" => tools::current_time(),
            "create_astrological_subject" => match birth_input(&arguments) {
                Ok(input) => tools::create_subject(&mut self.resolver, self.engine.as_ref(), &input),
                Err(e) => tools::failure(e),
            },
            "get_natal_aspects" => match birth_input(&arguments) {
                Ok(input) => tools::natal_aspects(&mut self.resolver, self.engine.as_ref(), &input),
                Err(e) => tools::failure(e),
            },
            "get_synastry_aspects" => match person_pair(&arguments) {
                Ok((first, second)) => tools::synastry_aspects(
                    &mut self.resolver,
                    self.engine.as_ref(),
                    &first,
                    &second,
                ),
                Err(e) => tools::failure(e),
            },
            "create_composite_chart" => match person_pair(&arguments) {
                Ok((first, second)) => tools::composite_chart(
                    &mut self.resolver,
                    self.engine.as_ref(),
                    &first,
                    &second,
                ),
                Err(e) => tools::failure(e),
            },
            other => {
                return tool_result(id, format!("Unknown tool: {}", other), true);
            }
        };

        let is_error = envelope.get("success") != Some(&Value::Bool(true));
        let text = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string());
        tool_result(id, text, is_error)
    }
}

fn birth_input(arguments: &Value) -> Result<BirthInput, String> {
    serde_json::from_value(arguments.clone()).map_err(|e| format!("Invalid arguments: {}", e))
}

fn person_pair(arguments: &Value) -> Result<(BirthInput, BirthInput), String> {
    let first = arguments
        .get("person1_data")
        .ok_or("Missing 'person1_data'")?;
    let second = arguments
        .get("person2_data")
        .ok_or("Missing 'person2_data'")?;
    Ok((birth_input(first)?, birth_input(second)?))
}

fn tool_result(id: Value, text: String, is_error: bool) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [{"type": "text", "text": text}],
            "isError": is_error,
        }
    })
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": code, "message": message}
    })
}

fn initialize_response(id: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "serverInfo": {
                "name": "stellium",
                "version": env!("CARGO_PKG_VERSION"),
                "description": "Astrology chart bridge: natal charts, aspects, synastry, composites",
            }
        }
    })
}

/// JSON schema fragment for one person's birth data. Location is not in
/// `required`: either a city or raw coordinates will do, checked server-side.
fn birth_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": "Subject name"},
            "year": {"type": "integer", "description": "Birth year"},
            "month": {"type": "integer", "description": "Birth month (1-12)"},
            "day": {"type": "integer", "description": "Birth day (1-31)"},
            "hour": {"type": "integer", "description": "Birth hour (0-23)"},
            "minute": {"type": "integer", "description": "Birth minute (0-59)"},
            "city": {"type": "string", "description": "Birth city name"},
            "nation": {"type": "string", "description": "Country code (e.g. US, GB, CN)"},
            "latitude": {"type": "number", "description": "Latitude; with longitude, overrides city lookup"},
            "longitude": {"type": "number", "description": "Longitude; with latitude, overrides city lookup"},
            "tz_str": {"type": "string", "description": "IANA timezone (e.g. Asia/Shanghai); required with raw coordinates"},
            "zodiac_type": {"type": "string", "enum": ["Tropical", "Sidereal"]},
            "sidereal_mode": {"type": "string", "description": "Ayanamsha when zodiac_type is Sidereal (e.g. LAHIRI)"},
            "houses_system": {"type": "string", "description": "House system code (default P, Placidus)"},
            "perspective": {"type": "string", "description": "Observation perspective (default Apparent Geocentric)"},
        },
        "required": ["name", "year", "month", "day", "hour", "minute"],
    })
}

fn pair_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "person1_data": birth_schema(),
            "person2_data": birth_schema(),
        },
        "required": ["person1_data", "person2_data"],
    })
}

fn tools_list_response(id: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": [
                {
                    "name": "get_current_time",
                    "description": "Current system time with formatted fields and unix timestamp",
                    "inputSchema": {"type": "object", "properties": {}, "required": []},
                },
                {
                    "name": "create_astrological_subject",
                    "description": "Compute a full natal chart (planets, houses) for one birth event",
                    "inputSchema": birth_schema(),
                },
                {
                    "name": "get_natal_aspects",
                    "description": "Natal chart plus the angular aspects between its planets",
                    "inputSchema": birth_schema(),
                },
                {
                    "name": "get_synastry_aspects",
                    "description": "Cross-chart aspects between two subjects",
                    "inputSchema": pair_schema(),
                },
                {
                    "name": "create_composite_chart",
                    "description": "Midpoint composite chart derived from two subjects",
                    "inputSchema": pair_schema(),
                },
            ]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;
    use crate::location::cache::GeocodeCache;
    use crate::location::{GeocodingLookup, LocationError, ResolvedLocation};
    use tempfile::TempDir;

    struct NoGeocoder;

    impl GeocodingLookup for NoGeocoder {
        fn lookup(&self, name: &str, _: Option<&str>) -> Result<ResolvedLocation, LocationError> {
            Err(LocationError::Network(format!("offline for '{}'", name)))
        }
    }

    fn test_server() -> (RpcServer, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = GeocodeCache::load_from(dir.path().join("geocache.json"));
        let mut resolver = LocationResolver::with_parts(cache, Box::new(NoGeocoder));
        resolver.set_offline(true);
        (RpcServer::new(resolver, Box::new(MockEngine::ok())), dir)
    }

    #[test]
    fn test_initialize() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}));
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "stellium");
    }

    #[test]
    fn test_tools_list_has_all_five() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}));
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert!(names.contains(&"create_astrological_subject"));
        assert!(names.contains(&"create_composite_chart"));
    }

    #[test]
    fn test_unknown_method() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({"jsonrpc": "2.0", "id": 3, "method": "charts/burn"}));
        assert_eq!(response["error"]["code"], -32601);
    }

    #[test]
    fn test_call_current_time() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {"name": "get_current_time", "arguments": {}}
        }));
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let envelope: Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["success"], true);
    }

    #[test]
    fn test_call_create_subject() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({
            "jsonrpc": "2.0", "id": 5, "method": "tools/call",
            "params": {"name": "create_astrological_subject", "arguments": {
                "name": "Li Wei", "year": 1990, "month": 6, "day": 15,
                "hour": 14, "minute": 30, "city": "Beijing", "nation": "CN"
            }}
        }));
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let envelope: Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["data"]["input"]["tz_str"], "Asia/Shanghai");
    }

    #[test]
    fn test_call_unknown_tool() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({
            "jsonrpc": "2.0", "id": 6, "method": "tools/call",
            "params": {"name": "read_tarot", "arguments": {}}
        }));
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Unknown tool"));
    }

    #[test]
    fn test_call_bad_arguments_is_tool_error() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({
            "jsonrpc": "2.0", "id": 7, "method": "tools/call",
            "params": {"name": "get_natal_aspects", "arguments": {"name": "only a name"}}
        }));
        // Not a protocol error: the session survives, the tool reports.
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
    }

    #[test]
    fn test_call_synastry_missing_person() {
        let (mut server, _dir) = test_server();
        let response = server.handle(&json!({
            "jsonrpc": "2.0", "id": 8, "method": "tools/call",
            "params": {"name": "get_synastry_aspects", "arguments": {"person1_data": {
                "name": "A", "year": 1990, "month": 1, "day": 1,
                "hour": 0, "minute": 0, "city": "Beijing"
            }}}
        }));
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("person2_data"));
    }

    #[test]
    fn test_serve_loop_parse_error_and_recovery() {
        let (mut server, _dir) = test_server();
        let input = b"this is not json\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"initialize\"}\n";
        let mut output = Vec::new();
        server.serve(&input[..], &mut output).unwrap();

        let lines: Vec<&str> = std::str::from_utf8(&output).unwrap().lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["error"]["code"], -32700);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["id"], 9);
        assert!(second.get("result").is_some());
    }

    #[test]
    fn test_serve_skips_blank_lines() {
        let (mut server, _dir) = test_server();
        let input = b"\n\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
        let mut output = Vec::new();
        server.serve(&input[..], &mut output).unwrap();
        let lines: Vec<&str> = std::str::from_utf8(&output).unwrap().lines().collect();
        assert_eq!(lines.len(), 1);
    }
}
