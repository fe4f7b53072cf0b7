use clap::Parser;
use std::sync::Arc;

use stellium::location::{LocationQuery, LocationResolver};
use stellium::rpc::RpcServer;
use stellium::{server, SubprocessEngine};

/// Stellium — astrology chart bridge.
///
/// Wraps an external astrology engine behind RPC transports. By default it
/// speaks JSON-RPC on stdin/stdout (one request per line); with --serve it
/// exposes the same operations as an HTTP API.
///
/// Examples:
///   stellium
///   stellium --engine "python3 -m kerykeion_shim"
///   stellium --serve --port 8094
///   stellium --resolve Beijing --country CN
///   stellium --resolve-coords 39.9042 116.4074 --tz Asia/Shanghai
#[derive(Parser)]
#[command(name = "stellium", version, about, long_about = None)]
struct Cli {
    /// Engine command: the program (plus fixed arguments) that wraps the
    /// astrology library. Spawned per request, JSON on stdin/stdout.
    #[arg(long, env = "STELLIUM_ENGINE", default_value = "stellium-engine")]
    engine: String,

    /// Run the HTTP server instead of the stdio transport.
    #[arg(long)]
    serve: bool,

    /// HTTP bind host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// HTTP bind port.
    #[arg(long, default_value_t = 8094)]
    port: u16,

    /// One-shot: resolve a city name and print the location as JSON.
    #[arg(long, value_name = "CITY")]
    resolve: Option<String>,

    /// Country hint for --resolve (ISO 3166-1 alpha-2, e.g. CN, US).
    #[arg(long)]
    country: Option<String>,

    /// One-shot: validate raw coordinates (with --tz) and print them.
    #[arg(long, num_args = 2, value_names = ["LAT", "LON"], allow_hyphen_values = true)]
    resolve_coords: Option<Vec<f64>>,

    /// IANA timezone for --resolve-coords (e.g. Asia/Shanghai).
    #[arg(long)]
    tz: Option<String>,

    /// Offline mode: embedded city table only, no network geocoding.
    #[arg(long)]
    offline: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut resolver = LocationResolver::new();
    if cli.offline {
        resolver.set_offline(true);
    }

    // ── One-shot resolver modes ─────────────────────────────────

    if let Some(coords) = &cli.resolve_coords {
        let query = LocationQuery::Coordinates {
            latitude: coords[0],
            longitude: coords[1],
            timezone: cli.tz.clone(),
        };
        print_resolution(&mut resolver, &query);
        return;
    }

    if let Some(city) = &cli.resolve {
        let query = LocationQuery::City {
            name: city.clone(),
            country_code: cli.country.clone(),
        };
        print_resolution(&mut resolver, &query);
        return;
    }

    // ── Serving modes ───────────────────────────────────────────

    let engine = SubprocessEngine::from_command(&cli.engine).unwrap_or_else(|| {
        eprintln!("Error: --engine must name a command");
        std::process::exit(1);
    });

    if cli.serve {
        let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("Error: cannot start runtime: {}", e);
            std::process::exit(1);
        });
        runtime.block_on(server::start(&cli.host, cli.port, resolver, Arc::new(engine)));
        return;
    }

    eprintln!("  Stellium {} — JSON-RPC on stdio", env!("CARGO_PKG_VERSION"));
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut rpc = RpcServer::new(resolver, Box::new(engine));
    if let Err(e) = rpc.serve(stdin.lock(), stdout.lock()) {
        eprintln!("Transport error: {}", e);
        std::process::exit(1);
    }
}

fn print_resolution(resolver: &mut LocationResolver, query: &LocationQuery) {
    match resolver.resolve(query) {
        Ok(location) => {
            println!("{}", serde_json::to_string_pretty(&location).unwrap());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
