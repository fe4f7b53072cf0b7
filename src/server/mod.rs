//! HTTP surface: the same chart operations as the stdio transport, plus
//! resolver debugging endpoints.

mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::engine::AstrologyEngine;
use crate::location::LocationResolver;

pub fn build_router(resolver: LocationResolver, engine: Arc<dyn AstrologyEngine>) -> Router {
    let state = Arc::new(AppState {
        resolver: Mutex::new(resolver),
        engine,
    });

    Router::new()
        .route("/api/time", get(handlers::current_time))
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/cities", get(handlers::cities))
        .route("/api/chart", post(handlers::natal_chart))
        .route("/api/aspects/natal", post(handlers::natal_aspects))
        .route("/api/aspects/synastry", post(handlers::synastry_aspects))
        .route("/api/composite", post(handlers::composite_chart))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(
    host: &str,
    port: u16,
    resolver: LocationResolver,
    engine: Arc<dyn AstrologyEngine>,
) {
    let app = build_router(resolver, engine);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: Cannot bind to {}: {}", addr, e);
            std::process::exit(1);
        });

    eprintln!("  Stellium server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    });
}
