//! Stellium — RPC bridge around an external astrology engine.
//!
//! The engine does the astronomy (ephemeris, houses, aspects, composites);
//! this crate does the glue: normalize birth locations, drive the engine
//! through a narrow capability trait, and serve the results over stdio
//! JSON-RPC or HTTP.

pub mod engine;
pub mod location;
pub mod rpc;
pub mod server;
pub mod tools;

pub use engine::{AstrologyEngine, BirthInput, ChartRequest, EngineError, SubprocessEngine};
pub use location::{LocationError, LocationQuery, LocationResolver, ResolvedLocation};
pub use rpc::RpcServer;
