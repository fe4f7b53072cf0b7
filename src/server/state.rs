use crate::engine::AstrologyEngine;
use crate::location::LocationResolver;
use std::sync::{Arc, Mutex};

pub struct AppState {
    pub resolver: Mutex<LocationResolver>,
    pub engine: Arc<dyn AstrologyEngine>,
}
