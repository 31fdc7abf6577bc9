//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use fitness_core::ports::{Clock, ProgressRepository, SystemClock};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ProgressRepository>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(repo: Arc<dyn ProgressRepository>) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
