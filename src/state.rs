//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! provider clients are constructed once at process start and held as trait
//! objects so tests can substitute fakes.

use std::sync::Arc;

use crate::config::Config;
use crate::gcp::{Identity, RunAdmin};

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<dyn Identity>,
    pub run: Arc<dyn RunAdmin>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, identity: Arc<dyn Identity>, run: Arc<dyn RunAdmin>) -> Self {
        Self { config: Arc::new(config), identity, run }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
