//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use sat_prep_core::ports::DatabaseService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
///
/// All mutable state lives in the store; this only carries handles to it.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
}
