//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use course_file_core::WorkflowEngine;

use crate::config::Config;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: WorkflowEngine,
    pub config: Arc<Config>,
}
