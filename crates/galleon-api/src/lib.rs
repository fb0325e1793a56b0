//! Galleon HTTP API
//!
//! Serves the routes contributed by enabled plugins, plus health checks.

mod handlers;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
