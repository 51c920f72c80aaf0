//! Axum HTTP API server.
//!
//! This crate provides:
//! - JSON commands for the project production pipeline
//! - Server-sent events for user profile changes
//! - Request id, logging, CORS and security header middleware
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, InFlight, InFlightGuard};
