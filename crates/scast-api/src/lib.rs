//! Axum HTTP API server.
//!
//! This crate provides:
//! - Session bootstrap + SSE streaming delivery for image generation runs
//! - JWT bearer verification (query-token variant for the SSE leg)
//! - Per-project generation locks
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use session::{InMemorySessionStore, ProjectLocks, SessionStore, SessionSweeper};
pub use state::AppState;
