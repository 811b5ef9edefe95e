//! HTTP API service for retouch.
//!
//! This crate wires the credit ledger, the edit-job orchestrator, the
//! payment-order service, and the webhook reconciler into one axum
//! application.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod provider;
pub mod routes;
pub mod sign;
pub mod state;
pub mod storage;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
