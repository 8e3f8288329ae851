//! Slawatch API Library
//!
//! This crate provides the HTTP handlers, the admin secret middleware and the
//! application setup for the SLA monitor.

mod api_doc;
pub mod constants;
mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use error::ErrorResponse;
pub use state::AppState;
