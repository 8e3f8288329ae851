//! Slawatch Core Library
//!
//! This crate provides the domain models, error types, configuration and the pure
//! SLA evaluation and metrics logic shared across all Slawatch components.

pub mod address;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod sla;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, StoreBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use sla::DEFAULT_SLA_THRESHOLD_HOURS;
