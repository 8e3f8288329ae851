//! Data models for the application
//!
//! Each sub-module represents one entity of the SLA monitor together with the
//! request DTOs and query inputs that operate on it.

mod alert;
mod department;
mod email;
mod metrics;
mod team_member;

// Re-export all models for convenient imports
pub use alert::*;
pub use department::*;
pub use email::*;
pub use metrics::*;
pub use team_member::*;
