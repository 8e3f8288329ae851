//! HTTP handlers. Each one validates its input, calls a service and maps the result.

pub mod admin;
pub mod alerts;
pub mod departments;
pub mod emails;
pub mod health;
pub mod metrics;
pub mod sync;
pub mod team_members;
