//! Shared-secret authentication for mutating routes

pub mod middleware;

pub use middleware::{admin_auth_middleware, AdminAuthState};
