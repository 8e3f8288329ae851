//! API constants

/// Prefix for every API route
pub const API_PREFIX: &str = "/api";

/// Header carrying the shared admin secret on mutating requests
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

pub const APP_NAME: &str = "slawatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
