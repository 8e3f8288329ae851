//! Slawatch Database Layer
//!
//! This crate provides the `SlaStore` abstraction used by every service, the
//! Postgres repositories behind it, and an in-memory implementation with the
//! same semantics for tests and local runs.

// Module declarations
pub mod db;
pub mod memory;
pub mod store;

// Re-exports: Postgres repositories
pub use db::{AlertRepository, DepartmentRepository, EmailRepository, TeamMemberRepository};

// Re-exports: Transaction utilities
pub use db::transaction::TransactionGuard;

// Re-exports: Store abstraction and implementations
pub use memory::MemoryStore;
pub use store::{PgStore, SlaStore};
