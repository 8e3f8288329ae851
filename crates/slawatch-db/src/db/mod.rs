//! Postgres repositories
//!
//! One repository per table. Each returns domain models from slawatch-core and
//! maps driver errors into `AppError`.

pub mod alert;
pub mod department;
pub mod email;
pub mod team_member;
pub mod transaction;

pub use alert::AlertRepository;
pub use department::DepartmentRepository;
pub use email::EmailRepository;
pub use team_member::TeamMemberRepository;
