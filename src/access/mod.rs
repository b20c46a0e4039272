//! Authorization core.
//!
//! `registry` answers membership questions over a per-request snapshot,
//! `predicates` composes those answers into named rules, and `filters`
//! turns the same rules into SQL conditions for list endpoints.

pub mod filters;
pub mod predicates;
pub mod registry;

use uuid::Uuid;

pub use predicates::Rule;
pub use registry::ProjectAccess;

/// The authenticated user as seen by permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_staff: bool,
}
