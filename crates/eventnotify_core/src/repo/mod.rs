//! Store contracts consumed by the selection core, plus SQLite adapters.
//!
//! # Responsibility
//! - Define the event directory, contact directory and link store contracts.
//! - Keep SQL details behind those contracts.
//!
//! # Invariants
//! - Contracts return semantic errors (`NotFound`, `Conflict`) in addition to
//!   transport/database failures.
//! - Adapters never hold the connection lock across an `.await`.

pub mod contact_repo;
pub mod error;
pub mod event_repo;
pub mod link_repo;

pub(crate) mod sql;
