//! Domain model for events, contacts and notification links.
//!
//! # Responsibility
//! - Define the records exchanged with the external directories and the
//!   link store.
//! - Validate drafts before they reach any persistence adapter.
//!
//! # Invariants
//! - Every record is identified by an opaque, store-assigned UUID.
//! - At most one `NotificationLink` exists per `(event_id, contact_id)`.

pub mod contact;
pub mod event;
pub mod link;
pub mod validation;
