//! Event notification selection core.
//!
//! Keeps a user's choice of "which contacts get notified for event E" in sync
//! with a link store, and gates dispatch on durably saved selections.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod repo;
pub mod selection;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use dispatch::{DispatchError, DispatchReceipt, DispatchTransport, SqliteOutbox};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contact::{Contact, ContactDraft, ContactId};
pub use model::event::{Event, EventDraft, EventFilter, EventId};
pub use model::link::{LinkId, NewLink, NotificationLink};
pub use model::validation::ValidationError;
pub use repo::contact_repo::{ContactDirectory, SqliteContactDirectory};
pub use repo::error::{RepoError, RepoResult};
pub use repo::event_repo::{EventDirectory, SqliteEventDirectory};
pub use repo::link_repo::{
    BulkCreateFailure, BulkCreateOutcome, LinkStore, LinkStoreError, LinkStoreResult,
    SqliteLinkStore,
};
pub use selection::reconciler::{
    FailedOp, LinkOp, PartialFailure, ReconcileError, ReconcilePlan, Reconciler,
    ReconcilerOptions, SaveReport,
};
pub use selection::send_gate::{ConfirmationSet, SendError, SendGate};
pub use selection::state::SelectionState;
pub use selection::view::{EventView, ViewError, ViewPhase, ViewServices};
pub use service::notify_service::NotifyService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
