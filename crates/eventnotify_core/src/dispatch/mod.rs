//! Outbound dispatch contract.
//!
//! # Responsibility
//! - Define the transport that delivers a notification batch for one event.
//! - Provide a local outbox adapter that queues batches for a sender.
//!
//! # Invariants
//! - Dispatch never mutates notification links; links mean "should notify"
//!   independent of delivery success.

mod outbox;

pub use outbox::SqliteOutbox;

use crate::db::DbError;
use crate::model::contact::ContactId;
use crate::model::event::EventId;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Acknowledgement returned by a transport that accepted a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub batch_id: Uuid,
    pub event_id: EventId,
    pub recipients: usize,
}

/// Dispatch transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Transport could not be reached or failed mid-request.
    Transport(String),
    /// Transport refused the batch.
    Rejected(String),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "dispatch transport unavailable: {message}"),
            Self::Rejected(message) => write!(f, "dispatch rejected: {message}"),
        }
    }
}

impl Error for DispatchError {}

impl From<DbError> for DispatchError {
    fn from(value: DbError) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<rusqlite::Error> for DispatchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// Transport that delivers notifications for one event.
#[async_trait]
pub trait DispatchTransport: Send + Sync {
    async fn send(
        &self,
        event_id: EventId,
        contact_ids: &[ContactId],
    ) -> Result<DispatchReceipt, DispatchError>;
}
