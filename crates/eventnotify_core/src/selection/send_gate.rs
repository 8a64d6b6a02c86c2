//! Send gate: dispatch only what is durably saved.
//!
//! # Responsibility
//! - Re-read saved links right before confirmation.
//! - Hand exactly the confirmed, re-verified set to the dispatch transport.
//!
//! # Invariants
//! - A `ConfirmationSet` can only be built from a fresh link read, so an
//!   unsaved working selection can never reach dispatch.
//! - Dispatch failures never touch link records.

use crate::dispatch::{DispatchError, DispatchReceipt, DispatchTransport};
use crate::model::contact::ContactId;
use crate::model::event::EventId;
use crate::model::link::linked_contacts;
use crate::repo::link_repo::{LinkStore, LinkStoreError};
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Saved recipients for one event, verified by a fresh link read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationSet {
    event_id: EventId,
    contact_ids: BTreeSet<ContactId>,
}

impl ConfirmationSet {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn contact_ids(&self) -> &BTreeSet<ContactId> {
        &self.contact_ids
    }

    pub fn contains(&self, contact_id: ContactId) -> bool {
        self.contact_ids.contains(&contact_id)
    }

    pub fn len(&self) -> usize {
        self.contact_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contact_ids.is_empty()
    }
}

/// Send failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Saved links could not be re-read.
    Fetch(LinkStoreError),
    /// No saved recipients for the event.
    NothingToSend(EventId),
    /// Transport failed; link records are unchanged.
    Dispatch(DispatchError),
}

impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "could not fetch saved contacts: {err}"),
            Self::NothingToSend(event_id) => {
                write!(f, "no saved contacts to notify for event {event_id}")
            }
            Self::Dispatch(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::Dispatch(err) => Some(err),
            Self::NothingToSend(_) => None,
        }
    }
}

/// Confirm-then-dispatch gate over the link store and transport.
#[derive(Clone)]
pub struct SendGate {
    links: Arc<dyn LinkStore>,
    transport: Arc<dyn DispatchTransport>,
}

impl SendGate {
    pub fn new(links: Arc<dyn LinkStore>, transport: Arc<dyn DispatchTransport>) -> Self {
        Self { links, transport }
    }

    /// Reads the saved recipients of `event_id` for confirmation.
    ///
    /// In-memory selections are deliberately not consulted.
    pub async fn prepare_send(&self, event_id: EventId) -> Result<ConfirmationSet, SendError> {
        let links = self.links.list_links(event_id).await.map_err(|err| {
            warn!(
                "event=send_prepare module=send_gate status=error event_id={} error={}",
                event_id, err
            );
            SendError::Fetch(err)
        })?;

        let confirmation = ConfirmationSet {
            event_id,
            contact_ids: linked_contacts(event_id, &links),
        };
        info!(
            "event=send_prepare module=send_gate status=ok event_id={} recipients={}",
            event_id,
            confirmation.len()
        );
        Ok(confirmation)
    }

    /// Dispatches a confirmed set.
    ///
    /// # Errors
    /// - `NothingToSend` for an empty confirmation.
    /// - `Dispatch` when the transport fails.
    pub async fn confirm_send(
        &self,
        confirmation: ConfirmationSet,
    ) -> Result<DispatchReceipt, SendError> {
        if confirmation.is_empty() {
            return Err(SendError::NothingToSend(confirmation.event_id));
        }

        let recipients: Vec<ContactId> = confirmation.contact_ids.into_iter().collect();
        match self
            .transport
            .send(confirmation.event_id, &recipients)
            .await
        {
            Ok(receipt) => {
                info!(
                    "event=send_confirm module=send_gate status=ok event_id={} recipients={} batch_id={}",
                    confirmation.event_id,
                    recipients.len(),
                    receipt.batch_id
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    "event=send_confirm module=send_gate status=error event_id={} recipients={} error={}",
                    confirmation.event_id,
                    recipients.len(),
                    err
                );
                Err(SendError::Dispatch(err))
            }
        }
    }
}
