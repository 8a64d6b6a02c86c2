//! Notification link model.
//!
//! A link asserts "contact C will be notified for event E". The link id is a
//! back-reference into the link store and is only meaningful for deletes
//! issued against the same fresh read that produced it.

use crate::model::contact::ContactId;
use crate::model::event::EventId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Opaque link identifier assigned by the link store.
pub type LinkId = Uuid;

/// Persisted `(event, contact)` notification link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLink {
    pub id: LinkId,
    pub event_id: EventId,
    pub contact_id: ContactId,
}

/// Link creation request; the store assigns the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NewLink {
    pub event_id: EventId,
    pub contact_id: ContactId,
}

impl NewLink {
    pub fn new(event_id: EventId, contact_id: ContactId) -> Self {
        Self {
            event_id,
            contact_id,
        }
    }
}

/// Collects the contact ids linked to `event_id`.
///
/// Links belonging to other events are skipped, so a store that returns an
/// over-broad result cannot leak foreign selections into this event.
pub fn linked_contacts(event_id: EventId, links: &[NotificationLink]) -> BTreeSet<ContactId> {
    links
        .iter()
        .filter(|link| link.event_id == event_id)
        .map(|link| link.contact_id)
        .collect()
}
