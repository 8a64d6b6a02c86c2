//! Link store contract and SQLite implementation.
//!
//! # Responsibility
//! - Fetch, create and delete `(event, contact)` notification links.
//! - Classify store failures into the reconciler's error taxonomy.
//!
//! # Invariants
//! - At most one link exists per `(event_id, contact_id)`; duplicates surface
//!   as `LinkStoreError::Conflict`.
//! - Bulk create reports every failed entry individually.

use crate::db::{DbError, SharedConnection};
use crate::model::contact::ContactId;
use crate::model::event::EventId;
use crate::model::link::{LinkId, NewLink, NotificationLink};
use crate::repo::sql::parse_uuid;
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type LinkStoreResult<T> = Result<T, LinkStoreError>;

/// Link store failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStoreError {
    /// Store unreachable or failed while serving the request. Retryable.
    Transport(String),
    /// A link for this pair already exists.
    Conflict(NewLink),
    /// The link is already absent.
    NotFound(LinkId),
    /// The store refused the write, e.g. the event or contact no longer exists.
    Rejected(String),
}

impl LinkStoreError {
    /// Returns whether re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl Display for LinkStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "link store unavailable: {message}"),
            Self::Conflict(entry) => write!(
                f,
                "link already exists for event {} and contact {}",
                entry.event_id, entry.contact_id
            ),
            Self::NotFound(id) => write!(f, "link not found: {id}"),
            Self::Rejected(message) => write!(f, "link write rejected: {message}"),
        }
    }
}

impl Error for LinkStoreError {}

impl From<DbError> for LinkStoreError {
    fn from(value: DbError) -> Self {
        Self::Transport(value.to_string())
    }
}

impl From<rusqlite::Error> for LinkStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// One bulk entry that could not be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCreateFailure {
    pub entry: NewLink,
    pub error: LinkStoreError,
}

/// Result of a bulk create: what was created and what failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkCreateOutcome {
    pub created: Vec<NotificationLink>,
    pub failed: Vec<BulkCreateFailure>,
}

impl BulkCreateOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Remote link store contract consumed by the reconciler and send gate.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Lists every link recorded for `event_id`.
    async fn list_links(&self, event_id: EventId) -> LinkStoreResult<Vec<NotificationLink>>;

    /// Creates one link.
    async fn create_link(
        &self,
        event_id: EventId,
        contact_id: ContactId,
    ) -> LinkStoreResult<NotificationLink>;

    /// Creates many links in one request.
    ///
    /// `Err` means the whole request failed; per-entry failures are reported
    /// in `BulkCreateOutcome::failed`.
    async fn create_links_bulk(&self, entries: &[NewLink]) -> LinkStoreResult<BulkCreateOutcome>;

    /// Deletes one link by id.
    async fn delete_link(&self, link_id: LinkId) -> LinkStoreResult<()>;
}

/// SQLite-backed link store.
#[derive(Clone)]
pub struct SqliteLinkStore {
    conn: SharedConnection,
}

impl SqliteLinkStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn list_links(&self, event_id: EventId) -> LinkStoreResult<Vec<NotificationLink>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT uuid, event_uuid, contact_uuid
             FROM notification_links
             WHERE event_uuid = ?1
             ORDER BY created_at ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([event_id.to_string()])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("uuid")?;
            let event: String = row.get("event_uuid")?;
            let contact: String = row.get("contact_uuid")?;
            links.push(NotificationLink {
                id: parse_uuid(&id, "notification_links.uuid").map_err(LinkStoreError::Transport)?,
                event_id: parse_uuid(&event, "notification_links.event_uuid")
                    .map_err(LinkStoreError::Transport)?,
                contact_id: parse_uuid(&contact, "notification_links.contact_uuid")
                    .map_err(LinkStoreError::Transport)?,
            });
        }
        Ok(links)
    }

    async fn create_link(
        &self,
        event_id: EventId,
        contact_id: ContactId,
    ) -> LinkStoreResult<NotificationLink> {
        let conn = self.conn.lock()?;
        insert_link(&conn, NewLink::new(event_id, contact_id))
    }

    async fn create_links_bulk(&self, entries: &[NewLink]) -> LinkStoreResult<BulkCreateOutcome> {
        let conn = self.conn.lock()?;
        let mut outcome = BulkCreateOutcome::default();
        for entry in entries {
            match insert_link(&conn, *entry) {
                Ok(link) => outcome.created.push(link),
                Err(error) => outcome.failed.push(BulkCreateFailure {
                    entry: *entry,
                    error,
                }),
            }
        }
        Ok(outcome)
    }

    async fn delete_link(&self, link_id: LinkId) -> LinkStoreResult<()> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            "DELETE FROM notification_links WHERE uuid = ?1;",
            [link_id.to_string()],
        )?;
        if changed == 0 {
            return Err(LinkStoreError::NotFound(link_id));
        }
        Ok(())
    }
}

fn insert_link(conn: &Connection, entry: NewLink) -> LinkStoreResult<NotificationLink> {
    let link = NotificationLink {
        id: Uuid::new_v4(),
        event_id: entry.event_id,
        contact_id: entry.contact_id,
    };

    match conn.execute(
        "INSERT INTO notification_links (uuid, event_uuid, contact_uuid)
         VALUES (?1, ?2, ?3);",
        params![
            link.id.to_string(),
            link.event_id.to_string(),
            link.contact_id.to_string(),
        ],
    ) {
        Ok(_) => Ok(link),
        Err(err) => Err(classify_insert_error(entry, err)),
    }
}

fn classify_insert_error(entry: NewLink, err: rusqlite::Error) -> LinkStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => LinkStoreError::Conflict(entry),
                _ => LinkStoreError::Rejected(format!(
                    "event {} or contact {} does not exist",
                    entry.event_id, entry.contact_id
                )),
            };
        }
    }
    LinkStoreError::from(err)
}

#[cfg(test)]
mod tests {
    use super::LinkStoreError;
    use crate::model::link::NewLink;
    use uuid::Uuid;

    #[test]
    fn only_transport_errors_are_retryable() {
        let entry = NewLink::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(LinkStoreError::Transport("timeout".to_string()).is_retryable());
        assert!(!LinkStoreError::Conflict(entry).is_retryable());
        assert!(!LinkStoreError::NotFound(Uuid::new_v4()).is_retryable());
        assert!(!LinkStoreError::Rejected("gone".to_string()).is_retryable());
    }
}
