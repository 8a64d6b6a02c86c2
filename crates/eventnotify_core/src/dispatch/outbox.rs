//! SQLite outbox transport.
//!
//! Queues one row per recipient under a fresh batch id; a downstream sender
//! drains the table. Queuing is atomic per batch; duplicate recipients are
//! queued once and counted once.

use super::{DispatchError, DispatchReceipt, DispatchTransport};
use crate::db::SharedConnection;
use crate::model::contact::ContactId;
use crate::model::event::EventId;
use async_trait::async_trait;
use log::info;
use rusqlite::params;
use uuid::Uuid;

/// Dispatch transport writing batches into `dispatch_outbox`.
#[derive(Clone)]
pub struct SqliteOutbox {
    conn: SharedConnection,
}

impl SqliteOutbox {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Returns the recipients queued for `batch_id`, sorted.
    pub fn batch_recipients(&self, batch_id: Uuid) -> Result<Vec<ContactId>, DispatchError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT contact_uuid FROM dispatch_outbox
             WHERE batch_uuid = ?1
             ORDER BY contact_uuid ASC;",
        )?;
        let mut rows = stmt.query([batch_id.to_string()])?;
        let mut recipients = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            let id = Uuid::parse_str(&value).map_err(|_| {
                DispatchError::Transport(format!(
                    "invalid uuid value `{value}` in dispatch_outbox.contact_uuid"
                ))
            })?;
            recipients.push(id);
        }
        Ok(recipients)
    }
}

#[async_trait]
impl DispatchTransport for SqliteOutbox {
    async fn send(
        &self,
        event_id: EventId,
        contact_ids: &[ContactId],
    ) -> Result<DispatchReceipt, DispatchError> {
        if contact_ids.is_empty() {
            return Err(DispatchError::Rejected("batch has no recipients".to_string()));
        }

        let batch_id = Uuid::new_v4();
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let mut recipients = 0;
        for contact_id in contact_ids {
            recipients += tx.execute(
                "INSERT OR IGNORE INTO dispatch_outbox (batch_uuid, event_uuid, contact_uuid)
                 VALUES (?1, ?2, ?3);",
                params![
                    batch_id.to_string(),
                    event_id.to_string(),
                    contact_id.to_string()
                ],
            )?;
        }
        tx.commit()?;

        info!(
            "event=dispatch_queue module=dispatch status=ok event_id={} batch_id={} recipients={}",
            event_id,
            batch_id,
            recipients
        );
        Ok(DispatchReceipt {
            batch_id,
            event_id,
            recipients,
        })
    }
}
