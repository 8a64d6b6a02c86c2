//! Event directory contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/delete/list over scheduled events.
//!
//! # Invariants
//! - Write paths normalize `EventDraft` before SQL mutations.
//! - Deleting an event removes its notification links (FK cascade).

use crate::db::SharedConnection;
use crate::model::event::{Event, EventDraft, EventFilter, EventId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{like_pattern, parse_uuid};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const EVENT_SELECT_SQL: &str = "SELECT uuid, name, event_date, event_time FROM events";

/// Event CRUD contract. The selection core only reads events as lookup keys.
#[async_trait]
pub trait EventDirectory: Send + Sync {
    async fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<Event>>;
    async fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    async fn create_event(&self, draft: &EventDraft) -> RepoResult<Event>;
    async fn update_event(&self, id: EventId, draft: &EventDraft) -> RepoResult<Event>;
    async fn delete_event(&self, id: EventId) -> RepoResult<()>;
}

/// SQLite-backed event directory.
#[derive(Clone)]
pub struct SqliteEventDirectory {
    conn: SharedConnection,
}

impl SqliteEventDirectory {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EventDirectory for SqliteEventDirectory {
    async fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<Event>> {
        let mut sql = format!("{EVENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(term) = filter.term() {
            sql.push_str(" AND lower(name) LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(like_pattern(term)));
        }
        sql.push_str(" ORDER BY event_date ASC, event_time ASC, uuid ASC");

        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    async fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!("{EVENT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_event_row(row)?)),
            None => Ok(None),
        }
    }

    async fn create_event(&self, draft: &EventDraft) -> RepoResult<Event> {
        let draft = draft.normalized()?;
        let event = Event {
            id: Uuid::new_v4(),
            name: draft.name,
            date: draft.date,
            time: draft.time,
        };

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO events (uuid, name, event_date, event_time)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                event.id.to_string(),
                event.name.as_str(),
                event.date.format(DATE_FORMAT).to_string(),
                event.time.format(TIME_FORMAT).to_string(),
            ],
        )?;
        Ok(event)
    }

    async fn update_event(&self, id: EventId, draft: &EventDraft) -> RepoResult<Event> {
        let draft = draft.normalized()?;

        let conn = self.conn.lock()?;
        let changed = conn.execute(
            "UPDATE events
             SET
                name = ?1,
                event_date = ?2,
                event_time = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?4;",
            params![
                draft.name.as_str(),
                draft.date.format(DATE_FORMAT).to_string(),
                draft.time.format(TIME_FORMAT).to_string(),
                id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(Event {
            id,
            name: draft.name,
            date: draft.date,
            time: draft.time,
        })
    }

    async fn delete_event(&self, id: EventId) -> RepoResult<()> {
        let conn = self.conn.lock()?;
        let changed = conn.execute("DELETE FROM events WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "events.uuid").map_err(RepoError::InvalidData)?;

    let date_text: String = row.get("event_date")?;
    let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid date `{date_text}` in events.event_date"))
    })?;

    let time_text: String = row.get("event_time")?;
    let time = NaiveTime::parse_from_str(&time_text, TIME_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid time `{time_text}` in events.event_time"))
    })?;

    Ok(Event {
        id,
        name: row.get("name")?,
        date,
        time,
    })
}
