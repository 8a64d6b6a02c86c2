//! Event domain model.
//!
//! # Responsibility
//! - Define the scheduled event record owned by the event directory.
//! - Validate event drafts before create/update.
//!
//! # Invariants
//! - `id` is stable and only used as a lookup key by the selection core.
//! - `name` is never empty once persisted.

use crate::model::validation::{require_text, ValidationError};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque event identifier assigned by the event directory.
pub type EventId = Uuid;

/// Scheduled event as returned by the event directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Display name shown in the event list and detail header.
    pub name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// Input for creating or replacing an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl EventDraft {
    pub fn new(name: impl Into<String>, date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            name: name.into(),
            date,
            time,
        }
    }

    /// Returns a trimmed copy of this draft.
    ///
    /// # Errors
    /// - `ValidationError::EmptyField("name")` when the name is blank.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: require_text("name", &self.name)?,
            date: self.date,
            time: self.time,
        })
    }
}

/// Event list filter.
///
/// `search` matches a case-insensitive substring of the event name; blank
/// input behaves like no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub search: Option<String>,
}

impl EventFilter {
    pub fn search(value: impl Into<String>) -> Self {
        Self {
            search: Some(value.into()),
        }
    }

    /// Returns the effective search term, `None` when blank.
    pub fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{EventDraft, EventFilter};
    use crate::model::validation::ValidationError;
    use chrono::{NaiveDate, NaiveTime};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).expect("valid date")
    }

    fn time() -> NaiveTime {
        NaiveTime::from_hms_opt(18, 30, 0).expect("valid time")
    }

    #[test]
    fn normalized_trims_name() {
        let draft = EventDraft::new("  Board meeting ", date(), time());
        let normalized = draft.normalized().unwrap();
        assert_eq!(normalized.name, "Board meeting");
        assert_eq!(normalized.date, date());
    }

    #[test]
    fn normalized_rejects_blank_name() {
        let err = EventDraft::new("   ", date(), time())
            .normalized()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyField("name"));
    }

    #[test]
    fn blank_filter_has_no_term() {
        assert_eq!(EventFilter::default().term(), None);
        assert_eq!(EventFilter::search("  ").term(), None);
        assert_eq!(EventFilter::search(" sync ").term(), Some("sync"));
    }
}
