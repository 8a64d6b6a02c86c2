//! Contact directory contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/delete/search over contacts.
//!
//! # Invariants
//! - Phones are normalized with the configured country prefix before insert.
//! - Deleting a contact removes its notification links (FK cascade).

use crate::db::SharedConnection;
use crate::model::contact::{validate_country_code, Contact, ContactDraft, ContactId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::sql::{like_pattern, parse_uuid};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use uuid::Uuid;

/// Contact directory contract.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Lists contacts whose name or phone contains `search` (case-insensitive).
    ///
    /// `None` or blank search returns the whole directory.
    async fn list_contacts(&self, search: Option<&str>) -> RepoResult<Vec<Contact>>;
    async fn create_contact(&self, draft: &ContactDraft) -> RepoResult<Contact>;
    async fn delete_contact(&self, id: ContactId) -> RepoResult<()>;
}

/// SQLite-backed contact directory.
#[derive(Clone)]
pub struct SqliteContactDirectory {
    conn: SharedConnection,
    country_code: String,
}

impl SqliteContactDirectory {
    /// Creates a directory that prefixes bare numbers with `country_code`.
    ///
    /// # Errors
    /// - `RepoError::Validation` when `country_code` is malformed.
    pub fn try_new(conn: SharedConnection, country_code: impl Into<String>) -> RepoResult<Self> {
        let country_code = country_code.into();
        validate_country_code(&country_code)?;
        Ok(Self { conn, country_code })
    }
}

#[async_trait]
impl ContactDirectory for SqliteContactDirectory {
    async fn list_contacts(&self, search: Option<&str>) -> RepoResult<Vec<Contact>> {
        let mut sql = "SELECT uuid, name, phone FROM contacts WHERE 1 = 1".to_string();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(term) = search.map(str::trim).filter(|term| !term.is_empty()) {
            sql.push_str(" AND (lower(name) LIKE ?1 ESCAPE '\\' OR phone LIKE ?1 ESCAPE '\\')");
            bind_values.push(Value::Text(like_pattern(term)));
        }
        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC");

        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            contacts.push(Contact {
                id: parse_uuid(&uuid_text, "contacts.uuid").map_err(RepoError::InvalidData)?,
                name: row.get("name")?,
                phone: row.get("phone")?,
            });
        }
        Ok(contacts)
    }

    async fn create_contact(&self, draft: &ContactDraft) -> RepoResult<Contact> {
        let draft = draft.normalized(&self.country_code)?;
        let contact = Contact {
            id: Uuid::new_v4(),
            name: draft.name,
            phone: draft.phone,
        };

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO contacts (uuid, name, phone) VALUES (?1, ?2, ?3);",
            params![
                contact.id.to_string(),
                contact.name.as_str(),
                contact.phone.as_str()
            ],
        )?;
        Ok(contact)
    }

    async fn delete_contact(&self, id: ContactId) -> RepoResult<()> {
        let conn = self.conn.lock()?;
        let changed = conn.execute("DELETE FROM contacts WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}
