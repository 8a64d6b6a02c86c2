//! Notification use-case service.
//!
//! # Responsibility
//! - Wire the directories, link store and transport together once.
//! - Open per-event views with explicit, non-global state.
//! - Pass event and contact CRUD through to the directories.
//!
//! # Invariants
//! - Every opened view owns its own `SelectionState`.
//! - Service APIs never bypass directory validation.

use crate::config::CoreConfig;
use crate::db::SharedConnection;
use crate::dispatch::{DispatchTransport, SqliteOutbox};
use crate::model::contact::{Contact, ContactDraft, ContactId};
use crate::model::event::{Event, EventDraft, EventFilter, EventId};
use crate::repo::contact_repo::{ContactDirectory, SqliteContactDirectory};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::event_repo::{EventDirectory, SqliteEventDirectory};
use crate::repo::link_repo::{LinkStore, SqliteLinkStore};
use crate::selection::reconciler::{Reconciler, ReconcilerOptions};
use crate::selection::send_gate::SendGate;
use crate::selection::view::{EventView, ViewServices};
use log::info;
use std::sync::Arc;

/// Facade over the external collaborators.
#[derive(Clone)]
pub struct NotifyService {
    events: Arc<dyn EventDirectory>,
    view_services: ViewServices,
}

impl NotifyService {
    pub fn new(
        events: Arc<dyn EventDirectory>,
        contacts: Arc<dyn ContactDirectory>,
        links: Arc<dyn LinkStore>,
        transport: Arc<dyn DispatchTransport>,
        options: ReconcilerOptions,
    ) -> Self {
        let view_services = ViewServices {
            contacts,
            reconciler: Reconciler::with_options(Arc::clone(&links), options),
            send_gate: SendGate::new(Arc::clone(&links), transport),
            links,
        };
        Self {
            events,
            view_services,
        }
    }

    /// Builds a service whose collaborators all share one SQLite connection.
    ///
    /// # Errors
    /// - `RepoError::Validation` when the configured country code is invalid.
    pub fn with_sqlite(conn: SharedConnection, config: &CoreConfig) -> RepoResult<Self> {
        let contacts = SqliteContactDirectory::try_new(conn.clone(), config.country_code.clone())?;
        Ok(Self::new(
            Arc::new(SqliteEventDirectory::new(conn.clone())),
            Arc::new(contacts),
            Arc::new(SqliteLinkStore::new(conn.clone())),
            Arc::new(SqliteOutbox::new(conn)),
            config.reconciler_options(),
        ))
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.view_services.reconciler
    }

    pub fn send_gate(&self) -> &SendGate {
        &self.view_services.send_gate
    }

    /// Opens a detail view for `event_id` and loads its selection.
    ///
    /// # Errors
    /// - `NotFound` when the event does not exist.
    /// - Load failures are not fatal: the view is returned in `Idle` and the
    ///   caller may `refresh` again.
    pub async fn open_view(&self, event_id: EventId) -> RepoResult<EventView> {
        let event = self
            .events
            .get_event(event_id)
            .await?
            .ok_or(RepoError::NotFound(event_id))?;
        let view = EventView::new(event, self.view_services.clone());
        if let Err(err) = view.refresh().await {
            info!(
                "event=view_open module=service status=degraded event_id={} error={}",
                event_id, err
            );
        }
        Ok(view)
    }

    pub async fn list_events(&self, filter: &EventFilter) -> RepoResult<Vec<Event>> {
        self.events.list_events(filter).await
    }

    pub async fn create_event(&self, draft: &EventDraft) -> RepoResult<Event> {
        self.events.create_event(draft).await
    }

    pub async fn update_event(&self, id: EventId, draft: &EventDraft) -> RepoResult<Event> {
        self.events.update_event(id, draft).await
    }

    pub async fn delete_event(&self, id: EventId) -> RepoResult<()> {
        self.events.delete_event(id).await
    }

    pub async fn list_contacts(&self, search: Option<&str>) -> RepoResult<Vec<Contact>> {
        self.view_services.contacts.list_contacts(search).await
    }

    pub async fn create_contact(&self, draft: &ContactDraft) -> RepoResult<Contact> {
        self.view_services.contacts.create_contact(draft).await
    }

    pub async fn delete_contact(&self, id: ContactId) -> RepoResult<()> {
        self.view_services.contacts.delete_contact(id).await
    }
}
