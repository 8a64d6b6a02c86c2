//! Event detail view state machine.
//!
//! # Responsibility
//! - Own the selection state of one open event view.
//! - Sequence load, save and send through explicit phases.
//! - Drop results of operations that finish after the view was closed.
//!
//! # Invariants
//! - Selection edits are only accepted in `Ready`.
//! - The state lock is never held across an `.await`; concurrent UI calls
//!   observe the busy phase instead of racing a diff.
//! - The baseline is only replaced from link reads.
//!
//! ```text
//! Idle -> Loading -> Ready -> Saving -> Ready
//!                    Ready -> Confirming -> Sending -> Idle
//!                             Confirming -> Ready (cancel)
//!                                           Sending -> Ready (dispatch failed)
//! any -> Closed
//! ```

use crate::dispatch::DispatchReceipt;
use crate::model::contact::{Contact, ContactId};
use crate::model::event::Event;
use crate::model::link::NotificationLink;
use crate::repo::contact_repo::ContactDirectory;
use crate::repo::error::RepoError;
use crate::repo::link_repo::{LinkStore, LinkStoreError};
use crate::selection::reconciler::{ReconcileError, Reconciler, SaveReport};
use crate::selection::send_gate::{ConfirmationSet, SendError, SendGate};
use crate::selection::state::SelectionState;
use log::debug;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lifecycle phase of an event view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    Loading,
    Ready,
    Saving,
    Confirming,
    Sending,
    Closed,
}

impl ViewPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Saving => "saving",
            Self::Confirming => "confirming",
            Self::Sending => "sending",
            Self::Closed => "closed",
        }
    }
}

/// View-level operation failure.
#[derive(Debug)]
pub enum ViewError {
    /// Operation not allowed in the current phase.
    Busy(ViewPhase),
    /// View was closed; the operation's result was discarded.
    Closed,
    /// Contact is not in the visible list.
    UnknownContact(ContactId),
    /// Send requested without any saved selection.
    NothingSaved,
    /// Contact directory failed while loading.
    Contacts(RepoError),
    /// Link read failed while loading.
    Links(LinkStoreError),
    Save(ReconcileError),
    Send(SendError),
}

impl Display for ViewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy(phase) => write!(f, "view is busy ({})", phase.as_str()),
            Self::Closed => write!(f, "view was closed"),
            Self::UnknownContact(id) => write!(f, "contact is not listed: {id}"),
            Self::NothingSaved => write!(f, "no saved selection to send"),
            Self::Contacts(err) => write!(f, "failed to load contacts: {err}"),
            Self::Links(err) => write!(f, "failed to load notifications: {err}"),
            Self::Save(err) => write!(f, "{err}"),
            Self::Send(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ViewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Contacts(err) => Some(err),
            Self::Links(err) => Some(err),
            Self::Save(err) => Some(err),
            Self::Send(err) => Some(err),
            _ => None,
        }
    }
}

struct ViewState {
    phase: ViewPhase,
    search: Option<String>,
    visible: Vec<Contact>,
    selection: SelectionState,
    confirmation: Option<ConfirmationSet>,
}

impl ViewState {
    fn visible_ids(&self) -> Vec<ContactId> {
        self.visible.iter().map(|contact| contact.id).collect()
    }

    fn require(&self, allowed: &[ViewPhase]) -> Result<(), ViewError> {
        match self.phase {
            ViewPhase::Closed => Err(ViewError::Closed),
            phase if allowed.contains(&phase) => Ok(()),
            phase => Err(ViewError::Busy(phase)),
        }
    }
}

/// Collaborators used by an `EventView`.
#[derive(Clone)]
pub struct ViewServices {
    pub contacts: Arc<dyn ContactDirectory>,
    pub links: Arc<dyn LinkStore>,
    pub reconciler: Reconciler,
    pub send_gate: SendGate,
}

/// One open event detail view and its selection.
pub struct EventView {
    event: Event,
    services: ViewServices,
    state: Mutex<ViewState>,
}

impl EventView {
    /// Creates a view in `Idle`; call `refresh` to load contacts and links.
    pub fn new(event: Event, services: ViewServices) -> Self {
        let selection = SelectionState::new(event.id);
        Self {
            event,
            services,
            state: Mutex::new(ViewState {
                phase: ViewPhase::Idle,
                search: None,
                visible: Vec::new(),
                selection,
                confirmation: None,
            }),
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn phase(&self) -> ViewPhase {
        self.state().phase
    }

    pub fn search(&self) -> Option<String> {
        self.state().search.clone()
    }

    pub fn visible_contacts(&self) -> Vec<Contact> {
        self.state().visible.clone()
    }

    pub fn working_selection(&self) -> BTreeSet<ContactId> {
        self.state().selection.working().clone()
    }

    pub fn baseline(&self) -> BTreeSet<ContactId> {
        self.state().selection.baseline().clone()
    }

    pub fn is_selected(&self, contact_id: ContactId) -> bool {
        self.state().selection.is_selected(contact_id)
    }

    /// Whether every visible contact is selected.
    pub fn is_all_selected(&self) -> bool {
        let state = self.state();
        state.selection.is_all_selected(&state.visible_ids())
    }

    /// Gates the send action.
    pub fn has_saved_selection(&self) -> bool {
        self.state().selection.has_saved_selection()
    }

    pub fn is_dirty(&self) -> bool {
        self.state().selection.is_dirty()
    }

    /// Pending confirmation, present only in `Confirming`.
    pub fn confirmation(&self) -> Option<ConfirmationSet> {
        self.state().confirmation.clone()
    }

    /// Re-fetches contacts and links and reloads the selection.
    ///
    /// Unsaved edits are discarded.
    pub async fn refresh(&self) -> Result<(), ViewError> {
        let (previous, search) = {
            let mut state = self.state();
            state.require(&[ViewPhase::Idle, ViewPhase::Ready])?;
            let previous = state.phase;
            self.transition(&mut state, ViewPhase::Loading);
            (previous, state.search.clone())
        };

        let loaded = self.fetch_contacts_and_links(search.as_deref()).await;

        let mut state = self.state();
        if state.phase == ViewPhase::Closed {
            return Err(ViewError::Closed);
        }
        match loaded {
            Ok((contacts, links)) => {
                let visible_ids: Vec<ContactId> = contacts.iter().map(|c| c.id).collect();
                state.selection.load(&links, &visible_ids);
                state.visible = contacts;
                self.transition(&mut state, ViewPhase::Ready);
                Ok(())
            }
            Err(err) => {
                self.transition(&mut state, previous);
                Err(err)
            }
        }
    }

    /// Changes the contact search filter and reloads.
    pub async fn set_search(&self, search: Option<String>) -> Result<(), ViewError> {
        {
            let mut state = self.state();
            state.require(&[ViewPhase::Idle, ViewPhase::Ready])?;
            state.search = search.filter(|value| !value.trim().is_empty());
        }
        self.refresh().await
    }

    /// Flips one visible contact and returns whether it is now selected.
    pub fn toggle(&self, contact_id: ContactId) -> Result<bool, ViewError> {
        let mut state = self.state();
        state.require(&[ViewPhase::Ready])?;
        if !state.visible.iter().any(|contact| contact.id == contact_id) {
            return Err(ViewError::UnknownContact(contact_id));
        }
        Ok(state.selection.toggle(contact_id))
    }

    /// Selects or clears every visible contact.
    pub fn toggle_all(&self) -> Result<(), ViewError> {
        let mut state = self.state();
        state.require(&[ViewPhase::Ready])?;
        let visible_ids = state.visible_ids();
        state.selection.toggle_all(&visible_ids);
        Ok(())
    }

    /// Saves the working selection and refreshes the baseline.
    ///
    /// On partial failure the baseline still moves to the best-known remote
    /// state before the error is returned.
    pub async fn save(&self) -> Result<SaveReport, ViewError> {
        let working = {
            let mut state = self.state();
            state.require(&[ViewPhase::Ready])?;
            self.transition(&mut state, ViewPhase::Saving);
            state.selection.working().clone()
        };

        let result = self.services.reconciler.save(self.event.id, &working).await;

        let mut state = self.state();
        if state.phase == ViewPhase::Closed {
            return Err(ViewError::Closed);
        }
        match &result {
            Ok(report) => state.selection.refresh_baseline(&report.links),
            Err(err) => {
                if let Some(links) = err.known_links() {
                    state.selection.refresh_baseline(links);
                }
            }
        }
        self.transition(&mut state, ViewPhase::Ready);
        result.map_err(ViewError::Save)
    }

    /// Re-reads saved recipients and enters `Confirming`.
    pub async fn prepare_send(&self) -> Result<ConfirmationSet, ViewError> {
        {
            let mut state = self.state();
            state.require(&[ViewPhase::Ready])?;
            if !state.selection.has_saved_selection() {
                return Err(ViewError::NothingSaved);
            }
            self.transition(&mut state, ViewPhase::Confirming);
        }

        let prepared = self.services.send_gate.prepare_send(self.event.id).await;

        let mut state = self.state();
        if state.phase == ViewPhase::Closed {
            return Err(ViewError::Closed);
        }
        match prepared {
            Ok(confirmation) if !confirmation.is_empty() => {
                state.confirmation = Some(confirmation.clone());
                Ok(confirmation)
            }
            Ok(confirmation) => {
                self.transition(&mut state, ViewPhase::Ready);
                Err(ViewError::Send(SendError::NothingToSend(
                    confirmation.event_id(),
                )))
            }
            Err(err) => {
                self.transition(&mut state, ViewPhase::Ready);
                Err(ViewError::Send(err))
            }
        }
    }

    /// Leaves `Confirming` without sending.
    pub fn cancel_send(&self) -> Result<(), ViewError> {
        let mut state = self.state();
        state.require(&[ViewPhase::Confirming])?;
        state.confirmation = None;
        self.transition(&mut state, ViewPhase::Ready);
        Ok(())
    }

    /// Dispatches the pending confirmation.
    ///
    /// Success ends the view session (`Idle`); failure returns to `Ready`.
    pub async fn confirm_send(&self) -> Result<DispatchReceipt, ViewError> {
        let confirmation = {
            let mut state = self.state();
            state.require(&[ViewPhase::Confirming])?;
            let confirmation = state.confirmation.take().ok_or(ViewError::NothingSaved)?;
            self.transition(&mut state, ViewPhase::Sending);
            confirmation
        };

        let sent = self.services.send_gate.confirm_send(confirmation).await;

        let mut state = self.state();
        if state.phase == ViewPhase::Closed {
            return Err(ViewError::Closed);
        }
        match sent {
            Ok(receipt) => {
                state.selection = SelectionState::new(self.event.id);
                state.visible.clear();
                self.transition(&mut state, ViewPhase::Idle);
                Ok(receipt)
            }
            Err(err) => {
                self.transition(&mut state, ViewPhase::Ready);
                Err(ViewError::Send(err))
            }
        }
    }

    /// Discards the view. In-flight results are dropped when they arrive;
    /// remote writes already issued are not cancelled.
    pub fn close(&self) {
        let mut state = self.state();
        state.selection = SelectionState::new(self.event.id);
        state.visible.clear();
        state.confirmation = None;
        self.transition(&mut state, ViewPhase::Closed);
    }

    async fn fetch_contacts_and_links(
        &self,
        search: Option<&str>,
    ) -> Result<(Vec<Contact>, Vec<NotificationLink>), ViewError> {
        let contacts = self
            .services
            .contacts
            .list_contacts(search)
            .await
            .map_err(ViewError::Contacts)?;
        let links = self
            .services
            .links
            .list_links(self.event.id)
            .await
            .map_err(ViewError::Links)?;
        Ok((contacts, links))
    }

    fn transition(&self, state: &mut ViewState, next: ViewPhase) {
        debug!(
            "event=view_phase module=view event_id={} from={} to={}",
            self.event.id,
            state.phase.as_str(),
            next.as_str()
        );
        state.phase = next;
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
