//! Per-event selection state.
//!
//! # Responsibility
//! - Hold the working selection of contacts for one event.
//! - Track the saved baseline as observed by the last confirmed link read.
//!
//! # Invariants
//! - `baseline` is only ever derived from a link read, never from a local diff.
//! - Both sets are scoped to the contact universe of the last `load`.
//! - Pure: no I/O happens here.

use crate::model::contact::ContactId;
use crate::model::event::EventId;
use crate::model::link::{linked_contacts, NotificationLink};
use std::collections::BTreeSet;

/// Working selection plus saved baseline for one event view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    event_id: EventId,
    universe: BTreeSet<ContactId>,
    working: BTreeSet<ContactId>,
    baseline: BTreeSet<ContactId>,
}

impl SelectionState {
    /// Creates an empty state; nothing is selected until `load`.
    pub fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            universe: BTreeSet::new(),
            working: BTreeSet::new(),
            baseline: BTreeSet::new(),
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Replaces working selection and baseline from a fresh link read.
    ///
    /// `links` is the result of `list_links` for this event; entries for other
    /// events are ignored. `visible` is the contact universe currently listed
    /// to the user; linked contacts outside it are dropped so stale ids
    /// do not linger after a search or directory change.
    pub fn load(&mut self, links: &[NotificationLink], visible: &[ContactId]) {
        self.universe = visible.iter().copied().collect();
        let linked = self.scoped(linked_contacts(self.event_id, links));
        self.working = linked.clone();
        self.baseline = linked;
    }

    /// Replaces only the baseline from a fresh link read.
    ///
    /// The working selection is kept so that unsynced edits stay visible.
    pub fn refresh_baseline(&mut self, links: &[NotificationLink]) {
        self.baseline = self.scoped(linked_contacts(self.event_id, links));
    }

    /// Flips membership of `contact_id` and returns whether it is now selected.
    pub fn toggle(&mut self, contact_id: ContactId) -> bool {
        if self.working.remove(&contact_id) {
            false
        } else {
            self.working.insert(contact_id);
            true
        }
    }

    /// Selects every visible contact, or clears them all when all are selected.
    ///
    /// Contacts outside `visible` are never touched.
    pub fn toggle_all(&mut self, visible: &[ContactId]) {
        if self.is_all_selected(visible) {
            for contact_id in visible {
                self.working.remove(contact_id);
            }
        } else {
            self.working.extend(visible.iter().copied());
        }
    }

    pub fn is_selected(&self, contact_id: ContactId) -> bool {
        self.working.contains(&contact_id)
    }

    /// Returns whether every visible contact is selected.
    ///
    /// An empty visible set is never "all selected".
    pub fn is_all_selected(&self, visible: &[ContactId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.working.contains(id))
    }

    /// Returns whether at least one selection is durably saved.
    pub fn has_saved_selection(&self) -> bool {
        !self.baseline.is_empty()
    }

    /// Returns whether the working selection differs from the baseline.
    pub fn is_dirty(&self) -> bool {
        self.working != self.baseline
    }

    pub fn working(&self) -> &BTreeSet<ContactId> {
        &self.working
    }

    pub fn baseline(&self) -> &BTreeSet<ContactId> {
        &self.baseline
    }

    fn scoped(&self, contacts: BTreeSet<ContactId>) -> BTreeSet<ContactId> {
        contacts
            .into_iter()
            .filter(|id| self.universe.contains(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::SelectionState;
    use crate::model::link::NotificationLink;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn link(event_id: Uuid, contact_id: Uuid) -> NotificationLink {
        NotificationLink {
            id: Uuid::new_v4(),
            event_id,
            contact_id,
        }
    }

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn load_sets_working_and_baseline_from_links() {
        let event = Uuid::new_v4();
        let contacts = ids(3);
        let mut state = SelectionState::new(event);

        state.load(&[link(event, contacts[0]), link(event, contacts[2])], &contacts);

        let expected: BTreeSet<Uuid> = [contacts[0], contacts[2]].into_iter().collect();
        assert_eq!(state.working(), &expected);
        assert_eq!(state.baseline(), &expected);
        assert!(state.has_saved_selection());
        assert!(!state.is_dirty());
    }

    #[test]
    fn load_drops_links_outside_visible_universe_and_other_events() {
        let event = Uuid::new_v4();
        let contacts = ids(3);
        let mut state = SelectionState::new(event);

        state.load(
            &[
                link(event, contacts[0]),
                link(event, contacts[2]),
                link(Uuid::new_v4(), contacts[1]),
            ],
            &contacts[..2],
        );

        assert!(state.is_selected(contacts[0]));
        assert!(!state.is_selected(contacts[1]));
        assert!(!state.is_selected(contacts[2]));
        assert_eq!(state.baseline().len(), 1);
    }

    #[test]
    fn toggle_changes_working_but_not_baseline() {
        let event = Uuid::new_v4();
        let contacts = ids(2);
        let mut state = SelectionState::new(event);
        state.load(&[link(event, contacts[0])], &contacts);

        assert!(state.toggle(contacts[1]));
        assert!(!state.toggle(contacts[0]));

        assert!(state.is_selected(contacts[1]));
        assert!(!state.is_selected(contacts[0]));
        assert!(state.baseline().contains(&contacts[0]));
        assert!(state.is_dirty());
    }

    #[test]
    fn toggle_all_alternates_over_visible_set() {
        let event = Uuid::new_v4();
        let contacts = ids(3);
        let mut state = SelectionState::new(event);
        state.load(&[link(event, contacts[0]), link(event, contacts[1])], &contacts);

        let all: BTreeSet<Uuid> = contacts.iter().copied().collect();

        state.toggle_all(&contacts);
        assert_eq!(state.working(), &all);
        assert!(state.is_all_selected(&contacts));

        state.toggle_all(&contacts);
        assert!(state.working().is_empty());

        state.toggle_all(&contacts);
        assert_eq!(state.working(), &all);
    }

    #[test]
    fn toggle_all_leaves_hidden_selection_alone() {
        let event = Uuid::new_v4();
        let contacts = ids(3);
        let mut state = SelectionState::new(event);
        state.load(&[link(event, contacts[2])], &contacts);

        let visible = &contacts[..2];
        state.toggle_all(visible);
        state.toggle_all(visible);

        assert!(state.is_selected(contacts[2]));
        assert!(!state.is_selected(contacts[0]));
    }

    #[test]
    fn empty_visible_set_is_never_all_selected() {
        let state = SelectionState::new(Uuid::new_v4());
        assert!(!state.is_all_selected(&[]));
    }

    #[test]
    fn refresh_baseline_keeps_unsynced_edits() {
        let event = Uuid::new_v4();
        let contacts = ids(2);
        let mut state = SelectionState::new(event);
        state.load(&[], &contacts);
        state.toggle(contacts[0]);
        state.toggle(contacts[1]);

        state.refresh_baseline(&[link(event, contacts[0])]);

        assert_eq!(state.working().len(), 2);
        assert_eq!(state.baseline().len(), 1);
        assert!(state.is_dirty());
    }
}
