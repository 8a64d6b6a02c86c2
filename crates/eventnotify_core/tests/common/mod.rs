#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use eventnotify_core::{
    BulkCreateFailure, BulkCreateOutcome, Contact, ContactDirectory, ContactDraft, ContactId,
    DispatchError, DispatchReceipt, DispatchTransport, Event, EventId, LinkId, LinkStore,
    LinkStoreError, LinkStoreResult, NewLink, NotificationLink, RepoError, RepoResult,
};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

/// Link store call as observed by `ScriptedLinkStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(EventId),
    Create(ContactId),
    Bulk(Vec<ContactId>),
    Delete(LinkId),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::List(_))
    }
}

/// Holds each write or send until released; used to observe in-flight phases.
#[derive(Default)]
pub struct Pause {
    pub entered: Notify,
    pub release: Notify,
}

#[derive(Default)]
struct Inner {
    links: Vec<NotificationLink>,
    calls: Vec<Call>,
    list_script: VecDeque<bool>,
    failing_creates: HashMap<ContactId, (u32, LinkStoreError)>,
    failing_deletes: HashSet<ContactId>,
    bulk_unavailable: bool,
    pause: Option<Arc<Pause>>,
}

/// In-memory link store with call recording and failure injection.
#[derive(Default)]
pub struct ScriptedLinkStore {
    inner: Mutex<Inner>,
}

impl ScriptedLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a link directly, as another session would.
    pub fn seed(&self, event_id: EventId, contact_id: ContactId) -> LinkId {
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().links.push(NotificationLink {
            id,
            event_id,
            contact_id,
        });
        id
    }

    pub fn link_id(&self, event_id: EventId, contact_id: ContactId) -> Option<LinkId> {
        self.inner
            .lock()
            .unwrap()
            .links
            .iter()
            .find(|link| link.event_id == event_id && link.contact_id == contact_id)
            .map(|link| link.id)
    }

    pub fn contacts_for(&self, event_id: EventId) -> BTreeSet<ContactId> {
        self.inner
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|link| link.event_id == event_id)
            .map(|link| link.contact_id)
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Scripts upcoming `list_links` outcomes: `true` succeeds, `false` fails.
    pub fn script_lists(&self, outcomes: &[bool]) {
        self.inner
            .lock()
            .unwrap()
            .list_script
            .extend(outcomes.iter().copied());
    }

    /// Fails creates for `contact_id` the next `times` attempts.
    pub fn fail_create(&self, contact_id: ContactId, times: u32, error: LinkStoreError) {
        self.inner
            .lock()
            .unwrap()
            .failing_creates
            .insert(contact_id, (times, error));
    }

    pub fn fail_delete(&self, contact_id: ContactId) {
        self.inner
            .lock()
            .unwrap()
            .failing_deletes
            .insert(contact_id);
    }

    /// Makes every bulk request fail as a whole.
    pub fn fail_bulk_requests(&self) {
        self.inner.lock().unwrap().bulk_unavailable = true;
    }

    pub fn pause_writes(&self) -> Arc<Pause> {
        let pause = Arc::new(Pause::default());
        self.inner.lock().unwrap().pause = Some(Arc::clone(&pause));
        pause
    }

    async fn wait_if_paused(&self) {
        let pause = self.inner.lock().unwrap().pause.clone();
        if let Some(pause) = pause {
            pause.entered.notify_one();
            pause.release.notified().await;
        }
    }

    fn insert(inner: &mut Inner, entry: NewLink) -> LinkStoreResult<NotificationLink> {
        if let Some((remaining, error)) = inner.failing_creates.get_mut(&entry.contact_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }
        if inner
            .links
            .iter()
            .any(|link| link.event_id == entry.event_id && link.contact_id == entry.contact_id)
        {
            return Err(LinkStoreError::Conflict(entry));
        }
        let link = NotificationLink {
            id: Uuid::new_v4(),
            event_id: entry.event_id,
            contact_id: entry.contact_id,
        };
        inner.links.push(link.clone());
        Ok(link)
    }
}

#[async_trait]
impl LinkStore for ScriptedLinkStore {
    async fn list_links(&self, event_id: EventId) -> LinkStoreResult<Vec<NotificationLink>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(Call::List(event_id));
        if inner.list_script.pop_front() == Some(false) {
            return Err(LinkStoreError::Transport("list unavailable".to_string()));
        }
        Ok(inner
            .links
            .iter()
            .filter(|link| link.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn create_link(
        &self,
        event_id: EventId,
        contact_id: ContactId,
    ) -> LinkStoreResult<NotificationLink> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(Call::Create(contact_id));
        self.wait_if_paused().await;
        let mut inner = self.inner.lock().unwrap();
        Self::insert(&mut inner, NewLink::new(event_id, contact_id))
    }

    async fn create_links_bulk(&self, entries: &[NewLink]) -> LinkStoreResult<BulkCreateOutcome> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .push(Call::Bulk(entries.iter().map(|e| e.contact_id).collect()));
        self.wait_if_paused().await;
        let mut inner = self.inner.lock().unwrap();
        if inner.bulk_unavailable {
            return Err(LinkStoreError::Transport("bulk unavailable".to_string()));
        }
        let mut outcome = BulkCreateOutcome::default();
        for entry in entries {
            match Self::insert(&mut inner, *entry) {
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
        self.inner.lock().unwrap().calls.push(Call::Delete(link_id));
        self.wait_if_paused().await;
        let mut inner = self.inner.lock().unwrap();
        let Some(position) = inner.links.iter().position(|link| link.id == link_id) else {
            return Err(LinkStoreError::NotFound(link_id));
        };
        if inner
            .failing_deletes
            .contains(&inner.links[position].contact_id)
        {
            return Err(LinkStoreError::Transport("delete unavailable".to_string()));
        }
        inner.links.remove(position);
        Ok(())
    }
}

/// Transport that records every dispatched batch.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(EventId, Vec<ContactId>)>>,
    fail: Mutex<bool>,
    pause: Mutex<Option<Arc<Pause>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let transport = Self::default();
        *transport.fail.lock().unwrap() = true;
        transport
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent(&self) -> Vec<(EventId, Vec<ContactId>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn pause_sends(&self) -> Arc<Pause> {
        let pause = Arc::new(Pause::default());
        *self.pause.lock().unwrap() = Some(Arc::clone(&pause));
        pause
    }
}

#[async_trait]
impl DispatchTransport for RecordingTransport {
    async fn send(
        &self,
        event_id: EventId,
        contact_ids: &[ContactId],
    ) -> Result<DispatchReceipt, DispatchError> {
        let pause = self.pause.lock().unwrap().clone();
        if let Some(pause) = pause {
            pause.entered.notify_one();
            pause.release.notified().await;
        }
        if *self.fail.lock().unwrap() {
            return Err(DispatchError::Transport("gateway timeout".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((event_id, contact_ids.to_vec()));
        Ok(DispatchReceipt {
            batch_id: Uuid::new_v4(),
            event_id,
            recipients: contact_ids.len(),
        })
    }
}

/// In-memory contact directory with name search.
#[derive(Default)]
pub struct MemoryContacts {
    contacts: Mutex<Vec<Contact>>,
    unavailable: Mutex<bool>,
}

impl MemoryContacts {
    pub fn with_names(names: &[&str]) -> (Self, Vec<ContactId>) {
        let contacts: Vec<Contact> = names
            .iter()
            .enumerate()
            .map(|(index, name)| Contact {
                id: Uuid::new_v4(),
                name: (*name).to_string(),
                phone: format!("+9190000000{index:02}"),
            })
            .collect();
        let ids = contacts.iter().map(|contact| contact.id).collect();
        (
            Self {
                contacts: Mutex::new(contacts),
                unavailable: Mutex::new(false),
            },
            ids,
        )
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn remove(&self, id: ContactId) {
        self.contacts.lock().unwrap().retain(|contact| contact.id != id);
    }
}

#[async_trait]
impl ContactDirectory for MemoryContacts {
    async fn list_contacts(&self, search: Option<&str>) -> RepoResult<Vec<Contact>> {
        if *self.unavailable.lock().unwrap() {
            return Err(RepoError::InvalidData("directory offline".to_string()));
        }
        let term = search.map(|value| value.trim().to_lowercase());
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|contact| match &term {
                Some(term) => contact.name.to_lowercase().contains(term.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn create_contact(&self, draft: &ContactDraft) -> RepoResult<Contact> {
        let draft = draft.normalized("+91")?;
        let contact = Contact {
            id: Uuid::new_v4(),
            name: draft.name,
            phone: draft.phone,
        };
        self.contacts.lock().unwrap().push(contact.clone());
        Ok(contact)
    }

    async fn delete_contact(&self, id: ContactId) -> RepoResult<()> {
        let mut contacts = self.contacts.lock().unwrap();
        let before = contacts.len();
        contacts.retain(|contact| contact.id != id);
        if contacts.len() == before {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

pub fn sample_event() -> Event {
    Event {
        id: Uuid::new_v4(),
        name: "Quarterly review".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
    }
}

pub fn set_of(ids: &[ContactId]) -> BTreeSet<ContactId> {
    ids.iter().copied().collect()
}
