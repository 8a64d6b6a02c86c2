//! Selection reconciler.
//!
//! # Responsibility
//! - Diff a working selection against a fresh link read.
//! - Apply the minimal creates and deletes, best-effort.
//! - Report the post-save baseline from a closing link read.
//!
//! # Invariants
//! - Every save starts with a fresh `list_links`; cached baselines are never
//!   used to compute the diff.
//! - One pending create uses `create_link`; two or more use one
//!   `create_links_bulk`.
//! - The closing read is issued only after every write settled.
//! - `Conflict` on create and `NotFound` on delete count as success.

use crate::model::contact::ContactId;
use crate::model::event::EventId;
use crate::model::link::{linked_contacts, LinkId, NewLink, NotificationLink};
use crate::repo::link_repo::{BulkCreateFailure, LinkStore, LinkStoreError};
use futures::future::join_all;
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Default number of extra attempts for retryable bulk-create failures.
pub const DEFAULT_BULK_RETRY_LIMIT: u32 = 1;

/// Tuning knobs for `Reconciler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Extra attempts for create entries that failed with a retryable error.
    /// Only the failed entries are re-issued.
    pub bulk_retry_limit: u32,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            bulk_retry_limit: DEFAULT_BULK_RETRY_LIMIT,
        }
    }
}

/// Creates and deletes needed to align the store with a working selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_add: Vec<NewLink>,
    pub to_remove: Vec<NotificationLink>,
}

impl ReconcilePlan {
    /// Computes `working - current` as creates and `current - working` as
    /// deletes. Links for other events in `current` are ignored.
    pub fn compute(
        event_id: EventId,
        current: &[NotificationLink],
        working: &BTreeSet<ContactId>,
    ) -> Self {
        let existing = linked_contacts(event_id, current);
        let to_add = working
            .iter()
            .filter(|contact_id| !existing.contains(contact_id))
            .map(|contact_id| NewLink::new(event_id, *contact_id))
            .collect();
        let to_remove = current
            .iter()
            .filter(|link| link.event_id == event_id && !working.contains(&link.contact_id))
            .cloned()
            .collect();
        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Kind of link write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOp {
    Create,
    Delete,
}

/// One failed link write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOp {
    pub contact_id: ContactId,
    pub op: LinkOp,
    pub error: LinkStoreError,
}

/// Successful save summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub event_id: EventId,
    /// Links newly created by this save.
    pub created: usize,
    /// Links deleted by this save.
    pub deleted: usize,
    /// Closing link read; the saved baseline is derived from it.
    pub links: Vec<NotificationLink>,
}

impl SaveReport {
    pub fn baseline(&self) -> BTreeSet<ContactId> {
        linked_contacts(self.event_id, &self.links)
    }
}

/// Aggregate outcome of a save where some writes failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailure {
    pub event_id: EventId,
    pub failed: Vec<FailedOp>,
    /// Contacts whose persisted state still differs from the working selection.
    pub unsynced: BTreeSet<ContactId>,
    /// Best-known remote links: the closing read, or the opening read minus
    /// deleted links when the closing read failed.
    pub links: Vec<NotificationLink>,
    pub refresh_error: Option<LinkStoreError>,
}

impl PartialFailure {
    pub fn baseline(&self) -> BTreeSet<ContactId> {
        linked_contacts(self.event_id, &self.links)
    }
}

/// Save failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Opening read failed; nothing was written.
    Fetch(LinkStoreError),
    /// Some writes failed; successful writes were kept.
    Partial(PartialFailure),
    /// All writes settled but the closing read failed. `links` holds the
    /// opening read minus the links this save deleted.
    Refresh {
        error: LinkStoreError,
        links: Vec<NotificationLink>,
    },
}

impl ReconcileError {
    /// Returns the best-known remote links, when any read succeeded.
    pub fn known_links(&self) -> Option<&[NotificationLink]> {
        match self {
            Self::Fetch(_) => None,
            Self::Partial(partial) => Some(&partial.links),
            Self::Refresh { links, .. } => Some(links),
        }
    }
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "failed to read current links: {err}"),
            Self::Partial(partial) => write!(
                f,
                "selection partially saved: {} operation(s) failed, {} contact(s) unsynced",
                partial.failed.len(),
                partial.unsynced.len()
            ),
            Self::Refresh { error, .. } => {
                write!(f, "selection saved but baseline refresh failed: {error}")
            }
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) | Self::Refresh { error: err, .. } => Some(err),
            Self::Partial(_) => None,
        }
    }
}

/// Applies working selections to the link store.
#[derive(Clone)]
pub struct Reconciler {
    links: Arc<dyn LinkStore>,
    options: ReconcilerOptions,
}

impl Reconciler {
    pub fn new(links: Arc<dyn LinkStore>) -> Self {
        Self::with_options(links, ReconcilerOptions::default())
    }

    pub fn with_options(links: Arc<dyn LinkStore>, options: ReconcilerOptions) -> Self {
        Self { links, options }
    }

    /// Makes the store's links for `event_id` match `working`.
    ///
    /// # Errors
    /// - `Fetch` when the opening read fails.
    /// - `Partial` when at least one create or delete failed.
    /// - `Refresh` when only the closing read failed.
    pub async fn save(
        &self,
        event_id: EventId,
        working: &BTreeSet<ContactId>,
    ) -> Result<SaveReport, ReconcileError> {
        let started_at = Instant::now();
        info!(
            "event=selection_save module=reconciler status=start event_id={} working={}",
            event_id,
            working.len()
        );

        let current = self.links.list_links(event_id).await.map_err(|err| {
            warn!(
                "event=selection_save module=reconciler status=error event_id={} error_code=fetch_failed error={}",
                event_id, err
            );
            ReconcileError::Fetch(err)
        })?;

        let plan = ReconcilePlan::compute(event_id, &current, working);
        let ((created, mut failed), (deleted, removed, delete_failures)) = futures::join!(
            self.apply_additions(&plan.to_add),
            self.apply_removals(&plan.to_remove)
        );
        failed.extend(delete_failures);

        let (links, refresh_error) = match self.links.list_links(event_id).await {
            Ok(links) => (links, None),
            Err(err) => (without_removed(current, &removed), Some(err)),
        };

        if failed.is_empty() {
            if let Some(error) = refresh_error {
                warn!(
                    "event=selection_save module=reconciler status=error event_id={} error_code=refresh_failed created={} deleted={} error={}",
                    event_id, created, deleted, error
                );
                return Err(ReconcileError::Refresh { error, links });
            }
            info!(
                "event=selection_save module=reconciler status=ok event_id={} created={} deleted={} duration_ms={}",
                event_id,
                created,
                deleted,
                started_at.elapsed().as_millis()
            );
            return Ok(SaveReport {
                event_id,
                created,
                deleted,
                links,
            });
        }

        let persisted = linked_contacts(event_id, &links);
        let unsynced = working
            .symmetric_difference(&persisted)
            .copied()
            .collect::<BTreeSet<_>>();
        warn!(
            "event=selection_save module=reconciler status=partial event_id={} created={} deleted={} failed={} unsynced={} duration_ms={}",
            event_id,
            created,
            deleted,
            failed.len(),
            unsynced.len(),
            started_at.elapsed().as_millis()
        );
        Err(ReconcileError::Partial(PartialFailure {
            event_id,
            failed,
            unsynced,
            links,
            refresh_error,
        }))
    }

    async fn apply_additions(&self, entries: &[NewLink]) -> (usize, Vec<FailedOp>) {
        let mut created = 0;
        let mut failed = Vec::new();
        let mut pending = entries.to_vec();
        let mut retries_left = self.options.bulk_retry_limit;

        while !pending.is_empty() {
            let (batch_created, failures) = self.create_batch(&pending).await;
            created += batch_created;

            let (retryable, fatal): (Vec<_>, Vec<_>) = failures
                .into_iter()
                .partition(|failure| failure.error.is_retryable());
            failed.extend(fatal.into_iter().map(create_failure));

            if retryable.is_empty() {
                break;
            }
            if retries_left == 0 {
                failed.extend(retryable.into_iter().map(create_failure));
                break;
            }
            retries_left -= 1;
            pending = retryable.into_iter().map(|failure| failure.entry).collect();
        }

        (created, failed)
    }

    async fn create_batch(&self, entries: &[NewLink]) -> (usize, Vec<BulkCreateFailure>) {
        match entries {
            [] => (0, Vec::new()),
            [entry] => match self
                .links
                .create_link(entry.event_id, entry.contact_id)
                .await
            {
                Ok(_) => (1, Vec::new()),
                Err(LinkStoreError::Conflict(_)) => (0, Vec::new()),
                Err(error) => (
                    0,
                    vec![BulkCreateFailure {
                        entry: *entry,
                        error,
                    }],
                ),
            },
            _ => match self.links.create_links_bulk(entries).await {
                Ok(outcome) => {
                    let failures = outcome
                        .failed
                        .into_iter()
                        .filter(|failure| !matches!(failure.error, LinkStoreError::Conflict(_)))
                        .collect();
                    (outcome.created.len(), failures)
                }
                Err(error) => (
                    0,
                    entries
                        .iter()
                        .map(|entry| BulkCreateFailure {
                            entry: *entry,
                            error: error.clone(),
                        })
                        .collect(),
                ),
            },
        }
    }

    /// Returns the delete count, the ids of links now absent from the store
    /// (deleted or already gone) and the failures.
    async fn apply_removals(
        &self,
        links: &[NotificationLink],
    ) -> (usize, BTreeSet<LinkId>, Vec<FailedOp>) {
        let results = join_all(links.iter().map(|link| async move {
            (link, self.links.delete_link(link.id).await)
        }))
        .await;

        let mut deleted = 0;
        let mut removed = BTreeSet::new();
        let mut failed = Vec::new();
        for (link, result) in results {
            match result {
                Ok(()) => {
                    deleted += 1;
                    removed.insert(link.id);
                }
                Err(LinkStoreError::NotFound(_)) => {
                    removed.insert(link.id);
                }
                Err(error) => failed.push(FailedOp {
                    contact_id: link.contact_id,
                    op: LinkOp::Delete,
                    error,
                }),
            }
        }
        (deleted, removed, failed)
    }
}

/// Opening read minus the links this save confirmed gone.
fn without_removed(
    links: Vec<NotificationLink>,
    removed: &BTreeSet<LinkId>,
) -> Vec<NotificationLink> {
    links
        .into_iter()
        .filter(|link| !removed.contains(&link.id))
        .collect()
}

fn create_failure(failure: BulkCreateFailure) -> FailedOp {
    FailedOp {
        contact_id: failure.entry.contact_id,
        op: LinkOp::Create,
        error: failure.error,
    }
}

#[cfg(test)]
mod tests {
    use super::{without_removed, ReconcilePlan};
    use crate::model::link::{NewLink, NotificationLink};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn link(event_id: Uuid, contact_id: Uuid) -> NotificationLink {
        NotificationLink {
            id: Uuid::new_v4(),
            event_id,
            contact_id,
        }
    }

    #[test]
    fn plan_adds_missing_and_removes_unselected() {
        let event = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let current = vec![link(event, a), link(event, b)];
        let working: BTreeSet<Uuid> = [b, c].into_iter().collect();

        let plan = ReconcilePlan::compute(event, &current, &working);

        assert_eq!(plan.to_add, vec![NewLink::new(event, c)]);
        assert_eq!(plan.to_remove, vec![current[0].clone()]);
    }

    #[test]
    fn plan_is_empty_when_selection_matches() {
        let event = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let current = vec![link(event, a), link(event, b)];
        let working: BTreeSet<Uuid> = [a, b].into_iter().collect();

        assert!(ReconcilePlan::compute(event, &current, &working).is_empty());
    }

    #[test]
    fn fallback_read_drops_confirmed_removals() {
        let event = Uuid::new_v4();
        let kept = link(event, Uuid::new_v4());
        let gone = link(event, Uuid::new_v4());
        let removed: BTreeSet<Uuid> = [gone.id].into_iter().collect();

        let links = without_removed(vec![kept.clone(), gone], &removed);

        assert_eq!(links, vec![kept]);
    }

    #[test]
    fn plan_ignores_links_of_other_events() {
        let event = Uuid::new_v4();
        let contact = Uuid::new_v4();
        let current = vec![link(Uuid::new_v4(), contact)];
        let working: BTreeSet<Uuid> = [contact].into_iter().collect();

        let plan = ReconcilePlan::compute(event, &current, &working);

        assert_eq!(plan.to_add, vec![NewLink::new(event, contact)]);
        assert!(plan.to_remove.is_empty());
    }
}
