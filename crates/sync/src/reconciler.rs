//! Offline-first reconciliation of one record collection.
//!
//! Local mutations are applied to the in-memory record set and written through
//! to the [`LocalStore`] immediately; the remote store only sees them when a
//! reconciliation pass runs. An acknowledgment from the remote store clears a
//! record's pending operation only if the record's version did not move while
//! the call was in flight, so edits made during a slow call are never lost.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, PoisonError};

use chrono::Utc;
use pantry_core::{DomainError, LocalId, RecordId, RemoteId, SyncPayload};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, Notify, watch};

use crate::offline::Connectivity;
use crate::remote::{RemoteError, RemoteStore};
use crate::store::{LocalStore, StoreError};
use crate::types::{
    Outcome, PendingOp, ReconcileReport, Record, RecordOutcome, Rejection, SyncState,
};

/// Errors returned by the enqueue and refresh operations.
///
/// Enqueue never fails because of connectivity; [`Reconciler::reconcile`]
/// never fails at all (problems end up in the report).
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("client is offline")]
    Offline,
}

impl From<DomainError> for ReconcileError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ReconcileError::Validation(msg),
            other => ReconcileError::Validation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ReconcileError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileError::Store(err.into())
    }
}

/// What [`Reconciler::enqueue_delete`] did with the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Deletion {
    /// The record never reached the remote store and is gone.
    Removed,
    /// A remote delete is queued for the next pass.
    Pending,
}

/// Counts returned by [`Reconciler::refresh_from_remote`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// False when the remote listing was capped or partly unreadable; no
    /// local records are removed in that case.
    pub complete: bool,
}

#[derive(Debug)]
struct Collection<P> {
    records: BTreeMap<LocalId, Record<P>>,
    by_remote: HashMap<RemoteId, LocalId>,
    /// Records with a remote call outstanding, and the op being sent.
    in_flight: HashMap<LocalId, PendingOp>,
    /// Records whose acknowledged state could not be written to the local store.
    unsaved: BTreeSet<LocalId>,
}

impl<P> Collection<P> {
    fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            by_remote: HashMap::new(),
            in_flight: HashMap::new(),
            unsaved: BTreeSet::new(),
        }
    }

    fn resolve(&self, id: &RecordId) -> Option<LocalId> {
        match id {
            RecordId::Local(local) => self.records.contains_key(local).then_some(*local),
            RecordId::Remote(remote) => self.by_remote.get(remote).copied(),
        }
    }

    fn insert(&mut self, record: Record<P>) {
        if let Some(remote) = &record.remote_id {
            self.by_remote.insert(remote.clone(), record.local_id);
        }
        self.records.insert(record.local_id, record);
    }

    fn remove(&mut self, local_id: LocalId) -> Option<Record<P>> {
        let record = self.records.remove(&local_id)?;
        if let Some(remote) = &record.remote_id {
            self.by_remote.remove(remote);
        }
        Some(record)
    }

    fn is_creating(&self, local_id: LocalId) -> bool {
        self.in_flight.get(&local_id) == Some(&PendingOp::Create)
    }
}

#[derive(Debug, Clone)]
enum Call {
    Create,
    Update(RemoteId),
    Delete(RemoteId),
}

impl Call {
    fn op(&self) -> PendingOp {
        match self {
            Call::Create => PendingOp::Create,
            Call::Update(_) => PendingOp::Update,
            Call::Delete(_) => PendingOp::Delete,
        }
    }

    fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            Call::Create => None,
            Call::Update(id) | Call::Delete(id) => Some(id),
        }
    }
}

/// A remote call about to be issued for one record.
struct Attempt<P> {
    local_id: LocalId,
    call: Call,
    version: u64,
    payload: P,
}

enum Step<P> {
    /// Nothing to do for this record any more.
    Idle,
    /// Settled without a remote call.
    Settled(RecordOutcome),
    Send(Attempt<P>),
}

type PassSlot = std::sync::Mutex<Option<watch::Receiver<Option<ReconcileReport>>>>;

enum Role {
    Lead(watch::Sender<Option<ReconcileReport>>),
    Follow(watch::Receiver<Option<ReconcileReport>>),
}

/// Clears the pass slot when the leading pass ends, even if it is cancelled.
struct PassGuard<'a> {
    slot: &'a PassSlot,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Reconciler for the records of one collection (`P::COLLECTION`).
pub struct Reconciler<P: SyncPayload> {
    remote: Arc<dyn RemoteStore<P>>,
    local: Arc<dyn LocalStore>,
    connectivity: Arc<dyn Connectivity>,
    state: Mutex<Collection<P>>,
    /// Held by passes and refreshes for their whole remote phase.
    exchange: Mutex<()>,
    pass: PassSlot,
    dirty: Notify,
}

impl<P: SyncPayload> Reconciler<P> {
    /// Build a reconciler from the records persisted for `P::COLLECTION`.
    ///
    /// Rows that no longer deserialize are skipped (and left in the store).
    pub async fn load(
        remote: Arc<dyn RemoteStore<P>>,
        local: Arc<dyn LocalStore>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, ReconcileError> {
        let rows = local.load(P::COLLECTION).await?;
        let mut collection = Collection::new();

        for row in rows {
            let local_id = row.local_id;
            let mut record = match Record::<P>::from_stored(row) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(
                        collection = P::COLLECTION,
                        %local_id,
                        error = %err,
                        "skipping unreadable record"
                    );
                    continue;
                }
            };

            if record.pending_op.is_none() && record.remote_id.is_none() {
                tracing::warn!(
                    "record {} in {} has neither a remote id nor a pending op; queueing create",
                    local_id,
                    P::COLLECTION
                );
                record.pending_op = Some(PendingOp::Create);
                local.put(P::COLLECTION, &record.to_stored()?).await?;
            }

            collection.insert(record);
        }

        tracing::info!(
            "Loaded {} {} records ({} pending)",
            collection.records.len(),
            P::COLLECTION,
            collection
                .records
                .values()
                .filter(|r| r.pending_op.is_some())
                .count()
        );

        Ok(Self {
            remote,
            local,
            connectivity,
            state: Mutex::new(collection),
            exchange: Mutex::new(()),
            pass: std::sync::Mutex::new(None),
            dirty: Notify::new(),
        })
    }

    /// Record a new payload locally and queue its remote creation.
    pub async fn enqueue_create(&self, payload: P) -> Result<Record<P>, ReconcileError> {
        payload.validate()?;
        let record = Record::new_local(payload);

        let mut state = self.state.lock().await;
        self.local.put(P::COLLECTION, &record.to_stored()?).await?;
        state.insert(record.clone());
        drop(state);

        tracing::debug!(collection = P::COLLECTION, local_id = %record.local_id, "queued create");
        self.dirty.notify_one();
        Ok(record)
    }

    /// Apply `patch` to the record with either identifier `id` and queue an update.
    ///
    /// A record whose creation is still pending stays `Create`.
    pub async fn enqueue_update(
        &self,
        id: &RecordId,
        patch: &P::Patch,
    ) -> Result<Record<P>, ReconcileError> {
        self.enqueue_update_with(id, |_| patch.clone()).await
    }

    /// Like [`enqueue_update`](Self::enqueue_update), with the patch computed
    /// from the record's current payload while no other mutation can run.
    pub async fn enqueue_update_with(
        &self,
        id: &RecordId,
        make_patch: impl FnOnce(&P) -> P::Patch,
    ) -> Result<Record<P>, ReconcileError> {
        let mut state = self.state.lock().await;
        let current = state
            .resolve(id)
            .and_then(|local_id| state.records.get(&local_id))
            .filter(|record| record.pending_op != Some(PendingOp::Delete))
            .ok_or_else(|| ReconcileError::NotFound(id.clone()))?;

        let patch = make_patch(&current.payload);
        let mut next = current.clone();
        next.payload.apply_patch(&patch);
        next.payload.validate()?;
        next.version += 1;
        next.pending_op = Some(match current.pending_op {
            Some(PendingOp::Create) => PendingOp::Create,
            _ => PendingOp::Update,
        });
        next.rejection = None;
        next.updated_at = Utc::now();

        self.local.put(P::COLLECTION, &next.to_stored()?).await?;
        state.unsaved.remove(&next.local_id);
        state.insert(next.clone());
        drop(state);

        tracing::debug!(
            collection = P::COLLECTION,
            local_id = %next.local_id,
            version = next.version,
            "queued update"
        );
        self.dirty.notify_one();
        Ok(next)
    }

    /// Delete the record with either identifier `id`.
    ///
    /// A record the remote store never saw (and is not being created right
    /// now) is dropped on the spot; anything else waits for a remote delete.
    /// Repeating the delete of a record whose delete the remote store refused
    /// queues it again.
    pub async fn enqueue_delete(&self, id: &RecordId) -> Result<Deletion, ReconcileError> {
        let mut state = self.state.lock().await;
        let local_id = state
            .resolve(id)
            .ok_or_else(|| ReconcileError::NotFound(id.clone()))?;
        let current = state
            .records
            .get(&local_id)
            .ok_or_else(|| ReconcileError::NotFound(id.clone()))?;

        if current.pending_op == Some(PendingOp::Delete) && !current.is_held_back() {
            return Ok(Deletion::Pending);
        }

        if current.remote_id.is_none() && !state.is_creating(local_id) {
            self.local.remove(P::COLLECTION, local_id).await?;
            state.unsaved.remove(&local_id);
            state.remove(local_id);
            tracing::debug!(collection = P::COLLECTION, %local_id, "dropped unsynced record");
            return Ok(Deletion::Removed);
        }

        let mut next = current.clone();
        next.version += 1;
        next.pending_op = Some(PendingOp::Delete);
        next.rejection = None;
        next.updated_at = Utc::now();

        self.local.put(P::COLLECTION, &next.to_stored()?).await?;
        state.unsaved.remove(&local_id);
        state.insert(next);
        drop(state);

        tracing::debug!(collection = P::COLLECTION, %local_id, "queued delete");
        self.dirty.notify_one();
        Ok(Deletion::Pending)
    }

    /// Push every pending record to the remote store, once each.
    ///
    /// Only one pass runs at a time; callers arriving while a pass is running
    /// wait for it and get its report.
    pub async fn reconcile(&self) -> ReconcileReport {
        loop {
            let role = {
                let mut slot = self.pass.lock().unwrap_or_else(PoisonError::into_inner);
                match slot.as_ref() {
                    Some(rx) => Role::Follow(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        *slot = Some(rx);
                        Role::Lead(tx)
                    }
                }
            };

            match role {
                Role::Lead(tx) => {
                    let guard = PassGuard { slot: &self.pass };
                    let report = self.run_pass().await;
                    drop(guard);
                    tx.send_replace(Some(report.clone()));
                    return report;
                }
                Role::Follow(mut rx) => {
                    let finished = rx
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|report| (*report).clone());
                    if let Some(report) = finished {
                        return report;
                    }
                    // The leading pass was cancelled; run one ourselves.
                }
            }
        }
    }

    async fn run_pass(&self) -> ReconcileReport {
        let _exchange = self.exchange.lock().await;
        let mut report = ReconcileReport::start(P::COLLECTION);

        if !self.connectivity.is_online() {
            tracing::debug!("Skipping {} reconciliation - offline", P::COLLECTION);
            report.partial = true;
            return report.finish();
        }

        self.flush_unsaved().await;

        let queue: Vec<LocalId> = {
            let state = self.state.lock().await;
            state
                .records
                .values()
                .filter(|record| record.pending_op.is_some())
                .map(|record| record.local_id)
                .collect()
        };

        for (index, &local_id) in queue.iter().enumerate() {
            if !self.connectivity.is_online() {
                tracing::warn!(
                    "Connectivity lost during {} reconciliation; {} records skipped",
                    P::COLLECTION,
                    queue.len() - index
                );
                report.partial = true;
                let state = self.state.lock().await;
                for rest in &queue[index..] {
                    if let Some(record) = state.records.get(rest) {
                        if let Some(op) = record.pending_op {
                            report.push(RecordOutcome {
                                local_id: record.local_id,
                                remote_id: record.remote_id.clone(),
                                op,
                                outcome: Outcome::Skipped,
                            });
                        }
                    }
                }
                break;
            }

            if let Some(entry) = self.reconcile_one(local_id).await {
                report.push(entry);
            }
        }

        let report = report.finish();
        if !report.outcomes.is_empty() || report.partial {
            tracing::info!(
                collection = P::COLLECTION,
                confirmed = report.confirmed(),
                retrying = report.retrying(),
                failed = report.failed(),
                skipped = report.skipped(),
                partial = report.partial,
                "reconciliation pass finished"
            );
        }
        report
    }

    async fn reconcile_one(&self, local_id: LocalId) -> Option<RecordOutcome> {
        let attempt = match self.begin_attempt(local_id).await {
            Step::Idle => return None,
            Step::Settled(entry) => return Some(entry),
            Step::Send(attempt) => attempt,
        };

        tracing::debug!(
            collection = P::COLLECTION,
            %local_id,
            op = %attempt.call.op(),
            version = attempt.version,
            "sending to remote store"
        );

        let result = match &attempt.call {
            Call::Create => self.remote.create_remote(&attempt.payload).await.map(Some),
            Call::Update(remote_id) => self
                .remote
                .update_remote(remote_id, &attempt.payload)
                .await
                .map(|()| None),
            Call::Delete(remote_id) => self.remote.delete_remote(remote_id).await.map(|()| None),
        };

        Some(self.finish_attempt(attempt, result).await)
    }

    /// Snapshot a pending record and mark it in flight.
    async fn begin_attempt(&self, local_id: LocalId) -> Step<P> {
        let mut state = self.state.lock().await;
        let Some(record) = state.records.get(&local_id) else {
            return Step::Idle;
        };
        let Some(op) = record.pending_op else {
            return Step::Idle;
        };
        if state.in_flight.contains_key(&local_id) {
            return Step::Idle;
        }

        if let Some(rejection) = record.rejection.as_ref().filter(|_| record.is_held_back()) {
            return Step::Settled(RecordOutcome {
                local_id,
                remote_id: record.remote_id.clone(),
                op,
                outcome: Outcome::Failed(rejection.reason.clone()),
            });
        }

        let call = match (op, record.remote_id.clone()) {
            (PendingOp::Delete, None) => {
                // Never reached the remote store; nothing to delete there.
                state.remove(local_id);
                self.save(&mut state, local_id).await;
                return Step::Settled(RecordOutcome {
                    local_id,
                    remote_id: None,
                    op,
                    outcome: Outcome::Confirmed,
                });
            }
            (PendingOp::Create | PendingOp::Update, None) => Call::Create,
            (PendingOp::Create, Some(remote_id)) => {
                tracing::warn!(
                    %local_id,
                    %remote_id,
                    "create queued for a record that already has a remote id; sending update"
                );
                Call::Update(remote_id)
            }
            (PendingOp::Update, Some(remote_id)) => Call::Update(remote_id),
            (PendingOp::Delete, Some(remote_id)) => Call::Delete(remote_id),
        };

        let attempt = Attempt {
            local_id,
            version: record.version,
            payload: record.payload.clone(),
            call,
        };
        state.in_flight.insert(local_id, attempt.call.op());
        Step::Send(attempt)
    }

    /// Apply the remote store's answer for an attempt.
    async fn finish_attempt(
        &self,
        attempt: Attempt<P>,
        result: Result<Option<RemoteId>, RemoteError>,
    ) -> RecordOutcome {
        let local_id = attempt.local_id;
        let op = attempt.call.op();
        let mut state = self.state.lock().await;
        state.in_flight.remove(&local_id);

        let outcome = match result {
            Ok(assigned) => Self::acknowledge(&mut state, local_id, op, attempt.version, assigned),
            Err(RemoteError::NotFound) if op != PendingOp::Create => {
                tracing::info!(
                    collection = P::COLLECTION,
                    %local_id,
                    "record no longer exists remotely; dropping it"
                );
                state.remove(local_id);
                Outcome::Gone
            }
            Err(RemoteError::Validation(reason)) => {
                tracing::warn!(
                    collection = P::COLLECTION,
                    %local_id,
                    %reason,
                    "remote store rejected record; holding it until edited"
                );
                if let Some(record) = state.records.get_mut(&local_id) {
                    record.rejection = Some(Rejection {
                        version: attempt.version,
                        reason: reason.clone(),
                    });
                }
                Outcome::Failed(reason)
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to sync {} record {} ({}), will retry: {}",
                    P::COLLECTION,
                    local_id,
                    op,
                    err
                );
                Outcome::Retrying(err.to_string())
            }
        };

        if !matches!(outcome, Outcome::Retrying(_)) {
            self.save(&mut state, local_id).await;
        }

        let remote_id = state
            .records
            .get(&local_id)
            .and_then(|record| record.remote_id.clone())
            .or_else(|| attempt.call.remote_id().cloned());
        RecordOutcome {
            local_id,
            remote_id,
            op,
            outcome,
        }
    }

    fn acknowledge(
        state: &mut Collection<P>,
        local_id: LocalId,
        op: PendingOp,
        version: u64,
        assigned: Option<RemoteId>,
    ) -> Outcome {
        let Some(record) = state.records.get_mut(&local_id) else {
            return Outcome::Confirmed;
        };
        if let Some(remote_id) = assigned {
            state.by_remote.insert(remote_id.clone(), local_id);
            record.remote_id = Some(remote_id);
        }
        record.rejection = None;

        if record.version != version {
            // Edited while the call was in flight: keep the newer op, which
            // now applies to a record that exists remotely.
            if record.pending_op == Some(PendingOp::Create) {
                record.pending_op = Some(PendingOp::Update);
            }
            return Outcome::Superseded;
        }

        if op == PendingOp::Delete {
            state.remove(local_id);
        } else {
            record.pending_op = None;
        }
        Outcome::Confirmed
    }

    /// Write the current state of `local_id` (or its absence) to the local store.
    ///
    /// Failures are logged and remembered; the next pass retries the write.
    async fn save(&self, state: &mut Collection<P>, local_id: LocalId) {
        let result = match state.records.get(&local_id) {
            Some(record) => match record.to_stored() {
                Ok(row) => self.local.put(P::COLLECTION, &row).await,
                Err(err) => Err(err.into()),
            },
            None => self.local.remove(P::COLLECTION, local_id).await,
        };

        match result {
            Ok(()) => {
                state.unsaved.remove(&local_id);
            }
            Err(err) => {
                tracing::error!(
                    collection = P::COLLECTION,
                    %local_id,
                    error = %err,
                    "failed to persist acknowledged record"
                );
                state.unsaved.insert(local_id);
            }
        }
    }

    async fn flush_unsaved(&self) {
        let mut state = self.state.lock().await;
        let ids: Vec<LocalId> = state.unsaved.iter().copied().collect();
        for local_id in ids {
            self.save(&mut state, local_id).await;
        }
    }

    /// Replace synced records with the remote store's current contents.
    ///
    /// Records with a pending operation are left alone. Synced records the
    /// remote store no longer has are dropped, but only when the listing is
    /// complete; a capped listing says nothing about what it left out.
    pub async fn refresh_from_remote(&self) -> Result<RefreshSummary, ReconcileError> {
        if !self.connectivity.is_online() {
            return Err(ReconcileError::Offline);
        }

        let _exchange = self.exchange.lock().await;
        let listing = self.remote.list_remote().await?;

        let mut state = self.state.lock().await;
        let mut summary = RefreshSummary {
            complete: listing.complete,
            ..RefreshSummary::default()
        };
        let mut seen: HashSet<RemoteId> = listing.skipped.iter().cloned().collect();

        for (remote_id, payload) in listing.docs {
            seen.insert(remote_id.clone());

            let next = match state.by_remote.get(&remote_id).copied() {
                Some(local_id) => {
                    let Some(current) = state.records.get(&local_id) else {
                        continue;
                    };
                    if current.pending_op.is_some() {
                        continue;
                    }
                    let mut next = current.clone();
                    next.payload = payload;
                    next.updated_at = Utc::now();
                    summary.updated += 1;
                    next
                }
                None => {
                    summary.inserted += 1;
                    Record::from_remote(remote_id, payload)
                }
            };

            self.local.put(P::COLLECTION, &next.to_stored()?).await?;
            state.insert(next);
        }

        if !summary.complete {
            tracing::info!(
                "Remote listing of {} is incomplete; keeping synced records it did not mention",
                P::COLLECTION
            );
        }

        let stale: Vec<LocalId> = state
            .records
            .values()
            .filter(|_| summary.complete)
            .filter(|record| record.pending_op.is_none())
            .filter(|record| {
                record
                    .remote_id
                    .as_ref()
                    .is_some_and(|remote_id| !seen.contains(remote_id))
            })
            .map(|record| record.local_id)
            .collect();

        for local_id in stale {
            self.local.remove(P::COLLECTION, local_id).await?;
            state.remove(local_id);
            summary.removed += 1;
        }

        tracing::info!(
            "Refreshed {} from remote: {} inserted, {} updated, {} removed",
            P::COLLECTION,
            summary.inserted,
            summary.updated,
            summary.removed
        );
        Ok(summary)
    }

    /// The record with either identifier `id`, unless it is pending deletion.
    pub async fn get(&self, id: &RecordId) -> Option<Record<P>> {
        let state = self.state.lock().await;
        state
            .resolve(id)
            .and_then(|local_id| state.records.get(&local_id))
            .filter(|record| record.pending_op != Some(PendingOp::Delete))
            .cloned()
    }

    /// Visible records (not pending deletion) in creation order.
    pub async fn list(&self) -> Vec<Record<P>> {
        let state = self.state.lock().await;
        state
            .records
            .values()
            .filter(|record| record.pending_op != Some(PendingOp::Delete))
            .cloned()
            .collect()
    }

    /// Every record with a pending operation, deletions included.
    pub async fn pending(&self) -> Vec<Record<P>> {
        let state = self.state.lock().await;
        state
            .records
            .values()
            .filter(|record| record.pending_op.is_some())
            .cloned()
            .collect()
    }

    pub async fn pending_count(&self) -> usize {
        let state = self.state.lock().await;
        state
            .records
            .values()
            .filter(|record| record.pending_op.is_some())
            .count()
    }

    /// True if any record is waiting for the remote store.
    pub async fn is_dirty(&self) -> bool {
        self.pending_count().await > 0
    }

    /// True while a reconciliation pass is running.
    pub fn is_syncing(&self) -> bool {
        self.pass
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub async fn sync_state(&self, id: &RecordId) -> Option<SyncState> {
        let state = self.state.lock().await;
        let local_id = state.resolve(id)?;
        if let Some(op) = state.in_flight.get(&local_id) {
            return Some(SyncState::Syncing(*op));
        }
        state.records.get(&local_id).map(Record::sync_state)
    }

    /// Resolves after the next local mutation.
    pub async fn changed(&self) {
        self.dirty.notified().await;
    }
}

impl<P: SyncPayload> core::fmt::Debug for Reconciler<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reconciler")
            .field("collection", &P::COLLECTION)
            .field("syncing", &self.is_syncing())
            .finish_non_exhaustive()
    }
}
