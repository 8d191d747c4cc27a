//! Remote document store boundary.
//!
//! The reconciler only needs create/update/delete by id (plus a listing for
//! refreshes). [`crate::http::HttpRemoteStore`] talks to the pantry API;
//! [`InMemoryRemoteStore`] is for tests and local development.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use pantry_core::{RemoteId, SyncPayload};
use thiserror::Error;
use tokio::sync::oneshot;

/// Remote store operation error.
///
/// The reconciler treats everything except `Validation` and `NotFound` as
/// "retry on the next pass".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),
    #[error("rejected by remote store: {0}")]
    Validation(String),
    #[error("not found on remote store")]
    NotFound,
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result of [`RemoteStore::list_remote`].
///
/// `complete` is false when the store may hold documents that are not listed
/// here at all (a capped listing, or a document without an id). Documents the
/// store returned but that could not be read are named in `skipped`.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<P> {
    pub docs: Vec<(RemoteId, P)>,
    pub skipped: Vec<RemoteId>,
    pub complete: bool,
}

impl<P> Listing<P> {
    /// A listing of every document in the collection.
    pub fn full(docs: Vec<(RemoteId, P)>) -> Self {
        Self {
            docs,
            skipped: Vec::new(),
            complete: true,
        }
    }

    /// True if `id` was returned by the store, readable or not.
    pub fn contains(&self, id: &RemoteId) -> bool {
        self.docs.iter().any(|(doc_id, _)| doc_id == id) || self.skipped.contains(id)
    }
}

/// Remote side of one record collection.
#[async_trait]
pub trait RemoteStore<P: SyncPayload>: Send + Sync {
    /// Persist a new record and return the identifier the store assigned.
    async fn create_remote(&self, payload: &P) -> Result<RemoteId, RemoteError>;

    /// Replace the stored fields of an existing record.
    async fn update_remote(&self, id: &RemoteId, payload: &P) -> Result<(), RemoteError>;

    async fn delete_remote(&self, id: &RemoteId) -> Result<(), RemoteError>;

    /// The records of the collection currently held remotely.
    async fn list_remote(&self) -> Result<Listing<P>, RemoteError>;
}

#[async_trait]
impl<P, S> RemoteStore<P> for Arc<S>
where
    P: SyncPayload,
    S: RemoteStore<P> + ?Sized,
{
    async fn create_remote(&self, payload: &P) -> Result<RemoteId, RemoteError> {
        (**self).create_remote(payload).await
    }

    async fn update_remote(&self, id: &RemoteId, payload: &P) -> Result<(), RemoteError> {
        (**self).update_remote(id, payload).await
    }

    async fn delete_remote(&self, id: &RemoteId) -> Result<(), RemoteError> {
        (**self).delete_remote(id).await
    }

    async fn list_remote(&self) -> Result<Listing<P>, RemoteError> {
        (**self).list_remote().await
    }
}

/// A call observed by [`InMemoryRemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Create,
    Update(RemoteId),
    Delete(RemoteId),
    List,
}

/// Handle on a remote call that [`InMemoryRemoteStore::pause_next_call`] is
/// holding open.
#[derive(Debug)]
pub struct PausedCall {
    entered: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

impl PausedCall {
    /// Wait until the paused call has reached the remote store.
    pub async fn entered(&mut self) {
        let _ = (&mut self.entered).await;
    }

    /// Let the paused call complete.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

#[derive(Debug)]
struct Gate {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

#[derive(Debug)]
struct RemoteState<P> {
    docs: BTreeMap<RemoteId, P>,
    next_id: u64,
    calls: Vec<RemoteCall>,
    failures: VecDeque<RemoteError>,
    list_cap: Option<usize>,
}

/// In-memory remote store.
///
/// Intended for tests/dev. Failures can be scripted with
/// [`fail_next`](Self::fail_next) and a call can be held open with
/// [`pause_next_call`](Self::pause_next_call) to simulate slow networks.
#[derive(Debug)]
pub struct InMemoryRemoteStore<P> {
    state: Mutex<RemoteState<P>>,
    gate: Mutex<Option<Gate>>,
}

impl<P: SyncPayload> InMemoryRemoteStore<P> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RemoteState {
                docs: BTreeMap::new(),
                next_id: 1,
                calls: Vec::new(),
                failures: VecDeque::new(),
                list_cap: None,
            }),
            gate: Mutex::new(None),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make the next call fail with `error` (queued; one error per call).
    pub fn fail_next(&self, error: RemoteError) {
        self.lock().failures.push_back(error);
    }

    /// Return at most `cap` documents from listings, like an API that pages
    /// or truncates its collection endpoint.
    pub fn cap_listing(&self, cap: Option<usize>) {
        self.lock().list_cap = cap;
    }

    /// Hold the next call open until the returned handle is released.
    pub fn pause_next_call(&self) -> PausedCall {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(Gate {
            entered: entered_tx,
            release: release_rx,
        });
        PausedCall {
            entered: entered_rx,
            release: release_tx,
        }
    }

    /// Insert a document directly, as if another client had created it.
    pub fn seed(&self, payload: P) -> RemoteId {
        let mut state = self.lock();
        let id = Self::allocate_id(&mut state);
        state.docs.insert(id.clone(), payload);
        id
    }

    /// Remove a document directly, as if another client had deleted it.
    pub fn forget(&self, id: &RemoteId) {
        self.lock().docs.remove(id);
    }

    pub fn get(&self, id: &RemoteId) -> Option<P> {
        self.lock().docs.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RemoteState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(state: &mut RemoteState<P>) -> RemoteId {
        let id = RemoteId::new(format!("r{}", state.next_id)).expect("generated ids are non-empty");
        state.next_id += 1;
        id
    }

    /// Record the call and pop any scripted failure, then wait at the gate.
    async fn enter(&self, call: RemoteCall) -> Result<(), RemoteError> {
        let scripted = {
            let mut state = self.lock();
            state.calls.push(call);
            state.failures.pop_front()
        };

        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(gate) = gate {
            let _ = gate.entered.send(());
            let _ = gate.release.await;
        }

        match scripted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<P: SyncPayload> Default for InMemoryRemoteStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P: SyncPayload> RemoteStore<P> for InMemoryRemoteStore<P> {
    async fn create_remote(&self, payload: &P) -> Result<RemoteId, RemoteError> {
        self.enter(RemoteCall::Create).await?;
        payload
            .validate()
            .map_err(|e| RemoteError::Validation(e.to_string()))?;

        let mut state = self.lock();
        let id = Self::allocate_id(&mut state);
        state.docs.insert(id.clone(), payload.clone());
        Ok(id)
    }

    async fn update_remote(&self, id: &RemoteId, payload: &P) -> Result<(), RemoteError> {
        self.enter(RemoteCall::Update(id.clone())).await?;
        payload
            .validate()
            .map_err(|e| RemoteError::Validation(e.to_string()))?;

        let mut state = self.lock();
        match state.docs.get_mut(id) {
            Some(doc) => {
                *doc = payload.clone();
                Ok(())
            }
            None => Err(RemoteError::NotFound),
        }
    }

    async fn delete_remote(&self, id: &RemoteId) -> Result<(), RemoteError> {
        self.enter(RemoteCall::Delete(id.clone())).await?;

        match self.lock().docs.remove(id) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound),
        }
    }

    async fn list_remote(&self) -> Result<Listing<P>, RemoteError> {
        self.enter(RemoteCall::List).await?;

        let state = self.lock();
        let cap = state.list_cap.unwrap_or(usize::MAX);
        let mut listing = Listing::full(
            state
                .docs
                .iter()
                .take(cap)
                .map(|(id, doc)| (id.clone(), doc.clone()))
                .collect(),
        );
        listing.complete = state.docs.len() <= cap;
        Ok(listing)
    }
}
