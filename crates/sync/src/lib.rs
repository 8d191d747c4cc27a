//! `pantry-sync`
//!
//! **Responsibility:** offline-first sync of the pantry's records.
//!
//! This crate provides:
//! - A per-collection [`Reconciler`] that accepts local edits at any time and
//!   pushes them to the remote store when connectivity allows
//! - Durable local storage ([`SqliteLocalStore`]) and an HTTP client for the
//!   pantry API ([`HttpRemoteStore`])
//! - A background [`SyncWorker`] and the [`Pantry`] facade the UI calls
//!
//! The local cache is the source of truth for the UI; the remote store only
//! ever sees changes through a reconciliation pass.

pub mod app;
pub mod config;
pub mod http;
pub mod offline;
pub mod reconciler;
pub mod remote;
pub mod store;
pub mod types;
pub mod worker;

pub use app::{Pantry, RefreshResult, SyncStatus, SyncSummary};
pub use config::SyncConfig;
pub use http::HttpRemoteStore;
pub use offline::{Connectivity, ConnectivityState, HealthCheck, OfflineMode};
pub use reconciler::{Deletion, ReconcileError, Reconciler, RefreshSummary};
pub use remote::{InMemoryRemoteStore, Listing, RemoteError, RemoteStore};
pub use store::{InMemoryLocalStore, LocalStore, SqliteLocalStore, StoreError, StoredRecord};
pub use types::{Outcome, PendingOp, ReconcileReport, Record, RecordOutcome, Rejection, SyncState};
pub use worker::{SyncEvent, SyncWorker, WorkerHandle};
