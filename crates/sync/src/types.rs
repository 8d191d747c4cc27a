//! Record and report types shared by the reconciler, the stores and the UI.

use chrono::{DateTime, Utc};
use pantry_core::{LocalId, RecordId, RemoteId, SyncPayload};
use serde::{Deserialize, Serialize};

/// Operation waiting for confirmation from the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingOp {
    Create,
    Update,
    Delete,
}

impl PendingOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingOp::Create => "create",
            PendingOp::Update => "update",
            PendingOp::Delete => "delete",
        }
    }
}

impl core::fmt::Display for PendingOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PendingOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(PendingOp::Create),
            "update" => Ok(PendingOp::Update),
            "delete" => Ok(PendingOp::Delete),
            other => Err(format!("invalid PendingOp: {other}")),
        }
    }
}

/// The remote store refused a record's payload at a given local version.
///
/// The record is held back from further remote calls until a local edit moves
/// its version past `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub version: u64,
    pub reason: String,
}

/// Sync state of one record as shown to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "op", rename_all = "lowercase")]
pub enum SyncState {
    /// A local change is waiting for the next pass.
    Unsynced(PendingOp),
    /// A remote call for this record is in flight.
    Syncing(PendingOp),
    /// Local and remote agree.
    Synced,
}

/// One tracked record.
///
/// Callers only ever get clones; all mutation goes through the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<P> {
    pub(crate) local_id: LocalId,
    pub(crate) remote_id: Option<RemoteId>,
    pub(crate) payload: P,
    pub(crate) pending_op: Option<PendingOp>,
    pub(crate) version: u64,
    pub(crate) rejection: Option<Rejection>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl<P> Record<P> {
    /// A record created on this device, waiting for remote creation.
    pub(crate) fn new_local(payload: P) -> Self {
        Self {
            local_id: LocalId::new(),
            remote_id: None,
            payload,
            pending_op: Some(PendingOp::Create),
            version: 1,
            rejection: None,
            updated_at: Utc::now(),
        }
    }

    /// A record loaded from the remote store that was never edited locally.
    pub(crate) fn from_remote(remote_id: RemoteId, payload: P) -> Self {
        Self {
            local_id: LocalId::new(),
            remote_id: Some(remote_id),
            payload,
            pending_op: None,
            version: 0,
            rejection: None,
            updated_at: Utc::now(),
        }
    }

    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    /// `remote_id` once assigned, `local_id` before that.
    pub fn canonical_id(&self) -> RecordId {
        match &self.remote_id {
            Some(remote) => RecordId::Remote(remote.clone()),
            None => RecordId::Local(self.local_id),
        }
    }

    /// True if `id` refers to this record through either identifier.
    pub fn matches(&self, id: &RecordId) -> bool {
        match id {
            RecordId::Local(local) => *local == self.local_id,
            RecordId::Remote(remote) => self.remote_id.as_ref() == Some(remote),
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn pending_op(&self) -> Option<PendingOp> {
        self.pending_op
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_synced(&self) -> bool {
        self.pending_op.is_none()
    }

    /// True while the remote store's last rejection still applies.
    pub fn is_held_back(&self) -> bool {
        self.rejection
            .as_ref()
            .is_some_and(|rejection| rejection.version == self.version)
    }

    pub fn sync_state(&self) -> SyncState {
        match self.pending_op {
            Some(op) => SyncState::Unsynced(op),
            None => SyncState::Synced,
        }
    }
}

impl<P: SyncPayload> Record<P> {
    pub(crate) fn to_stored(&self) -> Result<StoredRecord, serde_json::Error> {
        Ok(StoredRecord {
            local_id: self.local_id,
            remote_id: self.remote_id.clone(),
            pending_op: self.pending_op,
            version: self.version,
            payload: serde_json::to_value(&self.payload)?,
            rejection: self.rejection.clone(),
            updated_at: self.updated_at,
        })
    }

    pub(crate) fn from_stored(stored: StoredRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            local_id: stored.local_id,
            remote_id: stored.remote_id,
            payload: serde_json::from_value(stored.payload)?,
            pending_op: stored.pending_op,
            version: stored.version,
            rejection: stored.rejection,
            updated_at: stored.updated_at,
        })
    }
}

/// Untyped form of a record as kept by a [`crate::store::LocalStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub local_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub pending_op: Option<PendingOp>,
    pub version: u64,
    pub payload: serde_json::Value,
    pub rejection: Option<Rejection>,
    pub updated_at: DateTime<Utc>,
}

/// Connectivity state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// The remote store is reachable.
    Online,
    /// Network unreachable or remote store unavailable.
    Offline,
}

/// What happened to one record during a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    /// The remote store acknowledged the operation and the record is in sync.
    Confirmed,
    /// The remote store acknowledged the operation, but a newer local edit
    /// arrived meanwhile and is still pending.
    Superseded,
    /// The record no longer exists remotely and was dropped locally.
    Gone,
    /// Transient failure; the record stays pending for the next pass.
    Retrying(String),
    /// The remote store rejected the payload; the record waits for a local edit.
    Failed(String),
    /// Not attempted because connectivity was lost during the pass.
    Skipped,
}

/// Per-record entry of a [`ReconcileReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub local_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub op: PendingOp,
    pub outcome: Outcome,
}

/// Result of one reconciliation pass over a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub collection: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the pass stopped early (offline at start or mid-pass).
    pub partial: bool,
    pub outcomes: Vec<RecordOutcome>,
}

impl ReconcileReport {
    pub(crate) fn start(collection: &str) -> Self {
        let now = Utc::now();
        Self {
            collection: collection.to_string(),
            started_at: now,
            finished_at: now,
            partial: false,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, outcome: RecordOutcome) {
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn confirmed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Confirmed | Outcome::Superseded | Outcome::Gone))
    }

    pub fn retrying(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Retrying(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    /// True if every attempted record went through and the pass was complete.
    pub fn is_clean(&self) -> bool {
        !self.partial && self.retrying() == 0 && self.failed() == 0 && self.skipped() == 0
    }

    pub fn outcome_for(&self, local_id: LocalId) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|entry| entry.local_id == local_id)
            .map(|entry| &entry.outcome)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|entry| pred(&entry.outcome)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::{InventoryItem, Unit};

    #[test]
    fn new_local_record_is_pending_create() {
        let record = Record::new_local(InventoryItem::new("Milk", 1.0, Unit::Litre));

        assert_eq!(record.pending_op(), Some(PendingOp::Create));
        assert_eq!(record.version(), 1);
        assert_eq!(record.canonical_id(), RecordId::Local(record.local_id()));
        assert_eq!(record.sync_state(), SyncState::Unsynced(PendingOp::Create));
    }

    #[test]
    fn remote_id_becomes_canonical() {
        let remote = RemoteId::new("r1").unwrap();
        let record = Record::from_remote(remote.clone(), InventoryItem::new("Tea", 1.0, Unit::Pieces));

        assert!(record.is_synced());
        assert_eq!(record.canonical_id(), RecordId::Remote(remote.clone()));
        assert!(record.matches(&RecordId::Remote(remote)));
        assert!(record.matches(&RecordId::Local(record.local_id())));
    }

    #[test]
    fn stored_form_round_trips_payload() {
        let mut record = Record::new_local(InventoryItem::new("Rice", 2.0, Unit::Kilogram));
        record.rejection = Some(Rejection {
            version: 1,
            reason: "bad unit".into(),
        });

        let stored = record.to_stored().unwrap();
        assert_eq!(stored.payload["unit"], "kg");

        let back: Record<InventoryItem> = Record::from_stored(stored).unwrap();
        assert_eq!(back, record);
        assert!(back.is_held_back());
    }

    #[test]
    fn pending_op_parses_its_own_rendering() {
        for op in [PendingOp::Create, PendingOp::Update, PendingOp::Delete] {
            assert_eq!(op.as_str().parse::<PendingOp>().unwrap(), op);
        }
        assert!("sync".parse::<PendingOp>().is_err());
    }

    #[test]
    fn report_counts_by_outcome() {
        let mut report = ReconcileReport::start("inventory");
        for outcome in [
            Outcome::Confirmed,
            Outcome::Superseded,
            Outcome::Retrying("timeout".into()),
            Outcome::Failed("invalid".into()),
        ] {
            report.push(RecordOutcome {
                local_id: LocalId::new(),
                remote_id: None,
                op: PendingOp::Create,
                outcome,
            });
        }
        let report = report.finish();

        assert_eq!(report.confirmed(), 2);
        assert_eq!(report.retrying(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_clean());
    }
}
