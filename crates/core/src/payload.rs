//! The contract a record kind fulfils to be tracked by the sync layer.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DomainResult;

/// Domain fields of one record kind.
///
/// The sync layer never looks inside a payload: it only validates it, applies
/// patches to it and serialises it. Implementations must stay pure (no IO).
pub trait SyncPayload:
    Clone + core::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Partial update accepted by [`SyncPayload::apply_patch`].
    type Patch: Clone + core::fmt::Debug + Send + Sync;

    /// Collection name, used as the local store partition and the remote path
    /// segment (`/api/{collection}`).
    const COLLECTION: &'static str;

    /// Check invariants that can be detected without the remote store.
    fn validate(&self) -> DomainResult<()>;

    /// Merge a patch into the payload.
    fn apply_patch(&mut self, patch: &Self::Patch);
}
