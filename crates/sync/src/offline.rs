//! Connectivity signal shared by the reconcilers and the sync worker.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

pub use crate::types::ConnectivityState;

/// Whether the remote store can currently be reached.
///
/// The reconciler polls this before a pass and before every record.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Something that can actively check whether the remote store is reachable.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check_connectivity(&self) -> bool;
}

/// Shared connectivity flag.
///
/// Cheap to clone; all clones observe the same state. The sync worker flips it
/// after health checks, the reconciler reads it, and UI code can
/// [`subscribe`](OfflineMode::subscribe) to transitions.
#[derive(Debug, Clone)]
pub struct OfflineMode {
    state: Arc<watch::Sender<ConnectivityState>>,
}

impl OfflineMode {
    pub fn new() -> Self {
        Self::with_state(ConnectivityState::Online)
    }

    pub fn with_state(state: ConnectivityState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Mark the client as offline.
    pub fn set_offline(&self) {
        self.transition(ConnectivityState::Offline);
    }

    /// Mark the client as online.
    pub fn set_online(&self) {
        self.transition(ConnectivityState::Online);
    }

    /// Check if offline mode is active.
    pub fn is_offline(&self) -> bool {
        self.state() == ConnectivityState::Offline
    }

    /// Receive every connectivity transition from now on.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    fn transition(&self, next: ConnectivityState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::info!(state = ?next, "connectivity changed");
        }
    }
}

impl Default for OfflineMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity for OfflineMode {
    fn is_online(&self) -> bool {
        !self.is_offline()
    }
}

impl<C> Connectivity for Arc<C>
where
    C: Connectivity + ?Sized,
{
    fn is_online(&self) -> bool {
        (**self).is_online()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let mode = OfflineMode::new();
        let other = mode.clone();

        other.set_offline();
        assert!(mode.is_offline());
        assert!(!mode.is_online());

        mode.set_online();
        assert!(other.is_online());
    }

    #[tokio::test]
    async fn subscribers_see_transitions_only() {
        let mode = OfflineMode::new();
        let mut rx = mode.subscribe();

        mode.set_online();
        assert!(!rx.has_changed().unwrap());

        mode.set_offline();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectivityState::Offline);
    }
}
