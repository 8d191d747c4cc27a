//! Application facade: what the UI layer calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use pantry_core::{
    InventoryItem, InventoryItemPatch, Purchase, PurchasePatch, RecordId, spend_by_month,
    total_spent,
};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::SyncConfig;
use crate::http::HttpRemoteStore;
use crate::offline::{ConnectivityState, OfflineMode};
use crate::reconciler::{Deletion, ReconcileError, Reconciler, RefreshSummary};
use crate::remote::RemoteStore;
use crate::store::{LocalStore, SqliteLocalStore};
use crate::types::{ReconcileReport, Record};

/// Snapshot for a syncing indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub connectivity: ConnectivityState,
    pub syncing: bool,
    pub pending_items: usize,
    pub pending_purchases: usize,
}

/// Reports of one pass over both collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub inventory: ReconcileReport,
    pub purchases: ReconcileReport,
}

impl SyncSummary {
    pub fn is_clean(&self) -> bool {
        self.inventory.is_clean() && self.purchases.is_clean()
    }

    /// Records that hit a transient failure and stay queued.
    pub fn retrying(&self) -> usize {
        self.inventory.retrying() + self.purchases.retrying()
    }

    pub fn reports(&self) -> [&ReconcileReport; 2] {
        [&self.inventory, &self.purchases]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshResult {
    pub inventory: RefreshSummary,
    pub purchases: RefreshSummary,
}

/// The pantry: inventory items and purchases, cached locally and pushed to the
/// remote store in the background.
pub struct Pantry {
    inventory: Reconciler<InventoryItem>,
    purchases: Reconciler<Purchase>,
    offline: OfflineMode,
    /// Held for the whole of [`Pantry::log_purchase`], so that concurrent
    /// purchases of the same new item create it once.
    stocking: Mutex<()>,
}

impl Pantry {
    /// Wire both collections to explicit collaborators.
    pub async fn with_parts(
        inventory_remote: Arc<dyn RemoteStore<InventoryItem>>,
        purchase_remote: Arc<dyn RemoteStore<Purchase>>,
        local: Arc<dyn LocalStore>,
        offline: OfflineMode,
    ) -> Result<Self, ReconcileError> {
        let connectivity = Arc::new(offline.clone());
        let inventory =
            Reconciler::load(inventory_remote, local.clone(), connectivity.clone()).await?;
        let purchases = Reconciler::load(purchase_remote, local, connectivity).await?;

        Ok(Self {
            inventory,
            purchases,
            offline,
            stocking: Mutex::new(()),
        })
    }

    /// Open the SQLite cache at `config.db_path` and talk to `config.api_url`.
    pub async fn open(config: &SyncConfig, offline: OfflineMode) -> anyhow::Result<Self> {
        let remote = Arc::new(
            HttpRemoteStore::from_config(config).context("failed to build HTTP client")?,
        );
        let local = Arc::new(SqliteLocalStore::open(&config.db_path).await?);

        tracing::info!(
            "Opened pantry cache at {:?} (remote: {})",
            config.db_path,
            remote.api_url()
        );

        Ok(Self::with_parts(remote.clone(), remote, local, offline).await?)
    }

    pub fn offline(&self) -> &OfflineMode {
        &self.offline
    }

    pub fn inventory_reconciler(&self) -> &Reconciler<InventoryItem> {
        &self.inventory
    }

    pub fn purchase_reconciler(&self) -> &Reconciler<Purchase> {
        &self.purchases
    }

    pub async fn add_item(&self, item: InventoryItem) -> Result<Record<InventoryItem>, ReconcileError> {
        self.inventory.enqueue_create(item).await
    }

    pub async fn update_item(
        &self,
        id: &RecordId,
        patch: &InventoryItemPatch,
    ) -> Result<Record<InventoryItem>, ReconcileError> {
        self.inventory.enqueue_update(id, patch).await
    }

    pub async fn remove_item(&self, id: &RecordId) -> Result<Deletion, ReconcileError> {
        self.inventory.enqueue_delete(id).await
    }

    /// Record a purchase and stock its lines into the inventory.
    ///
    /// A line is added to an existing item with the same name
    /// (case-insensitive) and unit; otherwise a new item is created. Lines in
    /// a unit the inventory does not track (`bag`, `pack`, ...) are recorded
    /// on the purchase only.
    pub async fn log_purchase(&self, purchase: Purchase) -> Result<Record<Purchase>, ReconcileError> {
        let _stocking = self.stocking.lock().await;

        let record = self.purchases.enqueue_create(purchase).await?;
        let purchase = record.payload();

        for line in &purchase.items {
            let Some(unit) = line.inventory_unit() else {
                tracing::debug!(
                    "Not stocking {:?}: unit {:?} is not an inventory unit",
                    line.name,
                    line.unit
                );
                continue;
            };
            let name = line.name.trim();
            let existing = self.inventory.list().await.into_iter().find(|item| {
                item.payload().unit == unit && item.payload().name.trim().eq_ignore_ascii_case(name)
            });

            let restocked = match existing {
                Some(item) => {
                    let result = self
                        .inventory
                        .enqueue_update_with(&item.canonical_id(), |current| InventoryItemPatch {
                            quantity: Some(current.quantity + line.quantity),
                            purchase_date: Some(purchase.date),
                            ..InventoryItemPatch::default()
                        })
                        .await;
                    match result {
                        Ok(_) => true,
                        // Removed since we looked it up.
                        Err(ReconcileError::NotFound(_)) => false,
                        Err(err) => return Err(err),
                    }
                }
                None => false,
            };

            if !restocked {
                let item = InventoryItem::new(name, line.quantity, unit).with_purchase_date(purchase.date);
                self.inventory.enqueue_create(item).await?;
            }
        }

        tracing::debug!(
            "Logged purchase {} with {} lines",
            record.local_id(),
            purchase.items.len()
        );
        Ok(record)
    }

    pub async fn update_purchase(
        &self,
        id: &RecordId,
        patch: &PurchasePatch,
    ) -> Result<Record<Purchase>, ReconcileError> {
        self.purchases.enqueue_update(id, patch).await
    }

    pub async fn remove_purchase(&self, id: &RecordId) -> Result<Deletion, ReconcileError> {
        self.purchases.enqueue_delete(id).await
    }

    pub async fn item(&self, id: &RecordId) -> Option<Record<InventoryItem>> {
        self.inventory.get(id).await
    }

    pub async fn purchase(&self, id: &RecordId) -> Option<Record<Purchase>> {
        self.purchases.get(id).await
    }

    pub async fn items(&self) -> Vec<Record<InventoryItem>> {
        self.inventory.list().await
    }

    /// Purchases, newest first.
    pub async fn purchases(&self) -> Vec<Record<Purchase>> {
        let mut purchases = self.purchases.list().await;
        purchases.sort_by(|a, b| b.payload().date.cmp(&a.payload().date));
        purchases
    }

    /// Items at or below their restock threshold.
    pub async fn low_stock(&self) -> Vec<Record<InventoryItem>> {
        self.inventory
            .list()
            .await
            .into_iter()
            .filter(|item| item.payload().is_low_stock())
            .collect()
    }

    /// Items expiring within `window` from now (already expired included),
    /// soonest first.
    pub async fn expiring_within(&self, window: Duration) -> Vec<Record<InventoryItem>> {
        let now = Utc::now();
        let mut items: Vec<_> = self
            .inventory
            .list()
            .await
            .into_iter()
            .filter(|item| item.payload().expires_within(now, window))
            .collect();
        items.sort_by_key(|item| item.payload().expiry_date);
        items
    }

    /// Total spend per `YYYY-MM`.
    pub async fn spend_by_month(&self) -> BTreeMap<String, f64> {
        let purchases = self.purchases.list().await;
        spend_by_month(purchases.iter().map(Record::payload))
    }

    pub async fn total_spent(&self) -> f64 {
        let purchases = self.purchases.list().await;
        total_spent(purchases.iter().map(Record::payload))
    }

    /// Run a reconciliation pass over both collections.
    pub async fn sync_now(&self) -> SyncSummary {
        let (inventory, purchases) = tokio::join!(self.inventory.reconcile(), self.purchases.reconcile());
        SyncSummary {
            inventory,
            purchases,
        }
    }

    /// Pull both collections from the remote store.
    pub async fn refresh(&self) -> Result<RefreshResult, ReconcileError> {
        Ok(RefreshResult {
            inventory: self.inventory.refresh_from_remote().await?,
            purchases: self.purchases.refresh_from_remote().await?,
        })
    }

    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            connectivity: self.offline.state(),
            syncing: self.inventory.is_syncing() || self.purchases.is_syncing(),
            pending_items: self.inventory.pending_count().await,
            pending_purchases: self.purchases.pending_count().await,
        }
    }

    /// Resolves after the next local change to either collection.
    pub async fn changed(&self) {
        tokio::select! {
            _ = self.inventory.changed() => {}
            _ = self.purchases.changed() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{InMemoryRemoteStore, RemoteCall};
    use crate::store::InMemoryLocalStore;
    use pantry_core::{PurchaseLine, Unit};

    struct Fixture {
        items_remote: Arc<InMemoryRemoteStore<InventoryItem>>,
        purchases_remote: Arc<InMemoryRemoteStore<Purchase>>,
        offline: OfflineMode,
        pantry: Pantry,
    }

    async fn fixture() -> Fixture {
        let items_remote = InMemoryRemoteStore::<InventoryItem>::arc();
        let purchases_remote = InMemoryRemoteStore::<Purchase>::arc();
        let offline = OfflineMode::new();
        let pantry = Pantry::with_parts(
            items_remote.clone(),
            purchases_remote.clone(),
            Arc::new(InMemoryLocalStore::new()),
            offline.clone(),
        )
        .await
        .unwrap();
        Fixture {
            items_remote,
            purchases_remote,
            offline,
            pantry,
        }
    }

    fn groceries() -> Purchase {
        Purchase::new(
            vec![
                PurchaseLine::new("Milk", 2.0, 1.2, Unit::Litre),
                PurchaseLine::new("Apples", 6.0, 0.5, Unit::Pieces),
            ],
            Some("Corner Shop".to_string()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn offline_edits_sync_once_back_online() {
        let f = fixture().await;
        f.offline.set_offline();

        let milk = f
            .pantry
            .add_item(InventoryItem::new("Milk", 1.0, Unit::Litre))
            .await
            .unwrap();
        f.pantry
            .update_item(&milk.canonical_id(), &InventoryItemPatch::quantity(2.0))
            .await
            .unwrap();

        let status = f.pantry.status().await;
        assert_eq!(status.connectivity, ConnectivityState::Offline);
        assert_eq!(status.pending_items, 1);
        assert!(f.pantry.sync_now().await.inventory.partial);

        f.offline.set_online();
        let summary = f.pantry.sync_now().await;

        assert!(summary.is_clean());
        assert_eq!(f.items_remote.calls(), vec![RemoteCall::Create]);
        assert_eq!(f.pantry.status().await.pending_items, 0);
    }

    #[tokio::test]
    async fn logging_a_purchase_stocks_the_inventory() {
        let f = fixture().await;
        f.pantry
            .add_item(InventoryItem::new("milk", 1.0, Unit::Litre))
            .await
            .unwrap();

        let purchase = f.pantry.log_purchase(groceries()).await.unwrap();
        assert!((purchase.payload().total_cost - 5.4).abs() < 1e-9);

        let items = f.pantry.items().await;
        assert_eq!(items.len(), 2);
        let milk = items.iter().find(|i| i.payload().unit == Unit::Litre).unwrap();
        assert_eq!(milk.payload().quantity, 3.0);
        assert!(milk.payload().purchase_date.is_some());
        let apples = items.iter().find(|i| i.payload().name == "Apples").unwrap();
        assert_eq!(apples.payload().quantity, 6.0);

        f.pantry.sync_now().await;
        assert_eq!(f.purchases_remote.len(), 1);
        assert_eq!(f.items_remote.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_all_reach_the_inventory() {
        let f = fixture().await;
        let pantry = Arc::new(f.pantry);
        pantry
            .add_item(InventoryItem::new("Milk", 0.0, Unit::Litre))
            .await
            .unwrap();

        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let pantry = pantry.clone();
                tokio::spawn(async move {
                    let milk = PurchaseLine::new("milk", 1.0, 1.0, Unit::Litre);
                    pantry
                        .log_purchase(Purchase::new(vec![milk], None, Utc::now()))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(pantry.purchases().await.len(), 40);
        let items = pantry.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload().quantity, 40.0);
    }

    #[tokio::test]
    async fn unknown_purchase_units_are_recorded_but_not_stocked() {
        let f = fixture().await;
        let purchase = Purchase::new(
            vec![
                PurchaseLine::new("Crisps", 2.0, 1.5, "bag"),
                PurchaseLine::new("Eggs", 12.0, 0.3, Unit::Pieces),
            ],
            None,
            Utc::now(),
        );

        let record = f.pantry.log_purchase(purchase).await.unwrap();
        assert_eq!(record.payload().items[0].unit, "bag");

        let items = f.pantry.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload().name, "Eggs");
    }

    #[tokio::test]
    async fn invalid_purchase_leaves_inventory_alone() {
        let f = fixture().await;
        let empty = Purchase::new(Vec::new(), None, Utc::now());

        assert!(matches!(
            f.pantry.log_purchase(empty).await,
            Err(ReconcileError::Validation(_))
        ));
        assert!(f.pantry.items().await.is_empty());
        assert!(f.pantry.purchases().await.is_empty());
    }

    #[tokio::test]
    async fn read_side_helpers_filter_items() {
        let f = fixture().await;
        let now = Utc::now();
        f.pantry
            .add_item(InventoryItem::new("Rice", 5.0, Unit::Kilogram))
            .await
            .unwrap();
        f.pantry
            .add_item(InventoryItem::new("Salt", 0.5, Unit::Kilogram))
            .await
            .unwrap();
        f.pantry
            .add_item(
                InventoryItem::new("Yogurt", 4.0, Unit::Pieces).with_expiry(now + Duration::days(2)),
            )
            .await
            .unwrap();
        f.pantry
            .add_item(
                InventoryItem::new("Cheese", 2.0, Unit::Pieces).with_expiry(now + Duration::days(30)),
            )
            .await
            .unwrap();

        let low: Vec<_> = f
            .pantry
            .low_stock()
            .await
            .into_iter()
            .map(|r| r.payload().name.clone())
            .collect();
        assert_eq!(low, vec!["Salt".to_string()]);

        let expiring = f.pantry.expiring_within(Duration::days(7)).await;
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].payload().name, "Yogurt");
    }

    #[tokio::test]
    async fn removed_items_disappear_and_spend_is_summarised() {
        let f = fixture().await;
        let purchase = f.pantry.log_purchase(groceries()).await.unwrap();
        let milk = f.pantry.items().await.remove(0);

        assert_eq!(
            f.pantry.remove_item(&milk.canonical_id()).await.unwrap(),
            Deletion::Removed
        );
        assert_eq!(f.pantry.items().await.len(), 1);

        let by_month = f.pantry.spend_by_month().await;
        assert_eq!(by_month.len(), 1);
        assert_eq!(
            by_month.get(&purchase.payload().month_key()).copied(),
            Some(purchase.payload().total_cost)
        );
        assert_eq!(f.pantry.total_spent().await, purchase.payload().total_cost);
    }
}
