use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::item::Unit;
use crate::payload::SyncPayload;

/// Tolerance when comparing a stored total against the sum of its lines.
const TOTAL_EPSILON: f64 = 0.005;

/// One line of a purchase receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub name: String,
    pub quantity: f64,
    /// Unit price.
    pub price: f64,
    /// Free text as printed on the receipt (`kg`, `bag`, `6-pack`, ...).
    pub unit: String,
}

impl PurchaseLine {
    pub fn new(name: impl Into<String>, quantity: f64, price: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
            unit: unit.into(),
        }
    }

    /// The inventory unit this line stocks into, if its unit is one.
    pub fn inventory_unit(&self) -> Option<Unit> {
        self.unit.parse().ok()
    }

    pub fn cost(&self) -> f64 {
        self.price * self.quantity
    }
}

/// A shopping trip: what was bought, where, and what it cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub items: Vec<PurchaseLine>,
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    pub date: DateTime<Utc>,
}

impl Purchase {
    /// Build a purchase, deriving `total_cost` from the lines.
    pub fn new(items: Vec<PurchaseLine>, store_name: Option<String>, date: DateTime<Utc>) -> Self {
        let total_cost = items.iter().map(PurchaseLine::cost).sum();
        Self {
            items,
            total_cost,
            store_name,
            date,
        }
    }

    /// `YYYY-MM` bucket the purchase falls into.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.date.year(), self.date.month())
    }
}

/// Partial update of a [`Purchase`]. Replacing the lines recomputes the total.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePatch {
    pub items: Option<Vec<PurchaseLine>>,
    pub store_name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl SyncPayload for Purchase {
    type Patch = PurchasePatch;

    const COLLECTION: &'static str = "purchases";

    fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("purchase must contain at least one item"));
        }
        for (idx, line) in self.items.iter().enumerate() {
            if line.name.trim().is_empty() {
                return Err(DomainError::validation(format!("item {idx}: name cannot be empty")));
            }
            if line.unit.trim().is_empty() {
                return Err(DomainError::validation(format!("item {idx}: unit cannot be empty")));
            }
            if !line.quantity.is_finite() || line.quantity <= 0.0 {
                return Err(DomainError::validation(format!(
                    "item {idx}: quantity must be positive"
                )));
            }
            if !line.price.is_finite() || line.price < 0.0 {
                return Err(DomainError::validation(format!("item {idx}: price cannot be negative")));
            }
        }
        let expected: f64 = self.items.iter().map(PurchaseLine::cost).sum();
        if (expected - self.total_cost).abs() > TOTAL_EPSILON {
            return Err(DomainError::validation(format!(
                "totalCost {} does not match items ({expected})",
                self.total_cost
            )));
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        if let Some(items) = &patch.items {
            self.items = items.clone();
            self.total_cost = self.items.iter().map(PurchaseLine::cost).sum();
        }
        if let Some(store_name) = &patch.store_name {
            self.store_name = Some(store_name.clone());
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
    }
}

/// Total spend across purchases.
pub fn total_spent<'a>(purchases: impl IntoIterator<Item = &'a Purchase>) -> f64 {
    purchases.into_iter().map(|p| p.total_cost).sum()
}

/// Spend per `YYYY-MM`, oldest month first.
pub fn spend_by_month<'a>(purchases: impl IntoIterator<Item = &'a Purchase>) -> BTreeMap<String, f64> {
    let mut months = BTreeMap::new();
    for purchase in purchases {
        *months.entry(purchase.month_key()).or_insert(0.0) += purchase.total_cost;
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, 10, 0, 0).unwrap()
    }

    fn groceries() -> Vec<PurchaseLine> {
        vec![
            PurchaseLine::new("Milk", 2.0, 1.25, Unit::Litre),
            PurchaseLine::new("Bread", 1.0, 3.0, Unit::Pieces),
        ]
    }

    #[test]
    fn new_derives_total_from_lines() {
        let purchase = Purchase::new(groceries(), Some("Corner shop".into()), at(1, 5));
        assert!((purchase.total_cost - 5.5).abs() < f64::EPSILON);
        assert!(purchase.validate().is_ok());
    }

    #[test]
    fn mismatched_total_is_rejected() {
        let mut purchase = Purchase::new(groceries(), None, at(1, 5));
        purchase.total_cost = 1.0;
        assert!(matches!(purchase.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn empty_purchase_is_rejected() {
        let purchase = Purchase::new(vec![], None, at(1, 5));
        assert!(purchase.validate().is_err());
    }

    #[test]
    fn patching_lines_recomputes_total() {
        let mut purchase = Purchase::new(groceries(), None, at(1, 5));
        purchase.apply_patch(&PurchasePatch {
            items: Some(vec![PurchaseLine::new("Cheese", 2.0, 4.0, Unit::Pieces)]),
            ..PurchasePatch::default()
        });
        assert!((purchase.total_cost - 8.0).abs() < f64::EPSILON);
        assert!(purchase.validate().is_ok());
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let purchase = Purchase::new(groceries(), Some("Market".into()), at(2, 1));
        let json = serde_json::to_value(&purchase).unwrap();
        assert!(json.get("totalCost").is_some());
        assert_eq!(json["storeName"], "Market");
        assert_eq!(json["items"][0]["unit"], "L");
    }

    #[test]
    fn receipt_units_are_free_text() {
        let json = serde_json::json!({
            "items": [
                {"name": "Crisps", "quantity": 2.0, "price": 1.5, "unit": "bag"},
                {"name": "Milk", "quantity": 1.0, "price": 1.0, "unit": "L"}
            ],
            "totalCost": 4.0,
            "date": "2026-02-01T10:00:00Z"
        });
        let purchase: Purchase = serde_json::from_value(json).unwrap();

        assert!(purchase.validate().is_ok());
        assert_eq!(purchase.items[0].inventory_unit(), None);
        assert_eq!(purchase.items[1].inventory_unit(), Some(Unit::Litre));
    }

    #[test]
    fn blank_unit_is_rejected() {
        let purchase = Purchase::new(vec![PurchaseLine::new("Tea", 1.0, 4.0, " ")], None, at(1, 5));
        assert!(matches!(purchase.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn spend_is_grouped_by_month() {
        let purchases = vec![
            Purchase::new(groceries(), None, at(1, 5)),
            Purchase::new(groceries(), None, at(1, 20)),
            Purchase::new(vec![PurchaseLine::new("Tea", 1.0, 4.0, Unit::Pieces)], None, at(2, 2)),
        ];

        let months = spend_by_month(&purchases);
        assert_eq!(months.len(), 2);
        assert!((months["2026-01"] - 11.0).abs() < f64::EPSILON);
        assert!((months["2026-02"] - 4.0).abs() < f64::EPSILON);
        assert!((total_spent(&purchases) - 15.0).abs() < f64::EPSILON);
    }
}
