use core::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::payload::SyncPayload;

/// Stock level at or below which an item counts as running low, unless the
/// item carries its own threshold.
pub const DEFAULT_LOW_STOCK_THRESHOLD: f64 = 1.0;

/// Measuring unit for quantities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Unit {
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "L")]
    Litre,
    #[serde(rename = "ml")]
    Millilitre,
    #[default]
    #[serde(rename = "pcs")]
    Pieces,
}

impl Unit {
    pub const ALL: [Unit; 5] = [
        Unit::Kilogram,
        Unit::Gram,
        Unit::Litre,
        Unit::Millilitre,
        Unit::Pieces,
    ];

    /// Wire spelling (`kg`, `g`, `L`, `ml`, `pcs`).
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Litre => "L",
            Unit::Millilitre => "ml",
            Unit::Pieces => "pcs",
        }
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Unit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown unit {s:?}")))
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.as_str().to_string()
    }
}

/// Nutrition facts, per 100 g/ml or per piece.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Nutrition {
    fn validate(&self) -> DomainResult<()> {
        let fields = [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::validation(format!(
                    "nutrition.{name} must be a non-negative number"
                )));
            }
        }
        Ok(())
    }
}

/// A food item on hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, quantity: f64, unit: Unit) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit,
            purchase_date: None,
            expiry_date: None,
            threshold: None,
            category: None,
            nutrition: None,
        }
    }

    pub fn with_expiry(mut self, expiry_date: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_purchase_date(mut self, purchase_date: DateTime<Utc>) -> Self {
        self.purchase_date = Some(purchase_date);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.threshold()
    }

    /// True if the item has an expiry date that falls before `now + window`.
    /// Already expired items count as expiring. A window past the end of the
    /// calendar covers every dated item.
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.expiry_date {
            Some(expiry) => now
                .checked_add_signed(window)
                .is_none_or(|limit| expiry <= limit),
            None => false,
        }
    }
}

/// Partial update of an [`InventoryItem`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<Unit>,
    pub purchase_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub threshold: Option<f64>,
    pub category: Option<String>,
    pub nutrition: Option<Nutrition>,
}

impl InventoryItemPatch {
    pub fn quantity(quantity: f64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl SyncPayload for InventoryItem {
    type Patch = InventoryItemPatch;

    const COLLECTION: &'static str = "inventory";

    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if let Some(threshold) = self.threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(DomainError::validation("threshold cannot be negative"));
            }
        }
        if let Some(nutrition) = &self.nutrition {
            nutrition.validate()?;
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: &Self::Patch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(date) = patch.purchase_date {
            self.purchase_date = Some(date);
        }
        if let Some(date) = patch.expiry_date {
            self.expiry_date = Some(date);
        }
        if let Some(threshold) = patch.threshold {
            self.threshold = Some(threshold);
        }
        if let Some(category) = &patch.category {
            self.category = Some(category.clone());
        }
        if let Some(nutrition) = patch.nutrition {
            self.nutrition = Some(nutrition);
        }
    }
}
