use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalizes a category label: trimmed and lower-cased.
pub fn normalize_category(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A single catalog item as reported by the catalog source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    /// The raw category label, e.g. "Rings".
    pub product_type: String,
    pub status: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// The normalized category this product counts towards.
    pub fn category(&self) -> String {
        normalize_category(&self.product_type)
    }

    /// A product counts as active when its status says so or it has been published.
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active") || self.published_at.is_some()
    }
}

/// Per-category product counts. Keys are always normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct CategoryCounts(BTreeMap<String, u64>);

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the count for a category, replacing any previous value.
    pub fn insert(&mut self, category: &str, count: u64) {
        self.0.insert(normalize_category(category), count);
    }

    /// Adds `by` to a category's count, creating it at zero first if needed.
    pub fn increment(&mut self, category: &str, by: u64) {
        *self.0.entry(normalize_category(category)).or_insert(0) += by;
    }

    /// Count for a category; categories that were never recorded count as zero.
    pub fn get(&self, category: &str) -> u64 {
        self.0.get(&normalize_category(category)).copied().unwrap_or(0)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.0.contains_key(&normalize_category(category))
    }

    /// Sum of every recorded category. The denominator for all percentages.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, u64>> for CategoryCounts {
    fn from(map: BTreeMap<String, u64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<CategoryCounts> for BTreeMap<String, u64> {
    fn from(counts: CategoryCounts) -> Self {
        counts.0
    }
}

impl<K: AsRef<str>> FromIterator<(K, u64)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut counts = CategoryCounts::new();
        for (category, count) in iter {
            counts.insert(category.as_ref(), count);
        }
        counts
    }
}

/// Target share of the catalog per category, in percent (0-100).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Decimal>", into = "BTreeMap<String, Decimal>")]
pub struct TargetRatios(BTreeMap<String, Decimal>);

impl TargetRatios {
    /// Allowed distance of the ratio sum from 100 before it is reported.
    pub const SUM_TOLERANCE: Decimal = dec!(0.1);

    pub fn new<K: AsRef<str>>(ratios: impl IntoIterator<Item = (K, Decimal)>) -> Self {
        Self(
            ratios
                .into_iter()
                .map(|(k, v)| (normalize_category(k.as_ref()), v))
                .collect(),
        )
    }

    pub fn get(&self, category: &str) -> Option<Decimal> {
        self.0.get(&normalize_category(category)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn sum(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    /// True when the ratios add up to 100 within [`Self::SUM_TOLERANCE`].
    pub fn sums_to_hundred(&self) -> bool {
        (self.sum() - Decimal::ONE_HUNDRED).abs() <= Self::SUM_TOLERANCE
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TargetRatios {
    fn default() -> Self {
        Self::new([
            ("rings", dec!(40)),
            ("pendants", dec!(25)),
            ("earrings", dec!(20)),
            ("bracelets", dec!(15)),
        ])
    }
}

impl From<BTreeMap<String, Decimal>> for TargetRatios {
    fn from(map: BTreeMap<String, Decimal>) -> Self {
        Self::new(map)
    }
}

impl From<TargetRatios> for BTreeMap<String, Decimal> {
    fn from(ratios: TargetRatios) -> Self {
        ratios.0
    }
}

/// The full set of category counts recorded for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub counts: CategoryCounts,
}

impl Snapshot {
    pub fn new(date: NaiveDate, counts: CategoryCounts) -> Self {
        Self { date, counts }
    }

    pub fn total(&self) -> u64 {
        self.counts.total()
    }

    /// Day-over-day change from `previous` to this snapshot, over the union of both category sets.
    pub fn delta_from(&self, previous: &Snapshot) -> SnapshotDelta {
        let mut changes = BTreeMap::new();
        for (category, _) in previous.counts.iter().chain(self.counts.iter()) {
            let change = self.counts.get(category) as i64 - previous.counts.get(category) as i64;
            changes.insert(category.to_string(), change);
        }
        SnapshotDelta {
            from: previous.date,
            to: self.date,
            total_change: self.total() as i64 - previous.total() as i64,
            changes,
        }
    }
}

/// Per-category change between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDelta {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub changes: BTreeMap<String, i64>,
    pub total_change: i64,
}
