use crate::error::DbError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{CategoryCounts, Snapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// What an upsert did to the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UpsertOutcome {
    /// No snapshot existed for the date.
    Inserted,
    /// Some categories changed; only those were written.
    Updated { changed: Vec<String> },
    /// Every submitted count matched what was stored.
    Unchanged,
}

/// Durable storage of daily snapshots, keyed by date.
///
/// Writes are per category and last-write-wins: an upsert overwrites the categories it
/// carries and leaves other stored categories for that date alone.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn upsert_snapshot(&self, snapshot: &Snapshot) -> Result<UpsertOutcome, DbError>;

    async fn get_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>, DbError>;

    /// The most recent snapshot strictly before `date`.
    async fn get_previous_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>, DbError>;

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>, DbError>;

    /// Snapshots newest first, at most `limit` of them when given.
    async fn list_snapshots(&self, limit: Option<u32>) -> Result<Vec<Snapshot>, DbError>;

    /// Every stored date, newest first.
    async fn list_dates(&self) -> Result<Vec<NaiveDate>, DbError>;
}

/// Categories whose incoming count differs from (or is missing in) the stored counts.
pub fn changed_categories(stored: &CategoryCounts, incoming: &CategoryCounts) -> Vec<String> {
    incoming
        .iter()
        .filter(|(category, count)| !stored.contains(category) || stored.get(category) != *count)
        .map(|(category, _)| category.to_string())
        .collect()
}

/// Classifies an upsert given the stored counts (if any) and the categories that changed.
pub(crate) fn classify_upsert(stored: Option<&CategoryCounts>, changed: Vec<String>) -> UpsertOutcome {
    match stored {
        None => UpsertOutcome::Inserted,
        Some(_) if changed.is_empty() => UpsertOutcome::Unchanged,
        Some(_) => UpsertOutcome::Updated { changed },
    }
}

/// A process-local store. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<BTreeMap<NaiveDate, CategoryCounts>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshots(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            snapshots: RwLock::new(snapshots.into_iter().map(|s| (s.date, s.counts)).collect()),
        }
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn upsert_snapshot(&self, snapshot: &Snapshot) -> Result<UpsertOutcome, DbError> {
        let mut snapshots = self.snapshots.write().await;
        let stored = snapshots.get(&snapshot.date);
        let changed = match stored {
            Some(existing) => changed_categories(existing, &snapshot.counts),
            None => snapshot.counts.iter().map(|(c, _)| c.to_string()).collect(),
        };
        let outcome = classify_upsert(stored, changed.clone());

        let entry = snapshots.entry(snapshot.date).or_default();
        for category in &changed {
            entry.insert(category, snapshot.counts.get(category));
        }
        Ok(outcome)
    }

    async fn get_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>, DbError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&date).map(|counts| Snapshot::new(date, counts.clone())))
    }

    async fn get_previous_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>, DbError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .range(..date)
            .next_back()
            .map(|(d, counts)| Snapshot::new(*d, counts.clone())))
    }

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>, DbError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .iter()
            .next_back()
            .map(|(d, counts)| Snapshot::new(*d, counts.clone())))
    }

    async fn list_snapshots(&self, limit: Option<u32>) -> Result<Vec<Snapshot>, DbError> {
        let snapshots = self.snapshots.read().await;
        let limit = limit.map_or(usize::MAX, |l| l as usize);
        Ok(snapshots
            .iter()
            .rev()
            .take(limit)
            .map(|(d, counts)| Snapshot::new(*d, counts.clone()))
            .collect())
    }

    async fn list_dates(&self) -> Result<Vec<NaiveDate>, DbError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.keys().rev().copied().collect())
    }
}
