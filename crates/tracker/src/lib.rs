//! # Product Ratio Tracker
//!
//! Orchestrates one tracking run: fetch the catalog, aggregate per-category counts,
//! persist the day's snapshot, export it, analyse the ratios and, when they drift
//! past tolerance, route an alert to the notification channel.
//!
//! Every step runs sequentially. A failing fetch aborts the run before anything is
//! stored. Store, export and notification failures abort the rest of the run. A failed
//! read of the previous snapshot only costs the day-over-day delta.

use alerter::{AlertReport, Notifier};
use analyzer::{AnalysisError, RatioAnalysis, RatioEngine};
use api_client::CatalogSource;
use chrono::{Local, NaiveDate};
use core_types::{Snapshot, SnapshotDelta};
use database::{SnapshotStore, UpsertOutcome};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, Span};

pub mod aggregate;
pub mod error;
pub mod export;

pub use aggregate::aggregate_counts;
pub use error::TrackerError;

/// How the analysis step of a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// The snapshot held no products, so no analysis was possible.
    NoData,
    /// Every category is within tolerance of its target.
    Balanced { analysis: RatioAnalysis },
    /// At least one category is out of tolerance. `delivered` is false when no
    /// notification channel is configured.
    Alerted {
        analysis: RatioAnalysis,
        alert: AlertReport,
        delivered: bool,
    },
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub snapshot: Snapshot,
    pub upsert: UpsertOutcome,
    /// Catalog items whose category has no target.
    pub skipped_products: usize,
    pub export_path: Option<PathBuf>,
    /// Change against the most recent earlier snapshot, when there is one.
    pub delta: Option<SnapshotDelta>,
    pub outcome: RunOutcome,
}

/// The central orchestrator for a tracking run.
pub struct Tracker {
    catalog: Arc<dyn CatalogSource>,
    store: Arc<dyn SnapshotStore>,
    notifier: Option<Arc<dyn Notifier>>,
    engine: RatioEngine,
    report_dir: Option<PathBuf>,
    span: Span,
}

impl Tracker {
    /// Creates a tracker. All of its log output is recorded inside `span`.
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        store: Arc<dyn SnapshotStore>,
        engine: RatioEngine,
        span: Span,
    ) -> Self {
        Self {
            catalog,
            store,
            notifier: None,
            engine,
            report_dir: None,
            span,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Enables the per-run JSON export under `report_dir`.
    pub fn with_report_dir(mut self, report_dir: impl Into<PathBuf>) -> Self {
        self.report_dir = Some(report_dir.into());
        self
    }

    /// Runs one tracking cycle, storing counts under `snapshot_date` for products
    /// selected by `target_date`.
    pub async fn run(
        &self,
        snapshot_date: NaiveDate,
        target_date: NaiveDate,
    ) -> Result<RunReport, TrackerError> {
        self.run_steps(snapshot_date, target_date)
            .instrument(self.span.clone())
            .await
    }

    async fn run_steps(
        &self,
        snapshot_date: NaiveDate,
        target_date: NaiveDate,
    ) -> Result<RunReport, TrackerError> {
        // 1. Fetch. Nothing is persisted if this fails.
        let products = self.catalog.fetch_products(target_date).await.map_err(|e| {
            tracing::error!(error = %e, "Catalog fetch failed; aborting run.");
            e
        })?;

        // 2. Aggregate
        let (counts, skipped_products) = aggregate_counts(&products, self.engine.targets());
        if skipped_products > 0 {
            tracing::debug!(skipped = skipped_products, "Products without a target category were not counted.");
        }
        let snapshot = Snapshot::new(snapshot_date, counts);
        tracing::info!(date = %snapshot_date, total = snapshot.total(), counts = ?snapshot.counts, "Aggregated product counts.");

        // 3. Persist
        let upsert = self.store.upsert_snapshot(&snapshot).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to upsert product counts.");
            e
        })?;
        tracing::info!(outcome = ?upsert, "Snapshot stored.");

        // 4. Export
        let export_path = match &self.report_dir {
            Some(dir) => Some(
                export::write_snapshot_export(dir, &snapshot, Local::now())
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, dir = %dir.display(), "Failed to export snapshot.");
                        e
                    })?,
            ),
            None => None,
        };

        let delta = match self.store.get_previous_snapshot(snapshot_date).await {
            Ok(previous) => previous.map(|previous| snapshot.delta_from(&previous)),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read the previous snapshot; skipping day-over-day change.");
                None
            }
        };
        if let Some(delta) = &delta {
            tracing::info!(since = %delta.from, total_change = delta.total_change, "Day-over-day change.");
        }

        // 5. Analyse and route
        let outcome = self.analyze_and_alert(&snapshot).await?;

        Ok(RunReport {
            snapshot,
            upsert,
            skipped_products,
            export_path,
            delta,
            outcome,
        })
    }

    async fn analyze_and_alert(&self, snapshot: &Snapshot) -> Result<RunOutcome, TrackerError> {
        let analysis = match self.engine.analyze(&snapshot.counts) {
            Ok(analysis) => analysis,
            Err(AnalysisError::NoProducts) => {
                tracing::error!("No products uploaded, skipping ratio check.");
                return Ok(RunOutcome::NoData);
            }
        };

        let Some(alert) = AlertReport::build(snapshot.date, &analysis) else {
            tracing::info!("Product ratio within expected range.");
            return Ok(RunOutcome::Balanced { analysis });
        };

        let delivered = match &self.notifier {
            Some(notifier) => {
                notifier.send_alert(&alert).await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to send ratio alert.");
                    e
                })?;
                tracing::info!("Alert triggered due to ratio deviation.");
                true
            }
            None => {
                tracing::warn!(subject = %alert.subject, "Ratios deviate but no notification channel is configured.");
                false
            }
        };

        Ok(RunOutcome::Alerted {
            analysis,
            alert,
            delivered,
        })
    }
}
