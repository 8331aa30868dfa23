use crate::{AppState, error::AppError};
use analyzer::{AnalysisError, CategoryBreakdown, RatioEngine, Shortfalls};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use core_types::{CategoryCounts, Snapshot, SnapshotDelta};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// The ratio figures shown next to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisView {
    pub breakdown: Vec<CategoryBreakdown>,
    pub shortfalls: Shortfalls,
    pub balanced: bool,
    pub recommendations: Vec<String>,
}

/// A stored snapshot with its analysis. Zero-total snapshots carry `no_data: true`
/// and no analysis fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotView {
    pub date: NaiveDate,
    pub counts: CategoryCounts,
    pub total: u64,
    pub no_data: bool,
    #[serde(flatten)]
    pub analysis: Option<AnalysisView>,
}

impl SnapshotView {
    pub fn build(snapshot: Snapshot, engine: &RatioEngine) -> Self {
        let analysis = match (engine.analyze(&snapshot.counts), engine.breakdown(&snapshot.counts)) {
            (Ok(analysis), Ok(breakdown)) => Some(AnalysisView {
                breakdown,
                shortfalls: analysis.shortfalls,
                balanced: analysis.balanced,
                recommendations: analysis.recommendations,
            }),
            (Err(AnalysisError::NoProducts), _) | (_, Err(AnalysisError::NoProducts)) => None,
        };
        Self {
            date: snapshot.date,
            total: snapshot.total(),
            no_data: analysis.is_none(),
            counts: snapshot.counts,
            analysis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonView {
    pub current: SnapshotView,
    pub previous: Option<SnapshotView>,
    pub delta: Option<SnapshotDelta>,
}

fn no_snapshot(date: NaiveDate) -> AppError {
    AppError::NotFound(format!("No snapshot stored for {date}"))
}

/// # GET /api/snapshots?limit=N
/// Stored snapshots, newest first.
pub async fn list_snapshots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SnapshotView>>, AppError> {
    let snapshots = state.store.list_snapshots(query.limit).await?;
    Ok(Json(
        snapshots
            .into_iter()
            .map(|s| SnapshotView::build(s, &state.engine))
            .collect(),
    ))
}

/// # GET /api/snapshots/dates
pub async fn list_dates(State(state): State<Arc<AppState>>) -> Result<Json<Vec<NaiveDate>>, AppError> {
    Ok(Json(state.store.list_dates().await?))
}

/// # GET /api/snapshots/latest
pub async fn latest_snapshot(State(state): State<Arc<AppState>>) -> Result<Json<SnapshotView>, AppError> {
    let snapshot = state
        .store
        .latest_snapshot()
        .await?
        .ok_or_else(|| AppError::NotFound("No snapshots stored yet".to_string()))?;
    Ok(Json(SnapshotView::build(snapshot, &state.engine)))
}

/// # GET /api/snapshots/:date
pub async fn get_snapshot(
    Path(date): Path<NaiveDate>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SnapshotView>, AppError> {
    let snapshot = state.store.get_snapshot(date).await?.ok_or_else(|| no_snapshot(date))?;
    Ok(Json(SnapshotView::build(snapshot, &state.engine)))
}

/// # GET /api/snapshots/:date/comparison
/// The snapshot for `date` against the most recent earlier one.
pub async fn compare_with_previous(
    Path(date): Path<NaiveDate>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ComparisonView>, AppError> {
    let current = state.store.get_snapshot(date).await?.ok_or_else(|| no_snapshot(date))?;
    let previous = state.store.get_previous_snapshot(date).await?;
    let delta = previous.as_ref().map(|p| current.delta_from(p));

    Ok(Json(ComparisonView {
        current: SnapshotView::build(current, &state.engine),
        previous: previous.map(|p| SnapshotView::build(p, &state.engine)),
        delta,
    }))
}
