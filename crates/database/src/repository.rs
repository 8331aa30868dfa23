use crate::DbError;
use crate::store::{SnapshotStore, UpsertOutcome, changed_categories, classify_upsert};
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{CategoryCounts, Snapshot};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// The `DbRepository` provides the PostgreSQL-backed snapshot store.
/// It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

fn count_from_row(row: &PgRow) -> Result<(String, u64), DbError> {
    let category: String = row.try_get("category")?;
    let count: i64 = row.try_get("count")?;
    let count = u64::try_from(count)
        .map_err(|_| DbError::InvalidData(format!("negative count {count} for '{category}'")))?;
    Ok((category, count))
}

/// Folds `(snapshot_date, category, count)` rows, sorted by date, into snapshots.
fn group_rows(rows: &[PgRow]) -> Result<Vec<Snapshot>, DbError> {
    let mut snapshots: Vec<Snapshot> = Vec::new();
    for row in rows {
        let date: NaiveDate = row.try_get("snapshot_date")?;
        let (category, count) = count_from_row(row)?;
        match snapshots.last_mut() {
            Some(last) if last.date == date => last.counts.insert(&category, count),
            _ => {
                let mut counts = CategoryCounts::new();
                counts.insert(&category, count);
                snapshots.push(Snapshot::new(date, counts));
            }
        }
    }
    Ok(snapshots)
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn counts_for_date<'e, E>(executor: E, date: NaiveDate) -> Result<Option<CategoryCounts>, DbError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows = sqlx::query(
            r#"
            SELECT category, count
            FROM category_counts
            WHERE snapshot_date = $1
            "#,
        )
        .bind(date)
        .fetch_all(executor)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        let counts = rows
            .iter()
            .map(count_from_row)
            .collect::<Result<Vec<_>, DbError>>()?
            .into_iter()
            .collect();
        Ok(Some(counts))
    }

    async fn snapshot_at(&self, date: Option<NaiveDate>) -> Result<Option<Snapshot>, DbError> {
        let Some(date) = date else {
            return Ok(None);
        };
        Ok(Self::counts_for_date(&self.pool, date)
            .await?
            .map(|counts| Snapshot::new(date, counts)))
    }
}

#[async_trait]
impl SnapshotStore for DbRepository {
    async fn upsert_snapshot(&self, snapshot: &Snapshot) -> Result<UpsertOutcome, DbError> {
        let mut tx = self.pool.begin().await?;

        let stored = Self::counts_for_date(&mut *tx, snapshot.date).await?;
        let changed = match &stored {
            Some(existing) => changed_categories(existing, &snapshot.counts),
            None => snapshot.counts.iter().map(|(c, _)| c.to_string()).collect(),
        };

        for category in &changed {
            let count = i64::try_from(snapshot.counts.get(category))
                .map_err(|_| DbError::InvalidData(format!("count for '{category}' overflows BIGINT")))?;
            sqlx::query(
                r#"
                INSERT INTO category_counts (snapshot_date, category, count)
                VALUES ($1, $2, $3)
                ON CONFLICT (snapshot_date, category)
                DO UPDATE SET count = EXCLUDED.count, updated_at = now()
                "#,
            )
            .bind(snapshot.date)
            .bind(category)
            .bind(count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let outcome = classify_upsert(stored.as_ref(), changed);
        tracing::debug!(date = %snapshot.date, outcome = ?outcome, "Upserted snapshot.");
        Ok(outcome)
    }

    async fn get_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>, DbError> {
        self.snapshot_at(Some(date)).await
    }

    async fn get_previous_snapshot(&self, date: NaiveDate) -> Result<Option<Snapshot>, DbError> {
        let previous: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT MAX(snapshot_date) FROM category_counts WHERE snapshot_date < $1",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        self.snapshot_at(previous).await
    }

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>, DbError> {
        let latest: Option<NaiveDate> = sqlx::query_scalar("SELECT MAX(snapshot_date) FROM category_counts")
            .fetch_one(&self.pool)
            .await?;
        self.snapshot_at(latest).await
    }

    async fn list_snapshots(&self, limit: Option<u32>) -> Result<Vec<Snapshot>, DbError> {
        // LIMIT NULL means no limit in PostgreSQL.
        let rows = sqlx::query(
            r#"
            SELECT snapshot_date, category, count
            FROM category_counts
            WHERE snapshot_date IN (
                SELECT DISTINCT snapshot_date
                FROM category_counts
                ORDER BY snapshot_date DESC
                LIMIT $1
            )
            ORDER BY snapshot_date DESC, category ASC
            "#,
        )
        .bind(limit.map(i64::from))
        .fetch_all(&self.pool)
        .await?;

        group_rows(&rows)
    }

    async fn list_dates(&self) -> Result<Vec<NaiveDate>, DbError> {
        let dates = sqlx::query_scalar(
            "SELECT DISTINCT snapshot_date FROM category_counts ORDER BY snapshot_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }
}
