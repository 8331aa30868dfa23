use chrono::{DateTime, Local, NaiveDate};
use core_types::{CategoryCounts, Snapshot};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The row written for each run: the snapshot plus its total.
#[derive(Debug, Serialize)]
struct SnapshotExport<'a> {
    date: NaiveDate,
    #[serde(flatten)]
    counts: &'a CategoryCounts,
    total_products: u64,
}

/// Where a run's export lands: `<root>/<date>/snapshot_<date>_<HH-MM-SS>.json`.
pub fn export_path(root: &Path, date: NaiveDate, written_at: DateTime<Local>) -> PathBuf {
    let day = date.format("%Y-%m-%d").to_string();
    root.join(&day)
        .join(format!("snapshot_{}_{}.json", day, written_at.format("%H-%M-%S")))
}

/// Writes the snapshot export for one run and returns its path.
pub async fn write_snapshot_export(
    root: &Path,
    snapshot: &Snapshot,
    written_at: DateTime<Local>,
) -> Result<PathBuf, crate::TrackerError> {
    let path = export_path(root, snapshot.date, written_at);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let export = SnapshotExport {
        date: snapshot.date,
        counts: &snapshot.counts,
        total_products: snapshot.total(),
    };
    tokio::fs::write(&path, serde_json::to_vec_pretty(&export)?).await?;

    tracing::info!(path = %path.display(), "Snapshot export saved.");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn writes_flat_row_under_date_folder() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let snapshot = Snapshot::new(date, [("rings", 3), ("pendants", 1)].into_iter().collect());
        let written_at = Local.with_ymd_and_hms(2025, 3, 14, 18, 30, 5).unwrap();

        let path = write_snapshot_export(dir.path(), &snapshot, written_at).await.unwrap();
        assert_eq!(
            path,
            dir.path().join("2025-03-14").join("snapshot_2025-03-14_18-30-05.json")
        );

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["date"], "2025-03-14");
        assert_eq!(json["rings"], 3);
        assert_eq!(json["pendants"], 1);
        assert_eq!(json["total_products"], 4);
    }
}
