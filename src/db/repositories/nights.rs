use anyhow::{Context, Result};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::watch;

use crate::db::connection::Database;
use crate::db::models::SleepNight;

fn row_to_night(row: &Row) -> rusqlite::Result<SleepNight> {
    Ok(SleepNight {
        night_id: row.get("night_id")?,
        start_time_milli: row.get("start_time_milli")?,
        end_time_milli: row.get("end_time_milli")?,
        sleep_quality: row.get("sleep_quality")?,
    })
}

/// All recorded nights, newest first. Runs on the DB worker thread.
pub(crate) fn query_listing(conn: &Connection) -> Result<Vec<SleepNight>> {
    let mut stmt = conn.prepare(
        "SELECT night_id, start_time_milli, end_time_milli, sleep_quality
         FROM sleep_nights
         ORDER BY night_id DESC",
    )?;

    let nights = stmt
        .query_map([], row_to_night)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(nights)
}

/// Re-reads the listing and pushes it to observers. Called inside the same
/// worker task as the write it follows, so observers see publications in
/// write order.
fn publish_listing(conn: &Connection, changes: &watch::Sender<Vec<SleepNight>>) -> Result<()> {
    let listing = query_listing(conn).context("failed to read night listing")?;
    changes.send_replace(listing);
    Ok(())
}

impl Database {
    /// Inserts a night and returns it with the store-assigned id.
    pub async fn insert_night(&self, night: SleepNight) -> Result<SleepNight> {
        let mut record = night;
        let changes = self.changes.clone();

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sleep_nights (start_time_milli, end_time_milli, sleep_quality)
                 VALUES (?1, ?2, ?3)",
                params![
                    record.start_time_milli,
                    record.end_time_milli,
                    record.sleep_quality
                ],
            )
            .context("failed to insert night")?;

            record.night_id = conn.last_insert_rowid();
            publish_listing(conn, &changes)?;
            Ok(record)
        })
        .await
    }

    /// Overwrites the stored night with the same id. A missing id is logged
    /// and otherwise ignored.
    pub async fn update_night(&self, night: SleepNight) -> Result<()> {
        let record = night;
        let changes = self.changes.clone();

        self.execute(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE sleep_nights
                     SET start_time_milli = ?1, end_time_milli = ?2, sleep_quality = ?3
                     WHERE night_id = ?4",
                    params![
                        record.start_time_milli,
                        record.end_time_milli,
                        record.sleep_quality,
                        record.night_id
                    ],
                )
                .context("failed to update night")?;

            if rows == 0 {
                warn!("Update for night {} matched no row", record.night_id);
                return Ok(());
            }

            publish_listing(conn, &changes)
        })
        .await
    }

    pub async fn get_night(&self, night_id: i64) -> Result<Option<SleepNight>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT night_id, start_time_milli, end_time_milli, sleep_quality
                 FROM sleep_nights
                 WHERE night_id = ?1",
            )?;

            stmt.query_row(params![night_id], row_to_night)
                .optional()
                .context("failed to look up night")
        })
        .await
    }

    /// The most recently inserted night, if any.
    pub async fn get_latest_night(&self) -> Result<Option<SleepNight>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT night_id, start_time_milli, end_time_milli, sleep_quality
                 FROM sleep_nights
                 ORDER BY night_id DESC
                 LIMIT 1",
            )?;

            stmt.query_row([], row_to_night)
                .optional()
                .context("failed to look up latest night")
        })
        .await
    }

    /// Deletes every recorded night and publishes the empty listing.
    pub async fn clear_nights(&self) -> Result<()> {
        let changes = self.changes.clone();

        self.execute(move |conn| {
            conn.execute("DELETE FROM sleep_nights", [])
                .context("failed to clear nights")?;

            publish_listing(conn, &changes)
        })
        .await
    }

    pub async fn list_nights(&self) -> Result<Vec<SleepNight>> {
        self.execute(|conn| query_listing(conn)).await
    }

    /// Subscribes to the live listing. The receiver holds the current
    /// listing immediately; each committed write publishes the new one.
    pub fn observe_nights(&self) -> watch::Receiver<Vec<SleepNight>> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_db(dir: &tempfile::TempDir) -> Database {
        Database::new(dir.path().join("test.sqlite3")).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        let first = db.insert_night(SleepNight::started_at(1_000)).await.unwrap();
        let second = db.insert_night(SleepNight::started_at(2_000)).await.unwrap();

        assert!(first.night_id > 0);
        assert!(second.night_id > first.night_id);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        let first = db.insert_night(SleepNight::started_at(1_000)).await.unwrap();
        let second = db.insert_night(SleepNight::started_at(2_000)).await.unwrap();

        let nights = db.list_nights().await.unwrap();
        assert_eq!(nights.len(), 2);
        assert_eq!(nights[0].night_id, second.night_id);
        assert_eq!(nights[1].night_id, first.night_id);
    }

    #[tokio::test]
    async fn update_rewrites_the_stored_record() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        let mut night = db.insert_night(SleepNight::started_at(1_000)).await.unwrap();
        night.end_time_milli = 9_000;
        night.sleep_quality = 4;
        db.update_night(night.clone()).await.unwrap();

        let stored = db.get_night(night.night_id).await.unwrap().unwrap();
        assert_eq!(stored, night);
    }

    #[tokio::test]
    async fn update_of_missing_id_is_a_no_op() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        let mut phantom = SleepNight::started_at(1_000);
        phantom.night_id = 42;
        db.update_night(phantom).await.unwrap();

        assert!(db.list_nights().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn latest_returns_most_recent_insert() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        assert!(db.get_latest_night().await.unwrap().is_none());

        db.insert_night(SleepNight::started_at(1_000)).await.unwrap();
        let second = db.insert_night(SleepNight::started_at(2_000)).await.unwrap();

        let latest = db.get_latest_night().await.unwrap().unwrap();
        assert_eq!(latest.night_id, second.night_id);
    }

    #[tokio::test]
    async fn get_night_by_missing_id_is_none() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        assert!(db.get_night(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        db.insert_night(SleepNight::started_at(1_000)).await.unwrap();
        db.insert_night(SleepNight::started_at(2_000)).await.unwrap();
        db.clear_nights().await.unwrap();

        assert!(db.list_nights().await.unwrap().is_empty());
        assert!(db.get_latest_night().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_stay_monotonic_across_clear() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        let before = db.insert_night(SleepNight::started_at(1_000)).await.unwrap();
        db.clear_nights().await.unwrap();
        let after = db.insert_night(SleepNight::started_at(2_000)).await.unwrap();

        assert!(after.night_id > before.night_id);
    }

    #[tokio::test]
    async fn observer_sees_each_committed_write() {
        let dir = tempdir().unwrap();
        let db = test_db(&dir);

        let mut rx = db.observe_nights();
        assert!(rx.borrow().is_empty());

        let night = db.insert_night(SleepNight::started_at(1_000)).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_slice(), &[night.clone()]);

        db.clear_nights().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn reopening_the_file_keeps_recorded_nights() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.sqlite3");

        let night = {
            let db = Database::new(path.clone()).unwrap();
            db.insert_night(SleepNight::started_at(1_000)).await.unwrap()
        };

        let db = Database::new(path).unwrap();
        let nights = db.list_nights().await.unwrap();
        assert_eq!(nights, vec![night]);
    }
}
