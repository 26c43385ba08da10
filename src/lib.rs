//! Personal sleep tracking core: night records with quality ratings,
//! stored locally, with a live history view and start/stop controls.

pub mod db;
pub mod format;
pub mod tracker;

use std::path::Path;

use anyhow::{Context, Result};

pub use db::{Database, SleepNight};
pub use format::{format_nights, quality_label};
pub use tracker::{Signal, SleepTrackerController, TrackerSnapshot};

/// Ownership root wiring the store and the tracker together.
///
/// Opens the sleep history under a data directory and owns both handles
/// for the life of the app. Dropping it shuts the store's worker down.
pub struct SleepApp {
    db: Database,
    tracker: SleepTrackerController,
}

impl SleepApp {
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("sleep_history.sqlite3"))?;
        let tracker = SleepTrackerController::new(db.clone());

        Ok(Self { db, tracker })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn tracker(&self) -> &SleepTrackerController {
        &self.tracker
    }
}
