use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::{Database, SleepNight};

use super::state::{TrackerSnapshot, TrackerState};

/// Owns tonight's record and the live history view.
///
/// All storage work happens through [`Database`], off the caller's
/// sequence. A background watcher keeps the published snapshot in step
/// with the listing, so writes made outside the tracker show up too.
pub struct SleepTrackerController {
    state: Arc<Mutex<TrackerState>>,
    db: Database,
    snapshot_tx: Arc<watch::Sender<TrackerSnapshot>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    cancel_token: CancellationToken,
}

impl SleepTrackerController {
    pub fn new(db: Database) -> Self {
        let state = TrackerState::new();
        let (snapshot_tx, _) = watch::channel(state.snapshot());

        Self {
            state: Arc::new(Mutex::new(state)),
            db,
            snapshot_tx: Arc::new(snapshot_tx),
            watcher: Mutex::new(None),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Loads tonight and the recorded history, publishes the first
    /// snapshot, and starts watching the listing for later changes.
    pub async fn initialize(&self) -> Result<TrackerSnapshot> {
        let latest = self.db.get_latest_night().await?;
        let listing = self.db.list_nights().await?;

        let snapshot = {
            let mut state = self.state.lock().await;
            state.nights = listing;
            state.reconcile_tonight(latest);
            self.publish(&state)
        };

        self.spawn_watcher().await;

        info!(
            "Sleep tracker initialized with {} recorded nights",
            snapshot.nights.len()
        );
        Ok(snapshot)
    }

    pub async fn snapshot(&self) -> TrackerSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Subscribes to snapshot updates. The receiver holds the current
    /// snapshot immediately.
    pub fn observe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Begins tracking a new night. Fails while a night is still open.
    pub async fn start_tracking(&self) -> Result<SleepNight> {
        self.start_tracking_at(Utc::now().timestamp_millis()).await
    }

    async fn start_tracking_at(&self, now_milli: i64) -> Result<SleepNight> {
        {
            let state = self.state.lock().await;
            if state.tonight.is_some() {
                bail!("a night is already being tracked");
            }
        }

        let night = self
            .db
            .insert_night(SleepNight::started_at(now_milli))
            .await?;

        self.refresh().await?;

        info!("Started tracking night {}", night.night_id);
        Ok(night)
    }

    /// Closes tonight's record and raises the quality prompt for it.
    /// Does nothing when no night is open.
    pub async fn stop_tracking(&self) -> Result<Option<SleepNight>> {
        self.stop_tracking_at(Utc::now().timestamp_millis()).await
    }

    async fn stop_tracking_at(&self, now_milli: i64) -> Result<Option<SleepNight>> {
        let mut night = {
            let state = self.state.lock().await;
            match &state.tonight {
                Some(night) => night.clone(),
                None => return Ok(None),
            }
        };

        // A stop in the same millisecond as the start would leave the
        // record looking open (end == start marks an open night).
        night.end_time_milli = now_milli.max(night.start_time_milli + 1);
        self.db.update_night(night.clone()).await?;

        {
            let mut state = self.state.lock().await;
            state.quality_prompt.raise(night.night_id);
        }
        self.refresh().await?;

        info!("Stopped tracking night {}", night.night_id);
        Ok(Some(night))
    }

    /// Deletes the recorded history and raises the clear confirmation.
    pub async fn clear(&self) -> Result<()> {
        self.db.clear_nights().await?;

        {
            let mut state = self.state.lock().await;
            state.clear_confirmation.raise(());
        }
        self.refresh().await?;

        info!("Cleared sleep history");
        Ok(())
    }

    /// Records a quality rating for the given night. An unknown id is
    /// logged and otherwise ignored.
    pub async fn set_quality(&self, night_id: i64, quality: i32) -> Result<()> {
        let mut night = match self.db.get_night(night_id).await? {
            Some(night) => night,
            None => {
                warn!("Quality rating for unknown night {night_id} ignored");
                return Ok(());
            }
        };

        night.sleep_quality = quality;
        self.db.update_night(night).await?;
        self.refresh().await?;
        Ok(())
    }

    /// Consumes the pending quality prompt, if one is raised.
    pub async fn take_quality_prompt(&self) -> Option<i64> {
        let mut state = self.state.lock().await;
        let taken = state.quality_prompt.take();
        if taken.is_some() {
            self.publish(&state);
        }
        taken
    }

    /// Consumes the pending clear confirmation, if one is raised.
    pub async fn take_clear_confirmation(&self) -> bool {
        let mut state = self.state.lock().await;
        let taken = state.clear_confirmation.take().is_some();
        if taken {
            self.publish(&state);
        }
        taken
    }

    /// Stops the listing watcher. Pending signals and state survive, but
    /// snapshots no longer follow writes made outside the tracker.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.watcher.lock().await.take() {
            handle
                .await
                .context("listing watcher task failed to join")?;
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<TrackerSnapshot> {
        let listing = self.db.list_nights().await?;
        let mut state = self.state.lock().await;
        state.apply_listing(listing);
        Ok(self.publish(&state))
    }

    fn publish(&self, state: &TrackerState) -> TrackerSnapshot {
        let snapshot = state.snapshot();
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    async fn spawn_watcher(&self) {
        let mut watcher_guard = self.watcher.lock().await;
        if let Some(handle) = watcher_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let snapshot_tx = self.snapshot_tx.clone();
        let mut listing_rx = self.db.observe_nights();
        let cancel_token = self.cancel_token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = listing_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let listing = listing_rx.borrow_and_update().clone();
                        let mut guard = state.lock().await;
                        guard.apply_listing(listing);
                        snapshot_tx.send_replace(guard.snapshot());
                    }
                    _ = cancel_token.cancelled() => break,
                }
            }
        });

        *watcher_guard = Some(handle);
    }
}

impl Drop for SleepTrackerController {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
