use serde::{Deserialize, Serialize};

use crate::db::SleepNight;
use crate::format::format_nights;

use super::signal::Signal;

/// Mutable tracker state behind the controller's lock.
#[derive(Debug, Default)]
pub struct TrackerState {
    pub tonight: Option<SleepNight>,
    pub nights: Vec<SleepNight>,
    pub quality_prompt: Signal<i64>,
    pub clear_confirmation: Signal<()>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `tonight` only while the given latest record is still open.
    pub fn reconcile_tonight(&mut self, latest: Option<SleepNight>) {
        self.tonight = latest.filter(|night| night.is_open());
    }

    /// Replaces the listing and re-derives `tonight` from its newest entry.
    pub fn apply_listing(&mut self, nights: Vec<SleepNight>) {
        self.tonight = nights.first().filter(|night| night.is_open()).cloned();
        self.nights = nights;
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            tonight: self.tonight.clone(),
            nights_text: format_nights(&self.nights),
            can_start: self.tonight.is_none(),
            can_stop: self.tonight.is_some(),
            can_clear: !self.nights.is_empty(),
            quality_prompt: self.quality_prompt.pending().copied(),
            clear_confirmation: self.clear_confirmation.is_raised(),
            nights: self.nights.clone(),
        }
    }
}

/// Point-in-time view of the tracker published to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub tonight: Option<SleepNight>,
    pub nights: Vec<SleepNight>,
    pub nights_text: String,
    pub can_start: bool,
    pub can_stop: bool,
    pub can_clear: bool,
    /// Id of the night awaiting a quality rating, until acknowledged.
    pub quality_prompt: Option<i64>,
    /// True after the history is cleared, until acknowledged.
    pub clear_confirmation: bool,
}
