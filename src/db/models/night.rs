//! Sleep-night data model.

use serde::{Deserialize, Serialize};

/// One tracked sleep interval, from the moment the user starts a night to
/// the moment they stop it.
///
/// A night is "open" while `end_time_milli` still equals `start_time_milli`;
/// stopping the night moves `end_time_milli` forward, and rating it fills in
/// `sleep_quality`. At most one open night exists at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepNight {
    /// Store-assigned identifier, monotonically increasing. Callers pass the
    /// placeholder `0` on insert; the store writes the real id.
    pub night_id: i64,
    /// Epoch milliseconds captured when tracking started. Immutable.
    pub start_time_milli: i64,
    /// Epoch milliseconds when tracking stopped; equals the start time while
    /// the night is still open.
    pub end_time_milli: i64,
    /// User rating, `UNRATED` until the user rates the completed night.
    pub sleep_quality: i32,
}

impl SleepNight {
    /// Sentinel rating for a night the user has not rated yet.
    pub const UNRATED: i32 = -1;

    /// A freshly started night: open (end equals start) and unrated.
    pub fn started_at(start_time_milli: i64) -> Self {
        Self {
            night_id: 0,
            start_time_milli,
            end_time_milli: start_time_milli,
            sleep_quality: Self::UNRATED,
        }
    }

    /// Whether tracking is still in progress for this night.
    pub fn is_open(&self) -> bool {
        self.end_time_milli == self.start_time_milli
    }

    /// Milliseconds slept; zero while the night is open.
    pub fn duration_milli(&self) -> i64 {
        self.end_time_milli - self.start_time_milli
    }
}
