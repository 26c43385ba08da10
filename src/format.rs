use chrono::{DateTime, Utc};

use crate::db::SleepNight;

/// Display label for a numeric quality rating. Unrated nights show "--";
/// ratings outside the 0-5 scale fall back to the neutral label.
pub fn quality_label(quality: i32) -> &'static str {
    match quality {
        -1 => "--",
        0 => "Very bad",
        1 => "Poor",
        2 => "So-so",
        4 => "Pretty good",
        5 => "Excellent",
        _ => "OK",
    }
}

fn wall_time(time_milli: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(time_milli) {
        Some(when) => when.format("%a %Y-%m-%d %H:%M").to_string(),
        None => format!("{time_milli} ms"),
    }
}

/// Renders the night listing as the history text shown to the user.
/// Open nights print only their start; closed nights add end, quality,
/// and hours slept.
pub fn format_nights(nights: &[SleepNight]) -> String {
    let mut text = String::from("Here is your sleep data");

    for night in nights {
        text.push_str("\n\nStart: ");
        text.push_str(&wall_time(night.start_time_milli));

        if !night.is_open() {
            text.push_str("\nEnd: ");
            text.push_str(&wall_time(night.end_time_milli));
            text.push_str("\nQuality: ");
            text.push_str(quality_label(night.sleep_quality));

            let minutes = night.duration_milli() / 60_000;
            text.push_str(&format!("\nHours slept: {}:{:02}", minutes / 60, minutes % 60));
        }
    }

    text
}
