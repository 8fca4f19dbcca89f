//! Pure, deterministic activity analytics over commit timestamps.
//!
//! Callers deduplicate commits before handing timestamps in; nothing here
//! touches the filesystem or the clock except through explicit arguments.

pub mod streak;
pub mod velocity;

pub use streak::{calculate_streaks, local_days, streaks_for, Streaks, STREAK_GAP_TOLERANCE_HOURS};
pub use velocity::{
    calendar_week_start, commits_this_week, hour_histogram, most_active_weekday, peak_hour,
    trend_percent, window_counts, WindowCounts,
};
