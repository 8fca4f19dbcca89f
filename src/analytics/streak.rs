use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::collections::BTreeSet;

/// Maximum gap between the starts of two consecutive active days that still
/// continues a streak. On day buckets this admits exactly a one-day step.
pub const STREAK_GAP_TOLERANCE_HOURS: i64 = 36;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streaks {
    pub current: u32,
    pub longest: u32,
}

/// Buckets timestamps into local calendar days.
pub fn local_days<Tz: TimeZone>(timestamps: &[DateTime<Tz>]) -> Vec<NaiveDate> {
    timestamps
        .iter()
        .map(|ts| ts.with_timezone(&Local).date_naive())
        .collect()
}

fn within_tolerance(later: NaiveDate, earlier: NaiveDate) -> bool {
    later.signed_duration_since(earlier).num_hours() <= STREAK_GAP_TOLERANCE_HOURS
}

pub fn calculate_streaks(days: &[NaiveDate], today: NaiveDate) -> Streaks {
    let unique: BTreeSet<NaiveDate> = days.iter().copied().collect();
    let Some(&latest) = unique.iter().next_back() else {
        return Streaks::default();
    };

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut newest_run: Option<u32> = None;
    let mut previous: Option<NaiveDate> = None;

    for &day in unique.iter().rev() {
        match previous {
            Some(prev) if within_tolerance(prev, day) => run += 1,
            Some(_) => {
                newest_run.get_or_insert(run);
                run = 1;
            }
            None => run = 1,
        }
        longest = longest.max(run);
        previous = Some(day);
    }

    let current = if within_tolerance(today, latest) {
        newest_run.unwrap_or(run)
    } else {
        0
    };

    Streaks { current, longest }
}

pub fn streaks_for<Tz: TimeZone>(timestamps: &[DateTime<Tz>], now: DateTime<Local>) -> Streaks {
    calculate_streaks(&local_days(timestamps), now.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn days_ago(offsets: &[i64]) -> Vec<NaiveDate> {
        offsets.iter().map(|d| today() - Duration::days(*d)).collect()
    }

    #[test]
    fn empty_history_has_no_streak() {
        assert_eq!(calculate_streaks(&[], today()), Streaks { current: 0, longest: 0 });
    }

    #[test]
    fn gap_breaks_the_run() {
        let streaks = calculate_streaks(&days_ago(&[0, 1, 2, 4]), today());
        assert_eq!(streaks, Streaks { current: 3, longest: 3 });

        let streaks = calculate_streaks(&days_ago(&[0, 1, 2, 4, 5]), today());
        assert_eq!(streaks, Streaks { current: 3, longest: 3 });
    }

    #[test]
    fn same_day_commits_count_once() {
        let streaks = calculate_streaks(&days_ago(&[0, 0, 0, 0, 1, 1]), today());
        assert_eq!(streaks, Streaks { current: 2, longest: 2 });
    }

    #[test]
    fn yesterday_keeps_the_streak_alive() {
        let streaks = calculate_streaks(&days_ago(&[1, 2, 3]), today());
        assert_eq!(streaks, Streaks { current: 3, longest: 3 });
    }

    #[test]
    fn stale_history_has_no_current_streak() {
        let streaks = calculate_streaks(&days_ago(&[2, 3, 4, 5, 10]), today());
        assert_eq!(streaks, Streaks { current: 0, longest: 4 });
    }

    #[test]
    fn longest_can_be_older_than_current() {
        let streaks = calculate_streaks(&days_ago(&[0, 5, 6, 7, 8]), today());
        assert_eq!(streaks, Streaks { current: 1, longest: 4 });
    }

    #[test]
    fn order_of_input_does_not_matter() {
        let mut days = days_ago(&[4, 0, 2, 1]);
        let forward = calculate_streaks(&days, today());
        days.reverse();
        assert_eq!(forward, calculate_streaks(&days, today()));
    }

    #[test]
    fn longest_never_below_current() {
        // Deterministic pseudo-random day sets.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..200 {
            let mut offsets = Vec::new();
            for _ in 0..(seed % 40) {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                offsets.push((seed % 60) as i64);
            }
            let streaks = calculate_streaks(&days_ago(&offsets), today());
            assert!(streaks.longest >= streaks.current, "{offsets:?} -> {streaks:?}");
            if offsets.is_empty() {
                assert_eq!(streaks, Streaks::default());
            }
            seed = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
        }
    }

    #[test]
    fn timestamps_bucket_to_local_days() {
        let now = Local::now();
        let stamps = vec![now, now - Duration::minutes(1), now - Duration::days(1)];
        let streaks = streaks_for(&stamps, now);
        assert_eq!(streaks.current, streaks.longest);
        assert!(streaks.current >= 1 && streaks.current <= 2);
    }
}
