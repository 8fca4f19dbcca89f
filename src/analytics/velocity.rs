use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Timelike, Utc, Weekday};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    /// Commits in the trailing seven days.
    pub weekly: u32,
    /// Commits in the seven days before that.
    pub last_week: u32,
    /// Commits in the trailing thirty days.
    pub monthly: u32,
}

pub fn window_counts<Tz: TimeZone>(timestamps: &[DateTime<Tz>], now: DateTime<Utc>) -> WindowCounts {
    let week_ago = now - Duration::days(7);
    let two_weeks_ago = now - Duration::days(14);
    let month_ago = now - Duration::days(30);

    let mut counts = WindowCounts::default();
    for ts in timestamps {
        let ts = ts.with_timezone(&Utc);
        if ts > now {
            continue;
        }
        if ts >= week_ago {
            counts.weekly += 1;
        } else if ts >= two_weeks_ago {
            counts.last_week += 1;
        }
        if ts >= month_ago {
            counts.monthly += 1;
        }
    }
    counts
}

/// Monday 00:00 local time of the week containing `now`.
pub fn calendar_week_start(now: DateTime<Local>) -> DateTime<Local> {
    let date = now.date_naive();
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .unwrap_or(now)
}

pub fn commits_this_week<Tz: TimeZone>(timestamps: &[DateTime<Tz>], now: DateTime<Local>) -> u32 {
    let start = calendar_week_start(now);
    timestamps
        .iter()
        .map(|ts| ts.with_timezone(&Local))
        .filter(|ts| *ts >= start && *ts <= now)
        .count() as u32
}

pub fn hour_histogram<Tz: TimeZone>(timestamps: &[DateTime<Tz>]) -> [u32; 24] {
    let mut histogram = [0u32; 24];
    for ts in timestamps {
        histogram[ts.with_timezone(&Local).hour() as usize] += 1;
    }
    histogram
}

/// Hour with the most commits; the earliest hour wins a tie.
pub fn peak_hour(histogram: &[u32; 24]) -> Option<u32> {
    let mut best: Option<(usize, u32)> = None;
    for (hour, &count) in histogram.iter().enumerate() {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, top)) if top >= count => {}
            _ => best = Some((hour, count)),
        }
    }
    best.map(|(hour, _)| hour as u32)
}

pub fn trend_percent(current: u32, previous: u32) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    (f64::from(current) - f64::from(previous)) / f64::from(previous) * 100.0
}

pub fn most_active_weekday<Tz: TimeZone>(timestamps: &[DateTime<Tz>]) -> Option<Weekday> {
    let mut counts = [0u32; 7];
    for ts in timestamps {
        counts[ts.with_timezone(&Local).weekday().num_days_from_monday() as usize] += 1;
    }

    let mut best: Option<(usize, u32)> = None;
    for (idx, &count) in counts.iter().enumerate() {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((idx, count));
        }
    }
    best.map(|(idx, _)| weekday_from_monday(idx))
}

fn weekday_from_monday(idx: usize) -> Weekday {
    match idx {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).earliest().unwrap()
    }

    #[test]
    fn trailing_windows_do_not_overlap() {
        let now = Utc::now();
        let stamps = vec![
            now - Duration::hours(1),
            now - Duration::days(3),
            now - Duration::days(8),
            now - Duration::days(13),
            now - Duration::days(20),
            now - Duration::days(45),
        ];
        assert_eq!(
            window_counts(&stamps, now),
            WindowCounts { weekly: 2, last_week: 2, monthly: 5 }
        );
    }

    #[test]
    fn future_commits_are_ignored() {
        let now = Utc::now();
        let stamps = vec![now + Duration::days(2)];
        assert_eq!(window_counts(&stamps, now), WindowCounts::default());
    }

    #[test]
    fn trend_handles_empty_previous_window() {
        assert_eq!(trend_percent(5, 0), 0.0);
        assert_eq!(trend_percent(0, 0), 0.0);
        assert_eq!(trend_percent(15, 10), 50.0);
        assert_eq!(trend_percent(5, 10), -50.0);
    }

    #[test]
    fn peak_hour_prefers_earliest_tie() {
        let mut histogram = [0u32; 24];
        assert_eq!(peak_hour(&histogram), None);
        histogram[22] = 3;
        histogram[9] = 3;
        histogram[14] = 1;
        assert_eq!(peak_hour(&histogram), Some(9));
        histogram[14] = 4;
        assert_eq!(peak_hour(&histogram), Some(14));
    }

    #[test]
    fn histogram_uses_local_hours() {
        let stamps = vec![local(2024, 3, 4, 10), local(2024, 3, 5, 10), local(2024, 3, 5, 23)];
        let histogram = hour_histogram(&stamps);
        assert_eq!(histogram[10], 2);
        assert_eq!(histogram[23], 1);
        assert_eq!(peak_hour(&histogram), Some(10));
    }

    #[test]
    fn calendar_week_starts_monday() {
        // 2024-03-07 is a Thursday.
        let start = calendar_week_start(local(2024, 3, 7, 15));
        assert_eq!(start, local(2024, 3, 4, 0));
        let start = calendar_week_start(local(2024, 3, 4, 0));
        assert_eq!(start, local(2024, 3, 4, 0));
    }

    #[test]
    fn this_week_excludes_previous_sunday() {
        let now = local(2024, 3, 7, 15);
        let stamps = vec![local(2024, 3, 3, 22), local(2024, 3, 4, 9), local(2024, 3, 6, 12)];
        assert_eq!(commits_this_week(&stamps, now), 2);
    }

    #[test]
    fn weekday_with_most_commits() {
        let stamps = vec![
            local(2024, 3, 5, 12),
            local(2024, 3, 12, 12),
            local(2024, 3, 8, 12),
        ];
        assert_eq!(most_active_weekday(&stamps), Some(Weekday::Tue));
        assert_eq!(most_active_weekday::<Local>(&[]), None);
    }
}
