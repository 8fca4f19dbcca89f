use crate::analytics::{most_active_weekday, streaks_for, window_counts};
use crate::config::ExtractSettings;
use crate::error::{PulseError, Result};
use crate::git::{parse_log, CommitSource, LogRequest, ParsedCommit};
use crate::model::{RepositoryMetadata, RECENT_HISTORY_DAYS};
use crate::util::language_for_path;
use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Runs the oracle for one repository and derives its metadata.
///
/// `Ok(None)` means the configured author has no commits here.
pub fn extract_metadata(
    source: &dyn CommitSource,
    repo_path: &Path,
    settings: &ExtractSettings,
    now: DateTime<Utc>,
) -> Result<Option<RepositoryMetadata>> {
    let since = Duration::try_days(settings.lookback_days)
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .ok_or_else(|| {
            PulseError::Config(format!("lookback_days {} is out of range", settings.lookback_days))
        })?;

    let request = LogRequest {
        repo_path: repo_path.to_path_buf(),
        author: settings.author.clone(),
        since,
        all_branches: true,
        include_merges: settings.include_merges,
    };

    let output = source.log(&request)?;
    let commits = parse_log(&output);
    if commits.is_empty() {
        log::debug!("no matching commits in {}", repo_path.display());
        return Ok(None);
    }

    Ok(Some(build_metadata(repo_path, commits, settings, now)))
}

pub fn build_metadata(
    repo_path: &Path,
    commits: Vec<ParsedCommit>,
    settings: &ExtractSettings,
    now: DateTime<Utc>,
) -> RepositoryMetadata {
    let mut meta = RepositoryMetadata::new(repo_path.to_path_buf(), now);
    meta.extracted_with = Some(settings.clone());
    meta.author_verified = !commits.is_empty();
    meta.commit_count = commits.len() as u32;

    let timestamps: Vec<DateTime<FixedOffset>> =
        commits.iter().map(|c| c.record.timestamp).collect();
    meta.last_commit = timestamps.iter().copied().max();
    // A threshold too large to represent never marks anything dormant.
    meta.dormant = match (meta.last_commit, Duration::try_days(settings.dormant_days)) {
        (Some(last), Some(threshold)) => {
            now.signed_duration_since(last.with_timezone(&Utc)) > threshold
        }
        (Some(_), None) => false,
        (None, _) => true,
    };

    if settings.detailed_stats {
        meta.languages = language_totals(&commits, settings.min_lines_per_file);
    }

    // Dormant repositories skip the streak and velocity pass.
    if !meta.dormant {
        let streaks = streaks_for(&timestamps, now.with_timezone(&Local));
        let counts = window_counts(&timestamps, now);
        meta.current_streak = streaks.current;
        meta.longest_streak = streaks.longest;
        meta.weekly_commits = counts.weekly;
        meta.last_week_commits = counts.last_week;
        meta.monthly_commits = counts.monthly;
        meta.most_active_weekday = most_active_weekday(&timestamps);
    }

    let cutoff = now - Duration::days(RECENT_HISTORY_DAYS);
    let mut recent: Vec<_> = commits
        .into_iter()
        .map(|c| c.record)
        .filter(|r| r.timestamp_utc() >= cutoff)
        .collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
    meta.recent_commits = recent;

    meta
}

/// Per-language line totals; files whose summed churn stays under
/// `min_lines_per_file` are left out.
fn language_totals(commits: &[ParsedCommit], min_lines_per_file: u64) -> BTreeMap<String, u64> {
    let mut per_file: HashMap<&str, u64> = HashMap::new();
    for commit in commits {
        for file in commit.files.iter().filter(|f| !f.is_binary) {
            *per_file.entry(file.path.as_str()).or_insert(0) += file.total_lines();
        }
    }

    let mut languages = BTreeMap::new();
    for (path, lines) in per_file {
        if lines == 0 || lines < min_lines_per_file {
            continue;
        }
        if let Some(language) = language_for_path(path) {
            *languages.entry(language.to_string()).or_insert(0) += lines;
        }
    }
    languages
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::PulseError;
    use chrono::{NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    pub struct CannedSource(pub String);

    impl CommitSource for CannedSource {
        fn log(&self, _request: &LogRequest) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl CommitSource for FailingSource {
        fn log(&self, request: &LogRequest) -> Result<String> {
            Err(PulseError::oracle(&request.repo_path, "corrupt object"))
        }
    }

    /// Noon local time `days` before today; `days == 0` is the current instant.
    pub fn days_ago(days: i64) -> DateTime<Local> {
        let now = Local::now();
        if days == 0 {
            return now;
        }
        let date: NaiveDate = now.date_naive() - Duration::days(days);
        let noon = date.and_hms_opt(12, 0, 0).unwrap();
        Local.from_local_datetime(&noon).earliest().unwrap()
    }

    pub fn log_entry(hash_seed: u32, at: DateTime<Local>, author: &str, files: &[(&str, u64, u64)]) -> String {
        let mut entry = format!(
            "{:040x}\0{}\0{}\0{}@example.com\0commit {}\n\n",
            hash_seed,
            at.to_rfc3339(),
            author,
            author.to_lowercase(),
            hash_seed
        );
        for (path, added, removed) in files {
            entry.push_str(&format!("{added}\t{removed}\t{path}\n"));
        }
        entry.push('\n');
        entry
    }

    fn settings() -> ExtractSettings {
        ExtractSettings {
            author: "Ada".to_string(),
            dormant_days: 14,
            lookback_days: 365,
            detailed_stats: true,
            min_lines_per_file: 0,
            include_merges: true,
        }
    }

    #[test]
    fn no_commits_means_author_not_verified() {
        let source = CannedSource(String::new());
        let meta = extract_metadata(&source, Path::new("/repo"), &settings(), Utc::now()).unwrap();
        assert!(meta.is_none());
    }

    #[test]
    fn oracle_failure_is_reported() {
        let err = extract_metadata(&FailingSource, Path::new("/repo"), &settings(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, PulseError::Oracle { .. }));
    }

    #[test]
    fn active_repository_gets_streaks_and_counts() {
        let log: String = [0, 1, 2, 4]
            .iter()
            .enumerate()
            .map(|(i, d)| log_entry(i as u32 + 1, days_ago(*d), "Ada", &[("src/lib.rs", 10, 2)]))
            .collect();
        let source = CannedSource(log);

        let meta = extract_metadata(&source, Path::new("/repo"), &settings(), Utc::now())
            .unwrap()
            .unwrap();

        assert!(meta.author_verified);
        assert!(!meta.dormant);
        assert_eq!(meta.commit_count, 4);
        assert_eq!(meta.current_streak, 3);
        assert_eq!(meta.longest_streak, 3);
        assert_eq!(meta.weekly_commits, 4);
        assert_eq!(meta.monthly_commits, 4);
        assert_eq!(meta.recent_commits.len(), 4);
        assert_eq!(meta.languages.get("Rust"), Some(&48));
        assert!(meta.most_active_weekday.is_some());

        let newest = &meta.recent_commits[0];
        assert!(meta.recent_commits.iter().all(|c| c.timestamp <= newest.timestamp));
    }

    #[test]
    fn extra_old_day_does_not_extend_longest_streak() {
        let log: String = [0, 1, 2, 4, 5]
            .iter()
            .enumerate()
            .map(|(i, d)| log_entry(i as u32 + 1, days_ago(*d), "Ada", &[]))
            .collect();
        let meta = extract_metadata(&CannedSource(log), Path::new("/repo"), &settings(), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(meta.current_streak, 3);
        assert_eq!(meta.longest_streak, 3);
    }

    #[test]
    fn dormant_repository_skips_streaks() {
        let log = log_entry(7, days_ago(20), "Ada", &[("main.go", 30, 5)])
            + &log_entry(8, days_ago(21), "Ada", &[("main.go", 1, 1)]);
        let meta = extract_metadata(&CannedSource(log), Path::new("/old"), &settings(), Utc::now())
            .unwrap()
            .unwrap();

        assert!(meta.dormant);
        assert_eq!(meta.current_streak, 0);
        assert_eq!(meta.longest_streak, 0);
        assert_eq!(meta.weekly_commits, 0);
        assert_eq!(meta.most_active_weekday, None);
        assert_eq!(meta.commit_count, 2);
        assert_eq!(meta.recent_commits.len(), 2);
        assert_eq!(meta.languages.get("Go"), Some(&37));
    }

    #[test]
    fn recent_history_is_bounded() {
        let log = log_entry(1, days_ago(1), "Ada", &[]) + &log_entry(2, days_ago(45), "Ada", &[]);
        let meta = extract_metadata(&CannedSource(log), Path::new("/repo"), &settings(), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(meta.commit_count, 2);
        assert_eq!(meta.recent_commits.len(), 1);
    }

    #[test]
    fn language_threshold_and_toggle() {
        let log = log_entry(
            1,
            days_ago(1),
            "Ada",
            &[("src/big.rs", 40, 10), ("src/tiny.py", 1, 0), ("notes.txt", 100, 0)],
        );

        let mut strict = settings();
        strict.min_lines_per_file = 5;
        let meta = extract_metadata(&CannedSource(log.clone()), Path::new("/r"), &strict, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(meta.languages.len(), 1);
        assert_eq!(meta.languages.get("Rust"), Some(&50));

        let mut plain = settings();
        plain.detailed_stats = false;
        let meta = extract_metadata(&CannedSource(log), Path::new("/r"), &plain, Utc::now())
            .unwrap()
            .unwrap();
        assert!(meta.languages.is_empty());
    }

    #[test]
    fn out_of_range_day_counts_do_not_panic() {
        let log = log_entry(1, days_ago(1), "Ada", &[]);

        let mut huge_lookback = settings();
        huge_lookback.lookback_days = 1_000_000_000_000;
        let err = extract_metadata(&CannedSource(log.clone()), Path::new("/r"), &huge_lookback, Utc::now())
            .unwrap_err();
        assert!(matches!(err, PulseError::Config(_)));

        let mut huge_dormancy = settings();
        huge_dormancy.dormant_days = i64::MAX;
        let meta = extract_metadata(&CannedSource(log), Path::new("/r"), &huge_dormancy, Utc::now())
            .unwrap()
            .unwrap();
        assert!(!meta.dormant);
    }

    #[test]
    fn metadata_records_its_settings() {
        let log = log_entry(1, days_ago(0), "Ada", &[]);
        let meta = extract_metadata(&CannedSource(log), Path::new("/r"), &settings(), Utc::now())
            .unwrap()
            .unwrap();
        assert!(meta.extracted_for(&settings()));

        let mut other = settings();
        other.author = "Bob".to_string();
        assert!(!meta.extracted_for(&other));
    }

    #[test]
    fn metadata_keeps_repository_path() {
        let log = log_entry(1, days_ago(0), "Ada", &[]);
        let path = PathBuf::from("/work/projects/engine");
        let meta = extract_metadata(&CannedSource(log), &path, &settings(), Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(meta.path, path);
        assert_eq!(meta.name(), "engine");
    }
}
