use crate::analytics::{
    calculate_streaks, commits_this_week, hour_histogram, local_days, peak_hour, trend_percent,
    window_counts,
};
use crate::model::{
    CommitQuery, CommitRecord, DateRange, DisplayStats, RepoDisplayRow, RepositoryMetadata,
};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// One immutable, fully built snapshot of repository metadata and its indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitCache {
    repositories: BTreeMap<PathBuf, RepositoryMetadata>,
    /// Hash to the repositories holding it and the record's position in each
    /// repository's `recent_commits`.
    by_hash: BTreeMap<String, BTreeMap<PathBuf, usize>>,
    by_day: BTreeMap<NaiveDate, BTreeSet<String>>,
    by_author: BTreeMap<String, BTreeSet<String>>,
    display: DisplayStats,
    last_sync: Option<DateTime<Utc>>,
}

impl CommitCache {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rebuild(repositories: BTreeMap<PathBuf, RepositoryMetadata>, now: DateTime<Utc>) -> Self {
        let mut by_hash: BTreeMap<String, BTreeMap<PathBuf, usize>> = BTreeMap::new();
        let mut by_day: BTreeMap<NaiveDate, BTreeSet<String>> = BTreeMap::new();
        let mut by_author: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut display = DisplayStats::default();
        let mut active_seen: HashSet<&str> = HashSet::new();
        let mut active_stamps: Vec<DateTime<FixedOffset>> = Vec::new();

        for (path, meta) in &repositories {
            for (position, commit) in meta.recent_commits.iter().enumerate() {
                by_hash
                    .entry(commit.hash.clone())
                    .or_default()
                    .insert(path.clone(), position);
                by_day
                    .entry(commit.timestamp.with_timezone(&Local).date_naive())
                    .or_default()
                    .insert(commit.hash.clone());
                for key in author_keys(commit) {
                    by_author.entry(key).or_default().insert(commit.hash.clone());
                }

                if !meta.dormant && active_seen.insert(commit.hash.as_str()) {
                    display.total_additions += commit.lines_added;
                    display.total_deletions += commit.lines_removed;
                    active_stamps.push(commit.timestamp);
                }
            }

            if meta.dormant {
                continue;
            }
            for (language, lines) in &meta.languages {
                *display.languages.entry(language.clone()).or_insert(0) += lines;
            }
            display.repositories.push(RepoDisplayRow {
                path: path.clone(),
                name: meta.name(),
                last_commit: meta.last_commit,
                weekly_commits: meta.weekly_commits,
                monthly_commits: meta.monthly_commits,
                current_streak: meta.current_streak,
                longest_streak: meta.longest_streak,
            });
        }

        // Totals come from the deduplicated stamps so a commit in two clones counts once.
        let windows = window_counts(&active_stamps, now);
        display.weekly_total = windows.weekly;
        display.last_week_total = windows.last_week;

        let local_now = now.with_timezone(&Local);
        let streaks = calculate_streaks(&local_days(&active_stamps), local_now.date_naive());
        display.trend_percent = trend_percent(display.weekly_total, display.last_week_total);
        display.daily_average = f64::from(display.weekly_total) / 7.0;
        display.this_week_commits = commits_this_week(&active_stamps, local_now);
        display.peak_hour = peak_hour(&hour_histogram(&active_stamps));
        display.current_streak = streaks.current;
        display.longest_streak = streaks.longest;
        display.repositories.sort_by(|a, b| {
            b.last_commit
                .cmp(&a.last_commit)
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            repositories,
            by_hash,
            by_day,
            by_author,
            display,
            last_sync: Some(now),
        }
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn display_stats(&self) -> &DisplayStats {
        &self.display
    }

    pub fn repository(&self, path: &Path) -> Option<&RepositoryMetadata> {
        self.repositories.get(path)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryMetadata> {
        self.repositories.values()
    }

    pub fn active_repositories(&self) -> impl Iterator<Item = &RepositoryMetadata> {
        self.repositories.values().filter(|m| !m.dormant)
    }

    pub fn paths_for_hash(&self, hash: &str) -> Vec<&Path> {
        self.by_hash
            .get(hash)
            .map(|positions| positions.keys().map(PathBuf::as_path).collect())
            .unwrap_or_default()
    }

    pub fn get_commits(&self, query: &CommitQuery) -> Vec<CommitRecord> {
        let range = DateRange {
            since: query.since,
            until: query.until,
        };

        let candidates: Vec<&str> = if let Some(author) = &query.author {
            self.by_author
                .get(&author.to_lowercase())
                .map(|hashes| hashes.iter().map(String::as_str).collect())
                .unwrap_or_default()
        } else if let Some(repo) = &query.repository {
            self.repositories
                .get(repo)
                .map(|meta| meta.recent_commits.iter().map(|c| c.hash.as_str()).collect())
                .unwrap_or_default()
        } else {
            self.hashes_between(&range)
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut commits: Vec<CommitRecord> = candidates
            .into_iter()
            .filter(|hash| seen.insert(*hash))
            .filter_map(|hash| self.resolve(hash, query.repository.as_deref()))
            .filter(|commit| {
                query
                    .author
                    .as_deref()
                    .map_or(true, |author| commit.authored_by(author))
            })
            .filter(|commit| range.contains(&commit.timestamp_utc()))
            .cloned()
            .collect();

        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
        commits
    }

    pub fn commits_by_author(&self, author: &str, since: Option<DateTime<Utc>>) -> Vec<CommitRecord> {
        let mut query = CommitQuery::new().author(author);
        query.since = since;
        self.get_commits(&query)
    }

    pub fn commits_in_repository(&self, path: &Path) -> Vec<CommitRecord> {
        self.get_commits(&CommitQuery::new().repository(path))
    }

    pub fn commits_between(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<CommitRecord> {
        let range = DateRange::new().with_since(since).with_until(until);
        self.get_commits(&CommitQuery::new().range(&range))
    }

    fn hashes_between(&self, range: &DateRange) -> Vec<&str> {
        let first = range.since.map(|s| s.with_timezone(&Local).date_naive());
        let last = range.until.map(|u| u.with_timezone(&Local).date_naive());
        if let (Some(first), Some(last)) = (first, last) {
            if first > last {
                return Vec::new();
            }
        }

        let lower = first.unwrap_or(NaiveDate::MIN);
        let upper = last.unwrap_or(NaiveDate::MAX);
        self.by_day
            .range(lower..=upper)
            .flat_map(|(_, hashes)| hashes.iter().map(String::as_str))
            .collect()
    }

    fn record_at(&self, path: &Path, position: usize) -> Option<&CommitRecord> {
        self.repositories.get(path)?.recent_commits.get(position)
    }

    fn resolve(&self, hash: &str, repository: Option<&Path>) -> Option<&CommitRecord> {
        let positions = self.by_hash.get(hash)?;
        match repository {
            Some(repo) => self.record_at(repo, *positions.get(repo)?),
            None => positions
                .iter()
                .find_map(|(path, &position)| self.record_at(path, position)),
        }
    }

    /// Every indexed hash resolves to a commit held by some repository.
    pub fn is_consistent(&self) -> bool {
        let positions_valid = self.by_hash.iter().all(|(hash, positions)| {
            !positions.is_empty()
                && positions.iter().all(|(path, &position)| {
                    self.record_at(path, position).is_some_and(|c| &c.hash == hash)
                })
        });
        let in_history = |hash: &str| self.by_hash.contains_key(hash);

        positions_valid
            && self.by_day.values().flatten().all(|h| in_history(h.as_str()))
            && self.by_author.values().flatten().all(|h| in_history(h.as_str()))
    }
}

fn author_keys(commit: &CommitRecord) -> Vec<String> {
    let mut keys = vec![commit.author_name.to_lowercase()];
    let email = commit.author_email.to_lowercase();
    if !email.is_empty() && email != keys[0] {
        keys.push(email);
    }
    keys
}
