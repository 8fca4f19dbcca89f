use crate::config::ExtractSettings;
use chrono::{DateTime, FixedOffset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 2;

/// Commits newer than this many days are kept in a repository's recent history.
pub const RECENT_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub timestamp: DateTime<FixedOffset>,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub files: Vec<String>,
    pub lines_added: u64,
    pub lines_removed: u64,
}

impl CommitRecord {
    pub fn short_hash(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }

    pub fn timestamp_utc(&self) -> DateTime<Utc> {
        self.timestamp.with_timezone(&Utc)
    }

    /// Case-insensitive match against either the author name or email.
    pub fn authored_by(&self, author: &str) -> bool {
        let needle = author.to_lowercase();
        self.author_name.to_lowercase() == needle || self.author_email.to_lowercase() == needle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    pub path: String,
    pub added_lines: u64,
    pub deleted_lines: u64,
    pub is_binary: bool,
}

impl FileStats {
    pub fn total_lines(&self) -> u64 {
        self.added_lines + self.deleted_lines
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub path: PathBuf,
    pub author_verified: bool,
    pub dormant: bool,
    pub commit_count: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub weekly_commits: u32,
    pub last_week_commits: u32,
    pub monthly_commits: u32,
    pub most_active_weekday: Option<Weekday>,
    pub recent_commits: Vec<CommitRecord>,
    pub languages: BTreeMap<String, u64>,
    pub last_commit: Option<DateTime<FixedOffset>>,
    pub last_analyzed: DateTime<Utc>,
    /// Settings the metadata was derived with; reuse requires an exact match.
    pub extracted_with: Option<ExtractSettings>,
}

impl RepositoryMetadata {
    pub fn new(path: PathBuf, last_analyzed: DateTime<Utc>) -> Self {
        Self {
            path,
            author_verified: false,
            dormant: false,
            commit_count: 0,
            current_streak: 0,
            longest_streak: 0,
            weekly_commits: 0,
            last_week_commits: 0,
            monthly_commits: 0,
            most_active_weekday: None,
            recent_commits: Vec::new(),
            languages: BTreeMap::new(),
            last_commit: None,
            last_analyzed,
            extracted_with: None,
        }
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    /// Whether this metadata can stand in for a fresh extraction with `settings`.
    pub fn extracted_for(&self, settings: &ExtractSettings) -> bool {
        self.extracted_with.as_ref() == Some(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoDisplayRow {
    pub path: PathBuf,
    pub name: String,
    pub last_commit: Option<DateTime<FixedOffset>>,
    pub weekly_commits: u32,
    pub monthly_commits: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayStats {
    pub weekly_total: u32,
    pub last_week_total: u32,
    pub trend_percent: f64,
    pub daily_average: f64,
    pub this_week_commits: u32,
    pub peak_hour: Option<u32>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub repositories: Vec<RepoDisplayRow>,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub languages: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitQuery {
    pub author: Option<String>,
    pub repository: Option<PathBuf>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl CommitQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn repository(mut self, path: impl Into<PathBuf>) -> Self {
        self.repository = Some(path.into());
        self
    }

    pub fn range(mut self, range: &DateRange) -> Self {
        self.since = range.since;
        self.until = range.until;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > &until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub last_sync: Option<DateTime<Utc>>,
    pub stats: DisplayStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitsOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub author: Option<String>,
    pub repository: Option<PathBuf>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub commits: Vec<CommitRecord>,
}
