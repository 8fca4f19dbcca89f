use crate::cache::CacheManager;
use crate::model::{CommitQuery, CommitRecord, CommitsOutput, SCHEMA_VERSION};
use crate::util::{expand_home, resolve_range};
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use console::style;
use std::path::PathBuf;

pub fn exec(
    manager: &CacheManager,
    author: Option<String>,
    repo: Option<PathBuf>,
    since: Option<String>,
    until: Option<String>,
    json: bool,
) -> Result<()> {
    let range = resolve_range(since.as_deref(), until.as_deref())
        .context("Failed to resolve date range")?;
    let repo = repo.map(|p| expand_home(&p.to_string_lossy()));

    let mut query = CommitQuery::new().range(&range);
    query.author = author.clone();
    query.repository = repo.clone();

    let commits = manager.get_commits(&query);

    if json {
        let output = CommitsOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            author,
            repository: repo,
            since,
            until,
            commits,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output_table(&commits);
    }
    Ok(())
}

fn output_table(commits: &[CommitRecord]) {
    if commits.is_empty() {
        println!("No commits found");
        return;
    }

    for c in commits.iter().take(100) {
        println!(
            "{} {} {:<20} {:>6} {:>6}  {}",
            style(c.short_hash()).yellow(),
            style(c.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")).dim(),
            c.author_name,
            style(format!("+{}", c.lines_added)).green(),
            style(format!("-{}", c.lines_removed)).red(),
            c.message
        );
    }
    if commits.len() > 100 {
        println!("\n... and {} more commits", commits.len() - 100);
    }
}
