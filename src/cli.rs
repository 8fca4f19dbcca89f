use crate::cache::CacheManager;
use crate::config::{default_snapshot_path, Config};
use crate::util::expand_home;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "devpulse")]
#[command(about = "Commit streaks and velocity across your local git repositories")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Path to config file (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Path to snapshot file")]
    pub cache: Option<PathBuf>,

    #[arg(long, help = "Only count commits by this author (name or email)")]
    pub author: Option<String>,

    #[arg(long = "root", help = "Directory to scan for repositories (repeatable)")]
    pub roots: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rescan repositories and update the snapshot
    Refresh {
        #[arg(long, help = "Ignore the staleness window and re-extract everything")]
        force: bool,
    },
    /// Show streaks, velocity and per-repository activity
    Stats {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Use the snapshot as-is, even when it is old")]
        no_refresh: bool,
    },
    /// List cached commits
    Commits {
        #[arg(long, help = "Filter by author name or email")]
        author: Option<String>,

        #[arg(long, help = "Filter by repository path")]
        repo: Option<PathBuf>,

        #[arg(long, help = "Start from this date (RFC3339, YYYY-MM-DD, or natural language)")]
        since: Option<String>,

        #[arg(long, help = "End at this date (RFC3339, YYYY-MM-DD, or natural language)")]
        until: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Keep refreshing in the background and print a line per cycle
    Watch {
        #[arg(long, help = "Refresh interval, e.g. 15m or 30s (defaults to the configured one)")]
        interval: Option<String>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        let manager = open_manager(&self.common)?;
        match self.command {
            Commands::Refresh { force } => crate::report::refresh(&manager, force),
            Commands::Stats { json, no_refresh } => crate::stats::exec(&manager, json, no_refresh),
            Commands::Commits {
                author,
                repo,
                since,
                until,
                json,
            } => crate::commits::exec(&manager, author, repo, since, until, json),
            Commands::Watch { interval } => crate::report::watch(manager, interval.as_deref()),
        }
    }
}

/// Loads configuration, applies command-line overrides and opens the snapshot.
pub fn open_manager(common: &CommonArgs) -> Result<Arc<CacheManager>> {
    let mut config =
        Config::load_or_default(common.config.as_deref()).context("Failed to load configuration")?;

    if let Some(author) = &common.author {
        config.author = author.clone();
    }
    if !common.roots.is_empty() {
        config.roots = common
            .roots
            .iter()
            .map(|root| expand_home(&root.to_string_lossy()))
            .collect();
    }

    let snapshot_path = common.cache.clone().unwrap_or_else(default_snapshot_path);
    let manager = CacheManager::open(config, snapshot_path).context("Failed to open cache")?;
    Ok(Arc::new(manager))
}
