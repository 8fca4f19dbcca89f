use super::snapshot;
use super::store::CommitCache;
use crate::config::{Config, ExtractSettings};
use crate::error::{PulseError, Result};
use crate::extract::extract_metadata;
use crate::git::{CommitSource, GitCli};
use crate::model::{CommitQuery, CommitRecord, DisplayStats, RepositoryMetadata};
use crate::scan::{discover_repositories, ExcludeRules};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Counts for one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub discovered: usize,
    pub refreshed: usize,
    pub reused: usize,
    pub unverified: usize,
    pub failed: usize,
    /// Another refresh was already running, so nothing was done.
    pub skipped: bool,
    pub elapsed: Duration,
}

enum Outcome {
    Refreshed(RepositoryMetadata),
    Reused(RepositoryMetadata),
    Unverified,
    Failed(Option<RepositoryMetadata>),
}

struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the live snapshot and coordinates refresh, queries and persistence.
///
/// Readers clone the current `Arc<CommitCache>` and never block on extraction;
/// the write lock is held only for the pointer swap.
pub struct CacheManager {
    config: Config,
    source: Arc<dyn CommitSource>,
    snapshot_path: PathBuf,
    snapshot: RwLock<Arc<CommitCache>>,
    refreshing: AtomicBool,
    persist_lock: Mutex<()>,
    pool: ThreadPool,
    load_warning: Option<String>,
}

impl CacheManager {
    /// Builds a manager backed by the `git` binary named in the config.
    pub fn open(config: Config, snapshot_path: PathBuf) -> Result<Self> {
        let source = GitCli::new(config.git_binary.clone(), config.oracle_timeout()?);
        Self::new(config, Arc::new(source), snapshot_path)
    }

    pub fn new(config: Config, source: Arc<dyn CommitSource>, snapshot_path: PathBuf) -> Result<Self> {
        config.validate()?;

        let workers = num_cpus::get().max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("devpulse-worker-{i}"))
            .build()
            .map_err(|e| PulseError::Other(format!("Failed to build worker pool: {e}")))?;

        let loaded = snapshot::load(&snapshot_path);
        log::debug!(
            "loaded {} repositories from {}",
            loaded.cache.len(),
            snapshot_path.display()
        );

        Ok(Self {
            config,
            source,
            snapshot_path,
            snapshot: RwLock::new(Arc::new(loaded.cache)),
            refreshing: AtomicBool::new(false),
            persist_lock: Mutex::new(()),
            pool,
            load_warning: loaded.warning,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Set when the snapshot on disk was unreadable and the manager started cold.
    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn snapshot(&self) -> Arc<CommitCache> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub fn get_commits(&self, query: &CommitQuery) -> Vec<CommitRecord> {
        self.snapshot().get_commits(query)
    }

    pub fn display_stats(&self) -> DisplayStats {
        self.snapshot().display_stats().clone()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_sync()
    }

    pub fn needs_refresh(&self, interval: Duration) -> bool {
        match self.last_sync() {
            None => true,
            Some(last) => match (Utc::now() - last).to_std() {
                Ok(age) => age >= interval,
                Err(_) => false,
            },
        }
    }

    pub fn refresh(&self) -> Result<RefreshReport> {
        self.run_refresh(false)
    }

    /// Re-extracts every repository, ignoring the staleness window.
    pub fn force_refresh(&self) -> Result<RefreshReport> {
        self.run_refresh(true)
    }

    /// Writes the current snapshot to disk.
    pub fn save(&self) -> Result<()> {
        let _guard = self.persist_lock.lock();
        let current = self.snapshot();
        snapshot::save(&current, &self.snapshot_path)
    }

    fn run_refresh(&self, force: bool) -> Result<RefreshReport> {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            log::info!("refresh already in progress, skipping");
            return Ok(RefreshReport {
                skipped: true,
                ..RefreshReport::default()
            });
        };

        let started = Instant::now();
        let now = Utc::now();
        let previous = self.snapshot();
        let staleness = if force {
            None
        } else {
            Some(self.config.staleness_window()?)
        };

        let rules = ExcludeRules::new(&self.config.exclude);
        let paths = discover_repositories(&self.config.roots, &rules, self.config.max_depth)?;
        let settings = self.config.extract_settings();
        let source = self.source.as_ref();

        let outcomes: Vec<(PathBuf, Outcome)> = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let outcome = refresh_one(source, path, &settings, &previous, staleness, now);
                    (path.clone(), outcome)
                })
                .collect()
        });

        let mut report = RefreshReport {
            discovered: paths.len(),
            ..RefreshReport::default()
        };
        let mut repositories = BTreeMap::new();
        for (path, outcome) in outcomes {
            let kept = match outcome {
                Outcome::Refreshed(meta) => {
                    report.refreshed += 1;
                    Some(meta)
                }
                Outcome::Reused(meta) => {
                    report.reused += 1;
                    Some(meta)
                }
                Outcome::Unverified => {
                    report.unverified += 1;
                    None
                }
                Outcome::Failed(prior) => {
                    report.failed += 1;
                    prior
                }
            };
            if let Some(meta) = kept {
                repositories.insert(path, meta);
            }
        }

        let next = CommitCache::rebuild(repositories, now);
        *self.snapshot.write() = Arc::new(next);
        report.elapsed = started.elapsed();

        log::info!(
            "refreshed {} of {} repositories ({} reused, {} failed) in {:.2?}",
            report.refreshed,
            report.discovered,
            report.reused,
            report.failed,
            report.elapsed
        );

        self.save()?;
        Ok(report)
    }

    /// Runs `refresh` every `interval` on a dedicated thread until the handle
    /// is stopped or dropped. Ticks that land while a refresh is running are
    /// dropped by the in-progress flag.
    pub fn spawn_background_refresh<F>(self: &Arc<Self>, interval: Duration, mut on_refresh: F) -> Result<BackgroundRefresh>
    where
        F: FnMut(Result<RefreshReport>) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let manager = Arc::clone(self);

        let handle = thread::Builder::new()
            .name("devpulse-refresh".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => on_refresh(manager.refresh()),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(BackgroundRefresh {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

fn refresh_one(
    source: &dyn CommitSource,
    path: &Path,
    settings: &ExtractSettings,
    previous: &CommitCache,
    staleness: Option<Duration>,
    now: DateTime<Utc>,
) -> Outcome {
    // Metadata derived for another author or other limits is never carried over.
    let prior = previous
        .repository(path)
        .filter(|meta| meta.extracted_for(settings));

    if let (Some(window), Some(meta)) = (staleness, prior) {
        let fresh = match (now - meta.last_analyzed).to_std() {
            Ok(age) => age < window,
            Err(_) => true,
        };
        if fresh {
            log::debug!("reusing fresh metadata for {}", path.display());
            return Outcome::Reused(meta.clone());
        }
    }

    match extract_metadata(source, path, settings, now) {
        Ok(Some(meta)) => {
            log::debug!("extracted {} commits from {}", meta.commit_count, path.display());
            Outcome::Refreshed(meta)
        }
        Ok(None) => Outcome::Unverified,
        Err(err) => {
            if prior.is_some() {
                log::warn!("keeping previous metadata for {}: {err}", path.display());
            } else {
                log::warn!("skipping {}: {err}", path.display());
            }
            Outcome::Failed(prior.cloned())
        }
    }
}

/// Handle to a running background refresh loop.
pub struct BackgroundRefresh {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundRefresh {
    /// Signals the loop and waits for an in-flight refresh to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("background refresh thread panicked");
            }
        }
    }
}

impl Drop for BackgroundRefresh {
    fn drop(&mut self) {
        self.shutdown();
    }
}
