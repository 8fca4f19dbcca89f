use crate::cache::{CacheManager, RefreshReport};
use anyhow::{Context, Result};
use chrono::Local;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Refreshes with a spinner on stderr; used by `refresh` and by `stats` when
/// the snapshot is old.
pub fn run_with_spinner(manager: &CacheManager, force: bool) -> Result<RefreshReport> {
    let pb = spinner("Scanning repositories...");
    let result = if force {
        manager.force_refresh()
    } else {
        manager.refresh()
    };
    pb.finish_and_clear();
    result.context("Failed to refresh cache")
}

pub fn refresh(manager: &CacheManager, force: bool) -> Result<()> {
    let report = run_with_spinner(manager, force)?;
    print_report(&report);
    Ok(())
}

pub fn print_report(report: &RefreshReport) {
    if report.skipped {
        println!("{}", style("Refresh already in progress, skipped").yellow());
        return;
    }

    println!("{}", style("Refresh Summary").bold());
    println!("{}", "─".repeat(40));
    println!("Repositories found:  {}", style(report.discovered).cyan());
    println!("Re-analyzed:         {}", style(report.refreshed).green());
    println!("Reused (fresh):      {}", style(report.reused).dim());
    println!("No matching commits: {}", style(report.unverified).dim());
    if report.failed > 0 {
        println!("Failed:              {}", style(report.failed).red());
    }
    println!("Elapsed:             {:.2?}", report.elapsed);
}

fn summary_line(manager: &CacheManager, report: &RefreshReport) -> String {
    let stats = manager.display_stats();
    format!(
        "[{}] {} repos, {} commits this week, streak {} (best {}), {} failed",
        Local::now().format("%H:%M:%S"),
        stats.repositories.len(),
        stats.weekly_total,
        stats.current_streak,
        stats.longest_streak,
        report.failed
    )
}

/// Refreshes once, then keeps a background ticker running until the process
/// is interrupted.
pub fn watch(manager: Arc<CacheManager>, interval: Option<&str>) -> Result<()> {
    let interval = match interval {
        Some(raw) => humantime::parse_duration(raw).context("Invalid --interval")?,
        None => manager
            .config()
            .refresh_interval()
            .context("Invalid refresh interval in configuration")?,
    };

    let first = run_with_spinner(&manager, false)?;
    println!("{}", summary_line(&manager, &first));
    println!(
        "{}",
        style(format!(
            "Refreshing every {}, press Ctrl-C to stop",
            humantime::format_duration(interval)
        ))
        .dim()
    );

    let (tx, rx) = mpsc::channel();
    let _ticker = manager
        .spawn_background_refresh(interval, move |result| {
            let _ = tx.send(result);
        })
        .context("Failed to start background refresh")?;

    for result in rx {
        match result {
            Ok(report) if report.skipped => {}
            Ok(report) => println!("{}", summary_line(&manager, &report)),
            Err(err) => eprintln!("{} {err}", style("refresh failed:").red().bold()),
        }
    }
    Ok(())
}
