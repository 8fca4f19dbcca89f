use crate::cache::CacheManager;
use crate::model::{DisplayStats, StatsOutput, SCHEMA_VERSION};
use anyhow::Result;
use chrono::{Local, Utc};
use console::style;

pub fn exec(manager: &CacheManager, json: bool, no_refresh: bool) -> Result<()> {
    if !no_refresh {
        let interval = manager.config().refresh_interval()?;
        if manager.needs_refresh(interval) {
            crate::report::run_with_spinner(manager, false)?;
        }
    }

    let stats = manager.display_stats();
    if json {
        let output = StatsOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            last_sync: manager.last_sync(),
            stats,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output_table(&stats);
    }
    Ok(())
}

fn trend(percent: f64) -> String {
    let text = format!("{percent:+.0}%");
    if percent > 0.0 {
        style(text).green().to_string()
    } else if percent < 0.0 {
        style(text).red().to_string()
    } else {
        style(text).dim().to_string()
    }
}

fn output_table(stats: &DisplayStats) {
    println!("{}", style("Activity").bold());
    println!("{}", "─".repeat(50));
    println!(
        "Current streak: {} days   Longest: {} days",
        style(stats.current_streak).green().bold(),
        style(stats.longest_streak).cyan()
    );
    println!(
        "Last 7 days:    {} commits ({} vs previous week)",
        style(stats.weekly_total).cyan(),
        trend(stats.trend_percent)
    );
    println!("This week:      {} commits", stats.this_week_commits);
    println!("Daily average:  {:.1}", stats.daily_average);
    if let Some(hour) = stats.peak_hour {
        println!("Peak hour:      {hour:02}:00");
    }
    println!(
        "Lines:          {} / {}",
        style(format!("+{}", stats.total_additions)).green(),
        style(format!("-{}", stats.total_deletions)).red()
    );

    if !stats.languages.is_empty() {
        let mut languages: Vec<_> = stats.languages.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top: Vec<String> = languages
            .iter()
            .take(5)
            .map(|(name, lines)| format!("{name} ({lines})"))
            .collect();
        println!("Languages:      {}", top.join(", "));
    }

    if stats.repositories.is_empty() {
        println!("\nNo active repositories");
        return;
    }

    println!(
        "\n{:<30} {:>12} {:>6} {:>6} {:>8}",
        style("Repository").bold(),
        style("Last commit").bold(),
        style("Week").bold(),
        style("Month").bold(),
        style("Streak").bold()
    );
    println!("{}", "─".repeat(66));
    for row in &stats.repositories {
        let last = row
            .last_commit
            .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<30} {:>12} {:>6} {:>6} {:>8}",
            row.name, last, row.weekly_commits, row.monthly_commits, row.current_streak
        );
    }
}
