use crate::error::{PulseError, Result};
use crate::model::DateRange;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn resolve_range(since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
    let mut range = DateRange::new();

    let since_dt = since.map(parse_date).transpose()?;
    let until_dt = until.map(parse_date).transpose()?;

    if let (Some(s), Some(u)) = (since_dt, until_dt) {
        if s > u {
            return Err(PulseError::InvalidDate(format!(
                "Invalid range: since ({}) is after until ({})",
                s, u
            )));
        }
    }

    if let Some(s) = since_dt {
        range = range.with_since(s);
    }
    if let Some(u) = until_dt {
        range = range.with_until(u);
    }

    Ok(range)
}

pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    // RFC3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    // YYYY-MM-DD, local midnight
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            if let Some(local) = Local.from_local_datetime(&datetime).earliest() {
                return Ok(local.with_timezone(&Utc));
            }
        }
    }

    // Relative duration ("3 days ago", "2 weeks ago")
    if let Some(duration) = parse_natural_duration(input) {
        let delta = chrono::Duration::from_std(duration)
            .map_err(|_| PulseError::InvalidDate(format!("Duration overflow for '{input}'")))?;
        return Utc::now()
            .checked_sub_signed(delta)
            .ok_or_else(|| PulseError::InvalidDate(format!("Duration overflow for '{input}'")));
    }

    Err(PulseError::InvalidDate(format!(
        "Unrecognized date '{input}' (expected RFC3339, YYYY-MM-DD or 'N days ago')"
    )))
}

fn parse_natural_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    let units: [(&str, u64); 6] = [
        (" day ago", 86400),
        (" days ago", 86400),
        (" week ago", 7 * 86400),
        (" weeks ago", 7 * 86400),
        (" month ago", 30 * 86400),
        (" months ago", 30 * 86400),
    ];

    for (suffix, secs) in units {
        if let Some(n) = input.strip_suffix(suffix) {
            let n = n.trim().parse::<u64>().ok()?;
            return n.checked_mul(secs).map(Duration::from_secs);
        }
    }

    None
}

/// Maps a file path to a language name by extension or well-known file name.
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let path = Path::new(path);
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    match file_name {
        "Dockerfile" => return Some("Docker"),
        "Makefile" => return Some("Make"),
        _ => {}
    }

    let extension = path.extension().and_then(|s| s.to_str())?.to_lowercase();
    let language = match extension.as_str() {
        "rs" => "Rust",
        "go" => "Go",
        "py" | "pyi" => "Python",
        "js" | "mjs" | "cjs" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "java" => "Java",
        "kt" | "kts" => "Kotlin",
        "c" | "h" => "C",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "C++",
        "cs" => "C#",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "scala" => "Scala",
        "sh" | "bash" | "zsh" => "Shell",
        "lua" => "Lua",
        "zig" => "Zig",
        "ex" | "exs" => "Elixir",
        "hs" => "Haskell",
        "ml" | "mli" => "OCaml",
        "sql" => "SQL",
        "html" | "htm" => "HTML",
        "css" | "scss" | "sass" => "CSS",
        "vue" => "Vue",
        "svelte" => "Svelte",
        "md" | "markdown" => "Markdown",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "proto" => "Protobuf",
        "nix" => "Nix",
        _ => return None,
    };
    Some(language)
}

pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
