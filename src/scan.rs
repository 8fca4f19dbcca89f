use crate::error::{PulseError, Result};
use crate::util::expand_home;
use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    globs: Vec<String>,
    prefixes: Vec<PathBuf>,
}

impl ExcludeRules {
    /// Absolute or `~`-prefixed entries exclude a subtree; anything else is a glob
    /// relative to each scan root.
    pub fn new(rules: &[String]) -> Self {
        let mut globs = Vec::new();
        let mut prefixes = Vec::new();
        for rule in rules.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
            if rule.starts_with('/') || rule.starts_with('~') {
                prefixes.push(expand_home(rule));
            } else {
                globs.push(rule.to_string());
            }
        }
        Self { globs, prefixes }
    }

    fn overrides(&self, root: &Path) -> Result<Override> {
        let mut builder = OverrideBuilder::new(root);
        for glob in &self.globs {
            builder
                .add(&format!("!{glob}"))
                .map_err(|e| PulseError::Config(format!("Invalid exclude glob '{glob}': {e}")))?;
        }
        builder
            .build()
            .map_err(|e| PulseError::Config(format!("Invalid exclude rules: {e}")))
    }

    pub fn excludes_path(&self, path: &Path) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// Walks every root and returns the directories that contain a `.git` entry.
///
/// Unreadable subtrees and missing roots are logged and skipped.
pub fn discover_repositories(
    roots: &[PathBuf],
    rules: &ExcludeRules,
    max_depth: usize,
) -> Result<Vec<PathBuf>> {
    let mut found = BTreeSet::new();

    for root in roots {
        if rules.excludes_path(root) {
            continue;
        }
        if !root.exists() {
            log::warn!("scan root {} does not exist, skipping", root.display());
            continue;
        }

        let prefixes = rules.prefixes.clone();
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .follow_links(false)
            .max_depth(Some(max_depth))
            .overrides(rules.overrides(root)?)
            .filter_entry(move |entry| {
                entry.file_name() != ".git" && !prefixes.iter().any(|p| entry.path().starts_with(p))
            })
            .build();

        for result in walker {
            match result {
                Ok(entry) => {
                    let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                    if is_dir && entry.path().join(".git").exists() {
                        found.insert(entry.into_path());
                    }
                }
                Err(err) => log::warn!("skipping unreadable path under {}: {err}", root.display()),
            }
        }
    }

    Ok(found.into_iter().collect())
}
