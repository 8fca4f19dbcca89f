use crate::model::{CommitRecord, FileStats};
use chrono::DateTime;
use std::collections::HashSet;

const HEADER_DELIMITER: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    pub record: CommitRecord,
    pub files: Vec<FileStats>,
}

/// Parses `git log --numstat` output in the NUL-delimited header format.
///
/// Malformed headers drop only their own commit (stat lines that follow are
/// ignored until the next valid header); malformed stat lines are skipped.
/// Repeated hashes are kept once.
pub fn parse_log(output: &str) -> Vec<ParsedCommit> {
    let mut commits = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current: Option<ParsedCommit> = None;
    let mut skipped = 0usize;

    for line in output.lines() {
        if line.contains(HEADER_DELIMITER) {
            if let Some(done) = current.take() {
                push_unique(&mut commits, &mut seen, done);
            }
            match parse_header(line) {
                Some(record) => {
                    current = Some(ParsedCommit {
                        record,
                        files: Vec::new(),
                    })
                }
                None => skipped += 1,
            }
            continue;
        }

        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        match (current.as_mut(), parse_numstat(line)) {
            (Some(commit), Some(stats)) => {
                commit.record.lines_added += stats.added_lines;
                commit.record.lines_removed += stats.deleted_lines;
                commit.record.files.push(stats.path.clone());
                commit.files.push(stats);
            }
            (Some(_), None) => skipped += 1,
            (None, _) => {}
        }
    }

    if let Some(done) = current.take() {
        push_unique(&mut commits, &mut seen, done);
    }

    if skipped > 0 {
        log::debug!("skipped {skipped} malformed log line(s)");
    }
    commits
}

fn push_unique(commits: &mut Vec<ParsedCommit>, seen: &mut HashSet<String>, commit: ParsedCommit) {
    if seen.insert(commit.record.hash.clone()) {
        commits.push(commit);
    }
}

fn parse_header(line: &str) -> Option<CommitRecord> {
    let mut fields = line.splitn(5, HEADER_DELIMITER);
    let hash = fields.next()?.trim();
    let timestamp = fields.next()?.trim();
    let author_name = fields.next()?.trim();
    let author_email = fields.next()?.trim();
    let message = fields.next().unwrap_or("").trim();

    if hash.len() < 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let timestamp = DateTime::parse_from_rfc3339(timestamp).ok()?;

    Some(CommitRecord {
        hash: hash.to_string(),
        timestamp,
        author_name: author_name.to_string(),
        author_email: author_email.to_string(),
        message: message.to_string(),
        files: Vec::new(),
        lines_added: 0,
        lines_removed: 0,
    })
}

fn parse_numstat(line: &str) -> Option<FileStats> {
    let mut parts = line.splitn(3, '\t');
    let added = parts.next()?.trim();
    let deleted = parts.next()?.trim();
    let path = parts.next()?.trim();
    if path.is_empty() {
        return None;
    }

    let path = rename_target(path);
    if added == "-" && deleted == "-" {
        return Some(FileStats {
            path,
            added_lines: 0,
            deleted_lines: 0,
            is_binary: true,
        });
    }

    Some(FileStats {
        path,
        added_lines: added.parse().ok()?,
        deleted_lines: deleted.parse().ok()?,
        is_binary: false,
    })
}

/// Resolves numstat rename notation to the destination path:
/// `src/{old => new}/lib.rs` becomes `src/new/lib.rs`, `a => b` becomes `b`.
fn rename_target(path: &str) -> String {
    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) {
        if open < close {
            let inner = &path[open + 1..close];
            if let Some((_, to)) = inner.split_once(" => ") {
                let joined = format!("{}{}{}", &path[..open], to, &path[close + 1..]);
                return joined.replace("//", "/");
            }
        }
    }
    match path.split_once(" => ") {
        Some((_, to)) => to.to_string(),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HASH_A: &str = "1111111111111111111111111111111111111111";
    const HASH_B: &str = "2222222222222222222222222222222222222222";
    const HASH_C: &str = "3333333333333333333333333333333333333333";

    fn header(hash: &str, ts: &str, subject: &str) -> String {
        format!("{hash}\0{ts}\0Ada Lovelace\0ada@example.com\0{subject}")
    }

    #[test]
    fn parses_headers_and_stats() {
        let output = format!(
            "{}\n\n10\t2\tsrc/main.rs\n3\t0\tREADME.md\n\n{}\n\n1\t1\tCargo.toml\n",
            header(HASH_A, "2024-05-01T10:00:00+02:00", "Add engine"),
            header(HASH_B, "2024-04-30T09:30:00+02:00", "Initial"),
        );

        let commits = parse_log(&output);
        assert_eq!(commits.len(), 2);

        let first = &commits[0].record;
        assert_eq!(first.hash, HASH_A);
        assert_eq!(first.message, "Add engine");
        assert_eq!(first.author_email, "ada@example.com");
        assert_eq!(first.lines_added, 13);
        assert_eq!(first.lines_removed, 2);
        assert_eq!(first.files, vec!["src/main.rs", "README.md"]);
        assert_eq!(first.timestamp.to_rfc3339(), "2024-05-01T10:00:00+02:00");

        assert_eq!(commits[1].record.lines_added, 1);
    }

    #[test]
    fn corrupt_record_does_not_discard_the_rest() {
        let output = format!(
            "{}\n\n4\t4\ta.rs\n\nnot-a-hash\0garbage\n7\t7\tlost.rs\n\n{}\n\nxx\tyy\tbad.rs\n2\t1\tb.rs\n",
            header(HASH_A, "2024-05-01T10:00:00Z", "first"),
            header(HASH_C, "2024-05-03T10:00:00Z", "third"),
        );

        let commits = parse_log(&output);
        let hashes: Vec<_> = commits.iter().map(|c| c.record.hash.as_str()).collect();
        assert_eq!(hashes, vec![HASH_A, HASH_C]);
        assert_eq!(commits[1].record.files, vec!["b.rs"]);
        assert_eq!(commits[1].record.lines_added, 2);
    }

    #[test]
    fn bad_timestamp_skips_commit() {
        let output = format!(
            "{}\n\n{}\n",
            header(HASH_A, "yesterday-ish", "broken"),
            header(HASH_B, "2024-05-01T10:00:00Z", "fine"),
        );
        let commits = parse_log(&output);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].record.hash, HASH_B);
    }

    #[test]
    fn binary_and_renamed_files() {
        let output = format!(
            "{}\n\n-\t-\tassets/logo.png\n5\t1\tsrc/{{old => new}}/lib.rs\n2\t2\tdocs/a.md => docs/b.md\n",
            header(HASH_A, "2024-05-01T10:00:00Z", "move things"),
        );
        let commits = parse_log(&output);
        let files = &commits[0].files;
        assert!(files[0].is_binary);
        assert_eq!(files[0].total_lines(), 0);
        assert_eq!(files[1].path, "src/new/lib.rs");
        assert_eq!(files[2].path, "docs/b.md");
    }

    #[test]
    fn empty_rename_side_collapses_slashes() {
        assert_eq!(rename_target("src/{ => nested}/x.rs"), "src/nested/x.rs");
        assert_eq!(rename_target("src/{nested => }/x.rs"), "src/x.rs");
    }

    #[test]
    fn duplicate_hashes_are_kept_once() {
        let output = format!(
            "{}\n\n1\t0\ta.rs\n\n{}\n\n1\t0\ta.rs\n",
            header(HASH_A, "2024-05-01T10:00:00Z", "same"),
            header(HASH_A, "2024-05-01T10:00:00Z", "same"),
        );
        assert_eq!(parse_log(&output).len(), 1);
    }

    #[test]
    fn empty_output_has_no_commits() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("\n\n").is_empty());
    }

    #[test]
    fn subject_may_be_empty() {
        let output = format!("{HASH_A}\x002024-05-01T10:00:00Z\0Ada\0ada@example.com\0\n");
        let commits = parse_log(&output);
        assert_eq!(commits[0].record.message, "");
    }
}
