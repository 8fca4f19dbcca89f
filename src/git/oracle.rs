use crate::error::{PulseError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// `git log` header: hash, strict ISO timestamp, author name, author email, subject.
pub const LOG_FORMAT: &str = "--format=%H%x00%aI%x00%an%x00%ae%x00%s";

/// Exit status git uses for fatal errors (not a repository, corrupt objects).
const GIT_FATAL_EXIT: i32 = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub repo_path: PathBuf,
    pub author: String,
    pub since: DateTime<Utc>,
    pub all_branches: bool,
    pub include_merges: bool,
}

/// Source of raw commit log text for a repository.
///
/// An empty string means the repository has no matching commits.
pub trait CommitSource: Send + Sync {
    fn log(&self, request: &LogRequest) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new<P: Into<PathBuf>>(binary: P, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    fn args(request: &LogRequest) -> Vec<String> {
        let mut args = vec![
            "log".to_string(),
            "--numstat".to_string(),
            "--no-color".to_string(),
            "--find-renames".to_string(),
            LOG_FORMAT.to_string(),
            format!(
                "--since={}",
                request.since.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
        ];
        if request.all_branches {
            args.push("--all".to_string());
        }
        if !request.include_merges {
            args.push("--no-merges".to_string());
        }
        if !request.author.is_empty() {
            args.push(format!("--author={}", request.author));
        }
        args
    }

    fn run(&self, repo_path: &Path, args: &[String]) -> Result<String> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(repo_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PulseError::oracle(repo_path, format!("failed to spawn git: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| PulseError::oracle(repo_path, "stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PulseError::oracle(repo_path, "stderr not captured"))?;

        // Drain both pipes so a chatty git cannot block on a full buffer.
        let out_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });
        let err_reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let Some(status) = child.wait_timeout(self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PulseError::Timeout {
                path: repo_path.to_path_buf(),
                timeout: self.timeout,
            });
        };

        let output = out_reader
            .join()
            .map_err(|_| PulseError::oracle(repo_path, "stdout reader panicked"))??;
        let stderr = err_reader.join().unwrap_or_default();

        match status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output).into_owned()),
            Some(GIT_FATAL_EXIT) => Err(PulseError::oracle(repo_path, stderr.trim().to_string())),
            Some(code) => {
                log::debug!(
                    "git exited with {code} in {}: {}; treating as no commits",
                    repo_path.display(),
                    stderr.trim()
                );
                Ok(String::new())
            }
            None => Err(PulseError::oracle(repo_path, "git terminated by signal")),
        }
    }
}

impl CommitSource for GitCli {
    fn log(&self, request: &LogRequest) -> Result<String> {
        self.run(&request.repo_path, &Self::args(request))
    }
}
