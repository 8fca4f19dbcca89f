pub mod oracle;
pub mod parse;

pub use oracle::{CommitSource, GitCli, LogRequest, LOG_FORMAT};
pub use parse::{parse_log, ParsedCommit};
