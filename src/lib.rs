pub mod analytics;
pub mod cache;
pub mod cli;
pub mod commits;
pub mod config;
pub mod error;
pub mod extract;
pub mod git;
pub mod model;
pub mod report;
pub mod scan;
pub mod stats;
pub mod util;
