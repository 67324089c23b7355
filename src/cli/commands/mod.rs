//! CLI command implementations

pub mod cache;
pub mod completions;
pub mod compute;
pub mod config;
pub mod init;
pub mod results;
pub mod status;
pub mod update;
pub mod validate;
