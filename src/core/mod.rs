//! Core module - workspace, configuration and the result cache

pub mod cache;
pub mod config;
pub mod example;
pub mod loader;
pub mod logging;
pub mod project;

pub use cache::{CacheScope, ResultCache, UpdateStats};
pub use config::Config;
pub use loader::load_model;
pub use project::{Project, ProjectError};
