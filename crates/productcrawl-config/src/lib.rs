//! # productcrawl-config
//!
//! Environment variable loading (`AppConfig`) and CLI flag parsing/mode
//! dispatch (`CliArgs`, `RunMode`) for the product-crawl worker.

pub mod app_config;
pub mod cli;
pub mod env;

pub use app_config::{AppConfig, PaapiLocaleKeys};
pub use cli::{CliArgs, ModeError, RunMode};
pub use env::{EnvConfigLoader, EnvError};
