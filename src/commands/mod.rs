//! Command-line interface and orchestration for repo-pulse
//!
//! This module implements the CLI commands and coordinates the activity
//! pipeline to perform end-to-end collection and reporting. It handles
//! argument parsing and configuration management.
//!
//! # Commands
//!
//! - **collect**: Gather merged change requests and direct commits across
//!   the configured repositories and render a digest
//! - **cache**: Inspect or clear cached runs
//! - **init**: Generate a default configuration file
//!
//! # Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes to
//! the appropriate command handler. The collect command loads configuration,
//! answers from the run cache when possible, and otherwise drives a
//! [`Collector`](crate::activity::Collector) over a GitHub-backed source
//! before rendering the result with a
//! [`Summarizer`](crate::digest::Summarizer).
//!
//! Configuration is managed through a TOML file (`pulse.toml`) listing the
//! repositories and the collection, retry, and caching parameters.

mod cache;
mod collect;
mod common;
mod config;
mod host;
mod init;
mod progress_reporter;
mod run;

#[cfg(debug_assertions)]
pub use config::Config;

pub use cache::{CacheArgs, CacheCommand, process_cache};
pub use collect::{CollectArgs, process_collect};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use run::run;
