#![doc(hidden)]

//! Core library for repo-pulse
//!
//! This library consolidates all functionality for the repo-pulse tool, which
//! collects recent source-control activity (merged pull requests and direct
//! commits) across a configurable set of repositories and renders it as a
//! digest.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`activity`]: Resilient data collection and aggregation
//! - [`digest`]: Rendering of collected activity into a report

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod activity;
pub mod commands;
pub mod digest;

pub use crate::commands::{Host, run};
