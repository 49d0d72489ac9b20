//! Shared pieces of the command layer: logging setup, color handling, and
//! cache directory resolution.

use crate::Result;
use camino::Utf8PathBuf;
use clap::ValueEnum;
use directories::BaseDirs;
use ohno::IntoAppError;
use std::path::PathBuf;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    /// Resolve the mode against the actual terminal.
    pub fn use_colors(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Initialize logger based on log level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}

/// Determine the cache directory: the provided path, or the platform cache
/// directory otherwise.
pub fn resolve_cache_dir(cache_dir: Option<&Utf8PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cache_dir {
        return Ok(path.as_std_path().to_path_buf());
    }

    Ok(BaseDirs::new()
        .into_app_err("could not determine cache directory")?
        .cache_dir()
        .join("repo-pulse"))
}
