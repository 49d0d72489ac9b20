use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Repositories to collect activity for, as `owner/repo` or full URLs
    #[serde(default)]
    pub repositories: Vec<String>,

    /// How many days back the collection window reaches
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// How many repositories are fetched concurrently
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Retries allowed per remote operation on top of the original attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each subsequent retry
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Duration to keep a completed run reusable from the cache
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Whether a 403 response without any throttling signal is treated as a
    /// permission failure (`true`) or as an unsignalled rate limit (`false`)
    #[serde(default = "default_strict_forbidden")]
    pub strict_forbidden: bool,
}

const fn default_window_days() -> u32 {
    7
}

const fn default_batch_size() -> usize {
    10
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

const fn default_cache_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

const fn default_strict_forbidden() -> bool {
    true
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text =
                fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            // Look for pulse.toml in the current directory
            let path = Utf8PathBuf::from("pulse.toml");
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // No config file found, use defaults
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML)
            .into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if values are out of range
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(app_err!("batch_size must be at least 1"));
        }

        if self.window_days == 0 {
            return Err(app_err!("window_days must be at least 1"));
        }

        if self.cache_ttl.is_zero() {
            return Err(app_err!("cache_ttl must be greater than zero"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
