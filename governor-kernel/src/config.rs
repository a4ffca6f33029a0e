//! Kernel configuration and loaders.
//!
//! Configuration can come from three places, later sources overriding
//! earlier ones in the caller's composition: built-in defaults, a TOML file
//! via [`load_config`], and `GOVERNOR_`-prefixed environment variables via
//! [`load_config_from_env`].
//!
//! # File format
//!
//! ```toml
//! review_threshold     = 0.7
//! queue_capacity       = 256
//! learning_interval_ms = 5000
//! publish_attempts     = 3
//!
//! [adjuster]
//! step    = 50.0
//! floor   = 100.0
//! ceiling = 1000.0
//! ```

use std::fs;

use governor_learning::AdjusterConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating kernel configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file `{path}`: {source}")]
    FileRead {
        /// Path that could not be read.
        path: String,
        /// Source I/O error.
        source: std::io::Error,
    },

    /// The TOML content did not match the expected schema.
    #[error("failed to parse config: {source}")]
    Parse {
        /// Source TOML error.
        #[from]
        source: toml::de::Error,
    },

    /// An environment variable or field carried an unusable value.
    #[error("invalid config value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field or variable.
        field: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Tunables for the governance kernel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Weighted pass fraction below which a clean decision becomes `review`.
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,

    /// Maximum number of events held by the queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Milliseconds between learning loop ticks.
    #[serde(default = "default_learning_interval_ms")]
    pub learning_interval_ms: u64,

    /// Publish attempts per learning pass before giving up on version races.
    #[serde(default = "default_publish_attempts")]
    pub publish_attempts: usize,

    /// Threshold adjustment tunables.
    #[serde(default)]
    pub adjuster: AdjusterConfig,
}

fn default_review_threshold() -> f64 {
    0.7
}

fn default_queue_capacity() -> usize {
    256
}

fn default_learning_interval_ms() -> u64 {
    5_000
}

fn default_publish_attempts() -> usize {
    3
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            review_threshold: default_review_threshold(),
            queue_capacity: default_queue_capacity(),
            learning_interval_ms: default_learning_interval_ms(),
            publish_attempts: default_publish_attempts(),
            adjuster: AdjusterConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Checks the configuration for internally consistent values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for out-of-range fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.review_threshold) {
            return Err(ConfigError::invalid(
                "review_threshold",
                "must be within [0.0, 1.0]",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("queue_capacity", "must be positive"));
        }
        if self.learning_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "learning_interval_ms",
                "must be positive",
            ));
        }
        if self.adjuster.step <= 0.0 {
            return Err(ConfigError::invalid("adjuster.step", "must be positive"));
        }
        if self.adjuster.floor > self.adjuster.ceiling {
            return Err(ConfigError::invalid(
                "adjuster.floor",
                "must not exceed adjuster.ceiling",
            ));
        }
        Ok(())
    }
}

/// Loads and validates a [`KernelConfig`] from a TOML file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, parsed, or fails
/// validation.
pub fn load_config(path: &str) -> Result<KernelConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_owned(),
        source,
    })?;
    let config: KernelConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Loads a [`KernelConfig`] from `GOVERNOR_`-prefixed environment variables,
/// falling back to defaults for unset variables.
///
/// | Variable                        | Type  | Default |
/// |---------------------------------|-------|---------|
/// | `GOVERNOR_REVIEW_THRESHOLD`     | f64   | 0.7     |
/// | `GOVERNOR_QUEUE_CAPACITY`       | usize | 256     |
/// | `GOVERNOR_LEARNING_INTERVAL_MS` | u64   | 5000    |
/// | `GOVERNOR_PUBLISH_ATTEMPTS`     | usize | 3       |
/// | `GOVERNOR_ADJUST_STEP`          | f64   | 50.0    |
/// | `GOVERNOR_ADJUST_FLOOR`         | f64   | 100.0   |
/// | `GOVERNOR_ADJUST_CEILING`       | f64   | 1000.0  |
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when a set variable cannot be
/// parsed or the resulting configuration fails validation.
pub fn load_config_from_env() -> Result<KernelConfig, ConfigError> {
    let defaults = KernelConfig::default();
    let config = KernelConfig {
        review_threshold: read_env_f64("GOVERNOR_REVIEW_THRESHOLD", defaults.review_threshold)?,
        queue_capacity: read_env_usize("GOVERNOR_QUEUE_CAPACITY", defaults.queue_capacity)?,
        learning_interval_ms: read_env_u64(
            "GOVERNOR_LEARNING_INTERVAL_MS",
            defaults.learning_interval_ms,
        )?,
        publish_attempts: read_env_usize("GOVERNOR_PUBLISH_ATTEMPTS", defaults.publish_attempts)?,
        adjuster: AdjusterConfig {
            step: read_env_f64("GOVERNOR_ADJUST_STEP", defaults.adjuster.step)?,
            floor: read_env_f64("GOVERNOR_ADJUST_FLOOR", defaults.adjuster.floor)?,
            ceiling: read_env_f64("GOVERNOR_ADJUST_CEILING", defaults.adjuster.ceiling)?,
        },
    };
    config.validate()?;
    Ok(config)
}

fn read_env_f64(key: &str, default: f64) -> Result<f64, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<f64>()
            .map_err(|err| ConfigError::invalid(key, err.to_string())),
        Err(_) => Ok(default),
    }
}

fn read_env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<u64>()
            .map_err(|err| ConfigError::invalid(key, err.to_string())),
        Err(_) => Ok(default),
    }
}

fn read_env_usize(key: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<usize>()
            .map_err(|err| ConfigError::invalid(key, err.to_string())),
        Err(_) => Ok(default),
    }
}
