//! Configuration for IN-set construction.
//!
//! Settings are layered with `figment`:
//!
//! 1. Built-in defaults
//! 2. A TOML file (optional, missing files are skipped)
//! 3. Environment variables prefixed with `INSET_` (nested keys use `__`,
//!    e.g. `INSET_LIMITS__MAX_ROWS=1000`)
//!
//! ```toml
//! fill_elements = true
//! transform_null_in = false
//!
//! [limits]
//! max_rows = 1000000
//! max_bytes = 0
//! overflow_mode = "throw"
//! ```

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "INSET_";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration sources could not be parsed or merged.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A value is out of its accepted range.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Dotted configuration key.
        key: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// What to do once a size limit is crossed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowMode {
    /// Escalate to a `SizeLimitExceeded` error.
    #[default]
    Throw,
    /// Stop accumulating and report the overflow without failing.
    Break,
}

/// Row/byte limit policy for an accumulating structure. A zero limit is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeLimits {
    /// Maximum accumulated rows.
    pub max_rows: u64,
    /// Maximum accumulated bytes.
    pub max_bytes: u64,
    /// Overflow behaviour.
    pub overflow_mode: OverflowMode,
}

impl SizeLimits {
    /// Creates a limit policy.
    #[must_use]
    pub const fn new(max_rows: u64, max_bytes: u64, overflow_mode: OverflowMode) -> Self {
        Self {
            max_rows,
            max_bytes,
            overflow_mode,
        }
    }

    /// No limits at all.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self::new(0, 0, OverflowMode::Throw)
    }

    /// Returns true while `rows` and `bytes` are within the limits.
    #[must_use]
    pub const fn soft_check(&self, rows: u64, bytes: u64) -> bool {
        !((self.max_rows != 0 && rows > self.max_rows)
            || (self.max_bytes != 0 && bytes > self.max_bytes))
    }

    /// Escalating check.
    ///
    /// Returns `Ok(true)` within limits. Once exceeded, `Throw` mode fails with
    /// `SizeLimitExceeded` and `Break` mode returns `Ok(false)`.
    pub fn check(&self, rows: u64, bytes: u64, what: &str) -> Result<bool> {
        if self.soft_check(rows, bytes) {
            return Ok(true);
        }
        match self.overflow_mode {
            OverflowMode::Throw => Err(Error::SizeLimitExceeded {
                what: what.to_string(),
                rows,
                max_rows: self.max_rows,
                bytes,
                max_bytes: self.max_bytes,
            }),
            OverflowMode::Break => Ok(false),
        }
    }

    /// Returns true if any limit is configured.
    #[must_use]
    pub const fn has_limits(&self) -> bool {
        self.max_rows != 0 || self.max_bytes != 0
    }
}

/// Build options for an IN-set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetConfig {
    /// Size-limit policy.
    pub limits: SizeLimits,
    /// Keep a projection of distinct key components (needed for range indexes).
    pub fill_elements: bool,
    /// Treat NULL as an ordinary comparable key value.
    pub transform_null_in: bool,
}

impl SetConfig {
    /// Loads configuration from defaults, an optional TOML file and `INSET_` env vars.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string layered over defaults.
    pub fn from_toml_str(toml: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.limits.overflow_mode == OverflowMode::Break && !self.limits.has_limits() {
            return Err(ConfigError::InvalidValue {
                key: "limits.overflow_mode".to_string(),
                message: "break mode requires max_rows or max_bytes".to_string(),
            });
        }
        Ok(())
    }
}
