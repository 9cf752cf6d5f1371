//! Validation cache configuration.

use thiserror::Error;

/// Default maximum number of cached expressions.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 10_000;

/// Default maximum expression length in characters.
pub const DEFAULT_MAX_EXPRESSION_LENGTH: usize = 10_000;

/// An invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{setting} must be non-negative, got {value}")]
    Negative { setting: &'static str, value: i64 },
    #[error("{setting} must be an integer, got {value:?}")]
    NotAnInteger { setting: &'static str, value: String },
}

/// Settings governing a [`ValidationCache`](super::ValidationCache).
///
/// ```
/// use xmlguard::query::ValidationConfig;
///
/// let config = ValidationConfig::new()
///     .caching_enabled(false)
///     .max_expression_length(0);
/// assert!(!config.is_caching_enabled());
/// assert_eq!(config.max_size(), 10_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    pub(crate) caching_enabled: bool,
    pub(crate) cache_max_size: usize,
    pub(crate) max_expression_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            caching_enabled: true,
            cache_max_size: DEFAULT_CACHE_MAX_SIZE,
            max_expression_length: DEFAULT_MAX_EXPRESSION_LENGTH,
        }
    }
}

impl ValidationConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables caching of validation verdicts.
    #[must_use]
    pub fn caching_enabled(mut self, enabled: bool) -> Self {
        self.caching_enabled = enabled;
        self
    }

    /// Sets the maximum number of cached expressions. 0 caches nothing.
    #[must_use]
    pub fn cache_max_size(mut self, size: usize) -> Self {
        self.cache_max_size = size;
        self
    }

    /// Sets the maximum expression length in characters. 0 disables the
    /// limit.
    #[must_use]
    pub fn max_expression_length(mut self, length: usize) -> Self {
        self.max_expression_length = length;
        self
    }

    #[must_use]
    pub fn is_caching_enabled(&self) -> bool {
        self.caching_enabled
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.cache_max_size
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_expression_length
    }
}

/// Converts a signed setting into a limit, rejecting negative values.
///
/// # Errors
///
/// Returns [`ConfigError::Negative`] when `value < 0`.
pub fn check_limit(setting: &'static str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|_| ConfigError::Negative { setting, value })
}

/// Parses a limit from text, e.g. a command-line flag.
///
/// ```
/// use xmlguard::query::{parse_limit, ConfigError};
///
/// assert_eq!(parse_limit("max_length", " 500 "), Ok(500));
/// assert!(matches!(parse_limit("max_length", "-1"), Err(ConfigError::Negative { .. })));
/// assert!(matches!(parse_limit("max_length", "1.5"), Err(ConfigError::NotAnInteger { .. })));
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::NotAnInteger`] for non-integer text and
/// [`ConfigError::Negative`] for negative integers.
pub fn parse_limit(setting: &'static str, text: &str) -> Result<usize, ConfigError> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| ConfigError::NotAnInteger {
            setting,
            value: text.to_owned(),
        })?;
    check_limit(setting, value)
}
