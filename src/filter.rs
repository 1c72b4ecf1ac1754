//! Recognition of l2met metric lines.
//!
//! l2met picks measurements out of ordinary log output by convention:
//! `measure#name=value`, `sample#name=value` or `count#name=value` anywhere
//! in the line.

use regex::Regex;

use crate::config::ConfigError;

/// Pattern a line must contain to be forwarded.
pub const METRIC_PATTERN: &str = "(measure|sample|count)#.+=.+";

/// Compiled metric line matcher.
#[derive(Debug, Clone)]
pub struct MetricFilter {
    pattern: Regex,
}

impl MetricFilter {
    /// Compile the metric pattern.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Pattern` if the pattern fails to compile.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_pattern(METRIC_PATTERN)
    }

    pub(crate) fn with_pattern(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(ConfigError::Pattern)?;
        Ok(Self { pattern })
    }

    /// Whether `data` contains a metric anywhere in it.
    pub fn is_match(&self, data: &str) -> bool {
        self.pattern.is_match(data)
    }
}
