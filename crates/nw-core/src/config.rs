//! Configuration structures for the ngxwatch scanner.
//!
//! This module provides [`ScanConfig`], the runtime tunables for the config
//! scanner. It implements [`Default`] with the values the scanner has always
//! shipped with: a 100 ms settle delay and a 5 minute periodic rescan.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Runtime tunables for the config scanner.
///
/// Controls how long the scanner waits for a changed file to settle before
/// re-reading it, and how often it performs an unprompted full rescan.
///
/// # Examples
///
/// ```
/// use nw_core::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.settle_delay_ms, 100);
/// assert_eq!(config.rescan_interval_secs, 300);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Settle window in milliseconds.
    ///
    /// After a change notification the scanner waits this long before
    /// re-reading the file, so that editors writing in several steps are
    /// observed only once the file is complete.
    pub settle_delay_ms: u64,

    /// Interval between unprompted full rescans, in seconds.
    ///
    /// Must be positive; a full rescan also runs on every removal event,
    /// so this is a safety net rather than the primary change source.
    pub rescan_interval_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            rescan_interval_secs: 300,
        }
    }
}

impl ScanConfig {
    /// Returns a copy with the given settle delay in milliseconds.
    #[inline]
    #[must_use]
    pub const fn with_settle_delay_ms(mut self, millis: u64) -> Self {
        self.settle_delay_ms = millis;
        self
    }

    /// Returns a copy with the given full-rescan interval in seconds.
    #[inline]
    #[must_use]
    pub const fn with_rescan_interval_secs(mut self, secs: u64) -> Self {
        self.rescan_interval_secs = secs;
        self
    }

    /// The settle delay as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// The full-rescan interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn rescan_interval(&self) -> Duration {
        Duration::from_secs(self.rescan_interval_secs)
    }

    /// Validates option values.
    ///
    /// A zero rescan interval is rejected: the periodic timer cannot be
    /// armed with a zero period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rescan_interval_secs == 0 {
            return Err(ConfigError::InvalidOption {
                option: "rescan_interval_secs".to_owned(),
                reason: "must be positive".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.settle_delay_ms, 100);
        assert_eq!(config.rescan_interval_secs, 300);
    }

    #[test]
    fn test_builders() {
        let config = ScanConfig::default()
            .with_settle_delay_ms(25)
            .with_rescan_interval_secs(60);
        assert_eq!(config.settle_delay_ms, 25);
        assert_eq!(config.rescan_interval_secs, 60);
    }

    #[test]
    fn test_duration_accessors() {
        let config = ScanConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(100));
        assert_eq!(config.rescan_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = ScanConfig::default().with_rescan_interval_secs(0);
        assert!(config.validate().is_err());
        assert!(ScanConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = ScanConfig::default().with_settle_delay_ms(50);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"settle_delay_ms": 10}"#;
        let config: ScanConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.settle_delay_ms, 10);
        // Other fields should have defaults
        assert_eq!(config.rescan_interval_secs, 300);
    }
}
