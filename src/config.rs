//! Engine configuration
//!
//! Every field has a default matching the reference behaviour, so a partial
//! JSON document (or none at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TrackerError;
use crate::types::CategoryBoundaries;

/// Countdown lengths offered before a session starts
pub const COUNTDOWN_OPTIONS: [u32; 3] = [0, 3, 10];

/// Default countdown length (seconds)
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 3;

/// Default clock granularity (hundredths of a second)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

/// Hard session ceiling (15 minutes)
pub const DEFAULT_SESSION_CEILING_SECONDS: u64 = 900;

/// Longest ceiling a configuration may ask for (one day)
pub const MAX_SESSION_CEILING_SECONDS: u64 = 86_400;

/// Daily active-time goal (15 minutes)
pub const DEFAULT_DAILY_GOAL_SECONDS: f64 = 900.0;

/// Default smoothing history size
pub const DEFAULT_SMOOTHING_WINDOW: usize = 10;

/// How long the "go" signal is shown before running starts
pub const GO_SIGNAL_HOLD: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub countdown_seconds: u32,
    pub tick_interval_ms: u64,
    pub session_ceiling_seconds: u64,
    pub daily_goal_seconds: f64,
    pub smoothing_window: usize,
    pub category_boundaries: CategoryBoundaries,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            session_ceiling_seconds: DEFAULT_SESSION_CEILING_SECONDS,
            daily_goal_seconds: DEFAULT_DAILY_GOAL_SECONDS,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            category_boundaries: CategoryBoundaries::default(),
        }
    }
}

impl EngineConfig {
    /// Builder-style countdown override
    pub fn with_countdown(mut self, seconds: u32) -> Self {
        self.countdown_seconds = seconds;
        self
    }

    pub fn with_category_boundaries(mut self, boundaries: CategoryBoundaries) -> Self {
        self.category_boundaries = boundaries;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Number of clock ticks that make up the session ceiling
    pub fn ceiling_ticks(&self) -> u64 {
        // validate() guarantees the tick divides the ceiling
        self.session_ceiling_seconds
            .saturating_mul(1000)
            .div_ceil(self.tick_interval_ms.max(1))
    }

    /// Check that the configuration describes a usable session
    pub fn validate(&self) -> Result<(), TrackerError> {
        if !COUNTDOWN_OPTIONS.contains(&self.countdown_seconds) {
            return Err(TrackerError::InvalidConfig(format!(
                "countdown_seconds must be one of {:?}, got {}",
                COUNTDOWN_OPTIONS, self.countdown_seconds
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(TrackerError::InvalidConfig(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.session_ceiling_seconds == 0 {
            return Err(TrackerError::InvalidConfig(
                "session_ceiling_seconds must be positive".to_string(),
            ));
        }
        if self.session_ceiling_seconds > MAX_SESSION_CEILING_SECONDS {
            return Err(TrackerError::InvalidConfig(format!(
                "session_ceiling_seconds must be at most {}, got {}",
                MAX_SESSION_CEILING_SECONDS, self.session_ceiling_seconds
            )));
        }
        if (self.session_ceiling_seconds * 1000) % self.tick_interval_ms != 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "tick_interval_ms {} does not divide the {}s ceiling",
                self.tick_interval_ms, self.session_ceiling_seconds
            )));
        }
        if self.daily_goal_seconds.is_nan() || self.daily_goal_seconds <= 0.0 {
            return Err(TrackerError::InvalidConfig(
                "daily_goal_seconds must be positive".to_string(),
            ));
        }
        if self.smoothing_window < 5 {
            return Err(TrackerError::InvalidConfig(format!(
                "smoothing_window must be at least 5, got {}",
                self.smoothing_window
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ceiling_ticks(), 90_000);
        assert_eq!(config.tick_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"countdown_seconds": 10}"#).unwrap();
        assert_eq!(config.countdown_seconds, 10);
        assert_eq!(config.session_ceiling_seconds, 900);
        assert_eq!(config.category_boundaries, CategoryBoundaries::Standard);
    }

    #[test]
    fn test_legacy_boundaries_from_json() {
        let config = EngineConfig::from_json(r#"{"category_boundaries": "legacy"}"#).unwrap();
        assert_eq!(config.category_boundaries, CategoryBoundaries::Legacy);
    }

    #[test]
    fn test_rejects_unsupported_countdown() {
        let result = EngineConfig::from_json(r#"{"countdown_seconds": 5}"#);
        assert!(matches!(result, Err(TrackerError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_tick() {
        let config = EngineConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_ceiling() {
        let json = r#"{"session_ceiling_seconds": 18446744073709551615}"#;
        let result = EngineConfig::from_json(json);
        assert!(matches!(result, Err(TrackerError::InvalidConfig(_))));

        let config = EngineConfig {
            session_ceiling_seconds: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.ceiling_ticks(), u64::MAX / 10 + 1);
        assert!(crate::session::SessionStateMachine::new(config).is_err());
    }

    #[test]
    fn test_tick_must_divide_ceiling() {
        let config = EngineConfig {
            tick_interval_ms: 7,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TrackerError::InvalidConfig(_))));

        let config = EngineConfig {
            tick_interval_ms: 250,
            session_ceiling_seconds: MAX_SESSION_CEILING_SECONDS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.ceiling_ticks(), 345_600);
    }

    #[test]
    fn test_roundtrip() {
        let config = EngineConfig::default()
            .with_countdown(0)
            .with_category_boundaries(CategoryBoundaries::Legacy);
        let loaded = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, loaded);
    }
}
