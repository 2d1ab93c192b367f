//! System configuration parameters
//!
//! All tunable timeouts and cadences for the tracker.  Defaults are the
//! reference cadence; values can be overridden from a JSON file (bench
//! binary) or a postcard blob from the parameter store.

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Lifecycle coordinator timeouts.
    pub lifecycle: LifecycleConfig,
    /// Status LED cadence.
    pub indicator: IndicatorConfig,
    /// Console log level for the bench binary ("error" .. "trace").
    pub log_level: heapless::String<8>,
}

/// Timeouts owned by the lifecycle coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long a join may take before the stack is presumed stuck (seconds)
    pub join_timeout_secs: u32,
    /// Upper bound for a single transmission, TxStart to TxComplete (seconds)
    pub tx_timeout_secs: u32,
    /// Maximum quiet period between transmissions (seconds)
    pub tx_period_timeout_secs: u32,
    /// Margin added to the sensor period after TxComplete (seconds)
    pub tx_complete_margin_secs: u32,
    /// How long to wait for sensor data before sending without it (ms)
    pub sample_window_ms: u32,
    /// Consecutive watchdog resets tolerated before halting
    pub max_resets: u8,
    /// Re-poll interval while the low-power clock is not yet available (ms)
    pub clock_poll_interval_ms: u32,
    /// Extra sleep-lease time on top of a sensor poll delay (ms)
    pub sensor_poll_slack_ms: u32,
}

/// Status LED cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Fast blink half-period (ms)
    pub fast_blink_ms: u32,
    /// Rare blink on-time (ms)
    pub rare_blink_on_ms: u32,
    /// Rare blink off-time (ms)
    pub rare_blink_off_ms: u32,
    /// Render loop interval for steady patterns, used to catch battery changes (ms)
    pub idle_poll_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut log_level = heapless::String::new();
        let _ = log_level.push_str("info");
        Self {
            lifecycle: LifecycleConfig::default(),
            indicator: IndicatorConfig::default(),
            log_level,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: 2 * 60 * 60, // 2 h
            tx_timeout_secs: 8,
            tx_period_timeout_secs: 10 * 60, // 10 min
            tx_complete_margin_secs: 5,
            sample_window_ms: 2000,
            max_resets: 8,
            clock_poll_interval_ms: 1000,
            sensor_poll_slack_ms: 2, // ~64 ticks of the 32 kHz clock
        }
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            fast_blink_ms: 250,
            rare_blink_on_ms: 62,
            rare_blink_off_ms: 4000,
            idle_poll_ms: 10_000,
        }
    }
}

impl LifecycleConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.join_timeout_secs))
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.tx_timeout_secs))
    }

    pub fn tx_period_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.tx_period_timeout_secs))
    }

    pub fn tx_complete_margin(&self) -> Duration {
        Duration::from_secs(u64::from(self.tx_complete_margin_secs))
    }

    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(u64::from(self.sample_window_ms))
    }

    pub fn clock_poll_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.clock_poll_interval_ms))
    }

    pub fn sensor_poll_slack(&self) -> Duration {
        Duration::from_millis(u64::from(self.sensor_poll_slack_ms))
    }
}

impl IndicatorConfig {
    pub fn fast_blink(&self) -> Duration {
        Duration::from_millis(u64::from(self.fast_blink_ms))
    }

    pub fn rare_blink_on(&self) -> Duration {
        Duration::from_millis(u64::from(self.rare_blink_on_ms))
    }

    pub fn rare_blink_off(&self) -> Duration {
        Duration::from_millis(u64::from(self.rare_blink_off_ms))
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(u64::from(self.idle_poll_ms))
    }
}

impl SystemConfig {
    /// Reject values that would stall the watchdog or spin the scheduler.
    /// Invalid ranges are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.lifecycle;
        if l.max_resets == 0 {
            return Err(ConfigError::ValidationFailed("max_resets must be > 0"));
        }
        if l.join_timeout_secs == 0 || l.tx_timeout_secs == 0 || l.tx_period_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed("lifecycle timeouts must be > 0"));
        }
        if l.clock_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("clock_poll_interval_ms must be > 0"));
        }
        if u64::from(l.sample_window_ms) >= u64::from(l.tx_period_timeout_secs) * 1000 {
            return Err(ConfigError::ValidationFailed(
                "sample_window_ms must be shorter than tx_period_timeout_secs",
            ));
        }
        if u64::from(l.tx_timeout_secs) >= u64::from(l.tx_period_timeout_secs) {
            return Err(ConfigError::ValidationFailed(
                "tx_timeout_secs must be shorter than tx_period_timeout_secs",
            ));
        }

        let i = &self.indicator;
        if i.fast_blink_ms == 0 || i.rare_blink_on_ms == 0 || i.rare_blink_off_ms == 0 {
            return Err(ConfigError::ValidationFailed("blink periods must be > 0"));
        }
        if i.idle_poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("idle_poll_ms must be > 0"));
        }
        if i.rare_blink_on_ms >= i.rare_blink_off_ms {
            return Err(ConfigError::ValidationFailed(
                "rare_blink_on_ms must be shorter than rare_blink_off_ms",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode for the parameter store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupted)
    }

    /// Decode and validate a parameter-store blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }
}
