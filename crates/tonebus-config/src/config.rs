//! The engine's static startup configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tonebus_core::ConfigValidationError;

use crate::error::ConfigError;

/// Typed, validated startup configuration for a tonebus engine instance.
///
/// This is the only recognised set of knobs: no other configuration
/// surface exists for core runtime behaviour. Chain/processor topology
/// and parameter values are *not* persisted here — only the static
/// settings an engine needs before it can accept its first block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Audio sample rate, in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames per audio block.
    #[serde(default = "default_block_size")]
    pub block_size: u32,

    /// Entries per inbound/outbound RT queue. Must be a power of two.
    #[serde(default = "default_rt_queue_capacity")]
    pub rt_queue_capacity: usize,

    /// Dispatcher tick period, in milliseconds.
    #[serde(default = "default_dispatcher_tick_ms")]
    pub dispatcher_tick_ms: u64,

    /// Worker tick period, in milliseconds.
    #[serde(default = "default_worker_tick_ms")]
    pub worker_tick_ms: u64,

    /// Worker telemetry reporting cadence, in seconds.
    #[serde(default = "default_timing_report_interval_s")]
    pub timing_report_interval_s: u64,
}

const fn default_sample_rate() -> u32 {
    48_000
}

const fn default_block_size() -> u32 {
    64
}

const fn default_rt_queue_capacity() -> usize {
    1024
}

const fn default_dispatcher_tick_ms() -> u64 {
    1
}

const fn default_worker_tick_ms() -> u64 {
    5
}

const fn default_timing_report_interval_s() -> u64 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            rt_queue_capacity: default_rt_queue_capacity(),
            dispatcher_tick_ms: default_dispatcher_tick_ms(),
            worker_tick_ms: default_worker_tick_ms(),
            timing_report_interval_s: default_timing_report_interval_s(),
        }
    }
}

impl EngineConfig {
    /// Loads and validates configuration from a TOML file. Missing fields
    /// fall back to [`EngineConfig::default`]'s values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| ConfigError::read_file(path, source))?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes this configuration to a TOML file, creating or
    /// truncating it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| ConfigError::write_file(path, source))
    }

    /// Validates every recognised knob, returning the first violation
    /// found.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.block_size == 0 {
            return Err(ConfigValidationError::ZeroBlockSize);
        }
        if !self.rt_queue_capacity.is_power_of_two() {
            return Err(ConfigValidationError::CapacityNotPowerOfTwo(
                self.rt_queue_capacity,
            ));
        }
        if self.dispatcher_tick_ms == 0 {
            return Err(ConfigValidationError::ZeroTickPeriod {
                field: "dispatcher_tick_ms",
            });
        }
        if self.worker_tick_ms == 0 {
            return Err(ConfigValidationError::ZeroTickPeriod {
                field: "worker_tick_ms",
            });
        }
        if self.timing_report_interval_s == 0 {
            return Err(ConfigValidationError::ZeroTimingInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let config = EngineConfig {
            block_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroBlockSize));
    }

    #[test]
    fn non_power_of_two_capacity_is_rejected() {
        let config = EngineConfig {
            rt_queue_capacity: 1000,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::CapacityNotPowerOfTwo(1000))
        );
    }

    #[test]
    fn zero_tick_period_is_rejected() {
        let config = EngineConfig {
            dispatcher_tick_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroTickPeriod {
                field: "dispatcher_tick_ms"
            })
        );
    }

    #[test]
    fn round_trips_through_a_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tonebus.toml");
        let config = EngineConfig {
            sample_rate: 44_100,
            ..EngineConfig::default()
        };
        config.save(&path).expect("save");
        let loaded = EngineConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tonebus.toml");
        std::fs::write(&path, "sample_rate = 96000\n").expect("write");
        let loaded = EngineConfig::load(&path).expect("load");
        assert_eq!(loaded.sample_rate, 96_000);
        assert_eq!(loaded.block_size, default_block_size());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = EngineConfig::load("/nonexistent/tonebus.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
