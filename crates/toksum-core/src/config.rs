//! Pool configuration

use serde::{Deserialize, Serialize};

use crate::{PoolError, Result};

/// Tuning knobs for the tokenization pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of execution units to keep alive.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Deadline for a single count job, from submission to resolution.
    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,

    /// Deadline for encoder initialization inside a fresh unit.
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,

    /// Jobs waiting for a free unit beyond this are load-shed to fallback.
    #[serde(default = "default_job_queue_capacity")]
    pub job_queue_capacity: usize,

    /// Hard ceiling on input size. Larger single-text inputs are rejected.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,

    /// Calibration constant for the length-based fallback estimate.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token_fallback: f64,

    /// On terminate, let in-flight jobs finish (true) or settle them
    /// immediately via fallback (false).
    #[serde(default = "default_drain_on_terminate")]
    pub drain_on_terminate: bool,

    /// Interval between health probes of live units.
    #[serde(default = "default_health_probe_interval_ms")]
    pub health_probe_interval_ms: u64,

    /// Texts at or above this size are handed to units behind a shared
    /// buffer instead of being copied into the message.
    #[serde(default = "default_shared_payload_threshold_bytes")]
    pub shared_payload_threshold_bytes: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            job_timeout_ms: default_job_timeout_ms(),
            init_timeout_ms: default_init_timeout_ms(),
            job_queue_capacity: default_job_queue_capacity(),
            max_input_bytes: default_max_input_bytes(),
            chars_per_token_fallback: default_chars_per_token(),
            drain_on_terminate: default_drain_on_terminate(),
            health_probe_interval_ms: default_health_probe_interval_ms(),
            shared_payload_threshold_bytes: default_shared_payload_threshold_bytes(),
        }
    }
}

impl PoolConfig {
    /// Check invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(PoolError::InvalidConfig(
                "pool_size must be at least 1".to_string(),
            ));
        }
        if self.chars_per_token_fallback <= 0.0 {
            return Err(PoolError::InvalidConfig(
                "chars_per_token_fallback must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(4))
        .unwrap_or(2)
}

fn default_job_timeout_ms() -> u64 {
    10_000
}

fn default_init_timeout_ms() -> u64 {
    30_000
}

fn default_job_queue_capacity() -> usize {
    256
}

fn default_max_input_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_chars_per_token() -> f64 {
    4.0
}

fn default_drain_on_terminate() -> bool {
    true
}

fn default_health_probe_interval_ms() -> u64 {
    5_000
}

fn default_shared_payload_threshold_bytes() -> usize {
    64 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PoolConfig::default();
        config.validate().unwrap();
        assert!(config.pool_size >= 1);
        assert_eq!(config.chars_per_token_fallback, 4.0);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PoolConfig = toml::from_str("pool_size = 8\njob_timeout_ms = 50").unwrap();
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.job_timeout_ms, 50);
        assert_eq!(config.max_input_bytes, 10 * 1024 * 1024);
        assert!(config.drain_on_terminate);
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let config = PoolConfig {
            pool_size: 0,
            ..PoolConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
