//! Pipeline worker and retry configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::{RetryPolicy, WorkerConfig};

use super::error::ValidationError;

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Workers per stage queue
    #[serde(default = "default_workers")]
    pub workers_per_stage: u32,

    /// How often an idle worker polls, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Total tries per job before dead-lettering
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay, in milliseconds
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Retry delay cap, in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::default()
            .with_concurrency(self.workers_per_stage)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    /// Validate pipeline configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidMaxAttempts);
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ValidationError::InvalidRetryDelays);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers_per_stage: default_workers(),
            poll_interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_workers() -> u32 {
    2
}

fn default_poll_interval() -> u64 {
    200
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    2_000
}

fn default_max_delay() -> u64 {
    60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_retry_ladder() {
        let config = PipelineConfig::default();
        let policy = config.retry_policy();

        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = PipelineConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidMaxAttempts)
        ));
    }

    #[test]
    fn inverted_delays_are_rejected() {
        let config = PipelineConfig {
            base_delay_ms: 5_000,
            max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidRetryDelays)
        ));
    }
}
