//! Background loop configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Intervals and batch sizes for the background loops.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between reconciliation passes over pending transactions.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Seconds between session-completion sweeps.
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_secs: u64,

    /// Maximum items processed per loop pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

impl SchedulerConfig {
    /// Reconciliation interval as a Duration.
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Session sweep interval as a Duration.
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }

    /// Validate scheduler configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reconcile_interval_secs == 0
            || self.session_sweep_interval_secs == 0
            || self.batch_size == 0
        {
            return Err(ValidationError::InvalidSchedulerInterval);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
            session_sweep_interval_secs: default_session_sweep_interval(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_reconcile_interval() -> u64 {
    600
}

fn default_session_sweep_interval() -> u64 {
    300
}

fn default_batch_size() -> u32 {
    100
}
