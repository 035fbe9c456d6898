use thiserror::Error;

use rapidtap_core_types::TapError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("host fault: {0}")]
    Host(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SchedulerError> for TapError {
    fn from(value: SchedulerError) -> Self {
        TapError::new(value.to_string())
    }
}

/// Rejected statistics samples. Counters are left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("negative latency sample: {0}ms")]
    NegativeLatency(i64),
    #[error("negative success delta: {0}")]
    NegativeSuccessDelta(i64),
}

impl From<StatsError> for TapError {
    fn from(value: StatsError) -> Self {
        TapError::new(value.to_string())
    }
}
