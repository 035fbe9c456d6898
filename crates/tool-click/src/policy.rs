use std::time::Duration;

use rapidtap_policy_center::DispatchPolicy;
use serde::{Deserialize, Serialize};

/// Fixed waits of the dispatcher that do not vary with the strategy.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchTimings {
    pub fallback_timeout_ms: u64,
    pub confirm_delay_ms: u64,
}

impl DispatchTimings {
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }
}

impl Default for DispatchTimings {
    fn default() -> Self {
        Self {
            fallback_timeout_ms: 500,
            confirm_delay_ms: 10,
        }
    }
}

impl From<&DispatchPolicy> for DispatchTimings {
    fn from(policy: &DispatchPolicy) -> Self {
        Self {
            fallback_timeout_ms: policy.fallback_timeout_ms,
            confirm_delay_ms: policy.confirm_delay_ms,
        }
    }
}
