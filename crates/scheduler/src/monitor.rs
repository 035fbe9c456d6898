//! Cycle latency bookkeeping and health classification

use std::collections::{BTreeMap, VecDeque};
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rapidtap_policy_center::MonitorPolicy;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::StatsError;

pub const OP_CYCLE: &str = "cycle";
pub const OP_CACHE_HIT: &str = "cache_hit";
pub const OP_SEARCH: &str = "search";

const MIN_TREND_SAMPLES: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HealthStatus::Healthy => "HEALTHY",
            HealthStatus::Warning => "WARNING",
            HealthStatus::Critical => "CRITICAL",
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    pub count: u64,
    pub total_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub successes: u64,
}

impl OperationStats {
    fn record(&mut self, duration_ms: u64, success: bool) {
        self.min_ms = if self.count == 0 {
            duration_ms
        } else {
            self.min_ms.min(duration_ms)
        };
        self.max_ms = self.max_ms.max(duration_ms);
        self.count += 1;
        self.total_ms = self.total_ms.saturating_add(duration_ms);
        if success {
            self.successes += 1;
        }
    }

    pub fn avg_ms(&self) -> u64 {
        self.total_ms.checked_div(self.count).unwrap_or(0)
    }

    pub fn success_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.successes as f64 / self.count as f64
        }
    }
}

#[derive(Default)]
struct Detail {
    operations: BTreeMap<String, OperationStats>,
    recent: VecDeque<u64>,
}

pub struct PerformanceMonitor {
    policy: MonitorPolicy,
    total_ms: AtomicU64,
    count: AtomicU64,
    min_ms: AtomicU64,
    max_ms: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    detail: RwLock<Detail>,
}

impl PerformanceMonitor {
    pub fn new(policy: MonitorPolicy) -> Self {
        Self {
            policy,
            total_ms: AtomicU64::new(0),
            count: AtomicU64::new(0),
            min_ms: AtomicU64::new(u64::MAX),
            max_ms: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            detail: RwLock::new(Detail::default()),
        }
    }

    pub fn record(&self, operation: &str, duration_ms: i64, success: bool) -> Result<(), StatsError> {
        if duration_ms < 0 {
            warn!(operation, duration_ms, "rejecting negative duration");
            return Err(StatsError::NegativeLatency(duration_ms));
        }
        let duration = duration_ms as u64;
        self.total_ms.fetch_add(duration, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.min_ms.fetch_min(duration, Ordering::Relaxed);
        self.max_ms.fetch_max(duration, Ordering::Relaxed);

        {
            let mut detail = self.detail.write();
            detail
                .operations
                .entry(operation.to_string())
                .or_default()
                .record(duration, success);
            detail.recent.push_back(duration);
            while detail.recent.len() > self.policy.max_recent_operations {
                detail.recent.pop_front();
            }
        }

        if duration > self.policy.very_slow_operation_ms {
            warn!(operation, duration_ms = duration, "very slow operation");
        } else if duration > self.policy.slow_operation_ms {
            info!(operation, duration_ms = duration, "slow operation");
        }
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn average_ms(&self) -> u64 {
        self.total_ms
            .load(Ordering::Relaxed)
            .checked_div(self.count())
            .unwrap_or(0)
    }

    pub fn success_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.successes.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    pub fn min_ms(&self) -> u64 {
        match self.min_ms.load(Ordering::Relaxed) {
            u64::MAX => 0,
            min => min,
        }
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms.load(Ordering::Relaxed)
    }

    pub fn operation_stats(&self, operation: &str) -> Option<OperationStats> {
        self.detail.read().operations.get(operation).cloned()
    }

    pub fn all_operation_stats(&self) -> BTreeMap<String, OperationStats> {
        self.detail.read().operations.clone()
    }

    /// Most recent durations, oldest first.
    pub fn recent_trend(&self) -> Vec<u64> {
        let detail = self.detail.read();
        let skip = detail.recent.len().saturating_sub(self.policy.trend_window);
        detail.recent.iter().skip(skip).copied().collect()
    }

    pub fn is_degrading(&self) -> bool {
        let trend = self.recent_trend();
        if trend.len() < MIN_TREND_SAMPLES {
            return false;
        }
        let (first, second) = trend.split_at(trend.len() / 2);
        mean(second) > mean(first) * self.policy.degradation_factor
    }

    pub fn health_status(&self) -> HealthStatus {
        if self.count() == 0 {
            return HealthStatus::Healthy;
        }
        let avg = self.average_ms();
        let rate = self.success_rate();
        if avg > self.policy.very_slow_operation_ms || rate < 0.5 {
            HealthStatus::Critical
        } else if avg > self.policy.slow_operation_ms || rate < 0.8 || self.is_degrading() {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn export_metrics(&self) -> String {
        let trend = self
            .recent_trend()
            .iter()
            .map(|ms| ms.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut out = String::new();
        let _ = writeln!(out, "=== PERFORMANCE METRICS ===");
        let _ = writeln!(out, "Total Operations: {}", self.count());
        let _ = writeln!(out, "Average Time: {}ms", self.average_ms());
        let _ = writeln!(out, "Success Rate: {:.2}%", self.success_rate() * 100.0);
        let _ = writeln!(out, "Health Status: {}", self.health_status());
        let _ = writeln!(out, "Min Time: {}ms", self.min_ms());
        let _ = writeln!(out, "Max Time: {}ms", self.max_ms());
        let _ = writeln!(out, "Recent Trend: [{trend}]ms");
        let _ = writeln!(out);
        let _ = writeln!(out, "=== OPERATION BREAKDOWN ===");
        for (operation, stats) in self.all_operation_stats() {
            let _ = writeln!(
                out,
                "{operation}: {} ops, avg: {}ms, min: {}ms, max: {}ms, success: {:.2}%",
                stats.count,
                stats.avg_ms(),
                stats.min_ms,
                stats.max_ms,
                stats.success_rate() * 100.0
            );
        }
        let _ = writeln!(out, "=== END METRICS ===");
        out
    }

    pub fn reset(&self) {
        self.total_ms.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.min_ms.store(u64::MAX, Ordering::Relaxed);
        self.max_ms.store(0, Ordering::Relaxed);
        self.successes.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        let mut detail = self.detail.write();
        detail.operations.clear();
        detail.recent.clear();
        info!("performance monitor reset");
    }
}

fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<u64>() as f64 / values.len() as f64
}
