//! Adaptive strategy selection
//!
//! Outcome counters are plain atomics updated from any task. The classifier
//! runs at most once per recompute interval, under a mutex that callers only
//! `try_lock`: a caller that loses the race keeps using the published
//! strategy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rapidtap_core_types::{Strategy, StrategyKind};
use rapidtap_policy_center::{ClassifierThresholds, StatsWindow, StrategyPolicy};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::StatsError;

const NEVER: u64 = u64::MAX;

/// Maps observed health onto a strategy. First match wins; all
/// comparisons are strict.
pub fn classify(
    failure_rate: f64,
    avg_latency_ms: u64,
    thresholds: &ClassifierThresholds,
) -> StrategyKind {
    if failure_rate > thresholds.emergency_failure_rate
        && avg_latency_ms > thresholds.emergency_latency_ms
    {
        StrategyKind::Emergency
    } else if failure_rate > thresholds.aggressive_failure_rate
        || avg_latency_ms > thresholds.aggressive_latency_ms
    {
        StrategyKind::Aggressive
    } else if failure_rate < thresholds.turbo_failure_rate
        && avg_latency_ms < thresholds.turbo_latency_ms
    {
        StrategyKind::Turbo
    } else {
        StrategyKind::Normal
    }
}

pub fn failure_rate(successes: u64, failures: u64) -> f64 {
    let attempts = successes.saturating_add(failures);
    if attempts == 0 {
        0.0
    } else {
        failures as f64 / attempts as f64
    }
}

/// Exponentially weighted latency, 3:1 toward history.
pub fn ewma(avg_ms: u64, sample_ms: u64) -> u64 {
    if avg_ms == 0 {
        sample_ms
    } else {
        avg_ms.saturating_mul(3).saturating_add(sample_ms) / 4
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub strategy: StrategyKind,
    pub successes: u64,
    pub failures: u64,
    pub failure_rate: f64,
    pub avg_latency_ms: u64,
    pub recomputations: u64,
}

pub struct StrategyController {
    policy: StrategyPolicy,
    current: ArcSwap<Strategy>,
    successes: AtomicU64,
    failures: AtomicU64,
    avg_latency_ms: AtomicU64,
    recomputations: AtomicU64,
    epoch: Instant,
    last_recompute_ms: AtomicU64,
    recompute_lock: Mutex<()>,
}

impl StrategyController {
    pub fn new(policy: StrategyPolicy) -> Self {
        let initial = policy.strategy(StrategyKind::Normal);
        Self {
            policy,
            current: ArcSwap::from_pointee(initial),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            avg_latency_ms: AtomicU64::new(0),
            recomputations: AtomicU64::new(0),
            epoch: Instant::now(),
            last_recompute_ms: AtomicU64::new(NEVER),
            recompute_lock: Mutex::new(()),
        }
    }

    /// Folds one cycle into the statistics.
    pub fn record_outcome(&self, latency_ms: i64, success_delta: i64) -> Result<(), StatsError> {
        if latency_ms < 0 {
            warn!(latency_ms, "rejecting latency sample");
            return Err(StatsError::NegativeLatency(latency_ms));
        }
        if success_delta < 0 {
            warn!(success_delta, "rejecting success delta");
            return Err(StatsError::NegativeSuccessDelta(success_delta));
        }
        self.successes
            .fetch_add(success_delta as u64, Ordering::AcqRel);
        let sample = latency_ms as u64;
        // closure always returns Some, so the update cannot fail
        let _ = self
            .avg_latency_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |avg| {
                Some(ewma(avg, sample))
            });
        Ok(())
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns the active strategy, recomputing first when the interval has
    /// passed or no recomputation has happened yet.
    pub fn current_strategy(&self) -> Arc<Strategy> {
        if self.recompute_due() {
            if let Some(_guard) = self.recompute_lock.try_lock() {
                // another caller may have finished while we waited for the lock
                if self.recompute_due() {
                    self.recompute_locked();
                }
            }
        }
        self.current.load_full()
    }

    /// Recomputes regardless of the interval.
    pub fn recompute_now(&self) -> Arc<Strategy> {
        let _guard = self.recompute_lock.lock();
        self.recompute_locked();
        self.current.load_full()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let successes = self.successes.load(Ordering::Acquire);
        let failures = self.failures.load(Ordering::Acquire);
        StatsSnapshot {
            strategy: self.current.load().kind,
            successes,
            failures,
            failure_rate: failure_rate(successes, failures),
            avg_latency_ms: self.avg_latency_ms.load(Ordering::Acquire),
            recomputations: self.recomputations.load(Ordering::Acquire),
        }
    }

    fn recompute_due(&self) -> bool {
        let last = self.last_recompute_ms.load(Ordering::Acquire);
        if last == NEVER {
            return true;
        }
        let since = self.elapsed_ms().saturating_sub(last);
        Duration::from_millis(since) > self.policy.recompute_interval()
    }

    fn recompute_locked(&self) {
        let successes = self.successes.load(Ordering::Acquire);
        let failures = self.failures.load(Ordering::Acquire);
        let avg_latency_ms = self.avg_latency_ms.load(Ordering::Acquire);
        let rate = failure_rate(successes, failures);
        let kind = classify(rate, avg_latency_ms, &self.policy.thresholds);

        let previous = self.current.swap(Arc::new(self.policy.strategy(kind)));
        if previous.kind != kind {
            info!(
                from = %previous.kind,
                to = %kind,
                failure_rate = rate,
                avg_latency_ms,
                "strategy changed"
            );
        } else {
            debug!(strategy = %kind, failure_rate = rate, avg_latency_ms, "strategy kept");
        }

        if self.policy.window == StatsWindow::Windowed {
            // subtract what was observed so concurrent increments survive
            self.successes.fetch_sub(successes, Ordering::AcqRel);
            self.failures.fetch_sub(failures, Ordering::AcqRel);
            self.reset_latency(avg_latency_ms);
        }
        self.recomputations.fetch_add(1, Ordering::AcqRel);
        self.last_recompute_ms
            .store(self.elapsed_ms(), Ordering::Release);
    }

    /// Zeroes the average only if it still holds `observed`. A sample folded
    /// in after the classifier read is carried into the next window.
    fn reset_latency(&self, observed: u64) -> bool {
        match self.avg_latency_ms.compare_exchange(
            observed,
            0,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(current) => {
                debug!(observed, current, "latency sample raced window reset");
                false
            }
        }
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(NEVER - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapidtap_policy_center::default_snapshot;

    fn thresholds() -> ClassifierThresholds {
        default_snapshot().strategy.thresholds
    }

    fn controller() -> StrategyController {
        StrategyController::new(default_snapshot().strategy)
    }

    #[test]
    fn classification_boundaries_are_strict() {
        let t = thresholds();
        assert_eq!(classify(0.71, 3001, &t), StrategyKind::Emergency);
        assert_eq!(classify(0.7, 3001, &t), StrategyKind::Aggressive);
        assert_eq!(classify(0.71, 3000, &t), StrategyKind::Aggressive);
        assert_eq!(classify(0.41, 0, &t), StrategyKind::Aggressive);
        assert_eq!(classify(0.4, 2000, &t), StrategyKind::Normal);
        assert_eq!(classify(0.0, 2001, &t), StrategyKind::Aggressive);
        assert_eq!(classify(0.09, 499, &t), StrategyKind::Turbo);
        assert_eq!(classify(0.1, 499, &t), StrategyKind::Normal);
        assert_eq!(classify(0.09, 500, &t), StrategyKind::Normal);
        assert_eq!(classify(0.0, 0, &t), StrategyKind::Turbo);
    }

    #[test]
    fn classification_is_total() {
        let t = thresholds();
        for rate in [0.0, 0.05, 0.1, 0.25, 0.4, 0.55, 0.7, 0.85, 1.0] {
            for latency in [0, 250, 500, 1_000, 2_000, 2_500, 3_000, 10_000] {
                let kind = classify(rate, latency, &t);
                assert!(StrategyKind::all().contains(&kind));
            }
        }
    }

    #[test]
    fn ewma_replay_is_deterministic() {
        let samples = [120, 80, 400, 0, 1_000];
        let replay = |samples: &[u64]| samples.iter().fold(0, |avg, s| ewma(avg, *s));
        assert_eq!(replay(&samples), replay(&samples));
        assert_eq!(ewma(0, 120), 120);
        assert_eq!(ewma(120, 80), 110);
        assert_eq!(ewma(110, 400), 182);

        let controller = controller();
        for sample in samples {
            controller.record_outcome(sample as i64, 1).unwrap();
        }
        assert_eq!(controller.snapshot().avg_latency_ms, replay(&samples));
        assert_eq!(controller.snapshot().successes, 5);
    }

    #[test]
    fn invalid_samples_leave_counters_untouched() {
        let controller = controller();
        controller.record_outcome(100, 1).unwrap();
        assert_eq!(
            controller.record_outcome(-1, 1),
            Err(StatsError::NegativeLatency(-1))
        );
        assert_eq!(
            controller.record_outcome(10, -2),
            Err(StatsError::NegativeSuccessDelta(-2))
        );
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.successes, 1);
        assert_eq!(snapshot.avg_latency_ms, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn first_call_recomputes_then_waits_for_interval() {
        let controller = controller();
        assert_eq!(controller.snapshot().strategy, StrategyKind::Normal);
        assert_eq!(controller.current_strategy().kind, StrategyKind::Turbo);
        assert_eq!(controller.snapshot().recomputations, 1);

        for _ in 0..9 {
            controller.record_failure();
        }
        controller.record_outcome(3_500, 1).unwrap();
        tokio::time::advance(Duration::from_millis(5_000)).await;
        assert_eq!(controller.current_strategy().kind, StrategyKind::Turbo);

        tokio::time::advance(Duration::from_millis(1)).await;
        let strategy = controller.current_strategy();
        assert_eq!(strategy.kind, StrategyKind::Emergency);
        assert_eq!(strategy.time_budget, Duration::from_millis(2_000));
        assert_eq!(controller.snapshot().recomputations, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn windowed_mode_resets_counters() {
        let mut policy = default_snapshot().strategy;
        policy.window = StatsWindow::Windowed;
        let controller = StrategyController::new(policy);
        controller.record_outcome(600, 3).unwrap();
        controller.record_failure();
        assert_eq!(controller.current_strategy().kind, StrategyKind::Normal);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.successes, 0);
        assert_eq!(snapshot.failures, 0);
        assert_eq!(snapshot.avg_latency_ms, 0);
        assert_eq!(controller.recompute_now().kind, StrategyKind::Turbo);
    }

    #[test]
    fn late_latency_sample_survives_window_reset() {
        let controller = controller();
        controller.record_outcome(400, 1).unwrap();
        let observed = controller.snapshot().avg_latency_ms;
        controller.record_outcome(800, 1).unwrap();
        assert!(!controller.reset_latency(observed));
        assert_eq!(controller.snapshot().avg_latency_ms, ewma(400, 800));

        let current = controller.snapshot().avg_latency_ms;
        assert!(controller.reset_latency(current));
        assert_eq!(controller.snapshot().avg_latency_ms, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lifetime_mode_keeps_counters() {
        let controller = controller();
        controller.record_outcome(600, 3).unwrap();
        controller.record_failure();
        assert_eq!(controller.current_strategy().kind, StrategyKind::Normal);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.successes, 3);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.failure_rate, 0.25);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_are_counted() {
        let controller = Arc::new(controller());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let controller = controller.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    controller.record_outcome(50, 1).unwrap();
                    controller.record_failure();
                    let _ = controller.current_strategy();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.successes, 800);
        assert_eq!(snapshot.failures, 800);
        assert_eq!(snapshot.avg_latency_ms, 50);
    }
}
