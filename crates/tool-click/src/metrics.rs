use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Counters for every activation path the dispatcher takes.
#[derive(Clone, Default)]
pub struct DispatchMetrics {
    inner: Arc<DispatchMetricsInner>,
}

#[derive(Default)]
struct DispatchMetricsInner {
    primary_attempts: AtomicU64,
    primary_ok: AtomicU64,
    fallbacks: AtomicU64,
    fallback_ok: AtomicU64,
    confirmations: AtomicU64,
    faults: AtomicU64,
}

impl DispatchMetrics {
    pub fn record_primary_attempt(&self) {
        self.inner.primary_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_primary_ok(&self) {
        self.inner.primary_ok.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self, ok: bool) {
        self.inner.fallbacks.fetch_add(1, Ordering::Relaxed);
        if ok {
            self.inner.fallback_ok.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_confirmation(&self) {
        self.inner.confirmations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.inner.faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            primary_attempts: self.inner.primary_attempts.load(Ordering::Relaxed),
            primary_ok: self.inner.primary_ok.load(Ordering::Relaxed),
            fallbacks: self.inner.fallbacks.load(Ordering::Relaxed),
            fallback_ok: self.inner.fallback_ok.load(Ordering::Relaxed),
            confirmations: self.inner.confirmations.load(Ordering::Relaxed),
            faults: self.inner.faults.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchMetricsSnapshot {
    pub primary_attempts: u64,
    pub primary_ok: u64,
    pub fallbacks: u64,
    pub fallback_ok: u64,
    pub confirmations: u64,
    pub faults: u64,
}
