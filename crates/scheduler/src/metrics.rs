use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::model::SkipReason;

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    admitted: AtomicU64,
    foreign_package: AtomicU64,
    ignored_kind: AtomicU64,
    debounced: AtomicU64,
    busy: AtomicU64,
    intake_closed: AtomicU64,
    stopped: AtomicU64,
    cycles_completed: AtomicU64,
    cycle_faults: AtomicU64,
}

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Admission and cycle counters of one orchestrator.
#[derive(Clone, Default)]
pub struct OrchestratorMetrics {
    counters: Arc<Counters>,
}

impl OrchestratorMetrics {
    pub fn record_received(&self) {
        increment(&self.counters.received);
    }

    pub fn record_admitted(&self) {
        increment(&self.counters.admitted);
    }

    pub fn record_skipped(&self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::ForeignPackage => &self.counters.foreign_package,
            SkipReason::IgnoredKind => &self.counters.ignored_kind,
            SkipReason::Debounced => &self.counters.debounced,
            SkipReason::Busy => &self.counters.busy,
            SkipReason::IntakeClosed => &self.counters.intake_closed,
            SkipReason::Stopped => &self.counters.stopped,
        };
        increment(counter);
    }

    pub fn record_completed(&self) {
        increment(&self.counters.cycles_completed);
    }

    pub fn record_cycle_fault(&self) {
        increment(&self.counters.cycle_faults);
    }

    pub fn snapshot(&self) -> OrchestratorStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        OrchestratorStats {
            received: load(&self.counters.received),
            admitted: load(&self.counters.admitted),
            skipped: SkipCounts {
                foreign_package: load(&self.counters.foreign_package),
                ignored_kind: load(&self.counters.ignored_kind),
                debounced: load(&self.counters.debounced),
                busy: load(&self.counters.busy),
                intake_closed: load(&self.counters.intake_closed),
                stopped: load(&self.counters.stopped),
            },
            cycles_completed: load(&self.counters.cycles_completed),
            cycle_faults: load(&self.counters.cycle_faults),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub foreign_package: u64,
    pub ignored_kind: u64,
    pub debounced: u64,
    pub busy: u64,
    pub intake_closed: u64,
    pub stopped: u64,
}

impl SkipCounts {
    pub fn total(&self) -> u64 {
        self.foreign_package
            + self.ignored_kind
            + self.debounced
            + self.busy
            + self.intake_closed
            + self.stopped
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub received: u64,
    pub admitted: u64,
    pub skipped: SkipCounts,
    pub cycles_completed: u64,
    pub cycle_faults: u64,
}
