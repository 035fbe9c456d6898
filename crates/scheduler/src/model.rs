use std::fmt;
use std::time::Duration;

use action_locator::LocateMethod;
use rapidtap_core_types::{CycleId, PatternId, StrategyKind};
use serde::Serialize;

/// Why a UI-change signal did not start a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ForeignPackage,
    IgnoredKind,
    Debounced,
    Busy,
    IntakeClosed,
    /// The orchestrator has been shut down.
    Stopped,
}

impl SkipReason {
    pub fn name(&self) -> &'static str {
        match self {
            SkipReason::ForeignPackage => "foreign_package",
            SkipReason::IgnoredKind => "ignored_kind",
            SkipReason::Debounced => "debounced",
            SkipReason::Busy => "busy",
            SkipReason::IntakeClosed => "intake_closed",
            SkipReason::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchPath {
    /// Cached element activated without searching.
    Cache,
    /// Element found by the given method.
    Search(LocateMethod),
    NotFound,
    /// Unit did not finish within the cycle budget.
    Cancelled,
}

impl fmt::Display for DispatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPath::Cache => f.write_str("cache"),
            DispatchPath::Search(method) => write!(f, "search:{method}"),
            DispatchPath::NotFound => f.write_str("not-found"),
            DispatchPath::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of one pattern unit.
#[derive(Clone, Debug)]
pub struct DispatchResult {
    pub pattern: PatternId,
    pub label: String,
    pub success: bool,
    pub elapsed: Duration,
    pub path: DispatchPath,
    /// An element was found but did not respond to activation.
    pub action_fault: bool,
}

impl DispatchResult {
    pub fn new(
        pattern: PatternId,
        label: impl Into<String>,
        path: DispatchPath,
        success: bool,
        elapsed: Duration,
    ) -> Self {
        Self {
            pattern,
            label: label.into(),
            success,
            elapsed,
            path,
            action_fault: false,
        }
    }

    pub fn with_action_fault(mut self, fault: bool) -> Self {
        self.action_fault = fault;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CycleResult {
    pub success_count: u32,
    pub attempted_count: u32,
    pub action_faults: u32,
    pub cancelled_units: u32,
}

impl CycleResult {
    pub fn from_results(results: &[DispatchResult]) -> Self {
        let mut out = CycleResult {
            attempted_count: results.len() as u32,
            ..Default::default()
        };
        for result in results {
            if result.success {
                out.success_count += 1;
            }
            if result.action_fault {
                out.action_faults += 1;
            }
            if result.path == DispatchPath::Cancelled {
                out.cancelled_units += 1;
            }
        }
        out
    }

    /// Failures fed back to the strategy controller. Units cut off by the
    /// budget are a scheduling outcome, not a failure.
    pub fn failures(&self) -> u32 {
        self.action_faults
    }
}

/// Everything known about one finished cycle.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub strategy: StrategyKind,
    pub elapsed: Duration,
    pub result: CycleResult,
    pub units: Vec<DispatchResult>,
    /// Set when the cycle could not run its units.
    pub fault: Option<String>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.fault.is_none() && self.result.failures() == 0 && self.result.cancelled_units == 0
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle {} [{}] {}ms: {}/{} succeeded",
            self.cycle_id.0,
            self.strategy,
            self.elapsed.as_millis(),
            self.result.success_count,
            self.result.attempted_count
        )?;
        if let Some(fault) = &self.fault {
            write!(f, " (fault: {fault})")?;
        }
        for unit in &self.units {
            write!(
                f,
                "\n  {:<14} {:<18} {:>5}ms {}",
                unit.pattern.as_str(),
                unit.path.to_string(),
                unit.elapsed.as_millis(),
                if unit.success { "ok" } else { "-" }
            )?;
        }
        Ok(())
    }
}

/// Result of presenting one event to the orchestrator.
#[derive(Clone, Debug)]
pub enum EventOutcome {
    Completed(CycleReport),
    Skipped(SkipReason),
}

impl EventOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            EventOutcome::Completed(report) => Some(report),
            EventOutcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            EventOutcome::Completed(_) => None,
            EventOutcome::Skipped(reason) => Some(*reason),
        }
    }
}
