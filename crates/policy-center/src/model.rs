use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rapidtap_core_types::{Strategy, StrategyKind};
use serde::{Deserialize, Serialize};

use crate::errors::PolicyError;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PolicySnapshot {
    pub rev: u64,
    pub host: HostPolicy,
    pub strategy: StrategyPolicy,
    pub cache: CachePolicy,
    pub dispatch: DispatchPolicy,
    pub monitor: MonitorPolicy,
    pub patterns: Vec<PatternSpec>,
    #[serde(default)]
    pub provenance: HashMap<String, PolicyProvenance>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct HostPolicy {
    /// Application whose UI-change events are tracked.
    pub package: String,
    pub min_event_interval_ms: u64,
    pub max_concurrent_units: usize,
    pub intake_capacity: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StrategyPolicy {
    pub recompute_interval_ms: u64,
    pub window: StatsWindow,
    pub thresholds: ClassifierThresholds,
    pub turbo: StrategyParams,
    pub normal: StrategyParams,
    pub aggressive: StrategyParams,
    pub emergency: StrategyParams,
}

impl StrategyPolicy {
    pub fn params(&self, kind: StrategyKind) -> &StrategyParams {
        match kind {
            StrategyKind::Turbo => &self.turbo,
            StrategyKind::Normal => &self.normal,
            StrategyKind::Aggressive => &self.aggressive,
            StrategyKind::Emergency => &self.emergency,
        }
    }

    pub(crate) fn params_mut(&mut self, kind: StrategyKind) -> &mut StrategyParams {
        match kind {
            StrategyKind::Turbo => &mut self.turbo,
            StrategyKind::Normal => &mut self.normal,
            StrategyKind::Aggressive => &mut self.aggressive,
            StrategyKind::Emergency => &mut self.emergency,
        }
    }

    pub fn strategy(&self, kind: StrategyKind) -> Strategy {
        self.params(kind).to_strategy(kind)
    }

    pub fn recompute_interval(&self) -> Duration {
        Duration::from_millis(self.recompute_interval_ms)
    }
}

/// Whether outcome counters survive a strategy recomputation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatsWindow {
    #[default]
    Lifetime,
    Windowed,
}

impl StatsWindow {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lifetime" => Some(StatsWindow::Lifetime),
            "windowed" => Some(StatsWindow::Windowed),
            _ => None,
        }
    }
}

/// Cut-offs used by the strategy classifier. All comparisons are strict.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct ClassifierThresholds {
    pub emergency_failure_rate: f64,
    pub emergency_latency_ms: u64,
    pub aggressive_failure_rate: f64,
    pub aggressive_latency_ms: u64,
    pub turbo_failure_rate: f64,
    pub turbo_latency_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StrategyParams {
    pub time_budget_ms: u64,
    pub search_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl StrategyParams {
    pub fn to_strategy(&self, kind: StrategyKind) -> Strategy {
        Strategy::new(
            kind,
            Duration::from_millis(self.time_budget_ms),
            Duration::from_millis(self.search_timeout_ms),
            self.max_retries,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

impl From<&Strategy> for StrategyParams {
    fn from(strategy: &Strategy) -> Self {
        Self {
            time_budget_ms: strategy.time_budget.as_millis() as u64,
            search_timeout_ms: strategy.search_timeout.as_millis() as u64,
            max_retries: strategy.max_retries,
            retry_delay_ms: strategy.retry_delay.as_millis() as u64,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CachePolicy {
    pub ttl_ms: u64,
}

impl CachePolicy {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DispatchPolicy {
    pub fallback_timeout_ms: u64,
    pub confirm_delay_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct MonitorPolicy {
    pub slow_operation_ms: u64,
    pub very_slow_operation_ms: u64,
    pub max_recent_operations: usize,
    pub trend_window: usize,
    pub degradation_factor: f64,
}

/// Declarative form of a target pattern.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternSpec {
    pub id: String,
    pub texts: Vec<String>,
    #[serde(default)]
    pub view_ids: Vec<String>,
    #[serde(default)]
    pub descriptions: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub critical: bool,
}

fn default_priority() -> u8 {
    3
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyProvenance {
    pub path: String,
    pub source: PolicySource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PolicySource {
    Builtin,
    File,
    Env,
    Cli,
}

impl PolicySnapshot {
    pub fn set_provenance(&mut self, path: &str, source: PolicySource) {
        self.provenance.insert(
            path.to_string(),
            PolicyProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.host.package.trim().is_empty() {
            return Err(PolicyError::Invalid("host.package must be set".into()));
        }
        if self.host.max_concurrent_units == 0 {
            return Err(PolicyError::Invalid(
                "host.max_concurrent_units must be > 0".into(),
            ));
        }
        if self.host.intake_capacity == 0 {
            return Err(PolicyError::Invalid("host.intake_capacity must be > 0".into()));
        }
        for kind in StrategyKind::all() {
            let params = self.strategy.params(kind);
            if params.time_budget_ms == 0 || params.search_timeout_ms == 0 {
                return Err(PolicyError::Invalid(format!(
                    "strategy.{} needs non-zero budget and search timeout",
                    kind.name()
                )));
            }
            if params.max_retries == 0 {
                return Err(PolicyError::Invalid(format!(
                    "strategy.{}.max_retries must be > 0",
                    kind.name()
                )));
            }
        }
        let thresholds = &self.strategy.thresholds;
        for (name, rate) in [
            ("emergency_failure_rate", thresholds.emergency_failure_rate),
            ("aggressive_failure_rate", thresholds.aggressive_failure_rate),
            ("turbo_failure_rate", thresholds.turbo_failure_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PolicyError::Invalid(format!(
                    "strategy.thresholds.{name} out of range: {rate}"
                )));
            }
        }
        if self.patterns.is_empty() {
            return Err(PolicyError::Invalid("at least one pattern is required".into()));
        }
        let mut seen = HashSet::new();
        for pattern in &self.patterns {
            if pattern.id.trim().is_empty() {
                return Err(PolicyError::Invalid("pattern id must not be empty".into()));
            }
            if pattern.texts.iter().all(|text| text.trim().is_empty()) {
                return Err(PolicyError::Invalid(format!(
                    "pattern '{}' needs a primary text",
                    pattern.id
                )));
            }
            if !seen.insert(pattern.id.as_str()) {
                return Err(PolicyError::Invalid(format!(
                    "duplicate pattern id '{}'",
                    pattern.id
                )));
            }
        }
        Ok(())
    }
}
