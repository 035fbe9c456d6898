use rapidtap_core_types::StrategyKind;
use serde_json::Value;

use crate::errors::PolicyError;
use crate::model::{PatternSpec, PolicySnapshot, PolicySource, StatsWindow};

/// Applies one dotted-path value onto the snapshot and records where it came from.
pub fn apply_override_to_snapshot(
    snapshot: &mut PolicySnapshot,
    path: &str,
    value: &Value,
    source: PolicySource,
) -> Result<(), PolicyError> {
    let segments: Vec<&str> = path.split('.').collect();
    let changed = match segments.as_slice() {
        ["host", "package"] => merge(&mut snapshot.host.package, to_string(value)?),
        ["host", "min_event_interval_ms"] => {
            merge(&mut snapshot.host.min_event_interval_ms, to_u64(value)?)
        }
        ["host", "max_concurrent_units"] => {
            merge(&mut snapshot.host.max_concurrent_units, to_usize(value)?)
        }
        ["host", "intake_capacity"] => merge(&mut snapshot.host.intake_capacity, to_usize(value)?),
        ["strategy", "recompute_interval_ms"] => {
            merge(&mut snapshot.strategy.recompute_interval_ms, to_u64(value)?)
        }
        ["strategy", "window"] => merge(&mut snapshot.strategy.window, to_window(value)?),
        ["strategy", "thresholds", field] => {
            let thresholds = &mut snapshot.strategy.thresholds;
            match *field {
                "emergency_failure_rate" => {
                    merge(&mut thresholds.emergency_failure_rate, to_rate(value)?)
                }
                "emergency_latency_ms" => {
                    merge(&mut thresholds.emergency_latency_ms, to_u64(value)?)
                }
                "aggressive_failure_rate" => {
                    merge(&mut thresholds.aggressive_failure_rate, to_rate(value)?)
                }
                "aggressive_latency_ms" => {
                    merge(&mut thresholds.aggressive_latency_ms, to_u64(value)?)
                }
                "turbo_failure_rate" => merge(&mut thresholds.turbo_failure_rate, to_rate(value)?),
                "turbo_latency_ms" => merge(&mut thresholds.turbo_latency_ms, to_u64(value)?),
                _ => return Err(PolicyError::UnsupportedPath(path.to_string())),
            }
        }
        ["strategy", kind, field] => {
            let kind = strategy_kind(kind)
                .ok_or_else(|| PolicyError::UnsupportedPath(path.to_string()))?;
            let params = snapshot.strategy.params_mut(kind);
            match *field {
                "time_budget_ms" => merge(&mut params.time_budget_ms, to_u64(value)?),
                "search_timeout_ms" => merge(&mut params.search_timeout_ms, to_u64(value)?),
                "max_retries" => merge(&mut params.max_retries, to_u32(value)?),
                "retry_delay_ms" => merge(&mut params.retry_delay_ms, to_u64(value)?),
                _ => return Err(PolicyError::UnsupportedPath(path.to_string())),
            }
        }
        ["cache", "ttl_ms"] => merge(&mut snapshot.cache.ttl_ms, to_u64(value)?),
        ["dispatch", "fallback_timeout_ms"] => {
            merge(&mut snapshot.dispatch.fallback_timeout_ms, to_u64(value)?)
        }
        ["dispatch", "confirm_delay_ms"] => {
            merge(&mut snapshot.dispatch.confirm_delay_ms, to_u64(value)?)
        }
        ["monitor", "slow_operation_ms"] => {
            merge(&mut snapshot.monitor.slow_operation_ms, to_u64(value)?)
        }
        ["monitor", "very_slow_operation_ms"] => {
            merge(&mut snapshot.monitor.very_slow_operation_ms, to_u64(value)?)
        }
        ["monitor", "max_recent_operations"] => {
            merge(&mut snapshot.monitor.max_recent_operations, to_usize(value)?)
        }
        ["monitor", "trend_window"] => merge(&mut snapshot.monitor.trend_window, to_usize(value)?),
        ["monitor", "degradation_factor"] => {
            merge(&mut snapshot.monitor.degradation_factor, to_f64(value)?)
        }
        ["patterns"] => merge(&mut snapshot.patterns, to_patterns(value)?),
        _ => return Err(PolicyError::UnsupportedPath(path.to_string())),
    };
    if changed {
        snapshot.set_provenance(path, source);
    }
    Ok(())
}

fn merge<T: PartialEq>(target: &mut T, candidate: T) -> bool {
    if *target == candidate {
        return false;
    }
    *target = candidate;
    true
}

fn strategy_kind(raw: &str) -> Option<StrategyKind> {
    StrategyKind::all()
        .into_iter()
        .find(|kind| kind.name() == raw)
}

fn to_u64(value: &Value) -> Result<u64, PolicyError> {
    value
        .as_u64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected unsigned integer, got {value}")))
}

fn to_usize(value: &Value) -> Result<usize, PolicyError> {
    to_u64(value).map(|v| v as usize)
}

fn to_u32(value: &Value) -> Result<u32, PolicyError> {
    to_u64(value).and_then(|v| {
        u32::try_from(v).map_err(|_| PolicyError::InvalidValue(format!("value {v} exceeds u32")))
    })
}

fn to_f64(value: &Value) -> Result<f64, PolicyError> {
    value
        .as_f64()
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected number, got {value}")))
}

fn to_rate(value: &Value) -> Result<f64, PolicyError> {
    let rate = to_f64(value)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(PolicyError::InvalidValue(format!(
            "rate must lie in [0, 1], got {rate}"
        )))
    }
}

fn to_string(value: &Value) -> Result<String, PolicyError> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| PolicyError::InvalidValue(format!("expected string, got {value}")))
}

fn to_window(value: &Value) -> Result<StatsWindow, PolicyError> {
    value
        .as_str()
        .and_then(StatsWindow::parse)
        .ok_or_else(|| {
            PolicyError::InvalidValue(format!("expected 'lifetime' or 'windowed', got {value}"))
        })
}

fn to_patterns(value: &Value) -> Result<Vec<PatternSpec>, PolicyError> {
    serde_json::from_value(value.clone())
        .map_err(|err| PolicyError::InvalidValue(format!("patterns: {err}")))
}
