use std::time::Duration;

use action_locator::{ElementRef, TargetPattern};
use rapidtap_core_types::{Bounds, Strategy};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::errors::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::model::{GestureAck, TapGesture};
use crate::policy::DispatchTimings;
use crate::ports::ActuatorPort;

pub struct RuntimeDeps<'a> {
    pub actuator: &'a dyn ActuatorPort,
    pub metrics: &'a DispatchMetrics,
    pub timings: &'a DispatchTimings,
}

#[instrument(skip_all, fields(pattern = %pattern.id(), strategy = %strategy.kind))]
pub async fn execute(
    deps: RuntimeDeps<'_>,
    element: &ElementRef,
    bounds: Bounds,
    pattern: &TargetPattern,
    strategy: &Strategy,
    cancel: &CancellationToken,
) -> bool {
    let mut success = primary(&deps, element, strategy, cancel).await;
    if !success && strategy.max_retries > 1 && !cancel.is_cancelled() {
        success = fallback(&deps, bounds, strategy, cancel).await;
    }
    if !success {
        debug!(label = pattern.label(), "activation failed");
        return false;
    }

    info!(label = pattern.label(), "activation succeeded");
    if strategy.is_emergency() && pattern.is_critical() {
        confirm(&deps, element, cancel).await;
    }
    true
}

async fn primary(
    deps: &RuntimeDeps<'_>,
    element: &ElementRef,
    strategy: &Strategy,
    cancel: &CancellationToken,
) -> bool {
    let attempts = strategy.max_retries;
    for attempt in 1..=attempts {
        deps.metrics.record_primary_attempt();
        match deps.actuator.activate(element).await {
            Ok(true) => {
                deps.metrics.record_primary_ok();
                debug!(attempt, "primary activation accepted");
                return true;
            }
            Ok(false) => debug!(attempt, "primary activation declined"),
            Err(err) => {
                deps.metrics.record_fault();
                let err = DispatchError::Activation(err.to_string());
                warn!(attempt, error = %err, "primary activation fault");
            }
        }
        if attempt < attempts && !pause(strategy.retry_delay, cancel).await {
            debug!(attempt, error = %DispatchError::Cancelled, "retry abandoned");
            return false;
        }
    }
    false
}

async fn fallback(
    deps: &RuntimeDeps<'_>,
    bounds: Bounds,
    strategy: &Strategy,
    cancel: &CancellationToken,
) -> bool {
    let (x, y) = bounds.center();
    let gesture = TapGesture::new(x, y, strategy.retry_delay);
    let timeout = deps.timings.fallback_timeout();
    let acked = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DispatchError::Cancelled),
        result = tokio::time::timeout(timeout, deps.actuator.dispatch_gesture(gesture)) => {
            match result {
                Ok(Ok(ack)) => Ok(ack),
                Ok(Err(err)) => Err(DispatchError::Gesture(err.to_string())),
                Err(_) => Err(DispatchError::GestureTimeout(timeout.as_millis() as u64)),
            }
        }
    };
    let ok = match acked {
        Ok(GestureAck::Completed) => true,
        Ok(GestureAck::Cancelled) => {
            debug!(x, y, "gesture cancelled by host");
            false
        }
        Err(err) => {
            if matches!(err, DispatchError::Gesture(_)) {
                deps.metrics.record_fault();
            }
            warn!(x, y, error = %err, "gesture fallback failed");
            false
        }
    };
    deps.metrics.record_fallback(ok);
    ok
}

/// One extra primary activation; its outcome is ignored.
async fn confirm(deps: &RuntimeDeps<'_>, element: &ElementRef, cancel: &CancellationToken) {
    if !pause(deps.timings.confirm_delay(), cancel).await {
        return;
    }
    deps.metrics.record_confirmation();
    if let Err(err) = deps.actuator.activate(element).await {
        debug!(error = %err, "confirmation activation fault ignored");
    }
}

/// Sleeps unless cancelled first. Returns false on cancellation.
async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
