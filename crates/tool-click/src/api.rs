use std::sync::Arc;

use action_locator::{ElementRef, TargetPattern};
use async_trait::async_trait;
use rapidtap_core_types::{Bounds, Strategy};
use tokio_util::sync::CancellationToken;

use crate::errors::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::policy::DispatchTimings;
use crate::ports::ActuatorPort;
use crate::runner::{execute, RuntimeDeps};

#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Activates `element`, retrying and falling back per `strategy`.
    /// Faults never escape: every failure path yields `false`.
    async fn dispatch(
        &self,
        element: &ElementRef,
        bounds: Bounds,
        pattern: &TargetPattern,
        strategy: &Strategy,
        cancel: &CancellationToken,
    ) -> bool;

    fn metrics(&self) -> &DispatchMetrics;
}

pub struct DispatcherBuilder {
    timings: DispatchTimings,
    actuator: Option<Arc<dyn ActuatorPort>>,
    metrics: Option<DispatchMetrics>,
}

impl DispatcherBuilder {
    pub fn new(timings: DispatchTimings) -> Self {
        Self {
            timings,
            actuator: None,
            metrics: None,
        }
    }

    pub fn with_actuator(mut self, port: Arc<dyn ActuatorPort>) -> Self {
        self.actuator = Some(port);
        self
    }

    pub fn with_metrics(mut self, metrics: DispatchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Arc<dyn ActionDispatcher>, DispatchError> {
        Ok(Arc::new(TapDispatcher {
            timings: self.timings,
            actuator: self.actuator.ok_or(DispatchError::MissingActuator)?,
            metrics: self.metrics.unwrap_or_default(),
        }))
    }
}

pub struct TapDispatcher {
    timings: DispatchTimings,
    actuator: Arc<dyn ActuatorPort>,
    metrics: DispatchMetrics,
}

#[async_trait]
impl ActionDispatcher for TapDispatcher {
    async fn dispatch(
        &self,
        element: &ElementRef,
        bounds: Bounds,
        pattern: &TargetPattern,
        strategy: &Strategy,
        cancel: &CancellationToken,
    ) -> bool {
        let deps = RuntimeDeps {
            actuator: self.actuator.as_ref(),
            metrics: &self.metrics,
            timings: &self.timings,
        };
        execute(deps, element, bounds, pattern, strategy, cancel).await
    }

    fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GestureAck, TapGesture};
    use action_locator::StaticElement;
    use parking_lot::Mutex;
    use rapidtap_core_types::{StrategyKind, TapError};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct ScriptedActuator {
        activations: Mutex<VecDeque<Result<bool, TapError>>>,
        activation_times: Mutex<Vec<Instant>>,
        gestures: Mutex<Vec<TapGesture>>,
        gesture_ack: Option<GestureAck>,
    }

    impl ScriptedActuator {
        fn with_activations(results: Vec<Result<bool, TapError>>) -> Self {
            Self {
                activations: Mutex::new(results.into()),
                gesture_ack: Some(GestureAck::Completed),
                ..Default::default()
            }
        }

        fn activation_count(&self) -> usize {
            self.activation_times.lock().len()
        }
    }

    #[async_trait]
    impl ActuatorPort for ScriptedActuator {
        async fn activate(&self, _element: &ElementRef) -> Result<bool, TapError> {
            self.activation_times.lock().push(Instant::now());
            self.activations.lock().pop_front().unwrap_or(Ok(false))
        }

        async fn dispatch_gesture(&self, gesture: TapGesture) -> Result<GestureAck, TapError> {
            self.gestures.lock().push(gesture);
            match self.gesture_ack {
                Some(ack) => Ok(ack),
                None => std::future::pending().await,
            }
        }
    }

    fn element() -> ElementRef {
        Arc::new(StaticElement::new("btn"))
    }

    fn pattern(critical: bool) -> TargetPattern {
        TargetPattern::new("buy_now", ["Buy Now"])
            .unwrap()
            .with_critical(critical)
    }

    fn dispatcher(actuator: Arc<ScriptedActuator>) -> Arc<dyn ActionDispatcher> {
        DispatcherBuilder::new(DispatchTimings::default())
            .with_actuator(actuator)
            .build()
            .unwrap()
    }

    fn strategy_with_retries(max_retries: u32) -> Strategy {
        Strategy::new(
            StrategyKind::Aggressive,
            Duration::from_millis(500),
            Duration::from_millis(100),
            max_retries,
            Duration::from_millis(50),
        )
    }

    #[test]
    fn builder_requires_actuator() {
        let err = DispatcherBuilder::new(DispatchTimings::default())
            .build()
            .err()
            .expect("missing actuator");
        assert!(matches!(err, DispatchError::MissingActuator));
    }

    #[tokio::test(start_paused = true)]
    async fn first_accepted_activation_wins() {
        let actuator = Arc::new(ScriptedActuator::with_activations(vec![Ok(false), Ok(true)]));
        let ok = dispatcher(actuator.clone())
            .dispatch(
                &element(),
                Bounds::new(0, 0, 100, 40),
                &pattern(false),
                &strategy_with_retries(3),
                &CancellationToken::new(),
            )
            .await;
        assert!(ok);
        assert_eq!(actuator.activation_count(), 2);
        assert!(actuator.gestures.lock().is_empty());
        let times = actuator.activation_times.lock().clone();
        assert_eq!(times[1] - times[0], Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_primary_retries_then_single_gesture() {
        let actuator = Arc::new(ScriptedActuator::with_activations(vec![
            Ok(false),
            Err(TapError::new("node recycled")),
            Ok(false),
        ]));
        let dispatcher = dispatcher(actuator.clone());
        let ok = dispatcher
            .dispatch(
                &element(),
                Bounds::new(100, 200, 300, 260),
                &pattern(false),
                &strategy_with_retries(3),
                &CancellationToken::new(),
            )
            .await;
        assert!(ok);
        assert_eq!(actuator.activation_count(), 3);
        let gestures = actuator.gestures.lock().clone();
        assert_eq!(
            gestures,
            vec![TapGesture::new(200, 230, Duration::from_millis(50))]
        );
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.primary_attempts, 3);
        assert_eq!(snapshot.fallbacks, 1);
        assert_eq!(snapshot.fallback_ok, 1);
        assert_eq!(snapshot.faults, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_retry_strategy_skips_gesture() {
        let actuator = Arc::new(ScriptedActuator::with_activations(vec![Ok(false)]));
        let ok = dispatcher(actuator.clone())
            .dispatch(
                &element(),
                Bounds::new(0, 0, 100, 40),
                &pattern(false),
                &Strategy::builtin(StrategyKind::Turbo),
                &CancellationToken::new(),
            )
            .await;
        assert!(!ok);
        assert_eq!(actuator.activation_count(), 1);
        assert!(actuator.gestures.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unacknowledged_gesture_times_out() {
        let actuator = Arc::new(ScriptedActuator {
            gesture_ack: None,
            ..Default::default()
        });
        let started = Instant::now();
        let ok = dispatcher(actuator.clone())
            .dispatch(
                &element(),
                Bounds::new(0, 0, 100, 40),
                &pattern(false),
                &strategy_with_retries(2),
                &CancellationToken::new(),
            )
            .await;
        assert!(!ok);
        assert_eq!(actuator.gestures.lock().len(), 1);
        assert_eq!(started.elapsed(), Duration::from_millis(550));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_gesture_reports_failure() {
        let actuator = Arc::new(ScriptedActuator {
            gesture_ack: Some(GestureAck::Cancelled),
            ..Default::default()
        });
        let ok = dispatcher(actuator)
            .dispatch(
                &element(),
                Bounds::new(0, 0, 100, 40),
                &pattern(false),
                &strategy_with_retries(2),
                &CancellationToken::new(),
            )
            .await;
        assert!(!ok);
    }

    #[tokio::test(start_paused = true)]
    async fn emergency_critical_success_confirms_once() {
        let actuator = Arc::new(ScriptedActuator::with_activations(vec![
            Ok(true),
            Ok(false),
        ]));
        let dispatcher = dispatcher(actuator.clone());
        let ok = dispatcher
            .dispatch(
                &element(),
                Bounds::new(0, 0, 100, 40),
                &pattern(true),
                &Strategy::builtin(StrategyKind::Emergency),
                &CancellationToken::new(),
            )
            .await;
        assert!(ok, "confirmation result must not affect the outcome");
        let times = actuator.activation_times.lock().clone();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1] - times[0], Duration::from_millis(10));
        assert_eq!(dispatcher.metrics().snapshot().confirmations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_critical_pattern_is_not_confirmed() {
        let actuator = Arc::new(ScriptedActuator::with_activations(vec![Ok(true)]));
        let ok = dispatcher(actuator.clone())
            .dispatch(
                &element(),
                Bounds::new(0, 0, 100, 40),
                &pattern(false),
                &Strategy::builtin(StrategyKind::Emergency),
                &CancellationToken::new(),
            )
            .await;
        assert!(ok);
        assert_eq!(actuator.activation_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_retry_delay() {
        let actuator = Arc::new(ScriptedActuator::with_activations(vec![]));
        let cancel = CancellationToken::new();
        let dispatcher = dispatcher(actuator.clone());
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(75)).await;
            trigger.cancel();
        });
        let ok = dispatcher
            .dispatch(
                &element(),
                Bounds::new(0, 0, 100, 40),
                &pattern(false),
                &strategy_with_retries(5),
                &cancel,
            )
            .await;
        assert!(!ok);
        assert_eq!(actuator.activation_count(), 2);
        assert!(actuator.gestures.lock().is_empty());
    }
}
