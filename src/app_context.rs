//! Application context and shared components
//!
//! Builds one engine instance from a policy snapshot: the pattern registry,
//! the shared result cache, the dispatcher, the strategy controller, the
//! performance monitor and the orchestrator that drives them.

use std::sync::Arc;

use action_locator::{ElementLocator, PatternRegistry, ResultCache};
use rapidtap_policy_center::PolicySnapshot;
use rapidtap_scheduler::{
    CycleRuntime, HostPort, Orchestrator, OrchestratorDeps, PerformanceMonitor,
    StrategyController,
};
use tool_click::{ActuatorPort, DispatchTimings, DispatcherBuilder};
use tracing::info;

use crate::errors::AppError;

pub struct AppContext {
    cache: Arc<ResultCache>,
    controller: Arc<StrategyController>,
    monitor: Arc<PerformanceMonitor>,
    orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    pub fn new(
        policy: PolicySnapshot,
        host: Arc<dyn HostPort>,
        actuator: Arc<dyn ActuatorPort>,
    ) -> Result<Self, AppError> {
        policy.validate()?;
        let registry = Arc::new(PatternRegistry::from_specs(&policy.patterns)?);
        let cache = Arc::new(ResultCache::new(policy.cache.ttl()));
        let locator = Arc::new(ElementLocator::new(cache.clone()));
        let dispatcher = DispatcherBuilder::new(DispatchTimings::from(&policy.dispatch))
            .with_actuator(actuator)
            .build()?;
        let controller = Arc::new(StrategyController::new(policy.strategy.clone()));
        let monitor = Arc::new(PerformanceMonitor::new(policy.monitor.clone()));
        let runtime = Arc::new(CycleRuntime::new(
            registry.clone(),
            locator,
            dispatcher,
            policy.host.max_concurrent_units,
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            policy.host.clone(),
            OrchestratorDeps {
                host,
                runtime,
                controller: controller.clone(),
                monitor: monitor.clone(),
            },
        ));
        info!(
            rev = policy.rev,
            package = %policy.host.package,
            patterns = registry.len(),
            "engine assembled"
        );
        Ok(Self {
            cache,
            controller,
            monitor,
            orchestrator,
        })
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn controller(&self) -> &Arc<StrategyController> {
        &self.controller
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }
}
