//! Concurrent fan-out of pattern units within one cycle

use std::collections::HashMap;
use std::sync::Arc;

use action_locator::{CacheKey, ElementLocator, PatternRegistry, ResultCache, TargetPattern, UiTree};
use rapidtap_core_types::{PatternId, Strategy};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tool_click::ActionDispatcher;
use tracing::{debug, instrument, warn};

use crate::model::{DispatchPath, DispatchResult};

/// Runs one unit per registered pattern, bounded by a semaphore and by the
/// strategy's time budget.
pub struct CycleRuntime {
    registry: Arc<PatternRegistry>,
    locator: Arc<ElementLocator>,
    dispatcher: Arc<dyn ActionDispatcher>,
    slots: Arc<Semaphore>,
}

impl CycleRuntime {
    pub fn new(
        registry: Arc<PatternRegistry>,
        locator: Arc<ElementLocator>,
        dispatcher: Arc<dyn ActionDispatcher>,
        max_concurrent_units: usize,
    ) -> Self {
        Self {
            registry,
            locator,
            dispatcher,
            slots: Arc::new(Semaphore::new(max_concurrent_units.max(1))),
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        self.locator.cache()
    }

    /// Returns one result per pattern, in registry order. Units still
    /// running when the budget expires are cancelled, detached and reported
    /// as `Cancelled`. A detached unit whose tap still lands clears the cache
    /// itself.
    #[instrument(skip_all, fields(strategy = %strategy.kind, patterns = self.registry.len()))]
    pub async fn run(
        &self,
        root: Arc<dyn UiTree>,
        strategy: Arc<Strategy>,
        parent: &CancellationToken,
    ) -> Vec<DispatchResult> {
        let cancel = parent.child_token();
        let deadline = Instant::now() + strategy.time_budget;
        let mut units = JoinSet::new();
        for pattern in self.registry.iter() {
            let unit = Unit {
                pattern: pattern.clone(),
                strategy: strategy.clone(),
                root: root.clone(),
                locator: self.locator.clone(),
                dispatcher: self.dispatcher.clone(),
                slots: self.slots.clone(),
                cancel: cancel.clone(),
            };
            units.spawn(unit.run());
        }

        let mut finished: HashMap<PatternId, DispatchResult> = HashMap::new();
        loop {
            match tokio::time::timeout_at(deadline, units.join_next()).await {
                Ok(Some(Ok(result))) => {
                    finished.insert(result.pattern.clone(), result);
                }
                Ok(Some(Err(err))) => warn!(error = %err, "pattern unit aborted"),
                Ok(None) => break,
                Err(_) => {
                    debug!(remaining = units.len(), "cycle budget expired");
                    cancel.cancel();
                    units.detach_all();
                    break;
                }
            }
        }

        self.registry
            .iter()
            .map(|pattern| {
                finished.remove(pattern.id()).unwrap_or_else(|| {
                    DispatchResult::new(
                        pattern.id().clone(),
                        pattern.label(),
                        DispatchPath::Cancelled,
                        false,
                        strategy.time_budget,
                    )
                })
            })
            .collect()
    }
}

struct Unit {
    pattern: Arc<TargetPattern>,
    strategy: Arc<Strategy>,
    root: Arc<dyn UiTree>,
    locator: Arc<ElementLocator>,
    dispatcher: Arc<dyn ActionDispatcher>,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Unit {
    async fn run(self) -> DispatchResult {
        let started = Instant::now();
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return self.finish(DispatchPath::Cancelled, false, started),
            permit = self.slots.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return self.finish(DispatchPath::Cancelled, false, started),
            },
        };

        let key = CacheKey::new(self.pattern.id().clone(), self.strategy.kind);
        let mut cached_miss = false;
        if let Some(entry) = self.locator.cache().get(&key) {
            let ok = self
                .dispatcher
                .dispatch(
                    &entry.element,
                    entry.bounds,
                    &self.pattern,
                    &self.strategy,
                    &self.cancel,
                )
                .await;
            if ok {
                debug!(pattern = %self.pattern.id(), "cache hit");
                self.tapped();
                return self.finish(DispatchPath::Cache, true, started);
            }
            debug!(pattern = %self.pattern.id(), "cached element did not respond");
            cached_miss = true;
        }

        let located = self
            .locator
            .locate(
                self.root.as_ref(),
                &self.pattern,
                self.strategy.kind,
                self.strategy.search_timeout,
                &self.cancel,
            )
            .await;
        match located {
            Some(located) => {
                let ok = self
                    .dispatcher
                    .dispatch(
                        &located.element,
                        located.bounds,
                        &self.pattern,
                        &self.strategy,
                        &self.cancel,
                    )
                    .await;
                if ok {
                    self.tapped();
                }
                self.finish(DispatchPath::Search(located.method), ok, started)
                    .with_action_fault(!ok)
            }
            None if self.cancel.is_cancelled() => {
                self.finish(DispatchPath::Cancelled, false, started)
            }
            None => self
                .finish(DispatchPath::NotFound, false, started)
                .with_action_fault(cached_miss),
        }
    }

    /// Cached handles are stale once a tap lands, reported or not.
    fn tapped(&self) {
        if self.cancel.is_cancelled() {
            debug!(pattern = %self.pattern.id(), "late tap landed after budget");
        }
        self.locator.cache().clear();
    }

    fn finish(&self, path: DispatchPath, success: bool, started: Instant) -> DispatchResult {
        DispatchResult::new(
            self.pattern.id().clone(),
            self.pattern.label(),
            path,
            success,
            started.elapsed(),
        )
    }
}
