use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rapidtap_core_types::{CycleId, UiEvent};
use rapidtap_policy_center::HostPolicy;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::SchedulerError;
use crate::metrics::{OrchestratorMetrics, OrchestratorStats};
use crate::model::{CycleReport, CycleResult, DispatchPath, EventOutcome, SkipReason};
use crate::monitor::{PerformanceMonitor, OP_CACHE_HIT, OP_CYCLE, OP_SEARCH};
use crate::ports::HostPort;
use crate::runtime::CycleRuntime;
use crate::strategy::StrategyController;

const NEVER: u64 = u64::MAX;
const REPORT_BACKLOG: usize = 16;

/// Collaborators the orchestrator drives.
pub struct OrchestratorDeps {
    pub host: Arc<dyn HostPort>,
    pub runtime: Arc<CycleRuntime>,
    pub controller: Arc<StrategyController>,
    pub monitor: Arc<PerformanceMonitor>,
}

/// Turns UI-change signals into single-flight locate-and-act cycles.
pub struct Orchestrator {
    inner: Arc<Inner>,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    intake: mpsc::Sender<Admitted>,
    handle: JoinHandle<()>,
}

struct Inner {
    policy: HostPolicy,
    deps: OrchestratorDeps,
    metrics: OrchestratorMetrics,
    in_flight: Arc<AtomicBool>,
    epoch: Instant,
    last_admitted_ms: AtomicU64,
    reports: broadcast::Sender<Arc<CycleReport>>,
    shutdown: CancellationToken,
}

/// An admitted signal. Dropping it releases the single-flight flag.
struct Admitted {
    cycle_id: CycleId,
    _flight: FlightGuard,
}

struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Orchestrator {
    pub fn new(policy: HostPolicy, deps: OrchestratorDeps) -> Self {
        let (reports, _) = broadcast::channel(REPORT_BACKLOG);
        Self {
            inner: Arc::new(Inner {
                policy,
                deps,
                metrics: OrchestratorMetrics::default(),
                in_flight: Arc::new(AtomicBool::new(false)),
                epoch: Instant::now(),
                last_admitted_ms: AtomicU64::new(NEVER),
                reports,
                shutdown: CancellationToken::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Starts the intake worker. Must be called from within a runtime;
    /// further calls and calls after `shutdown` are no-ops.
    pub fn spawn(&self) {
        let mut guard = self.worker.lock();
        if guard.is_some() || self.inner.shutdown.is_cancelled() {
            return;
        }
        let (intake, mut rx) = mpsc::channel::<Admitted>(self.inner.policy.intake_capacity.max(1));
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = inner.shutdown.cancelled() => break,
                    next = rx.recv() => match next {
                        Some(admitted) => {
                            inner.run_cycle(admitted).await;
                        }
                        None => break,
                    },
                }
            }
            debug!("intake worker stopped");
        });
        *guard = Some(Worker { intake, handle });
    }

    /// Admits `event` and hands it to the intake worker without waiting.
    pub fn on_event(&self, event: UiEvent) -> Result<CycleId, SkipReason> {
        let intake = match self.worker.lock().as_ref() {
            Some(worker) => worker.intake.clone(),
            None => {
                self.inner.metrics.record_received();
                return Err(self.inner.skip(SkipReason::IntakeClosed));
            }
        };
        let admitted = self.inner.admit(&event)?;
        let cycle_id = admitted.cycle_id.clone();
        match intake.try_send(admitted) {
            Ok(()) => Ok(cycle_id),
            Err(err) => {
                let err = SchedulerError::Internal(err.to_string());
                warn!(error = %err, "intake rejected admitted signal");
                Err(self.inner.skip(SkipReason::IntakeClosed))
            }
        }
    }

    /// Admits `event` and runs its cycle on the calling task.
    pub async fn handle_event(&self, event: UiEvent) -> EventOutcome {
        match self.inner.admit(&event) {
            Ok(admitted) => EventOutcome::Completed(self.inner.run_cycle(admitted).await),
            Err(reason) => EventOutcome::Skipped(reason),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<CycleReport>> {
        self.inner.reports.subscribe()
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.inner.metrics.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn controller(&self) -> &Arc<StrategyController> {
        &self.inner.deps.controller
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.inner.deps.monitor
    }

    /// Cancels running units and stops the intake worker. Later signals are
    /// skipped as `Stopped`.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            drop(worker.intake);
            if let Err(err) = worker.handle.await {
                warn!(error = %err, "intake worker ended abnormally");
            }
        }
    }
}

impl Inner {
    fn admit(&self, event: &UiEvent) -> Result<Admitted, SkipReason> {
        self.metrics.record_received();
        if self.shutdown.is_cancelled() {
            return Err(self.skip(SkipReason::Stopped));
        }
        if event.package != self.policy.package {
            return Err(self.skip(SkipReason::ForeignPackage));
        }
        if !event.kind.is_layout_change() {
            return Err(self.skip(SkipReason::IgnoredKind));
        }
        if self.debounced() {
            return Err(self.skip(SkipReason::Debounced));
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(self.skip(SkipReason::Busy));
        }
        self.last_admitted_ms
            .store(self.elapsed_ms(), Ordering::Release);
        self.metrics.record_admitted();
        Ok(Admitted {
            cycle_id: CycleId::new(),
            _flight: FlightGuard(Arc::clone(&self.in_flight)),
        })
    }

    fn skip(&self, reason: SkipReason) -> SkipReason {
        trace!(reason = %reason, "signal skipped");
        self.metrics.record_skipped(reason);
        reason
    }

    fn debounced(&self) -> bool {
        let last = self.last_admitted_ms.load(Ordering::Acquire);
        last != NEVER
            && self.elapsed_ms().saturating_sub(last) < self.policy.min_event_interval_ms
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(NEVER - 1)
    }

    #[instrument(skip_all, fields(cycle = %admitted.cycle_id.0))]
    async fn run_cycle(&self, admitted: Admitted) -> CycleReport {
        let started = Instant::now();
        let strategy = self.deps.controller.current_strategy();
        debug!(strategy = %strategy, "cycle started");

        let (units, fault, ran) = match self.deps.host.active_root().await {
            Ok(Some(root)) => {
                let units = self
                    .deps
                    .runtime
                    .run(root, strategy.clone(), &self.shutdown)
                    .await;
                (units, None, true)
            }
            Ok(None) => {
                debug!("no active root");
                (Vec::new(), None, false)
            }
            Err(err) => {
                let err = SchedulerError::Host(err.to_string());
                warn!(error = %err, "cycle aborted");
                (Vec::new(), Some(err.to_string()), true)
            }
        };

        let report = CycleReport {
            cycle_id: admitted.cycle_id.clone(),
            strategy: strategy.kind,
            elapsed: started.elapsed(),
            result: CycleResult::from_results(&units),
            units,
            fault,
        };
        if ran {
            self.feed_back(&report);
        }
        self.metrics.record_completed();
        info!(
            strategy = %report.strategy,
            elapsed_ms = report.elapsed.as_millis() as u64,
            succeeded = report.result.success_count,
            attempted = report.result.attempted_count,
            "cycle finished"
        );
        // release the flight before subscribers see the report
        drop(admitted);
        let _ = self.reports.send(Arc::new(report.clone()));
        report
    }

    fn feed_back(&self, report: &CycleReport) {
        let controller = &self.deps.controller;
        let monitor = &self.deps.monitor;
        let latency_ms = i64::try_from(report.elapsed.as_millis()).unwrap_or(i64::MAX);

        if report.fault.is_some() {
            self.metrics.record_cycle_fault();
            controller.record_failure();
            if let Err(err) = monitor.record(OP_CYCLE, latency_ms, false) {
                warn!(error = %err, "cycle sample rejected");
            }
            return;
        }

        if let Err(err) =
            controller.record_outcome(latency_ms, i64::from(report.result.success_count))
        {
            warn!(error = %err, "outcome sample rejected");
        }
        for _ in 0..report.result.failures() {
            controller.record_failure();
        }

        for unit in &report.units {
            let operation = match unit.path {
                DispatchPath::Cache => OP_CACHE_HIT,
                DispatchPath::Search(_) | DispatchPath::Cancelled => OP_SEARCH,
                DispatchPath::NotFound => continue,
            };
            let elapsed = i64::try_from(unit.elapsed.as_millis()).unwrap_or(i64::MAX);
            if let Err(err) = monitor.record(operation, elapsed, unit.success) {
                warn!(error = %err, "unit sample rejected");
            }
        }
        if let Err(err) = monitor.record(OP_CYCLE, latency_ms, report.is_clean()) {
            warn!(error = %err, "cycle sample rejected");
        }

        // units clear on their own success; this covers a cache written after it
        if report.result.success_count > 0 {
            self.deps.runtime.cache().clear();
        }
    }
}
