pub mod error;
pub mod metrics;
pub mod model;
pub mod monitor;
pub mod orchestrator;
pub mod ports;
pub mod runtime;
pub mod strategy;

pub use error::{SchedulerError, StatsError};
pub use metrics::{OrchestratorStats, SkipCounts};
pub use model::{CycleReport, CycleResult, DispatchPath, DispatchResult, EventOutcome, SkipReason};
pub use monitor::{HealthStatus, OperationStats, PerformanceMonitor};
pub use orchestrator::{Orchestrator, OrchestratorDeps};
pub use ports::HostPort;
pub use runtime::CycleRuntime;
pub use strategy::{classify, StatsSnapshot, StrategyController};
