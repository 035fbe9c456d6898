pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;
pub mod overlay;

pub use defaults::{default_patterns, default_snapshot};
pub use errors::PolicyError;
pub use loader::{load_snapshot, load_snapshot_with_options, LoadOptions};
pub use model::{
    CachePolicy, ClassifierThresholds, DispatchPolicy, HostPolicy, MonitorPolicy, PatternSpec,
    PolicySnapshot, PolicySource, StatsWindow, StrategyParams, StrategyPolicy,
};

#[cfg(test)]
mod tests;
