pub mod api;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod ports;

mod runner;

pub use api::{ActionDispatcher, DispatcherBuilder};
pub use errors::DispatchError;
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use model::{GestureAck, TapGesture};
pub use policy::DispatchTimings;
pub use ports::ActuatorPort;
