//! RapidTap library
//!
//! Assembles the engine crates into a runnable application and exposes the
//! scripted host used by the CLI and integration tests.

pub mod app_context;
pub mod cli;
pub mod errors;
pub mod sim;

pub use app_context::AppContext;
pub use errors::AppError;
pub use sim::{Scene, SimulatedActuator, SimulatedHost, TapRecord};
