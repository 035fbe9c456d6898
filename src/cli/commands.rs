use clap::Subcommand;

use super::config::ConfigArgs;
use super::simulate::SimulateArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List the target patterns in scheduling order
    Patterns,

    /// Print the effective policy snapshot
    Config(ConfigArgs),

    /// Drive the engine against a scripted host
    Simulate(SimulateArgs),

    /// Show build information
    Info,
}
