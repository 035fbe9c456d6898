use super::config::cmd_config;
use super::env::CliArgs;
use super::info::cmd_info;
use super::patterns::cmd_patterns;
use super::simulate::cmd_simulate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Patterns => cmd_patterns(ctx),
        Commands::Config(args) => cmd_config(args, ctx),
        Commands::Simulate(args) => cmd_simulate(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
