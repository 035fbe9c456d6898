use anyhow::Result;

use super::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    println!("RapidTap System Information");
    println!("===========================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!("Git Branch: {}", env!("GIT_BRANCH"));
    println!();

    if ctx.policy_paths().is_empty() {
        println!("Policy Paths: (builtin defaults)");
    } else {
        println!("Policy Paths:");
        for path in ctx.policy_paths() {
            println!("  - {}", path.display());
        }
    }
    match ctx.load_policy() {
        Ok(policy) => {
            println!("Policy Revision: {}", policy.rev);
            println!("Tracked Package: {}", policy.host.package);
            println!("Patterns: {}", policy.patterns.len());
            println!(
                "Stats Window: {:?}, recompute every {}ms",
                policy.strategy.window, policy.strategy.recompute_interval_ms
            );
        }
        Err(err) => println!("Policy: unavailable ({err:#})"),
    }
    Ok(())
}
