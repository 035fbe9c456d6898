use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use rapidtap_core_types::{StrategyKind, UiEvent};
use rapidtap_scheduler::{CycleReport, EventOutcome, Orchestrator, OrchestratorStats, StatsSnapshot};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;

use super::context::CliContext;
use super::output::{print_structured, OutputFormat};
use crate::app_context::AppContext;
use crate::sim::{Scene, SimulatedHost};

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Scene file describing the simulated screens
    #[arg(long, value_name = "FILE")]
    pub scene: PathBuf,

    /// Number of content-change signals to send
    #[arg(long, default_value_t = 10)]
    pub cycles: u32,

    /// Pause between signals in milliseconds
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,

    /// Hand signals to the background intake worker instead of running
    /// each cycle inline
    #[arg(long)]
    pub background: bool,
}

#[derive(Serialize)]
struct CycleLine {
    screen: String,
    outcome: String,
    strategy: Option<StrategyKind>,
    elapsed_ms: Option<u64>,
    succeeded: u32,
    attempted: u32,
}

#[derive(Serialize)]
struct SimulationSummary {
    cycles: Vec<CycleLine>,
    stats: OrchestratorStats,
    strategy: StatsSnapshot,
    health: String,
    accepted_taps: Vec<String>,
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext) -> Result<()> {
    let policy = ctx.load_policy()?;
    let scene = Scene::load(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;
    let host = Arc::new(SimulatedHost::new(scene, &policy.host.package));
    let context = AppContext::new(policy, host.clone(), host.actuator().clone())
        .context("Failed to assemble engine")?;
    let orchestrator = context.orchestrator();
    let human = ctx.output() == OutputFormat::Human;

    info!(
        cycles = args.cycles,
        screens = host.screen_count(),
        background = args.background,
        "simulation started"
    );
    let mut reports = orchestrator.subscribe();
    if args.background {
        orchestrator.spawn();
    }
    let mut lines = Vec::with_capacity(args.cycles as usize);
    for index in 0..args.cycles as usize {
        if index > 0 && args.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
        let screen = host.show(index).to_string();
        let outcome = if args.background {
            submit(orchestrator, &mut reports, host.event()).await?
        } else {
            orchestrator.handle_event(host.event()).await
        };
        if human {
            match &outcome {
                EventOutcome::Completed(report) => println!("[{screen}] {report}"),
                EventOutcome::Skipped(reason) => println!("[{screen}] skipped: {reason}"),
            }
        }
        lines.push(cycle_line(screen, &outcome));
    }
    if args.background {
        orchestrator.shutdown().await;
    }

    let summary = SimulationSummary {
        cycles: lines,
        stats: orchestrator.stats(),
        strategy: context.controller().snapshot(),
        health: context.monitor().health_status().to_string(),
        accepted_taps: host.actuator().accepted(),
    };
    if print_structured(ctx.output(), &summary)? {
        return Ok(());
    }

    println!();
    println!(
        "Signals: {} received, {} admitted, {} skipped",
        summary.stats.received,
        summary.stats.admitted,
        summary.stats.skipped.total()
    );
    println!(
        "Strategy: {} (failure rate {:.2}, avg latency {}ms)",
        summary.strategy.strategy, summary.strategy.failure_rate, summary.strategy.avg_latency_ms
    );
    println!("Accepted taps: {}", summary.accepted_taps.join(", "));
    println!();
    print!("{}", context.monitor().export_metrics());
    Ok(())
}

/// Queues `event` on the intake worker and waits for its report.
async fn submit(
    orchestrator: &Orchestrator,
    reports: &mut broadcast::Receiver<Arc<CycleReport>>,
    event: UiEvent,
) -> Result<EventOutcome> {
    let cycle_id = match orchestrator.on_event(event) {
        Ok(cycle_id) => cycle_id,
        Err(reason) => return Ok(EventOutcome::Skipped(reason)),
    };
    loop {
        match reports.recv().await {
            Ok(report) if report.cycle_id == cycle_id => {
                return Ok(EventOutcome::Completed(report.as_ref().clone()))
            }
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => bail!("report stream closed before the cycle finished"),
        }
    }
}

fn cycle_line(screen: String, outcome: &EventOutcome) -> CycleLine {
    match outcome {
        EventOutcome::Completed(report) => CycleLine {
            screen,
            outcome: if report.fault.is_some() {
                "fault".into()
            } else {
                "completed".into()
            },
            strategy: Some(report.strategy),
            elapsed_ms: Some(report.elapsed.as_millis() as u64),
            succeeded: report.result.success_count,
            attempted: report.result.attempted_count,
        },
        EventOutcome::Skipped(reason) => CycleLine {
            screen,
            outcome: format!("skipped: {reason}"),
            strategy: None,
            elapsed_ms: None,
            succeeded: 0,
            attempted: 0,
        },
    }
}
