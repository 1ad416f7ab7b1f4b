// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fwi_orchestrator::backends::compute::ProcessComputeService;
use fwi_orchestrator::backends::store::{load_artifact, FilesystemTraceStore};
use fwi_orchestrator::config::load_and_validate_config;
use fwi_orchestrator::iteration::IterationManager;
use fwi_orchestrator::jobs::SimulationType;
use fwi_orchestrator::model::{EventId, WindowSet};
use fwi_orchestrator::traits::{ArtifactKind, TraceStore};

/// Solver used by commands that never submit a job.
const DEFAULT_SOLVER: &str = "solver";

fn usage(program: &str) {
    eprintln!("Usage: {} <command> <project> <config> <iteration> [args...]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  create   <project> <config> <iteration> <event> [event ...]");
    eprintln!("  weights  <project> <config> <iteration>");
    eprintln!("  measure  <project> <config> <iteration>");
    eprintln!("  windows  <project> <config> <iteration>");
    eprintln!("  simulate <project> <config> <iteration> <forward|adjoint> <solver> [solver args ...]");
    eprintln!();
    eprintln!("Example: {} measure ./project configs/inversion.yaml it0000", program);
}

/// Open the project store and build a manager for it.
fn open_manager(project: &str, config: &str, solver: &str, solver_args: Vec<String>) -> Result<IterationManager> {
    let config = load_and_validate_config(config).with_context(|| format!("loading {}", config))?;
    let store = Arc::new(FilesystemTraceStore::open(project)?);
    let compute = Arc::new(ProcessComputeService::new(
        solver,
        solver_args,
        Path::new(project).join("runs"),
    ));
    Ok(IterationManager::new(store, compute, config)?)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        usage(&args[0]);
        std::process::exit(1);
    }

    let start = Instant::now();
    let (command, project, config, iteration) = (&args[1], &args[2], &args[3], &args[4]);
    let rest = &args[5..];

    let outcome = match command.as_str() {
        "create" => run_create(project, config, iteration, rest),
        "weights" => run_weights(project, config, iteration),
        "measure" => run_measure(project, config, iteration).await,
        "windows" => run_windows(project, config, iteration),
        "simulate" => run_simulate(project, config, iteration, rest).await,
        other => {
            eprintln!("❌ Unknown command '{}'", other);
            usage(&args[0]);
            std::process::exit(1);
        }
    };

    match outcome {
        Ok(()) => println!("\n🎉 Done in {:.2?}", start.elapsed()),
        Err(e) => {
            eprintln!("❌ {} failed: {:#}", command, e);
            std::process::exit(1);
        }
    }
}

fn run_create(project: &str, config: &str, iteration: &str, events: &[String]) -> Result<()> {
    if events.is_empty() {
        bail!("create needs at least one event id");
    }
    let manager = open_manager(project, config, DEFAULT_SOLVER, Vec::new())?;
    let events: Vec<EventId> = events.iter().map(|id| EventId::from(id.as_str())).collect();
    let created = manager.create_iteration_for_events(iteration, &events)?;

    println!("🆕 Iteration {}", created.name());
    println!("═══════════════════════════════════");
    for event in created.event_ids() {
        let stations: Vec<&str> = created.stations_for(event).map(|s| s.as_str()).collect();
        println!("  {} → {} station(s): {}", event, stations.len(), stations.join(", "));
    }
    Ok(())
}

fn run_weights(project: &str, config: &str, iteration: &str) -> Result<()> {
    let manager = open_manager(project, config, DEFAULT_SOLVER, Vec::new())?;
    let weights = manager.compute_weights(iteration)?;

    println!("⚖️  Station weights for {}", iteration);
    println!("═══════════════════════════════════");
    for (station, weight) in weights.iter() {
        println!("  {:<12} {:.4}", station.as_str(), weight);
    }
    Ok(())
}

async fn run_measure(project: &str, config: &str, iteration: &str) -> Result<()> {
    let manager = open_manager(project, config, DEFAULT_SOLVER, Vec::new())?;
    let misfit = manager.measure(iteration).await?;
    let summary = &misfit.summary;

    println!("📏 Misfit of {} ({} kernel)", misfit.iteration, misfit.kernel);
    println!("═══════════════════════════════════");
    println!("  Units:            {}", summary.units);
    println!("  Measured:         {}", summary.measured);
    println!("  Windows:          {}", summary.windows);
    println!("  Without windows:  {}", summary.without_windows);
    for (reason, count) in &summary.discarded {
        println!("  Discarded ({}): {}", reason, count);
    }
    for (unit, error) in &summary.failed {
        println!("  ⚠️  {}: {}", unit, error);
    }
    println!("  Total misfit:     {:.6e}", misfit.total_misfit);
    Ok(())
}

fn run_windows(project: &str, config: &str, iteration: &str) -> Result<()> {
    let manager = open_manager(project, config, DEFAULT_SOLVER, Vec::new())?;
    manager.iteration(iteration)?;
    let store: &dyn TraceStore = manager.store().as_ref();
    let windows: WindowSet = load_artifact(store, iteration, ArtifactKind::Windows)
        .with_context(|| format!("no window set for {}; run `measure` first", iteration))?;

    println!("🪟 Windows of {}: {} in {} channel(s)", iteration, windows.window_count(), windows.len());
    println!("═══════════════════════════════════");
    for (key, channel_windows) in windows.iter() {
        let spans: Vec<String> = channel_windows
            .iter()
            .map(|w| format!("[{:.1}, {:.1}]", w.start, w.end))
            .collect();
        println!("  {:<24} {}", key.to_string(), spans.join(" "));
    }
    Ok(())
}

async fn run_simulate(project: &str, config: &str, iteration: &str, rest: &[String]) -> Result<()> {
    let (simulation, solver, solver_args) = match rest {
        [simulation, solver, solver_args @ ..] => (simulation, solver, solver_args.to_vec()),
        _ => bail!("simulate needs <forward|adjoint> <solver>"),
    };
    let Some(simulation) = SimulationType::from_name(simulation) else {
        bail!("unknown simulation type '{}'", simulation);
    };

    let manager = open_manager(project, config, solver, solver_args)?;
    let handles = manager.submit_simulations(iteration, simulation).await?;
    println!("🚀 Submitted {} {} simulation(s) for {}", handles.len(), simulation, iteration);

    let statuses = manager.await_simulations(&handles).await?;
    let outputs = manager.collect_outputs(&handles).await?;

    println!("═══════════════════════════════════");
    for (event, status) in &statuses {
        match outputs.get(event) {
            Some(location) => println!("  ✅ {} {} → {}", event, status, location),
            None => {
                let diagnostic = match handles.get(event) {
                    Some(handle) => manager.tracker().failure_diagnostic(handle).await?,
                    None => None,
                };
                println!("  ❌ {} {} {}", event, status, diagnostic.unwrap_or_default());
            }
        }
    }
    Ok(())
}
