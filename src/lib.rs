// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod globs;
pub mod graph;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod transform;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::{Runtime, RuntimeEvent, RuntimeOptions};
use crate::graph::{FlatStep, TaskGraph};
use crate::paths::PathConfig;
use crate::pipeline::PipelineRunner;
use crate::transform::TransformRegistry;
use crate::watch::build_watch_rules;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - path roots / task graph / transform registry / runner
/// - one run of the requested task
/// - (optional) file watcher + runtime loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let project_root = config_root_dir(&config_path);
    let paths = PathConfig::new(&project_root, &cfg.paths);
    let graph = TaskGraph::from_config(&cfg);
    let registry = TransformRegistry::builtin();

    let runner = Arc::new(PipelineRunner::new(
        paths.clone(),
        cfg.project.clone(),
        graph,
        registry,
    )?);

    if args.dry_run {
        print_dry_run(&runner, &args.task)?;
        return Ok(());
    }

    // Run the requested task once, up front. In watch mode this is the
    // initial full build before the loop takes over; failures abort
    // before any watching starts.
    let report = {
        let runner = Arc::clone(&runner);
        let task = args.task.clone();
        tokio::task::spawn_blocking(move || runner.run(&task)).await??
    };
    info!(task = %report.task, steps = report.steps, "task finished");

    if !args.watch {
        return Ok(());
    }

    // Watch mode: compile rules, start the watcher and the runtime loop.
    let rules = build_watch_rules(&cfg)?;
    if rules.is_empty() {
        info!("--watch requested but config declares no [[watch]] rules; exiting");
        return Ok(());
    }

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher_handle = watch::spawn_watcher(&paths, rules, rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let options = RuntimeOptions {
        debounce: std::time::Duration::from_millis(cfg.config.debounce_ms),
    };
    let runtime = Runtime::new(runner, options, rt_rx, rt_tx);
    runtime.run().await
}

/// Figure out the project root for resolving relative logical paths.
/// Currently: directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Print the resolved plan for a task without executing anything.
fn print_dry_run(runner: &PipelineRunner, task: &str) -> Result<()> {
    let plan = runner.resolve(task)?;

    println!("assetpipe dry-run: task '{}'", plan.task);
    for requirement in plan.requires.iter() {
        println!(
            "  requires manifest '{}' (for '{}')",
            requirement.manifest, requirement.task
        );
    }

    for (index, resolved) in plan.steps.iter().enumerate() {
        match &resolved.step {
            FlatStep::Clean { root, dir } => match dir {
                Some(dir) => println!("  {index}: clean {root}/{dir}  (from '{}')", resolved.origin),
                None => println!("  {index}: clean {root}  (from '{}')", resolved.origin),
            },
            FlatStep::Transform(t) => {
                println!(
                    "  {index}: {} {}:{:?} -> {}/{}  (from '{}')",
                    t.transform,
                    t.input.root,
                    t.input.globs,
                    t.output.root,
                    t.output.dir,
                    resolved.origin
                );
            }
        }
    }

    Ok(())
}
