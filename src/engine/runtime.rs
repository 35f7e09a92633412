// src/engine/runtime.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::engine::queue::CoalescingQueue;
use crate::pipeline::{PipelineRunner, RunReport};

/// Public type alias for task names throughout the engine.
pub type TaskName = String;

/// Reason why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    FileWatch,
    Startup,
}

/// Result of one task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed,
}

/// Events sent into the runtime from the watcher, finished runs, or
/// external signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: RunOutcome,
    },
    ShutdownRequested,
}

/// How runs are executed. Production uses [`PipelineRunner`]; tests can
/// substitute an implementation that records invocations instead of
/// touching the filesystem.
pub trait RunExecutor: Send + Sync + 'static {
    fn execute(&self, task: &str) -> crate::errors::Result<RunReport>;
}

impl RunExecutor for PipelineRunner {
    fn execute(&self, task: &str) -> crate::errors::Result<RunReport> {
        self.run(task)
    }
}

/// Options that influence how the runtime behaves.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Quiet period after the last trigger before pending tasks start.
    pub debounce: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
        }
    }
}

/// The watch-mode event loop.
///
/// State machine: watching (idle) → running(task) → watching, with a
/// coalescing pending queue in between. Triggers within one debounce
/// window collapse into a single run; triggers during a run wait for it
/// to complete. Shutdown lets an in-flight run finish — a step is the
/// atomic unit of work and is never interrupted.
pub struct Runtime {
    executor: Arc<dyn RunExecutor>,
    queue: CoalescingQueue,
    options: RuntimeOptions,

    /// Unified event stream from the watcher, finished runs, and the
    /// signal handler.
    events_rx: mpsc::Receiver<RuntimeEvent>,
    /// Sender handed to spawned runs so they can report completion.
    events_tx: mpsc::Sender<RuntimeEvent>,

    /// Task currently being run, if any.
    running: Option<TaskName>,
    /// End of the current debounce window, if one is open.
    deadline: Option<Instant>,
    shutting_down: bool,
}

impl Runtime {
    pub fn new(
        executor: Arc<dyn RunExecutor>,
        options: RuntimeOptions,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        events_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            executor,
            queue: CoalescingQueue::new(),
            options,
            events_rx,
            events_tx,
            running: None,
            deadline: None,
            shutting_down: false,
        }
    }

    /// Main event loop. Returns once shutdown completes.
    pub async fn run(mut self) -> Result<()> {
        info!("watch runtime started");

        loop {
            let event = match self.deadline {
                Some(deadline) => {
                    tokio::select! {
                        ev = self.events_rx.recv() => match ev {
                            Some(ev) => Some(ev),
                            None => break,
                        },
                        _ = tokio::time::sleep_until(deadline) => None,
                    }
                }
                None => match self.events_rx.recv().await {
                    Some(ev) => Some(ev),
                    None => break,
                },
            };

            match event {
                Some(RuntimeEvent::TaskTriggered { task, reason }) => {
                    self.handle_trigger(task, reason);
                }
                Some(RuntimeEvent::TaskCompleted { task, outcome }) => {
                    self.handle_completion(task, outcome);
                    if self.shutting_down && self.running.is_none() {
                        break;
                    }
                }
                Some(RuntimeEvent::ShutdownRequested) => {
                    if self.running.is_none() {
                        break;
                    }
                    info!("shutdown requested, waiting for in-flight run to finish");
                    self.shutting_down = true;
                }
                // Debounce window elapsed.
                None => {
                    self.deadline = None;
                    self.maybe_start_next();
                }
            }
        }

        info!("watch runtime exiting");
        Ok(())
    }

    fn handle_trigger(&mut self, task: TaskName, reason: TriggerReason) {
        if self.shutting_down {
            debug!(task = %task, "ignoring trigger during shutdown");
            return;
        }

        info!(task = %task, ?reason, "task triggered");
        self.queue.record(&task);

        // Each trigger re-opens the debounce window, so a burst of edits
        // settles before anything runs.
        self.deadline = Some(Instant::now() + self.options.debounce);
    }

    fn handle_completion(&mut self, task: TaskName, outcome: RunOutcome) {
        match outcome {
            RunOutcome::Success => info!(task = %task, "task run completed"),
            // Development mode tolerates failures: log and keep watching so
            // the next edit gets another chance.
            RunOutcome::Failed => warn!(task = %task, "task run failed"),
        }

        self.running = None;

        // If a debounce window is open, its timer will start the next run.
        if self.deadline.is_none() {
            self.maybe_start_next();
        }
    }

    /// Start the next pending run, if idle and one is queued.
    fn maybe_start_next(&mut self) {
        if self.running.is_some() {
            return;
        }
        let Some(task) = self.queue.pop_next() else {
            return;
        };

        self.running = Some(task.clone());

        let executor = Arc::clone(&self.executor);
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            let run_task = task.clone();
            let result =
                tokio::task::spawn_blocking(move || executor.execute(&run_task)).await;

            let outcome = match result {
                Ok(Ok(report)) => {
                    debug!(task = %report.task, steps = report.steps, "run report");
                    RunOutcome::Success
                }
                Ok(Err(err)) => {
                    error!(task = %task, error = %err, "run failed");
                    RunOutcome::Failed
                }
                Err(join_err) => {
                    error!(task = %task, error = %join_err, "run panicked");
                    RunOutcome::Failed
                }
            };

            if let Err(err) = events_tx
                .send(RuntimeEvent::TaskCompleted { task, outcome })
                .await
            {
                // Runtime already gone; nothing left to notify.
                debug!(error = %err, "completion event dropped");
            }
        });
    }
}
