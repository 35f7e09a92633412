use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::engine::{
    RunExecutor, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason,
};
use assetpipe::pipeline::RunReport;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Records which tasks were run instead of touching the filesystem.
struct RecordingExecutor {
    runs: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl RunExecutor for RecordingExecutor {
    fn execute(&self, task: &str) -> assetpipe::errors::Result<RunReport> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.runs.lock().unwrap().push(task.to_string());
        Ok(RunReport {
            task: task.to_string(),
            steps: 0,
        })
    }
}

struct Harness {
    runs: Arc<Mutex<Vec<String>>>,
    tx: mpsc::Sender<RuntimeEvent>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

fn start_runtime(debounce: Duration, run_delay: Duration) -> Harness {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let executor = Arc::new(RecordingExecutor {
        runs: Arc::clone(&runs),
        delay: run_delay,
    });

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let runtime = Runtime::new(executor, RuntimeOptions { debounce }, rx, tx.clone());
    let handle = tokio::spawn(runtime.run());

    Harness { runs, tx, handle }
}

async fn trigger(harness: &Harness, task: &str) {
    harness
        .tx
        .send(RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        })
        .await
        .unwrap();
}

async fn shutdown(harness: Harness) -> Vec<String> {
    harness
        .tx
        .send(RuntimeEvent::ShutdownRequested)
        .await
        .unwrap();
    timeout(Duration::from_secs(5), harness.handle)
        .await
        .expect("runtime should stop after shutdown")
        .unwrap()
        .unwrap();
    let runs = harness.runs.lock().unwrap().clone();
    runs
}

#[tokio::test]
async fn rapid_triggers_within_one_window_run_once() {
    let harness = start_runtime(Duration::from_millis(100), Duration::ZERO);

    for _ in 0..5 {
        trigger(&harness, "dev-styles").await;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    let runs = shutdown(harness).await;
    assert_eq!(runs, vec!["dev-styles"]);
}

#[tokio::test]
async fn triggers_during_a_run_coalesce_into_one_follow_up() {
    let harness = start_runtime(Duration::from_millis(50), Duration::from_millis(400));

    trigger(&harness, "dev-styles").await;
    // Let the debounce window close and the (slow) run start.
    tokio::time::sleep(Duration::from_millis(200)).await;

    for _ in 0..3 {
        trigger(&harness, "dev-styles").await;
    }
    // First run (~400ms) + follow-up run (~400ms) + margins.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let runs = shutdown(harness).await;
    assert_eq!(runs, vec!["dev-styles", "dev-styles"]);
}

#[tokio::test]
async fn distinct_tasks_run_sequentially_in_trigger_order() {
    let harness = start_runtime(Duration::from_millis(50), Duration::from_millis(100));

    trigger(&harness, "dev-styles").await;
    trigger(&harness, "dev-markup").await;
    tokio::time::sleep(Duration::from_millis(800)).await;

    let runs = shutdown(harness).await;
    assert_eq!(runs, vec!["dev-styles", "dev-markup"]);
}

#[tokio::test]
async fn shutdown_while_idle_stops_immediately() {
    let harness = start_runtime(Duration::from_millis(50), Duration::ZERO);
    let runs = shutdown(harness).await;
    assert!(runs.is_empty());
}
