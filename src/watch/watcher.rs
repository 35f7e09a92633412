// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::globs::relative_str;
use crate::paths::PathConfig;
use crate::watch::patterns::WatchRule;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher over every logical root referenced by a
/// watch rule, sending `RuntimeEvent::TaskTriggered` for tasks whose
/// patterns match a changed path.
pub fn spawn_watcher(
    paths: &PathConfig,
    rules: Vec<WatchRule>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    // Group rules under their resolved root directory so event paths can
    // be relativized against the right base.
    let mut groups: Vec<(PathBuf, Vec<WatchRule>)> = Vec::new();
    for rule in rules {
        let dir = paths.resolve(rule.root())?;
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

        match groups.iter_mut().find(|(root, _)| *root == dir) {
            Some((_, group)) => group.push(rule),
            None => groups.push((dir, vec![rule])),
        }
    }

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // tracing isn't safe from this callback; fall back to stderr.
                    eprintln!("assetpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for (root, _) in groups.iter() {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("watching directory {:?}", root))?;
        info!("file watcher started on {:?}", root);
    }

    // Async task consuming notify events and forwarding task triggers.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!("received notify event: {:?}", event);

            for path in &event.paths {
                for (root, group) in groups.iter() {
                    let Some(rel) = relative_str(root, path) else {
                        continue;
                    };
                    for rule in group.iter() {
                        if rule.matches(&rel) {
                            let task = rule.task().to_string();
                            debug!(task = %task, path = %rel, "watch match -> triggering task");
                            if runtime_tx
                                .send(RuntimeEvent::TaskTriggered {
                                    task,
                                    reason: TriggerReason::FileWatch,
                                })
                                .await
                                .is_err()
                            {
                                warn!("runtime channel closed; stopping watch loop");
                                return;
                            }
                        }
                    }
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}
