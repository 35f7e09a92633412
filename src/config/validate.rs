// src/config/validate.rs

use std::collections::BTreeSet;

use anyhow::{Result, anyhow};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, StepConfig};
use crate::paths::REQUIRED_ROOTS;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - all required logical roots are present in `[paths]`
/// - `debounce_ms` is sane
/// - step roots reference configured logical roots
/// - sub-task steps and watch rules reference existing tasks
/// - every `requires_manifest` name is declared by some `hash-rename` step
/// - task composition contains no cycles
///
/// It does **not** check transform names against the registry; that happens
/// when the runner is assembled, since callers may register their own
/// transforms after loading the config.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_roots(cfg)?;
    validate_global_config(cfg)?;
    validate_step_references(cfg)?;
    validate_watch_rules(cfg)?;
    validate_manifest_references(cfg)?;
    validate_composition_acyclic(cfg)?;
    Ok(())
}

fn validate_roots(cfg: &ConfigFile) -> Result<()> {
    for root in REQUIRED_ROOTS {
        if !cfg.paths.contains_key(root) {
            return Err(anyhow!("[paths] must define the '{}' root", root));
        }
    }
    Ok(())
}

fn validate_global_config(cfg: &ConfigFile) -> Result<()> {
    if cfg.config.debounce_ms == 0 {
        return Err(anyhow!("[config].debounce_ms must be >= 1 (got 0)"));
    }
    Ok(())
}

fn validate_step_references(cfg: &ConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for step in task.steps.iter() {
            match step {
                StepConfig::Sub { task: sub } => {
                    if !cfg.task.contains_key(sub) {
                        return Err(anyhow!(
                            "task '{}' references unknown sub-task '{}'",
                            name,
                            sub
                        ));
                    }
                }
                StepConfig::Clean { clean, .. } => {
                    ensure_root(cfg, name, clean)?;
                }
                StepConfig::Transform { input, output, .. } => {
                    ensure_root(cfg, name, &input.root)?;
                    ensure_root(cfg, name, &output.root)?;
                }
            }
        }
    }
    Ok(())
}

fn ensure_root(cfg: &ConfigFile, task: &str, root: &str) -> Result<()> {
    if !cfg.paths.contains_key(root) {
        return Err(anyhow!(
            "task '{}' references unknown logical root '{}'",
            task,
            root
        ));
    }
    Ok(())
}

fn validate_watch_rules(cfg: &ConfigFile) -> Result<()> {
    for rule in cfg.watch.iter() {
        if !cfg.task.contains_key(&rule.task) {
            return Err(anyhow!("watch rule references unknown task '{}'", rule.task));
        }
        if !cfg.paths.contains_key(&rule.root) {
            return Err(anyhow!(
                "watch rule for task '{}' references unknown logical root '{}'",
                rule.task,
                rule.root
            ));
        }
        if rule.glob.is_empty() {
            return Err(anyhow!(
                "watch rule for task '{}' has an empty glob list",
                rule.task
            ));
        }
    }
    Ok(())
}

/// Every `requires_manifest` name must be produced by some `hash-rename`
/// step, otherwise the gate could never be satisfied.
fn validate_manifest_references(cfg: &ConfigFile) -> Result<()> {
    let mut produced: BTreeSet<&str> = BTreeSet::new();

    for task in cfg.task.values() {
        for step in task.steps.iter() {
            if let StepConfig::Transform {
                transform, options, ..
            } = step
            {
                if transform == "hash-rename" {
                    if let Some(name) = options.get("manifest").and_then(|v| v.as_str()) {
                        produced.insert(name);
                    }
                }
            }
        }
    }

    for (name, task) in cfg.task.iter() {
        for manifest in task.requires_manifest.iter() {
            if !produced.contains(manifest.as_str()) {
                return Err(anyhow!(
                    "task '{}' requires manifest '{}', but no hash-rename step produces it",
                    name,
                    manifest
                ));
            }
        }
    }
    Ok(())
}

fn validate_composition_acyclic(cfg: &ConfigFile) -> Result<()> {
    // Edge direction: parent task -> referenced sub-task. A topological
    // sort fails exactly when composition is cyclic.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for step in task.steps.iter() {
            if let StepConfig::Sub { task: sub } = step {
                graph.add_edge(name.as_str(), sub.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(anyhow!(
                "cycle detected in task composition involving task '{}'",
                node
            ))
        }
    }
}
