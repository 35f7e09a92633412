// src/pipeline/runner.rs

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::model::ProjectSection;
use crate::errors::{PipelineError, Result};
use crate::globs::{build_globset, scan};
use crate::graph::{FlatStep, ResolvedPlan, TaskGraph, TransformStep};
use crate::paths::PathConfig;
use crate::transform::{
    ManifestStore, Outcome, TransformBatch, TransformCtx, TransformRegistry,
};

/// Subdirectory of the `tmp` root holding persisted manifests.
const MANIFEST_DIR: &str = ".manifests";

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub task: String,
    pub steps: usize,
}

/// Executes resolved task plans strictly sequentially.
///
/// Owns the immutable pieces for the life of the process: logical roots,
/// project metadata, the task graph, and the transform registry.
#[derive(Debug)]
pub struct PipelineRunner {
    paths: PathConfig,
    project: ProjectSection,
    graph: TaskGraph,
    registry: TransformRegistry,
    manifest_dir: PathBuf,
}

impl PipelineRunner {
    /// Assemble a runner, failing fast if any declared step names a
    /// transform the registry does not know.
    pub fn new(
        paths: PathConfig,
        project: ProjectSection,
        graph: TaskGraph,
        registry: TransformRegistry,
    ) -> Result<Self> {
        let manifest_dir = paths.join("tmp", MANIFEST_DIR)?;

        let names: Vec<String> = graph.task_names().map(str::to_string).collect();
        for name in names {
            let plan = graph.resolve(&name)?;
            for step in plan.steps.iter() {
                if let FlatStep::Transform(t) = &step.step {
                    if !registry.contains(&t.transform) {
                        return Err(PipelineError::UnknownTransform(t.transform.clone()));
                    }
                }
            }
        }

        Ok(Self {
            paths,
            project,
            graph,
            registry,
            manifest_dir,
        })
    }

    pub fn resolve(&self, task: &str) -> Result<ResolvedPlan> {
        self.graph.resolve(task)
    }

    /// Run a task to completion or first failure.
    ///
    /// On a step failure, remaining steps of this run are not attempted;
    /// partial output under `tmp` is left in place for inspection.
    pub fn run(&self, task: &str) -> Result<RunReport> {
        let plan = self.graph.resolve(task)?;
        let mut manifests = ManifestStore::new(self.manifest_dir.clone());

        // A requirement is satisfied by an already-persisted manifest or by
        // a hash step earlier in this very plan (composed release runs).
        let produced: Vec<(String, usize)> = plan
            .steps
            .iter()
            .enumerate()
            .filter_map(|(index, resolved)| match &resolved.step {
                FlatStep::Transform(t) if t.transform == "hash-rename" => t
                    .options
                    .get_str("manifest")
                    .map(|name| (name.to_string(), index)),
                _ => None,
            })
            .collect();

        for requirement in plan.requires.iter() {
            let produced_earlier = produced
                .iter()
                .any(|(name, index)| *name == requirement.manifest && *index < requirement.step_index);
            if !produced_earlier && !manifests.exists(&requirement.manifest) {
                return Err(PipelineError::OutOfOrderStage {
                    task: requirement.task.clone(),
                    manifest: requirement.manifest.clone(),
                });
            }
        }

        info!(task = %task, steps = plan.steps.len(), "starting run");

        for (index, resolved) in plan.steps.iter().enumerate() {
            match &resolved.step {
                FlatStep::Clean { root, dir } => {
                    self.run_clean(index, root, dir.as_deref())?;
                }
                FlatStep::Transform(step) => {
                    self.run_transform(index, step, &mut manifests)?;
                }
            }
        }

        info!(task = %task, "run complete");
        Ok(RunReport {
            task: task.to_string(),
            steps: plan.steps.len(),
        })
    }

    fn run_clean(&self, index: usize, root: &str, dir: Option<&str>) -> Result<()> {
        let target = match dir {
            Some(sub) => self.paths.join(root, sub)?,
            None => self.paths.resolve(root)?.to_path_buf(),
        };

        info!(step = index, path = ?target, "clean");

        if target.exists() {
            fs::remove_dir_all(&target)
                .with_context(|| format!("removing directory {:?}", target))?;
        }
        fs::create_dir_all(&target)
            .with_context(|| format!("recreating directory {:?}", target))?;
        Ok(())
    }

    fn run_transform(
        &self,
        index: usize,
        step: &TransformStep,
        manifests: &mut ManifestStore,
    ) -> Result<()> {
        let input_root = if step.input.dir.is_empty() {
            self.paths.resolve(&step.input.root)?.to_path_buf()
        } else {
            self.paths.join(&step.input.root, &step.input.dir)?
        };
        let include = build_globset(&step.input.globs)?;
        let exclude = if step.input.excludes.is_empty() {
            None
        } else {
            Some(build_globset(&step.input.excludes)?)
        };

        let inputs = scan(&input_root, &include, exclude.as_ref());

        let output_dir = if step.output.dir.is_empty() {
            self.paths.resolve(&step.output.root)?.to_path_buf()
        } else {
            self.paths.join(&step.output.root, &step.output.dir)?
        };
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating output directory {:?}", output_dir))?;

        info!(
            step = index,
            transform = %step.transform,
            inputs = inputs.len(),
            output = ?output_dir,
            "transform"
        );

        let batch = TransformBatch {
            inputs,
            input_root,
            output_dir,
            options: step.options.clone(),
        };
        let mut ctx = TransformCtx {
            paths: &self.paths,
            project: &self.project,
            manifests,
        };

        let results = match self.registry.invoke(&step.transform, &mut ctx, &batch) {
            Ok(results) => results,
            // A misconfigured transform name is its own error; anything else
            // that sinks the whole batch becomes a step failure.
            Err(err @ PipelineError::UnknownTransform(_)) => return Err(err),
            Err(err) => {
                return Err(PipelineError::StepFailure {
                    step_index: index,
                    transform: step.transform.clone(),
                    input: None,
                    cause: err.to_string(),
                });
            }
        };

        for result in results.iter() {
            match &result.outcome {
                Outcome::Written(path) => {
                    debug!(input = ?result.input, output = ?path, "ok");
                }
                Outcome::Failed(cause) => {
                    warn!(input = ?result.input, cause = %cause, "input failed");
                    return Err(PipelineError::StepFailure {
                        step_index: index,
                        transform: step.transform.clone(),
                        input: Some(result.input.clone()),
                        cause: cause.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
