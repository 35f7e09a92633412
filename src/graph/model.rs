// src/graph/model.rs

use crate::config::model::{StepConfig, TaskConfig};
use crate::transform::TransformOptions;

/// A named task: an ordered sequence of steps.
///
/// Steps execute strictly in declared order; a later step may depend on
/// files written by an earlier step within the same run.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub steps: Vec<Step>,
    /// Manifests that must exist before this task may run.
    pub requires_manifest: Vec<String>,
}

impl Task {
    pub fn from_config(name: &str, cfg: &TaskConfig) -> Self {
        Self {
            name: name.to_string(),
            steps: cfg.steps.iter().map(Step::from_config).collect(),
            requires_manifest: cfg.requires_manifest.clone(),
        }
    }
}

/// One step of a task.
#[derive(Debug, Clone)]
pub enum Step {
    /// Invoke a registered transform over a glob-selected input set.
    Transform(TransformStep),
    /// Splice in another task's steps.
    Sub(String),
    /// Remove and recreate a directory under a logical root.
    Clean { root: String, dir: Option<String> },
}

impl Step {
    fn from_config(cfg: &StepConfig) -> Self {
        match cfg {
            StepConfig::Sub { task } => Step::Sub(task.clone()),
            StepConfig::Clean { clean, dir } => Step::Clean {
                root: clean.clone(),
                dir: dir.clone(),
            },
            StepConfig::Transform {
                transform,
                input,
                output,
                options,
            } => Step::Transform(TransformStep {
                transform: transform.clone(),
                input: InputSet {
                    root: input.root.clone(),
                    dir: input.dir.clone(),
                    globs: input.glob.clone(),
                    excludes: input.exclude.clone(),
                },
                output: OutputDir {
                    root: output.root.clone(),
                    dir: output.dir.clone(),
                },
                options: TransformOptions::new(options.clone()),
            }),
        }
    }
}

/// A transform invocation: which transform, over which files, into where.
#[derive(Debug, Clone)]
pub struct TransformStep {
    pub transform: String,
    pub input: InputSet,
    pub output: OutputDir,
    pub options: TransformOptions,
}

/// Glob-selected input files rooted at a logical path.
#[derive(Debug, Clone)]
pub struct InputSet {
    pub root: String,
    /// Subdirectory under the root the globs are evaluated in.
    pub dir: String,
    pub globs: Vec<String>,
    pub excludes: Vec<String>,
}

/// Output directory rooted at a logical path.
#[derive(Debug, Clone)]
pub struct OutputDir {
    pub root: String,
    /// Subdirectory under the root; empty means the root itself.
    pub dir: String,
}
