// src/graph/resolve.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{PipelineError, Result};
use crate::graph::model::{Step, Task, TransformStep};

/// Immutable task graph keyed by task name.
///
/// Built once from static declarations; `resolve` expands sub-task
/// references into a flat ordered step list. Config validation already
/// rejects cyclic composition at load time, but `resolve` re-checks with
/// an explicit expansion stack so graphs assembled programmatically (e.g.
/// in tests) get the same guarantee.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<String, Task>,
}

impl TaskGraph {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut graph = Self::default();
        for (name, task_cfg) in cfg.task.iter() {
            graph.define(Task::from_config(name, task_cfg));
        }
        graph
    }

    /// Register a task. A task defined twice is replaced.
    pub fn define(&mut self, task: Task) {
        self.tasks.insert(task.name.clone(), task);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Flatten a task into its ordered step list.
    ///
    /// Sub-task references expand recursively in place. Fails with
    /// [`PipelineError::CyclicTask`] if expansion revisits a task already on
    /// the expansion stack, and [`PipelineError::UnknownTask`] for an
    /// undefined reference. Performs no filesystem access.
    pub fn resolve(&self, name: &str) -> Result<ResolvedPlan> {
        let mut steps = Vec::new();
        let mut requires = Vec::new();
        let mut stack = Vec::new();

        self.expand(name, &mut stack, &mut steps, &mut requires)?;

        debug!(task = %name, steps = steps.len(), "resolved task plan");
        Ok(ResolvedPlan {
            task: name.to_string(),
            steps,
            requires,
        })
    }

    fn expand(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<ResolvedStep>,
        requires: &mut Vec<ManifestRequirement>,
    ) -> Result<()> {
        if stack.iter().any(|n| n == name) {
            return Err(PipelineError::CyclicTask(name.to_string()));
        }

        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| PipelineError::UnknownTask(name.to_string()))?;

        stack.push(name.to_string());

        // A manifest requirement binds at the position where this task's
        // steps begin: it may be satisfied either by an already-persisted
        // manifest or by a hash step earlier in the same plan.
        for manifest in task.requires_manifest.iter() {
            requires.push(ManifestRequirement {
                manifest: manifest.clone(),
                task: name.to_string(),
                step_index: out.len(),
            });
        }

        for step in task.steps.iter() {
            match step {
                Step::Sub(sub) => self.expand(sub, stack, out, requires)?,
                Step::Transform(t) => out.push(ResolvedStep {
                    origin: name.to_string(),
                    step: FlatStep::Transform(t.clone()),
                }),
                Step::Clean { root, dir } => out.push(ResolvedStep {
                    origin: name.to_string(),
                    step: FlatStep::Clean {
                        root: root.clone(),
                        dir: dir.clone(),
                    },
                }),
            }
        }

        stack.pop();
        Ok(())
    }
}

/// A fully expanded, cycle-checked execution plan for one task.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub task: String,
    pub steps: Vec<ResolvedStep>,
    /// Every `requires_manifest` declaration across the expanded tasks,
    /// each bound to the step index where its task's steps begin.
    pub requires: Vec<ManifestRequirement>,
}

/// A task's declaration that a manifest must be available before its
/// steps run.
#[derive(Debug, Clone)]
pub struct ManifestRequirement {
    pub manifest: String,
    /// Task that declared the requirement (for error reporting).
    pub task: String,
    /// Plan position at which the requirement takes effect.
    pub step_index: usize,
}

/// One flattened step, tagged with the task that declared it.
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub origin: String,
    pub step: FlatStep,
}

/// Step kinds that survive flattening (sub-task references do not).
#[derive(Debug, Clone)]
pub enum FlatStep {
    Transform(TransformStep),
    Clean { root: String, dir: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{InputSet, OutputDir};
    use crate::transform::TransformOptions;

    fn transform_step(transform: &str) -> Step {
        Step::Transform(TransformStep {
            transform: transform.to_string(),
            input: InputSet {
                root: "src".to_string(),
                dir: String::new(),
                globs: vec!["**/*".to_string()],
                excludes: vec![],
            },
            output: OutputDir {
                root: "tmp".to_string(),
                dir: String::new(),
            },
            options: TransformOptions::default(),
        })
    }

    fn task(name: &str, steps: Vec<Step>) -> Task {
        Task {
            name: name.to_string(),
            steps,
            requires_manifest: vec![],
        }
    }

    #[test]
    fn flattened_length_is_sum_of_contributed_steps() {
        let mut graph = TaskGraph::default();
        graph.define(task("leaf", vec![transform_step("copy"), transform_step("copy")]));
        graph.define(task(
            "mid",
            vec![Step::Sub("leaf".to_string()), transform_step("copy")],
        ));
        graph.define(task(
            "top",
            vec![
                Step::Clean {
                    root: "tmp".to_string(),
                    dir: None,
                },
                Step::Sub("mid".to_string()),
                Step::Sub("leaf".to_string()),
            ],
        ));

        let plan = graph.resolve("top").unwrap();
        // 1 clean + (2 + 1) from mid + 2 from leaf again.
        assert_eq!(plan.steps.len(), 6);
        assert_eq!(plan.steps[1].origin, "leaf");
    }

    #[test]
    fn shared_sub_task_may_be_referenced_twice() {
        let mut graph = TaskGraph::default();
        graph.define(task("shared", vec![transform_step("copy")]));
        graph.define(task(
            "both",
            vec![Step::Sub("shared".to_string()), Step::Sub("shared".to_string())],
        ));

        let plan = graph.resolve("both").unwrap();
        assert_eq!(plan.steps.len(), 2);
    }

    #[test]
    fn self_reference_fails_with_cyclic_task() {
        let mut graph = TaskGraph::default();
        graph.define(task("selfish", vec![Step::Sub("selfish".to_string())]));

        match graph.resolve("selfish") {
            Err(PipelineError::CyclicTask(name)) => assert_eq!(name, "selfish"),
            other => panic!("expected CyclicTask, got {other:?}"),
        }
    }

    #[test]
    fn transitive_cycle_fails_with_cyclic_task() {
        let mut graph = TaskGraph::default();
        graph.define(task("a", vec![Step::Sub("b".to_string())]));
        graph.define(task("b", vec![Step::Sub("c".to_string())]));
        graph.define(task("c", vec![Step::Sub("a".to_string())]));

        assert!(matches!(
            graph.resolve("a"),
            Err(PipelineError::CyclicTask(_))
        ));
    }

    #[test]
    fn unknown_reference_fails_with_unknown_task() {
        let mut graph = TaskGraph::default();
        graph.define(task("root", vec![Step::Sub("ghost".to_string())]));

        match graph.resolve("root") {
            Err(PipelineError::UnknownTask(name)) => assert_eq!(name, "ghost"),
            other => panic!("expected UnknownTask, got {other:?}"),
        }
    }

    #[test]
    fn manifest_requirements_bind_to_expansion_positions() {
        let mut graph = TaskGraph::default();
        graph.define(Task {
            name: "styles".to_string(),
            steps: vec![transform_step("rewrite-refs")],
            requires_manifest: vec!["images".to_string()],
        });
        graph.define(Task {
            name: "markup".to_string(),
            steps: vec![transform_step("copy"), Step::Sub("styles".to_string())],
            requires_manifest: vec!["styles".to_string()],
        });

        let plan = graph.resolve("markup").unwrap();
        let summary: Vec<(&str, &str, usize)> = plan
            .requires
            .iter()
            .map(|r| (r.task.as_str(), r.manifest.as_str(), r.step_index))
            .collect();
        // markup's own requirement binds at step 0; the nested styles
        // requirement binds where styles' steps start.
        assert_eq!(
            summary,
            vec![("markup", "styles", 0), ("styles", "images", 1)]
        );
    }
}
