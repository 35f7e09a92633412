// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// name = "site"
/// version = "1.0.0"
///
/// [paths]
/// src = "src/"
/// dev = "dev/"
/// tmp = ".tmp/"
/// dist = "dist/"
///
/// [task.styles]
/// steps = [
///     { transform = "run-command", input = { root = "src", glob = ["sass/page/*.scss"] }, output = { root = "tmp", dir = "css" }, options = { cmd = "sassc {input} {output}", ext = ".css" } },
/// ]
///
/// [[watch]]
/// glob = ["sass/**/*.scss"]
/// task = "styles"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Project metadata from `[project]`, interpolated into generated files.
    #[serde(default)]
    pub project: ProjectSection,

    /// Logical roots from `[paths]`. Must contain `src`, `dev`, `tmp`, `dist`.
    pub paths: BTreeMap<String, PathBuf>,

    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Watch rules from `[[watch]]`.
    #[serde(default)]
    pub watch: Vec<WatchRuleConfig>,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default = "default_project_version")]
    pub version: String,
}

fn default_project_name() -> String {
    "site".to_string()
}

fn default_project_version() -> String {
    "0.0.0".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            version: default_project_version(),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Quiet period in milliseconds before change events are flushed into
    /// a task run. Rapid successive edits inside this window coalesce.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Ordered steps; execution order is declaration order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Manifests that must exist before this task may run. Running a
    /// release stage without the previous stage's manifest is refused
    /// rather than silently producing a broken release.
    #[serde(default)]
    pub requires_manifest: Vec<String>,
}

/// One step within a task.
///
/// Untagged: the shape of the table decides the variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepConfig {
    /// `{ task = "images" }` — splice another task's steps in here.
    Sub { task: String },

    /// `{ clean = "tmp" }` or `{ clean = "dist", dir = "css" }` — remove
    /// and recreate a directory under a logical root.
    Clean {
        clean: String,
        #[serde(default)]
        dir: Option<String>,
    },

    /// A transform invocation.
    Transform {
        transform: String,
        input: InputSpec,
        output: OutputSpec,
        #[serde(default)]
        options: BTreeMap<String, toml::Value>,
    },
}

/// Input file selection for a transform step.
#[derive(Debug, Clone, Deserialize)]
pub struct InputSpec {
    /// Logical root the globs are relative to.
    pub root: String,
    /// Subdirectory under the root the globs are evaluated in. Matched
    /// files keep their path relative to this base, which is what the
    /// output directory layout and manifest keys are built from.
    #[serde(default)]
    pub dir: String,
    pub glob: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Output directory for a transform step.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSpec {
    pub root: String,
    /// Subdirectory under the root; empty means the root itself.
    #[serde(default)]
    pub dir: String,
}

/// `[[watch]]` entry: glob set → task name.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRuleConfig {
    pub glob: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Logical root the globs are relative to.
    #[serde(default = "default_watch_root")]
    pub root: String,
    /// Task to re-run when a matching path changes.
    pub task: String,
}

fn default_watch_root() -> String {
    "src".to_string()
}
