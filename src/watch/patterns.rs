// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::model::ConfigFile;
use crate::engine::TaskName;
use crate::globs::build_globset;

/// Compiled glob set → task mapping for one `[[watch]]` entry.
///
/// Patterns are evaluated against paths relative to the rule's logical
/// root. Rules are registered once at startup and never mutated.
#[derive(Clone)]
pub struct WatchRule {
    task: TaskName,
    root: String,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("task", &self.task)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    /// Task to trigger when this rule matches.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Logical root the globs are relative to.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether this rule is interested in the given root-relative path,
    /// e.g. `"sass/page/home.scss"`.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile every `[[watch]]` entry in the config.
pub fn build_watch_rules(cfg: &ConfigFile) -> Result<Vec<WatchRule>> {
    let mut rules = Vec::with_capacity(cfg.watch.len());

    for rule in cfg.watch.iter() {
        let include = build_globset(&rule.glob)
            .with_context(|| format!("building watch globs for task {}", rule.task))?;

        let exclude = if rule.exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(&rule.exclude)
                    .with_context(|| format!("building watch excludes for task {}", rule.task))?,
            )
        };

        rules.push(WatchRule {
            task: rule.task.clone(),
            root: rule.root.clone(),
            include,
            exclude,
        });
    }

    Ok(rules)
}
