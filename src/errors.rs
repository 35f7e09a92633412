// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Every failure a caller can act on has its own variant; I/O and parsing
//! errors convert in via `#[from]`, and `anyhow` errors from the wiring
//! layer pass through `Other`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unknown logical root '{0}'")]
    UnknownRoot(String),

    #[error("unknown task '{0}'")]
    UnknownTask(String),

    #[error("cycle detected in task graph involving '{0}'")]
    CyclicTask(String),

    #[error("unknown transform '{0}'")]
    UnknownTransform(String),

    #[error("no manifest named '{0}' has been produced")]
    UnknownManifest(String),

    #[error(
        "task '{task}' requires the '{manifest}' manifest; run the stage that produces it first"
    )]
    OutOfOrderStage { task: String, manifest: String },

    #[error("step {step_index} ({transform}) failed on {}: {cause}", display_input(.input))]
    StepFailure {
        step_index: usize,
        transform: String,
        input: Option<PathBuf>,
        cause: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn display_input(input: &Option<PathBuf>) -> String {
    match input {
        Some(path) => path.display().to_string(),
        None => "(whole batch)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
