// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references and composition acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, InputSpec, OutputSpec, ProjectSection, StepConfig, TaskConfig,
    WatchRuleConfig,
};
pub use validate::validate_config;
