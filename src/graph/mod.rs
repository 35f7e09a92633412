// src/graph/mod.rs

//! Task graph representation and resolution.
//!
//! - [`model`] holds the runtime task/step types built from config.
//! - [`resolve`] flattens task composition into an ordered step list,
//!   detecting cycles and unknown references as it expands.

pub mod model;
pub mod resolve;

pub use model::{InputSet, OutputDir, Step, Task, TransformStep};
pub use resolve::{FlatStep, ManifestRequirement, ResolvedPlan, ResolvedStep, TaskGraph};
