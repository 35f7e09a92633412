// src/watch/mod.rs

//! File watching and change-to-trigger mapping.
//!
//! This module is responsible for:
//! - Compiling `[[watch]]` glob rules against their logical roots.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//!
//! It does **not** know about tasks' contents or ordering; it only turns
//! filesystem changes into task-level triggers. Debouncing and coalescing
//! happen in the runtime, where the invariant is testable.

pub mod patterns;
pub mod watcher;

pub use patterns::{WatchRule, build_watch_rules};
pub use watcher::{WatcherHandle, spawn_watcher};
