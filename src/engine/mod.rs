// src/engine/mod.rs

//! Watch-mode orchestration.
//!
//! This module ties together:
//! - the coalescing queue (what happens to triggers that arrive while a
//!   run is active or within the debounce window)
//! - the runtime event loop that reacts to:
//!   - file-watch triggers
//!   - run completion events
//!   - shutdown signals

pub mod queue;
pub mod runtime;

pub use queue::CoalescingQueue;
pub use runtime::{
    RunExecutor, RunOutcome, Runtime, RuntimeEvent, RuntimeOptions, TaskName, TriggerReason,
};
