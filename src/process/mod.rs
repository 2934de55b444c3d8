//! Supervision of gallery-dl processes
//!
//! - [`registry`] - Live-process registry used by `stop()` to reach every running process
//! - [`supervisor`] - Spawns one process per target and turns its output into events

pub mod registry;
pub mod supervisor;


pub use registry::{HandleId, LiveProcess, ProcessRegistry};
pub use supervisor::{ExitLatch, SupervisorContext, TargetJob, run_target};
