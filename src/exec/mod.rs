// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`task`] owns [`ProcessTask`], one external process and its lifecycle.
//! - [`env`] merges the configured overlay over the inherited environment.
//! - [`lines`] decodes output streams into lines for the observers.
//! - [`kill_tree`] provides the `ProcessTreeKiller` capability and the
//!   platform `SystemTreeKiller`, which tests can replace with a fake.

pub mod env;
pub mod kill_tree;
pub mod lines;
pub mod task;

pub use env::build_spawn_env;
pub use kill_tree::{KillFuture, ProcessTreeKiller, Signal, SystemTreeKiller, descendants_of};
pub use lines::{LineObserver, StreamKind, pump_lines};
pub use task::{ExitCode, ProcessTask, StartedObserver, TaskState};
