// src/exec/task.rs

//! A single external-process invocation.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::errors::{Result, TaskError};
use crate::exec::env::build_spawn_env;
use crate::exec::kill_tree::{ProcessTreeKiller, Signal, SystemTreeKiller};
use crate::exec::lines::{LineObserver, StreamKind, pump_lines};
use crate::logging::TaskLogger;

pub type ExitCode = i32;

/// Callback fired once the process has been spawned.
pub type StartedObserver = Box<dyn Fn() + Send + Sync>;

/// Where a [`ProcessTask`] is in its lifecycle.
///
/// `Created -> Running -> {Exited | Killed}`, or `Created -> Failed` when the
/// spawn itself fails. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Exited(ExitCode),
    Killed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Exited(_) | TaskState::Killed | TaskState::Failed
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Created => f.write_str("created"),
            TaskState::Running => f.write_str("running"),
            TaskState::Exited(code) => write!(f, "exited({code})"),
            TaskState::Killed => f.write_str("killed"),
            TaskState::Failed => f.write_str("failed"),
        }
    }
}

/// Zero-or-one callback per channel.
#[derive(Default)]
struct Observers {
    started: Option<StartedObserver>,
    stdout: Option<LineObserver>,
    stderr: Option<LineObserver>,
}

/// Mutable lifecycle data, shared between `execute` and `kill`.
///
/// - `pid` is `Some` only while the child is alive.
/// - `interrupted` only ever goes `false -> true`.
#[derive(Debug)]
struct Lifecycle {
    state: TaskState,
    pid: Option<u32>,
    interrupted: bool,
}

/// One external process: spawn it, stream its output line by line to the
/// registered observers, and terminate its whole process tree on request.
///
/// Observers are attached through `&mut self`, so they are fixed once
/// [`execute`](Self::execute) is running. `execute` and [`kill`](Self::kill)
/// both take `&self`; share the task as `Arc<ProcessTask>` to kill it from
/// another tokio task.
pub struct ProcessTask {
    configuration: Arc<dyn Configuration>,
    logger: Arc<dyn TaskLogger>,
    killer: Arc<dyn ProcessTreeKiller>,
    executable: String,
    args: Vec<String>,
    cwd: PathBuf,
    observers: Observers,
    lifecycle: Mutex<Lifecycle>,
}

impl ProcessTask {
    pub fn new<I, S>(
        configuration: Arc<dyn Configuration>,
        logger: Arc<dyn TaskLogger>,
        executable: impl Into<String>,
        args: I,
        cwd: impl Into<PathBuf>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configuration,
            logger,
            killer: Arc::new(SystemTreeKiller),
            executable: executable.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            observers: Observers::default(),
            lifecycle: Mutex::new(Lifecycle {
                state: TaskState::Created,
                pid: None,
                interrupted: false,
            }),
        }
    }

    /// Replace the platform tree killer.
    pub fn with_killer(mut self, killer: Arc<dyn ProcessTreeKiller>) -> Self {
        self.killer = killer;
        self
    }

    /// Called once, right after the process has been spawned and before any
    /// output line is delivered. Replaces any earlier callback.
    pub fn on_started<F>(&mut self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.started = Some(Box::new(f));
    }

    /// Called for every stdout line, in order. Replaces any earlier callback.
    pub fn on_stdout_line<F>(&mut self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.observers.stdout = Some(Box::new(f));
    }

    /// Called for every stderr line, in order. Replaces any earlier callback.
    pub fn on_stderr_line<F>(&mut self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.observers.stderr = Some(Box::new(f));
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn state(&self) -> TaskState {
        self.lifecycle().state
    }

    /// OS process id, while the process is running.
    pub fn pid(&self) -> Option<u32> {
        self.lifecycle().pid
    }

    pub fn is_interrupted(&self) -> bool {
        self.lifecycle().interrupted
    }

    /// Run the process to completion.
    ///
    /// Resolves with the exit code once the process has exited and both of
    /// its output streams have been fully delivered. Fails with
    /// [`TaskError::Spawn`] if the process could not be created and with
    /// [`TaskError::Interrupted`] if [`kill`](Self::kill) was requested
    /// before it exited. Can only be called once per task.
    pub async fn execute(&self) -> Result<ExitCode> {
        self.begin()?;

        let overlay = self.configuration.cargo_env();
        let env = build_spawn_env(std::env::vars_os(), overlay.as_ref());

        self.trace(&format!("execute: executable = {:?}", self.executable));
        self.trace(&format!("execute: args = {:?}", self.args));
        let sorted_overlay = overlay
            .as_ref()
            .map(|o| o.iter().collect::<BTreeMap<_, _>>());
        self.trace(&format!("execute: cargo_env = {:?}", sorted_overlay));

        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .env_clear()
            .envs(&env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a tree kill also reaches children forked
        // after the process table was scanned.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                self.lifecycle().state = TaskState::Failed;
                warn!(
                    executable = %self.executable,
                    cwd = %self.cwd.display(),
                    error = %source,
                    "failed to spawn process"
                );
                return Err(TaskError::Spawn {
                    executable: self.executable.clone(),
                    source,
                });
            }
        };

        let pid = child.id();
        self.lifecycle().pid = pid;
        info!(executable = %self.executable, pid = ?pid, "process started");

        if let Some(started) = &self.observers.started {
            started();
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_pump = async move {
            match stdout {
                Some(s) => {
                    pump_lines(s, self.observers.stdout.as_deref(), StreamKind::Stdout).await
                }
                None => 0,
            }
        };
        let stderr_pump = async move {
            match stderr {
                Some(s) => {
                    pump_lines(s, self.observers.stderr.as_deref(), StreamKind::Stderr).await
                }
                None => 0,
            }
        };
        // The pid goes away as soon as the child is reaped; descendants may
        // keep the pipes open for much longer.
        let wait = async {
            let status = child.wait().await;
            (status, self.mark_exited())
        };

        let ((status, interrupted), stdout_lines, stderr_lines) =
            tokio::join!(wait, stdout_pump, stderr_pump);

        debug!(
            executable = %self.executable,
            pid = ?pid,
            stdout_lines,
            stderr_lines,
            "process output drained"
        );

        self.finish(status, interrupted)
    }

    /// Request termination of the whole process tree.
    ///
    /// A no-op when no process is running or a kill was already requested.
    /// Completes once the signal has been issued; await `execute` to observe
    /// the process actually going away.
    pub async fn kill(&self) -> Result<()> {
        let Some(pid) = self.mark_interrupted() else {
            debug!(executable = %self.executable, "kill ignored; nothing to terminate");
            return Ok(());
        };

        info!(
            executable = %self.executable,
            pid,
            signal = %Signal::Term,
            "terminating process tree"
        );

        self.killer
            .kill_tree(pid, Signal::Term)
            .await
            .map_err(|source| TaskError::Kill { pid, source })
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != TaskState::Created {
            return Err(TaskError::AlreadyStarted {
                state: lifecycle.state.to_string(),
            });
        }
        lifecycle.state = TaskState::Running;
        Ok(())
    }

    /// Flip `interrupted` and hand back the pid to signal, if this call is
    /// the one that should act.
    fn mark_interrupted(&self) -> Option<u32> {
        let mut lifecycle = self.lifecycle();
        if lifecycle.interrupted {
            return None;
        }
        let pid = lifecycle.pid?;
        lifecycle.interrupted = true;
        Some(pid)
    }

    /// Forget the pid of a reaped child and report whether a kill had been
    /// requested by then.
    fn mark_exited(&self) -> bool {
        let mut lifecycle = self.lifecycle();
        lifecycle.pid = None;
        lifecycle.interrupted
    }

    fn finish(&self, status: io::Result<ExitStatus>, interrupted: bool) -> Result<ExitCode> {
        let mut lifecycle = self.lifecycle();

        if interrupted {
            lifecycle.state = TaskState::Killed;
            info!(executable = %self.executable, "process terminated after kill request");
            return Err(TaskError::Interrupted {
                executable: self.executable.clone(),
            });
        }

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                lifecycle.state = TaskState::Failed;
                return Err(TaskError::Wait(e));
            }
        };

        let code = exit_code(&status);
        lifecycle.state = TaskState::Exited(code);
        info!(
            executable = %self.executable,
            exit_code = code,
            success = status.success(),
            "process exited"
        );
        Ok(code)
    }

    /// Forward a diagnostic line to the task logger. A misbehaving logger
    /// never affects the run.
    fn trace(&self, message: &str) {
        let logger = &self.logger;
        if panic::catch_unwind(AssertUnwindSafe(|| logger.debug(message))).is_err() {
            warn!(executable = %self.executable, "task logger panicked; line dropped");
        }
    }
}

impl fmt::Debug for ProcessTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessTask")
            .field("executable", &self.executable)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field("lifecycle", &*self.lifecycle())
            .finish_non_exhaustive()
    }
}

/// Exit code for a finished process; on Unix a signal death maps to
/// `128 + signal` like a shell would report it.
fn exit_code(status: &ExitStatus) -> ExitCode {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
