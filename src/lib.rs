// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;

use std::future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{
    ConfigFile, Configuration, default_config_path, load_and_validate, load_or_default,
};
use crate::exec::{ExitCode, ProcessTask};
use crate::logging::TracingLogger;

/// Exit code reported when the task was killed on Ctrl-C or timeout.
pub const INTERRUPTED_EXIT_CODE: ExitCode = 130;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one `ProcessTask` echoing its output to our stdout/stderr
/// - Ctrl-C / `--timeout` handling, which kills the whole process tree
///
/// Returns the exit code the binary should exit with.
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_or_default(default_config_path())?,
    };

    let cwd = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolving current directory")?,
    };

    let timeout = args
        .timeout
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("invalid --timeout")?;

    if args.dry_run {
        print_dry_run(&args, &cwd, &cfg);
        return Ok(0);
    }

    let logger = TracingLogger::new("taskrun").child(&task_tag(&args.executable));
    let mut task = ProcessTask::new(
        Arc::new(cfg),
        Arc::new(logger),
        args.executable.as_str(),
        args.args.iter().cloned(),
        cwd,
    );

    let executable = args.executable.clone();
    task.on_started(move || debug!(executable = %executable, "task started"));
    task.on_stdout_line(|line| println!("{line}"));
    task.on_stderr_line(|line| eprintln!("{line}"));

    let task = Arc::new(task);

    let canceller = {
        let task = Arc::clone(&task);
        tokio::spawn(async move {
            let reason = wait_for_cancel(timeout).await;
            info!(reason, "cancelling running task");
            if let Err(e) = task.kill().await {
                warn!(error = %e, "failed to kill task");
            }
        })
    };

    let result = task.execute().await;
    canceller.abort();

    match result {
        Ok(code) => Ok(code),
        Err(e) if e.is_interrupted() => Ok(INTERRUPTED_EXIT_CODE),
        Err(e) => Err(e.into()),
    }
}

/// Resolve once the task should be cancelled: on Ctrl-C, or when `timeout`
/// elapses.
async fn wait_for_cancel(timeout: Option<Duration>) -> &'static str {
    let timer = async {
        match timeout {
            Some(d) => tokio::time::sleep(d).await,
            None => future::pending::<()>().await,
        }
    };
    tokio::pin!(timer);

    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => "interrupt",
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl+C");
                (&mut timer).await;
                "timeout"
            }
        },
        _ = &mut timer => "timeout",
    }
}

/// Short logger tag for an executable: its file name without extension.
fn task_tag(executable: &str) -> String {
    Path::new(executable)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("task")
        .to_string()
}

fn print_dry_run(args: &CliArgs, cwd: &Path, cfg: &ConfigFile) {
    println!("taskrun dry-run");
    println!("  executable: {}", args.executable);
    println!("  args: {:?}", args.args);
    println!("  cwd: {}", cwd.display());
    if let Some(timeout) = args.timeout {
        println!("  timeout: {timeout}s");
    }
    match cfg.cargo_env() {
        Some(env) => {
            let mut keys: Vec<_> = env.into_iter().collect();
            keys.sort();
            println!("  env overlay ({}):", keys.len());
            for (k, v) in keys {
                println!("    {k}={v}");
            }
        }
        None => println!("  env overlay: none"),
    }

    debug!("dry-run complete (no execution)");
}
