#![cfg(unix)]

mod common;
use crate::common::{LineRecorder, RecordingLogger, TaskBuilder, init_tracing, with_timeout};

use std::error::Error;
use std::sync::{Arc, Mutex};

use taskrun::errors::TaskError;
use taskrun::exec::TaskState;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn stdout_lines_arrive_in_order_and_exit_code_is_returned() -> TestResult {
    init_tracing();

    let stdout = LineRecorder::new();
    let mut task = TaskBuilder::sh("printf 'a\\nb\\nc'").build();
    task.on_stdout_line(stdout.observer());

    let code = with_timeout(task.execute()).await?;

    assert_eq!(code, 0);
    assert_eq!(stdout.lines(), vec!["a", "b", "c"]);
    assert_eq!(task.state(), TaskState::Exited(0));
    assert_eq!(task.pid(), None);
    Ok(())
}

#[tokio::test]
async fn line_content_is_exact_including_empty_and_unterminated_lines() -> TestResult {
    init_tracing();

    let stdout = LineRecorder::new();
    let mut task =
        TaskBuilder::sh("printf 'first\\n\\n  indented  \\na much longer line of output\\nlast'")
            .build();
    task.on_stdout_line(stdout.observer());

    with_timeout(task.execute()).await?;

    assert_eq!(
        stdout.lines(),
        vec![
            "first",
            "",
            "  indented  ",
            "a much longer line of output",
            "last"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn stderr_is_delivered_independently() -> TestResult {
    init_tracing();

    let stdout = LineRecorder::new();
    let stderr = LineRecorder::new();
    let mut task = TaskBuilder::sh("echo out1; echo err1 >&2; echo out2; echo err2 >&2").build();
    task.on_stdout_line(stdout.observer());
    task.on_stderr_line(stderr.observer());

    with_timeout(task.execute()).await?;

    assert_eq!(stdout.lines(), vec!["out1", "out2"]);
    assert_eq!(stderr.lines(), vec!["err1", "err2"]);
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_code_resolves_normally() -> TestResult {
    init_tracing();

    let mut task = TaskBuilder::sh("echo failing >&2; exit 3").build();
    let stderr = LineRecorder::new();
    task.on_stderr_line(stderr.observer());

    let code = with_timeout(task.execute()).await?;

    assert_eq!(code, 3);
    assert_eq!(stderr.lines(), vec!["failing"]);
    assert_eq!(task.state(), TaskState::Exited(3));
    // Killing a finished task changes nothing.
    task.kill().await?;
    assert!(!task.is_interrupted());
    assert_eq!(task.state(), TaskState::Exited(3));
    Ok(())
}

#[tokio::test]
async fn started_fires_once_before_any_line() -> TestResult {
    init_tracing();

    let events = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut task = TaskBuilder::sh("echo one; echo two >&2").build();
    {
        let events = Arc::clone(&events);
        task.on_started(move || events.lock().unwrap().push("started".to_string()));
    }
    {
        let events = Arc::clone(&events);
        task.on_stdout_line(move |l| events.lock().unwrap().push(format!("out:{l}")));
    }
    {
        let events = Arc::clone(&events);
        task.on_stderr_line(move |l| events.lock().unwrap().push(format!("err:{l}")));
    }

    with_timeout(task.execute()).await?;

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], "started");
    assert!(events.contains(&"out:one".to_string()));
    assert!(events.contains(&"err:two".to_string()));
    Ok(())
}

#[tokio::test]
async fn last_registered_observer_wins() -> TestResult {
    init_tracing();

    let first = LineRecorder::new();
    let second = LineRecorder::new();
    let mut task = TaskBuilder::sh("echo hello").build();
    task.on_stdout_line(first.observer());
    task.on_stdout_line(second.observer());

    with_timeout(task.execute()).await?;

    assert!(first.lines().is_empty());
    assert_eq!(second.lines(), vec!["hello"]);
    Ok(())
}

#[tokio::test]
async fn output_without_observers_is_drained() -> TestResult {
    init_tracing();

    // Far more than a pipe buffer; the child would block if nobody read it.
    let task =
        TaskBuilder::sh("i=0; while [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done").build();

    let code = with_timeout(task.execute()).await?;

    assert_eq!(code, 0);
    Ok(())
}

#[tokio::test]
async fn working_directory_is_honoured() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("marker.txt"), "here\n")?;

    let stdout = LineRecorder::new();
    let mut task = TaskBuilder::sh("cat marker.txt").cwd(dir.path()).build();
    task.on_stdout_line(stdout.observer());

    let code = with_timeout(task.execute()).await?;

    assert_eq!(code, 0);
    assert_eq!(stdout.lines(), vec!["here"]);
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_a_spawn_failure() -> TestResult {
    init_tracing();

    let fired = Arc::new(Mutex::new(0usize));
    let mut task = TaskBuilder::new("/definitely/not/a/real/binary").build();
    {
        let fired = Arc::clone(&fired);
        task.on_started(move || *fired.lock().unwrap() += 1);
    }
    {
        let fired = Arc::clone(&fired);
        task.on_stdout_line(move |_| *fired.lock().unwrap() += 1);
    }

    let err = with_timeout(task.execute()).await.unwrap_err();

    match err {
        TaskError::Spawn { executable, source } => {
            assert_eq!(executable, "/definitely/not/a/real/binary");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected Spawn error, got {other:?}"),
    }
    assert_eq!(*fired.lock().unwrap(), 0);
    assert_eq!(task.state(), TaskState::Failed);
    Ok(())
}

#[tokio::test]
async fn second_execute_fails_fast() -> TestResult {
    init_tracing();

    let task = TaskBuilder::sh("exit 0").build();
    with_timeout(task.execute()).await?;

    let err = task.execute().await.unwrap_err();
    assert!(matches!(err, TaskError::AlreadyStarted { ref state } if state == "exited(0)"));
    Ok(())
}

#[tokio::test]
async fn logger_receives_invocation_details() -> TestResult {
    init_tracing();

    let logger = RecordingLogger::new();
    let task = TaskBuilder::sh("true")
        .logger(Arc::new(logger.clone()))
        .build();

    with_timeout(task.execute()).await?;

    let lines = logger.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("\"sh\""));
    assert!(lines[1].contains("\"-c\"") && lines[1].contains("\"true\""));
    assert!(lines[2].contains("cargo_env = None"));
    Ok(())
}
