use std::sync::{Arc, Mutex};

use taskrun::logging::TaskLogger;

/// Logger that keeps every diagnostic line.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl TaskLogger for RecordingLogger {
    fn debug(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

/// Logger that panics on every call.
pub struct PanickingLogger;

impl TaskLogger for PanickingLogger {
    fn debug(&self, _message: &str) {
        panic!("logger exploded");
    }
}

/// Collects lines handed to an output observer.
#[derive(Clone, Default)]
pub struct LineRecorder {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LineRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback suitable for `on_stdout_line` / `on_stderr_line`.
    pub fn observer(&self) -> impl Fn(&str) + Send + Sync + use<> {
        let lines = Arc::clone(&self.lines);
        move |line: &str| lines.lock().unwrap().push(line.to_string())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}
