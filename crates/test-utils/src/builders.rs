#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use taskrun::config::{Configuration, StaticConfiguration};
use taskrun::exec::{ProcessTask, ProcessTreeKiller};
use taskrun::logging::TaskLogger;

use crate::recorders::RecordingLogger;

/// Builder for `ProcessTask` to simplify test setup.
pub struct TaskBuilder {
    executable: String,
    args: Vec<String>,
    cwd: PathBuf,
    env: Option<HashMap<String, String>>,
    logger: Arc<dyn TaskLogger>,
    killer: Option<Arc<dyn ProcessTreeKiller>>,
}

impl TaskBuilder {
    pub fn new(executable: &str) -> Self {
        Self {
            executable: executable.to_string(),
            args: vec![],
            cwd: std::env::current_dir().unwrap(),
            env: None,
            logger: Arc::new(RecordingLogger::new()),
            killer: None,
        }
    }

    /// `sh -c <script>`.
    pub fn sh(script: &str) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = dir.into();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn logger(mut self, logger: Arc<dyn TaskLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn killer(mut self, killer: Arc<dyn ProcessTreeKiller>) -> Self {
        self.killer = Some(killer);
        self
    }

    pub fn build(self) -> ProcessTask {
        let config: Arc<dyn Configuration> = Arc::new(StaticConfiguration::new(self.env));
        let task = ProcessTask::new(config, self.logger, self.executable, self.args, self.cwd);
        match self.killer {
            Some(killer) => task.with_killer(killer),
            None => task,
        }
    }
}
