use std::sync::{Arc, Mutex};

use taskrun::exec::{KillFuture, ProcessTreeKiller, Signal, SystemTreeKiller};

/// A tree killer that:
/// - records every `(pid, signal)` request
/// - optionally forwards the request to the real `SystemTreeKiller`.
#[derive(Clone, Default)]
pub struct RecordingKiller {
    requests: Arc<Mutex<Vec<(u32, Signal)>>>,
    forward: bool,
}

impl RecordingKiller {
    /// Record only; no signal is ever sent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and really terminate the tree.
    pub fn forwarding() -> Self {
        Self {
            requests: Arc::default(),
            forward: true,
        }
    }

    pub fn requests(&self) -> Vec<(u32, Signal)> {
        self.requests.lock().unwrap().clone()
    }
}

impl ProcessTreeKiller for RecordingKiller {
    fn kill_tree(&self, pid: u32, signal: Signal) -> KillFuture<'_> {
        self.requests.lock().unwrap().push((pid, signal));
        let forward = self.forward;

        Box::pin(async move {
            if forward {
                SystemTreeKiller.kill_tree(pid, signal).await
            } else {
                Ok(())
            }
        })
    }
}
