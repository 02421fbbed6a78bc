#![allow(dead_code)]

pub use taskrun_test_utils::builders::TaskBuilder;
pub use taskrun_test_utils::fake_killer::RecordingKiller;
pub use taskrun_test_utils::recorders::{LineRecorder, PanickingLogger, RecordingLogger};
pub use taskrun_test_utils::{init_tracing, with_timeout};

/// Whether `pid` names a live (non-zombie) process.
#[cfg(target_os = "linux")]
pub fn is_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // Format: "<pid> (<comm>) <state> ..."; comm may contain spaces.
        Ok(stat) => match stat.rfind(')') {
            Some(idx) => !matches!(stat[idx + 1..].trim_start().chars().next(), Some('Z' | 'X')),
            None => false,
        },
        Err(_) => false,
    }
}

/// Process group id of `pid`, if it is still around.
#[cfg(target_os = "linux")]
pub fn process_group(pid: u32) -> Option<u32> {
    let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // After "(<comm>)": state, ppid, pgrp.
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(2)?.parse().ok()
}

/// Poll `cond` every 20ms for up to 5s.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if cond() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    cond()
}
