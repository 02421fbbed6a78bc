// src/exec/kill_tree.rs

//! Process-tree termination.
//!
//! A spawned executable may start children of its own (a build tool running
//! compiler subprocesses, a shell running a pipeline). Killing only the direct
//! child would leak those descendants, so termination goes through a
//! [`ProcessTreeKiller`] that signals the whole tree.
//!
//! - [`SystemTreeKiller`] is the platform implementation used in production.
//! - Tests can provide their own implementation that records requests
//!   instead of (or in addition to) sending signals.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;

use tracing::debug;

/// Future returned by [`ProcessTreeKiller::kill_tree`].
pub type KillFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// Signal used to terminate a process tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Term,
    Kill,
    Int,
    Hup,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Term => "SIGTERM",
            Signal::Kill => "SIGKILL",
            Signal::Int => "SIGINT",
            Signal::Hup => "SIGHUP",
        };
        f.write_str(name)
    }
}

#[cfg(unix)]
impl From<Signal> for nix::sys::signal::Signal {
    fn from(signal: Signal) -> Self {
        use nix::sys::signal::Signal as Nix;
        match signal {
            Signal::Term => Nix::SIGTERM,
            Signal::Kill => Nix::SIGKILL,
            Signal::Int => Nix::SIGINT,
            Signal::Hup => Nix::SIGHUP,
        }
    }
}

/// Capability: terminate the process rooted at `pid` and all of its
/// transitive descendants.
///
/// The future completes once the termination request has been issued, not
/// once the processes have died.
pub trait ProcessTreeKiller: Send + Sync {
    fn kill_tree(&self, pid: u32, signal: Signal) -> KillFuture<'_>;
}

/// Platform tree killer.
///
/// - Unix: snapshot the process table and walk parent links from `pid`;
///   signal the root's process group (when it leads one), then the root and
///   every descendant found by the walk.
/// - Windows: `taskkill /PID <pid> /T /F` (the signal is ignored).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTreeKiller;

impl ProcessTreeKiller for SystemTreeKiller {
    fn kill_tree(&self, pid: u32, signal: Signal) -> KillFuture<'_> {
        Box::pin(platform_kill_tree(pid, signal))
    }
}

#[cfg(unix)]
async fn platform_kill_tree(pid: u32, signal: Signal) -> io::Result<()> {
    tokio::task::spawn_blocking(move || unix::kill_tree(pid, signal))
        .await
        .map_err(io::Error::other)?
}

#[cfg(windows)]
async fn platform_kill_tree(pid: u32, signal: Signal) -> io::Result<()> {
    windows::kill_tree(pid, signal).await
}

/// All transitive descendants of `root`, breadth-first, given
/// `(pid, parent_pid)` links. `root` itself is not included.
pub fn descendants_of<I>(root: u32, links: I) -> Vec<u32>
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for (pid, parent) in links {
        if pid != parent {
            children.entry(parent).or_default().push(pid);
        }
    }
    for list in children.values_mut() {
        list.sort_unstable();
    }

    let mut out = Vec::new();
    let mut seen = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        if let Some(kids) = children.get(&current) {
            for &kid in kids {
                if seen.insert(kid) {
                    out.push(kid);
                    queue.push_back(kid);
                }
            }
        }
    }
    debug!(root, count = out.len(), "collected descendant processes");
    out
}

#[cfg(unix)]
mod unix {
    use std::io;

    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::{Pid, getpgid};
    use sysinfo::{ProcessesToUpdate, System};
    use tracing::{debug, warn};

    use super::{Signal, descendants_of};

    pub(super) fn kill_tree(root: u32, signal: Signal) -> io::Result<()> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let links = system.processes().iter().filter_map(|(pid, process)| {
            process
                .parent()
                .map(|parent| (pid.as_u32(), parent.as_u32()))
        });
        let descendants = descendants_of(root, links);

        debug!(
            root,
            %signal,
            descendants = ?descendants,
            "signalling process tree"
        );

        if leads_group(root) {
            match killpg(to_pid(root)?, nix::sys::signal::Signal::from(signal)) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(errno) => return Err(io::Error::from(errno)),
            }
        }

        // ESRCH on the root is not an error: it exited before the signal landed.
        send(root, signal)?;
        for pid in descendants {
            if let Err(e) = send(pid, signal) {
                warn!(pid, %signal, error = %e, "failed to signal descendant process");
            }
        }
        Ok(())
    }

    fn leads_group(pid: u32) -> bool {
        match to_pid(pid) {
            Ok(p) => getpgid(Some(p)) == Ok(p),
            Err(_) => false,
        }
    }

    fn to_pid(pid: u32) -> io::Result<Pid> {
        let raw = i32::try_from(pid).map_err(io::Error::other)?;
        Ok(Pid::from_raw(raw))
    }

    fn send(pid: u32, signal: Signal) -> io::Result<()> {
        match kill(to_pid(pid)?, nix::sys::signal::Signal::from(signal)) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::io;
    use std::process::Stdio;

    use tokio::process::Command;
    use tracing::debug;

    use super::Signal;

    pub(super) async fn kill_tree(root: u32, signal: Signal) -> io::Result<()> {
        debug!(root, %signal, "running taskkill on process tree");
        let status = Command::new("taskkill")
            .args(["/PID", &root.to_string(), "/T", "/F"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("taskkill exited with {status}")))
        }
    }
}
