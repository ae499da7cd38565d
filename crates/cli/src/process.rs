// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runner process execution.
//!
//! A [`Launcher`] starts the runner and forwards its combined output and
//! exit into a session's event channel; the returned [`ProcessHandle`]
//! delivers interrupts and kills. [`SystemLauncher`] is the real
//! implementation; tests substitute scripted launchers.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use serde::Serialize;

use crate::session::SessionEvent;
use crate::target::Invocation;

/// How often the waiter polls the child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Read buffer size for the output pipes.
const CHUNK_SIZE: usize = 8 * 1024;

/// How the runner process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "code")]
pub enum ExitOutcome {
    /// Exited with a status code.
    Exited(i32),
    /// Ended by a signal, without a status code.
    Terminated,
}

impl ExitOutcome {
    pub fn is_success(self) -> bool {
        self == ExitOutcome::Exited(0)
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitOutcome::Exited(code),
            None => ExitOutcome::Terminated,
        }
    }
}

/// Control over a launched runner.
pub trait ProcessHandle: Send {
    /// Deliver an interrupt (SIGINT on unix).
    fn interrupt(&mut self) -> io::Result<()>;

    /// Terminate forcibly.
    fn kill(&mut self) -> io::Result<()>;

    /// Whether the process has not been observed to exit yet.
    fn is_running(&self) -> bool;
}

/// Starts runner processes.
pub trait Launcher: Send + Sync {
    /// Spawn `invocation`. Output chunks arrive as [`SessionEvent::Output`],
    /// followed by exactly one [`SessionEvent::Exited`] once all output has
    /// been delivered.
    fn launch(
        &self,
        invocation: &Invocation,
        events: Sender<SessionEvent>,
    ) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Launcher backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(
        &self,
        invocation: &Invocation,
        events: Sender<SessionEvent>,
    ) -> io::Result<Box<dyn ProcessHandle>> {
        let mut child = Command::new(&invocation.command)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let pid = child.id();
        tracing::debug!("spawned `{}` as pid {}", invocation.display(), pid);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, events.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, events.clone()));
        }

        let child = Arc::new(Mutex::new(child));
        let exited = Arc::new(AtomicBool::new(false));
        spawn_waiter(Arc::clone(&child), Arc::clone(&exited), readers, events);

        Ok(Box::new(SystemProcess { pid, child, exited }))
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    mut pipe: R,
    events: Sender<SessionEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if events.send(SessionEvent::Output(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("runner output read failed: {}", e);
                    break;
                }
            }
        }
    })
}

fn spawn_waiter(
    child: Arc<Mutex<Child>>,
    exited: Arc<AtomicBool>,
    readers: Vec<JoinHandle<()>>,
    events: Sender<SessionEvent>,
) {
    std::thread::spawn(move || {
        let outcome = loop {
            let polled = match child.lock() {
                Ok(mut guard) => guard.try_wait(),
                Err(poisoned) => poisoned.into_inner().try_wait(),
            };
            match polled {
                Ok(Some(status)) => break ExitOutcome::from(status),
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    tracing::warn!("waiting for runner failed: {}", e);
                    break ExitOutcome::Terminated;
                }
            }
        };
        exited.store(true, Ordering::SeqCst);

        // Deliver every output chunk before the exit.
        for reader in readers {
            let _ = reader.join();
        }
        tracing::debug!("runner exited: {:?}", outcome);
        let _ = events.send(SessionEvent::Exited(outcome));
    });
}

struct SystemProcess {
    pid: u32,
    child: Arc<Mutex<Child>>,
    exited: Arc<AtomicBool>,
}

impl ProcessHandle for SystemProcess {
    fn interrupt(&mut self) -> io::Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        send_interrupt(self.pid).or_else(|e| {
            tracing::warn!("interrupt of pid {} failed: {}", self.pid, e);
            self.kill()
        })
    }

    fn kill(&mut self) -> io::Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        let mut guard = match self.child.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.kill() {
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    fn is_running(&self) -> bool {
        !self.exited.load(Ordering::SeqCst)
    }
}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    match kill(Pid::from_raw(pid), Signal::SIGINT) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

#[cfg(not(unix))]
fn send_interrupt(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "interrupts are not supported on this platform",
    ))
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
