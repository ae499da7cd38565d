// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run sessions.
//!
//! Everything that happens to a run (output chunks, the exit, cancellation)
//! travels through one channel into one consumer thread that owns the
//! [`StreamParser`]. Lines are therefore applied to the store strictly in
//! arrival order and parser state is never touched concurrently.
//!
//! The [`Orchestrator`] keeps at most one session alive: starting a run
//! cancels and drains the previous one first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use serde::Serialize;

use crate::aggregate::StatusCounts;
use crate::error::{Error, Result};
use crate::process::{ExitOutcome, Launcher, ProcessHandle};
use crate::status::{Status, StatusStore};
use crate::stream::StreamParser;
use crate::target::{Invocation, RunScope};

/// Default pause between the two interrupts of a cancellation.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(250);

/// How long `cancel` waits for the consumer to acknowledge.
const ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll interval while waiting for the runner to exit after an interrupt.
const EXIT_POLL: Duration = Duration::from_millis(10);

/// Input of a session's consumer thread.
#[derive(Debug)]
pub enum SessionEvent {
    /// A chunk of combined stdout/stderr.
    Output(Vec<u8>),
    /// The runner exited; no output follows.
    Exited(ExitOutcome),
    /// Abort in-flight nodes and ignore further output; acknowledged on
    /// the enclosed sender.
    Cancel(Sender<()>),
}

/// Per-run settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// The runner stops at the first failure; unexecuted tests are skipped.
    pub fail_fast: bool,
    /// Pause before the second interrupt.
    pub cancel_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Display label of the run root.
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// `None` when the runner never reported an exit.
    pub exit: Option<ExitOutcome>,
    pub cancelled: bool,
    /// Leaf statuses at the end of the run.
    pub counts: StatusCounts,
    /// Output lines consumed.
    pub lines: usize,
}

impl RunReport {
    /// Nothing failed, nothing was aborted, and the run was not cancelled.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.counts.failed == 0 && self.counts.aborted == 0
    }
}

enum Completion {
    Running(JoinHandle<RunReport>),
    Finished(RunReport),
    Lost,
}

/// One execution of the runner against one scope.
pub struct RunSession {
    events: Sender<SessionEvent>,
    handle: Mutex<Box<dyn ProcessHandle>>,
    cancel_requested: Arc<AtomicBool>,
    options: SessionOptions,
    completion: Mutex<Completion>,
}

impl RunSession {
    /// Launch the runner and start consuming its output.
    ///
    /// When the runner cannot be spawned, the selected node is marked
    /// `failed` with the spawn error as detail.
    pub fn start(
        launcher: &dyn Launcher,
        invocation: &Invocation,
        store: Arc<StatusStore>,
        scope: RunScope,
        options: SessionOptions,
    ) -> Result<Self> {
        let (tx, rx) = unbounded();

        let handle = match launcher.launch(invocation, tx.clone()) {
            Ok(handle) => handle,
            Err(source) => {
                tracing::debug!("spawn of `{}` failed: {}", invocation.display(), source);
                if let Some(root) = &scope.root_path {
                    store.set_status(root, Status::Failed);
                    store.set_failure_detail(
                        root,
                        format!("failed to spawn `{}`: {}", invocation.command, source),
                    );
                }
                return Err(Error::Spawn {
                    command: invocation.command.clone(),
                    source,
                });
            }
        };

        let parser = StreamParser::new(store, scope);
        parser.begin();

        let cancel_requested = Arc::new(AtomicBool::new(false));
        let consumer = {
            let cancel_requested = Arc::clone(&cancel_requested);
            std::thread::spawn(move || consume(parser, rx, cancel_requested, options))
        };

        Ok(Self {
            events: tx,
            handle: Mutex::new(handle),
            cancel_requested,
            options,
            completion: Mutex::new(Completion::Running(consumer)),
        })
    }

    /// Interrupt the runner, wait briefly, interrupt again if it is still
    /// alive, then abort every in-flight node.
    ///
    /// Returns false if the session was already cancelled. Cancelling a
    /// session whose runner already exited only settles node state.
    pub fn cancel(&self) -> bool {
        if self.cancel_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::debug!("cancelling run");

        self.signal(|h| h.interrupt());
        if !self.wait_for_exit(self.options.cancel_grace) {
            self.signal(|h| h.interrupt());
            if !self.wait_for_exit(self.options.cancel_grace) {
                tracing::warn!("runner ignored two interrupts, killing it");
                self.signal(|h| h.kill());
            }
        }

        let (ack_tx, ack_rx) = bounded(1);
        if self.events.send(SessionEvent::Cancel(ack_tx)).is_ok()
            && ack_rx.recv_timeout(ACK_TIMEOUT).is_err()
        {
            tracing::debug!("cancel was not acknowledged; session already finishing");
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Whether the runner has not exited yet.
    pub fn is_running(&self) -> bool {
        self.lock_handle().is_running()
    }

    /// Block until the consumer has settled the run.
    pub fn wait(&self) -> Result<RunReport> {
        let mut completion = self
            .completion
            .lock()
            .map_err(|_| Error::Internal("run session state poisoned".to_string()))?;

        if let Completion::Running(_) = &*completion
            && let Completion::Running(consumer) =
                std::mem::replace(&mut *completion, Completion::Lost)
        {
            match consumer.join() {
                Ok(report) => *completion = Completion::Finished(report),
                Err(_) => {
                    return Err(Error::Internal("run session consumer panicked".to_string()));
                }
            }
        }

        match &*completion {
            Completion::Finished(report) => Ok(report.clone()),
            _ => Err(Error::Internal("run session consumer panicked".to_string())),
        }
    }

    fn lock_handle(&self) -> MutexGuard<'_, Box<dyn ProcessHandle>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn signal(&self, f: impl FnOnce(&mut Box<dyn ProcessHandle>) -> std::io::Result<()>) {
        let mut handle = self.lock_handle();
        if let Err(e) = f(&mut *handle) {
            tracing::warn!("signalling runner failed: {}", e);
        }
    }

    fn wait_for_exit(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            if !self.is_running() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(EXIT_POLL);
        }
    }
}

fn consume(
    mut parser: StreamParser,
    rx: Receiver<SessionEvent>,
    cancel_requested: Arc<AtomicBool>,
    options: SessionOptions,
) -> RunReport {
    let started_at = Utc::now();
    let started = Instant::now();
    let mut cancelled = false;
    let mut exit = None;

    while let Ok(event) = rx.recv() {
        match event {
            SessionEvent::Output(chunk) => {
                if !cancelled {
                    parser.push_chunk(&chunk);
                    parser.process();
                }
            }
            SessionEvent::Cancel(ack) => {
                if !cancelled {
                    let aborted = parser.abort_in_flight();
                    tracing::debug!("cancelled: {} nodes aborted", aborted);
                    cancelled = true;
                }
                let _ = ack.send(());
            }
            SessionEvent::Exited(outcome) => {
                exit = Some(outcome);
                if cancelled || cancel_requested.load(Ordering::SeqCst) {
                    parser.abort_in_flight();
                    cancelled = true;
                } else {
                    parser.flush_at(Instant::now());
                    let settled = parser.finalize(outcome, options.fail_fast);
                    tracing::debug!("exit {:?}: {} nodes finalized", outcome, settled);
                }
                break;
            }
        }
    }

    if exit.is_none() {
        tracing::warn!("runner output ended without an exit status");
        parser.abort_in_flight();
    }

    let scope = parser.scope();
    RunReport {
        label: scope.label.clone(),
        started_at,
        elapsed_ms: started.elapsed().as_millis() as u64,
        exit,
        cancelled,
        counts: StatusCounts::of(parser.store(), scope.leaves.iter().map(String::as_str)),
        lines: parser.lines(),
    }
}

/// Owner of the single active session.
pub struct Orchestrator {
    launcher: Arc<dyn Launcher>,
    store: Arc<StatusStore>,
    active: Mutex<Option<Arc<RunSession>>>,
}

impl Orchestrator {
    pub fn new(launcher: Arc<dyn Launcher>, store: Arc<StatusStore>) -> Self {
        Self {
            launcher,
            store,
            active: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Start a run, first cancelling and draining any session still active.
    pub fn start(
        &self,
        invocation: &Invocation,
        scope: RunScope,
        options: SessionOptions,
    ) -> Result<Arc<RunSession>> {
        let mut active = self.lock_active()?;
        if let Some(previous) = active.take() {
            if previous.is_running() {
                tracing::debug!("replacing active run");
                previous.cancel();
            }
            previous.wait()?;
        }

        let session = Arc::new(RunSession::start(
            self.launcher.as_ref(),
            invocation,
            Arc::clone(&self.store),
            scope,
            options,
        )?);
        *active = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Cancel the active session, if any.
    pub fn cancel(&self) -> bool {
        match self.current() {
            Some(session) => session.cancel(),
            None => false,
        }
    }

    /// The active (or most recently finished) session.
    pub fn current(&self) -> Option<Arc<RunSession>> {
        self.lock_active().ok().and_then(|active| active.clone())
    }

    fn lock_active(&self) -> Result<MutexGuard<'_, Option<Arc<RunSession>>>> {
        self.active
            .lock()
            .map_err(|_| Error::Internal("orchestrator state poisoned".to_string()))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
