// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh coalescing.
//!
//! Store mutations arrive far faster than a view can redraw. The
//! [`RefreshThrottle`] decides, for each request, whether to fire now or
//! defer to a single delayed flush; the [`Refresher`] drives it from a
//! store subscription on its own thread.

use std::collections::BTreeSet;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, at, bounded, never, select};

use crate::error::{Error, Result};
use crate::status::StatusChange;

/// Outcome of [`RefreshThrottle::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Fire immediately.
    FireNow,
    /// Fired too recently; a flush was scheduled this far in the future.
    ScheduleIn(Duration),
    /// A flush is already pending and will cover this request.
    AlreadyScheduled,
}

/// Fires at most once per interval.
#[derive(Debug, Clone)]
pub struct RefreshThrottle {
    interval: Duration,
    last_fired: Option<Instant>,
    scheduled: Option<Instant>,
}

impl RefreshThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
            scheduled: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Register a refresh request at `now`.
    pub fn request(&mut self, now: Instant) -> RefreshDecision {
        if self.scheduled.is_some() {
            return RefreshDecision::AlreadyScheduled;
        }
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                let deadline = last + self.interval;
                self.scheduled = Some(deadline);
                RefreshDecision::ScheduleIn(deadline.saturating_duration_since(now))
            }
            _ => {
                self.last_fired = Some(now);
                RefreshDecision::FireNow
            }
        }
    }

    /// Deadline of the pending flush, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.scheduled
    }

    /// Consume the pending flush if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.scheduled {
            Some(deadline) if now >= deadline => {
                self.scheduled = None;
                self.last_fired = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Consume the pending flush regardless of its deadline.
    pub fn take_pending(&mut self, now: Instant) -> bool {
        if self.scheduled.take().is_some() {
            self.last_fired = Some(now);
            true
        } else {
            false
        }
    }
}

/// Changes accumulated since the previous refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshBatch {
    /// Store generation of the newest change in the batch.
    pub generation: u64,
    /// Paths touched since the previous refresh.
    pub paths: BTreeSet<String>,
    /// The store was cleared since the previous refresh.
    pub cleared: bool,
}

impl RefreshBatch {
    fn record(&mut self, change: StatusChange) {
        self.generation = self.generation.max(change.generation);
        if change.path.is_empty() {
            self.cleared = true;
        } else {
            self.paths.insert(change.path);
        }
    }

    fn is_empty(&self) -> bool {
        self.paths.is_empty() && !self.cleared
    }
}

/// Background thread turning store notifications into throttled refreshes.
pub struct Refresher {
    stop: Sender<()>,
    handle: JoinHandle<usize>,
}

impl Refresher {
    /// Start coalescing `changes`, invoking `on_refresh` at most once per
    /// `interval`.
    pub fn spawn<F>(changes: Receiver<StatusChange>, interval: Duration, on_refresh: F) -> Self
    where
        F: FnMut(&RefreshBatch) + Send + 'static,
    {
        let (stop, stopped) = bounded(1);
        let handle =
            std::thread::spawn(move || coalesce(changes, stopped, interval, on_refresh));
        Self { stop, handle }
    }

    /// Flush anything pending and stop. Returns the number of refreshes fired.
    pub fn stop(self) -> Result<usize> {
        let _ = self.stop.send(());
        self.handle
            .join()
            .map_err(|_| Error::Internal("refresh thread panicked".to_string()))
    }
}

fn coalesce<F>(
    changes: Receiver<StatusChange>,
    stopped: Receiver<()>,
    interval: Duration,
    mut on_refresh: F,
) -> usize
where
    F: FnMut(&RefreshBatch),
{
    let mut throttle = RefreshThrottle::new(interval);
    let mut batch = RefreshBatch::default();
    let mut fired = 0;

    let mut fire = |batch: &mut RefreshBatch, fired: &mut usize| {
        if !batch.is_empty() {
            on_refresh(batch);
            *fired += 1;
        }
        *batch = RefreshBatch::default();
    };

    loop {
        let timer = match throttle.deadline() {
            Some(deadline) => at(deadline),
            None => never(),
        };
        select! {
            recv(changes) -> msg => match msg {
                Ok(change) => {
                    batch.record(change);
                    if throttle.request(Instant::now()) == RefreshDecision::FireNow {
                        fire(&mut batch, &mut fired);
                    }
                }
                Err(_) => break,
            },
            recv(timer) -> _ => {
                if throttle.take_due(Instant::now()) {
                    fire(&mut batch, &mut fired);
                }
            }
            recv(stopped) -> _ => break,
        }
    }

    // Drain notifications already queued so the final flush is complete.
    while let Ok(change) = changes.try_recv() {
        batch.record(change);
    }
    throttle.take_pending(Instant::now());
    fire(&mut batch, &mut fired);
    tracing::debug!("refresher stopped after {} refreshes", fired);
    fired
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
