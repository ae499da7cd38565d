// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};

use super::*;
use crate::status::{Status, StatusStore};

const INTERVAL: Duration = Duration::from_millis(200);

#[test]
fn first_request_fires_immediately() {
    let mut throttle = RefreshThrottle::new(INTERVAL);
    assert_eq!(throttle.request(Instant::now()), RefreshDecision::FireNow);
    assert_eq!(throttle.deadline(), None);
}

#[test]
fn request_within_interval_schedules_one_flush() {
    let mut throttle = RefreshThrottle::new(INTERVAL);
    let t0 = Instant::now();
    throttle.request(t0);

    assert_eq!(
        throttle.request(t0 + Duration::from_millis(50)),
        RefreshDecision::ScheduleIn(Duration::from_millis(150))
    );
    assert_eq!(
        throttle.request(t0 + Duration::from_millis(60)),
        RefreshDecision::AlreadyScheduled
    );
    assert_eq!(throttle.deadline(), Some(t0 + INTERVAL));
}

#[test]
fn scheduled_flush_is_due_at_its_deadline() {
    let mut throttle = RefreshThrottle::new(INTERVAL);
    let t0 = Instant::now();
    throttle.request(t0);
    throttle.request(t0 + Duration::from_millis(10));

    assert!(!throttle.take_due(t0 + Duration::from_millis(199)));
    assert!(throttle.take_due(t0 + INTERVAL));
    assert!(!throttle.take_due(t0 + INTERVAL));
    assert_eq!(throttle.deadline(), None);

    // The flush counts as a firing.
    assert!(matches!(
        throttle.request(t0 + Duration::from_millis(250)),
        RefreshDecision::ScheduleIn(_)
    ));
}

#[test]
fn request_after_interval_fires_again() {
    let mut throttle = RefreshThrottle::new(INTERVAL);
    let t0 = Instant::now();
    throttle.request(t0);
    assert_eq!(throttle.request(t0 + INTERVAL), RefreshDecision::FireNow);
}

#[test]
fn take_pending_ignores_deadline() {
    let mut throttle = RefreshThrottle::new(INTERVAL);
    let t0 = Instant::now();
    assert!(!throttle.take_pending(t0));
    throttle.request(t0);
    throttle.request(t0);
    assert!(throttle.take_pending(t0));
    assert_eq!(throttle.deadline(), None);
}

#[test]
fn zero_interval_never_defers() {
    let mut throttle = RefreshThrottle::new(Duration::ZERO);
    let t0 = Instant::now();
    for _ in 0..3 {
        assert_eq!(throttle.request(t0), RefreshDecision::FireNow);
    }
}

#[test]
fn refresher_coalesces_bursts() {
    let store = StatusStore::new();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let refresher = {
        let batches = Arc::clone(&batches);
        Refresher::spawn(store.subscribe(), Duration::from_secs(60), move |batch| {
            batches.lock().unwrap().push(batch.clone());
        })
    };

    for i in 0..50 {
        store.set_status(&format!("pkg.test_mod.test_{i}"), Status::Passed);
    }
    let fired = refresher.stop().unwrap();

    let batches = batches.lock().unwrap();
    assert_eq!(fired, batches.len());
    assert!(batches.len() <= 2, "fired {} times", batches.len());
    let seen: BTreeSet<String> = batches.iter().flat_map(|b| b.paths.clone()).collect();
    assert_eq!(seen.len(), 50);
    assert_eq!(batches.last().unwrap().generation, store.generation());
}

#[test]
fn refresher_flushes_after_interval() {
    let store = StatusStore::new();
    let (tx, rx) = crossbeam_channel::unbounded();
    let refresher = Refresher::spawn(store.subscribe(), Duration::from_millis(20), move |batch| {
        let _ = tx.send(batch.clone());
    });

    store.set_status("a.test_x", Status::Running);
    store.set_status("a.test_x", Status::Passed);

    let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(first.paths.contains("a.test_x"));
    let mut latest = first.generation;
    while latest < store.generation() {
        latest = rx.recv_timeout(Duration::from_secs(2)).unwrap().generation;
    }
    assert_eq!(latest, store.generation());
    refresher.stop().unwrap();
}

#[test]
fn clear_is_reported() {
    let store = StatusStore::new();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let refresher = {
        let batches = Arc::clone(&batches);
        Refresher::spawn(store.subscribe(), Duration::from_secs(60), move |batch| {
            batches.lock().unwrap().push(batch.clone());
        })
    };
    store.clear();
    refresher.stop().unwrap();
    assert!(batches.lock().unwrap().iter().any(|b| b.cleared));
}

#[test]
fn idle_refresher_fires_nothing() {
    let store = StatusStore::new();
    let refresher = Refresher::spawn(store.subscribe(), INTERVAL, |_| panic!("no changes"));
    assert_eq!(refresher.stop().unwrap(), 0);
}
