//! Integration tests for `TimerSet`.
//!
//! All tests run with a paused Tokio clock; the runtime auto-advances to
//! the next sleeping timer whenever every task is idle, so delays of
//! minutes resolve instantly and in deterministic order.

use std::time::Duration;

use pickban_timer::{Fired, TimerSet};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Grace(&'static str),
    Vote(u32),
}

#[derive(Debug)]
enum Event {
    Timer(Fired<Key>),
}

fn timer_set() -> (TimerSet<Key, Event>, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TimerSet::new(tx, Event::Timer), rx)
}

fn fired(event: Event) -> Fired<Key> {
    match event {
        Event::Timer(f) => f,
    }
}

#[tokio::test(start_paused = true)]
async fn test_schedule_fires_after_delay() {
    let (mut timers, mut rx) = timer_set();
    let start = Instant::now();

    timers.schedule(Key::Grace("a"), Duration::from_secs(5));
    assert!(timers.is_pending(&Key::Grace("a")));

    let f = fired(rx.recv().await.unwrap());
    assert_eq!(f.key, Key::Grace("a"));
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(timers.claim(&f));
    assert!(timers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timers_fire_in_deadline_order() {
    let (mut timers, mut rx) = timer_set();

    timers.schedule(Key::Vote(1), Duration::from_secs(60));
    timers.schedule(Key::Grace("a"), Duration::from_secs(5));

    assert_eq!(fired(rx.recv().await.unwrap()).key, Key::Grace("a"));
    assert_eq!(fired(rx.recv().await.unwrap()).key, Key::Vote(1));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_delivery() {
    let (mut timers, mut rx) = timer_set();

    timers.schedule(Key::Grace("a"), Duration::from_secs(5));
    assert!(timers.cancel(&Key::Grace("a")));
    assert!(!timers.cancel(&Key::Grace("a")), "second cancel finds nothing");

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err(), "cancelled timer must not fire");
}

#[tokio::test(start_paused = true)]
async fn test_reschedule_replaces_and_old_token_is_stale() {
    let (mut timers, mut rx) = timer_set();

    let first = timers.schedule(Key::Grace("a"), Duration::from_secs(5));
    let second = timers.schedule(Key::Grace("a"), Duration::from_secs(8));
    assert_ne!(first, second);
    assert_eq!(timers.len(), 1);

    let f = fired(rx.recv().await.unwrap());
    assert_eq!(f.id, second);

    let stale = Fired {
        key: Key::Grace("a"),
        id: first,
    };
    assert!(!timers.claim(&stale));
    assert!(timers.claim(&f));
}

#[tokio::test(start_paused = true)]
async fn test_claim_after_cancel_rejects_raced_event() {
    let (mut timers, mut rx) = timer_set();

    timers.schedule(Key::Grace("a"), Duration::from_secs(1));
    // Let the timer fire and queue its event before we cancel.
    tokio::time::sleep(Duration::from_secs(2)).await;
    timers.cancel(&Key::Grace("a"));

    let f = fired(rx.recv().await.unwrap());
    assert!(!timers.claim(&f), "event queued before cancel must be stale");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_where_matches_keys() {
    let (mut timers, _rx) = timer_set();

    timers.schedule(Key::Vote(1), Duration::from_secs(60));
    timers.schedule(Key::Vote(2), Duration::from_secs(60));
    timers.schedule(Key::Grace("a"), Duration::from_secs(5));

    let cancelled = timers.cancel_where(|k| matches!(k, Key::Vote(1)));

    assert_eq!(cancelled, 1);
    assert!(!timers.is_pending(&Key::Vote(1)));
    assert!(timers.is_pending(&Key::Vote(2)));
    assert!(timers.is_pending(&Key::Grace("a")));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_reports_due_instant() {
    let (mut timers, _rx) = timer_set();
    let before = Instant::now();

    timers.schedule(Key::Vote(7), Duration::from_secs(30));

    let due = timers.deadline(&Key::Vote(7)).unwrap();
    assert_eq!(due - before, Duration::from_secs(30));
    assert_eq!(timers.deadline(&Key::Vote(8)), None);
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_pending_timers() {
    let (mut timers, mut rx) = timer_set();
    timers.schedule(Key::Grace("a"), Duration::from_secs(5));

    drop(timers);
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Sender side is gone with the set's tasks, so recv yields None.
    assert!(rx.recv().await.is_none());
}
