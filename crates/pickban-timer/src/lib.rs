//! Keyed one-shot timers for pickban.
//!
//! The hub needs three kinds of deadline: a session's reconnection grace
//! period, a finished draft's game duration, and the voting window. Each
//! one is a single delayed event, may need to be cancelled, and must be
//! delivered back into the hub's own event queue so it is processed in
//! order with client requests.
//!
//! [`TimerSet`] does exactly that. Every scheduled timer is a Tokio task
//! that sleeps and then sends a [`Fired`] token, wrapped into the hub's
//! event type, down an mpsc channel.
//!
//! # Freshness
//!
//! Aborting a task cannot recall an event it already queued. Each timer
//! therefore carries a unique id, and the receiver calls
//! [`TimerSet::claim`] before acting. `claim` only succeeds for the timer
//! currently registered under that key, so events from cancelled or
//! replaced timers are dropped.
//!
//! # Integration
//!
//! ```ignore
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let mut timers = TimerSet::new(tx, HubEvent::Timer);
//! timers.schedule(TimerKey::Grace(session_id), grace);
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         HubEvent::Timer(fired) if timers.claim(&fired) => { /* act */ }
//!         HubEvent::Timer(_) => { /* stale, ignore */ }
//!         _ => {}
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Fired token
// ---------------------------------------------------------------------------

/// Unique id of one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Delivered when a timer's delay elapses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<K> {
    /// The key the timer was scheduled under.
    pub key: K,
    /// Which scheduling of that key fired.
    pub id: TimerId,
}

// ---------------------------------------------------------------------------
// TimerSet
// ---------------------------------------------------------------------------

struct Pending {
    id: TimerId,
    deadline: Instant,
    handle: AbortHandle,
}

/// A set of pending one-shot timers, at most one per key.
///
/// Dropping the set aborts every pending timer.
pub struct TimerSet<K, E> {
    pending: HashMap<K, Pending>,
    events: mpsc::UnboundedSender<E>,
    wrap: fn(Fired<K>) -> E,
    next_id: u64,
}

impl<K, E> TimerSet<K, E>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    E: Send + 'static,
{
    /// Creates an empty set. Fired timers are sent to `events` after
    /// being converted by `wrap`.
    pub fn new(events: mpsc::UnboundedSender<E>, wrap: fn(Fired<K>) -> E) -> Self {
        Self {
            pending: HashMap::new(),
            events,
            wrap,
            next_id: 1,
        }
    }

    /// Schedules `key` to fire after `delay`.
    ///
    /// An existing timer under the same key is cancelled first.
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&mut self, key: K, delay: Duration) -> TimerId {
        self.cancel(&key);

        let id = TimerId(self.next_id);
        self.next_id += 1;

        let deadline = Instant::now() + delay;
        let tx = self.events.clone();
        let event = (self.wrap)(Fired {
            key: key.clone(),
            id,
        });
        let task = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            // Receiver gone means the owner shut down; nothing to do.
            let _ = tx.send(event);
        });

        debug!(?key, %id, delay_ms = delay.as_millis() as u64, "timer scheduled");
        self.pending.insert(
            key,
            Pending {
                id,
                deadline,
                handle: task.abort_handle(),
            },
        );
        id
    }

    /// Cancels the timer under `key`. Returns `true` if one was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(pending) => {
                pending.handle.abort();
                debug!(?key, id = %pending.id, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every timer whose key matches `pred`. Returns how many.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let keys: Vec<K> = self.pending.keys().filter(|k| pred(k)).cloned().collect();
        for key in &keys {
            self.cancel(key);
        }
        keys.len()
    }

    /// Accepts a fired token if it belongs to the timer currently
    /// registered under its key, and forgets that timer.
    ///
    /// Returns `false` for tokens of cancelled or replaced timers.
    pub fn claim(&mut self, fired: &Fired<K>) -> bool {
        match self.pending.get(&fired.key) {
            Some(pending) if pending.id == fired.id => {
                self.pending.remove(&fired.key);
                trace!(key = ?fired.key, id = %fired.id, "timer claimed");
                true
            }
            _ => {
                debug!(key = ?fired.key, id = %fired.id, "stale timer event dropped");
                false
            }
        }
    }

    /// Whether a timer is pending under `key`.
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// When the timer under `key` is due, if one is pending.
    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.pending.get(key).map(|p| p.deadline)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<K, E> Drop for TimerSet<K, E> {
    fn drop(&mut self) {
        for pending in self.pending.values() {
            pending.handle.abort();
        }
    }
}
