//! Debounced event dispatcher.
//!
//! Every device backend funnels its accepted signals into one [`Dispatcher`].
//! The dispatcher owns two pieces of process-lifetime state:
//!
//! - the **debounce table**: last accepted instant per symbolic key, behind a
//!   `Mutex` so the read-compare-write of one key is atomic with respect to
//!   every other backend thread;
//! - the **subscriber registry**: symbolic key → subscribers in registration
//!   order, behind an `RwLock` since it is written at startup and read on
//!   every event.
//!
//! The bill acceptor and the custom buttons bounce electrically and emit the
//! same key several times within a few hundred milliseconds, so any repeat of
//! a key inside [`DEBOUNCE_WINDOW`] of its last accepted press is dropped.
//! The window is per key: pressing `"7"` never suppresses `"kp_7"`.
//!
//! Accepted events fan out to every subscriber of the key.  Each subscriber
//! runs on the Tokio blocking pool with no join, no cancellation and no
//! timeout; a slow or panicking subscriber cannot delay or break another.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use kiosk_core::{InputEvent, SymbolicKey};
use tokio::runtime::Handle;
use tracing::{debug, error, trace};

/// Minimum interval between two accepted presses of the same key.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// A consumer of input events.
///
/// Subscribers are shared across every key they were registered for and run
/// on arbitrary threads.
pub type Subscriber = Arc<dyn Fn(&InputEvent) + Send + Sync>;

/// Outcome of offering one event to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted and handed to this many subscribers.
    Dispatched(usize),
    /// Accepted (the debounce record was updated) but nobody subscribes to
    /// the key.
    Unsubscribed,
    /// Dropped: the key was last accepted `since` ago, inside the window.
    Debounced { since: Duration },
}

/// Debounced, concurrent fan-out from symbolic keys to subscribers.
pub struct Dispatcher {
    last_accepted: Mutex<HashMap<SymbolicKey, std::time::Instant>>,
    registry: RwLock<HashMap<SymbolicKey, Vec<Subscriber>>>,
    runtime: Handle,
}

impl Dispatcher {
    /// Creates a dispatcher whose subscribers run on `runtime`'s blocking
    /// pool.
    pub fn new(runtime: Handle) -> Self {
        Self {
            last_accepted: Mutex::new(HashMap::new()),
            registry: RwLock::new(HashMap::new()),
            runtime,
        }
    }

    /// Appends `subscriber` to each key in `keys`.
    ///
    /// Registration is additive; there is no unsubscribe.  A key listed more
    /// than once in the same call is registered once.
    pub fn register(&self, keys: &[SymbolicKey], subscriber: Subscriber) {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                continue;
            }
            registry
                .entry(key.clone())
                .or_default()
                .push(Arc::clone(&subscriber));
            trace!(%key, "subscriber registered");
        }
    }

    /// Number of subscribers registered for `key`.
    pub fn subscriber_count(&self, key: &SymbolicKey) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Offers `event` to the dispatcher and spawns every subscriber of its
    /// key on the blocking pool.  Returns without waiting for them.
    pub fn deliver(&self, event: InputEvent) -> Delivery {
        let subscribers = match self.admit(&event) {
            Ok(subscribers) => subscribers,
            Err(outcome) => return outcome,
        };

        let count = subscribers.len();
        for subscriber in subscribers {
            let event = event.clone();
            // Fire-and-forget: the JoinHandle is dropped on purpose.
            drop(self.runtime.spawn_blocking(move || subscriber(&event)));
        }
        Delivery::Dispatched(count)
    }

    /// Like [`deliver`](Self::deliver), but runs the subscribers one after
    /// another on the calling thread.  The debounce gate is identical.
    ///
    /// A panicking subscriber is logged and does not prevent the rest from
    /// running.
    pub fn deliver_inline(&self, event: InputEvent) -> Delivery {
        let subscribers = match self.admit(&event) {
            Ok(subscribers) => subscribers,
            Err(outcome) => return outcome,
        };

        let count = subscribers.len();
        for subscriber in subscribers {
            if panic::catch_unwind(AssertUnwindSafe(|| subscriber(&event))).is_err() {
                error!(key = %event.key, "subscriber panicked");
            }
        }
        Delivery::Dispatched(count)
    }

    /// Debounce gate followed by a registry snapshot.
    ///
    /// The debounce lock is released before the registry is read, so
    /// subscribers never run while any dispatcher lock is held.
    fn admit(&self, event: &InputEvent) -> Result<Vec<Subscriber>, Delivery> {
        {
            let mut table = self
                .last_accepted
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(last) = table.get(&event.key) {
                let since = event.timestamp.saturating_duration_since(*last);
                if since < DEBOUNCE_WINDOW {
                    debug!(
                        key = %event.key,
                        raw_code = event.raw_code,
                        since_ms = since.as_millis() as u64,
                        "debounced"
                    );
                    return Err(Delivery::Debounced { since });
                }
            }
            table.insert(event.key.clone(), event.timestamp);
        }

        let subscribers = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.key)
            .cloned()
            .unwrap_or_default();

        if subscribers.is_empty() {
            trace!(key = %event.key, "no subscribers");
            return Err(Delivery::Unsubscribed);
        }
        debug!(key = %event.key, raw_code = event.raw_code, subscribers = subscribers.len(), "dispatching");
        Ok(subscribers)
    }
}
