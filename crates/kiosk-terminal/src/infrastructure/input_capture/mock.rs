//! Mock input backend for unit and integration testing.
//!
//! Allows tests to inject raw key codes through a real key table without
//! opening any device or X connection.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use kiosk_core::{EvdevKeyMap, InputEvent, KeyCodeMap, SymbolicKey};

use super::{CaptureError, InputBackend};
use crate::application::dispatch::{Delivery, Dispatcher, Subscriber};

/// A mock implementation of [`InputBackend`] that allows tests to inject
/// key presses.
pub struct MockBackend {
    dispatcher: Arc<Dispatcher>,
    keymap: Box<dyn KeyCodeMap>,
    start_count: AtomicU32,
    stop_count: AtomicU32,
}

impl MockBackend {
    /// Creates a mock backend resolving codes with the evdev table.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self::with_keymap(dispatcher, Box::new(EvdevKeyMap))
    }

    /// Creates a mock backend resolving codes with `keymap`.
    pub fn with_keymap(dispatcher: Arc<Dispatcher>, keymap: Box<dyn KeyCodeMap>) -> Self {
        Self {
            dispatcher,
            keymap,
            start_count: AtomicU32::new(0),
            stop_count: AtomicU32::new(0),
        }
    }

    /// Injects a press of `code` now, as if read from a device.  Subscribers
    /// run on the blocking pool.
    ///
    /// Returns `None` when the table does not map `code`.
    pub fn inject_code(&self, code: u16) -> Option<Delivery> {
        self.inject_at(code, Instant::now())
    }

    /// Injects a press of `code` stamped with `timestamp`.
    pub fn inject_at(&self, code: u16, timestamp: Instant) -> Option<Delivery> {
        let key = self.keymap.resolve(code)?;
        Some(self.dispatcher.deliver(InputEvent::at(key, i32::from(code), timestamp)))
    }

    /// Like [`inject_at`](Self::inject_at), but subscribers run on the
    /// calling thread before this returns.
    pub fn inject_inline_at(&self, code: u16, timestamp: Instant) -> Option<Delivery> {
        let key = self.keymap.resolve(code)?;
        Some(
            self.dispatcher
                .deliver_inline(InputEvent::at(key, i32::from(code), timestamp)),
        )
    }

    /// Returns the number of times [`start_listening`](InputBackend::start_listening) was called.
    pub fn start_count(&self) -> u32 {
        self.start_count.load(Ordering::SeqCst)
    }

    /// Returns the number of times [`stop`](InputBackend::stop) was called.
    pub fn stop_count(&self) -> u32 {
        self.stop_count.load(Ordering::SeqCst)
    }
}

impl InputBackend for MockBackend {
    fn register(&self, keys: &[SymbolicKey], subscriber: Subscriber) {
        self.dispatcher.register(keys, subscriber);
    }

    fn simulate_signal(&self, key: &SymbolicKey) -> Delivery {
        self.dispatcher.deliver_inline(InputEvent::simulated(key.clone()))
    }

    fn start_listening(&self) -> Result<(), CaptureError> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::HookKeyMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn recording(backend: &MockBackend, keys: &[&'static str]) -> Arc<Mutex<Vec<(SymbolicKey, i32)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let keys: Vec<SymbolicKey> = keys.iter().map(|k| SymbolicKey::from(*k)).collect();
        backend.register(
            &keys,
            Arc::new(move |e: &InputEvent| s.lock().unwrap().push((e.key.clone(), e.raw_code))),
        );
        seen
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_injected_code_resolves_through_evdev_table() {
        // Arrange
        let backend = MockBackend::new(Arc::new(Dispatcher::new(Handle::current())));
        let seen = recording(&backend, &["kp_7"]);

        // Act
        let outcome = backend.inject_inline_at(85, Instant::now());

        // Assert
        assert_eq!(outcome, Some(Delivery::Dispatched(1)));
        assert_eq!(*seen.lock().unwrap(), vec![(SymbolicKey::from("kp_7"), 85)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unmapped_code_is_not_delivered() {
        let backend = MockBackend::new(Arc::new(Dispatcher::new(Handle::current())));

        assert_eq!(backend.inject_code(999), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_custom_keymap_is_used() {
        // Arrange: hook table, where 79 is kp_7 instead of evdev's kp_1.
        let backend = MockBackend::with_keymap(
            Arc::new(Dispatcher::new(Handle::current())),
            Box::new(HookKeyMap::new()),
        );
        let seen = recording(&backend, &["kp_7"]);

        // Act
        backend.inject_inline_at(79, Instant::now());

        // Assert
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_injected_bounce_is_debounced() {
        let backend = MockBackend::new(Arc::new(Dispatcher::new(Handle::current())));
        let _seen = recording(&backend, &["y"]);
        let t0 = Instant::now();

        backend.inject_inline_at(21, t0);
        let bounce = backend.inject_inline_at(21, t0 + Duration::from_millis(10));

        assert!(matches!(bounce, Some(Delivery::Debounced { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_and_stop_are_counted() {
        let backend = MockBackend::new(Arc::new(Dispatcher::new(Handle::current())));

        backend.start_listening().expect("mock start never fails");
        backend.start_listening().expect("mock start never fails");
        backend.stop();

        assert_eq!(backend.start_count(), 2);
        assert_eq!(backend.stop_count(), 1);
    }
}
