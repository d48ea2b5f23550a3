//! Integration tests for the key-press path: raw code → key table →
//! debounce → hot keys and cash recognizer.
//!
//! These tests exercise the public API of `kiosk_terminal` end to end with
//! the mock backend and recording sinks.  No device or X server is needed.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use kiosk_core::{DenominationTable, HookKeyMap, SymbolicKey};
use kiosk_terminal::application::cash::CashRecognizer;
use kiosk_terminal::application::dispatch::{Delivery, Dispatcher};
use kiosk_terminal::application::hotkeys::{default_bindings, register_hotkeys, ActionExecutor};
use kiosk_terminal::infrastructure::browser::{BrowserError, BrowserSink};
use kiosk_terminal::infrastructure::input_capture::mock::MockBackend;
use kiosk_terminal::infrastructure::input_capture::InputBackend;
use kiosk_terminal::infrastructure::os_command::{CommandError, OsCommand};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

// ── Test doubles ──────────────────────────────────────────────────────────────

struct ChannelBrowser(UnboundedSender<String>);

#[async_trait]
impl BrowserSink for ChannelBrowser {
    async fn evaluate(&self, script: &str) -> Result<(), BrowserError> {
        let _ = self.0.send(script.to_string());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let _ = self.0.send(url.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingOs {
    numlock: Mutex<Vec<bool>>,
}

impl OsCommand for RecordingOs {
    fn set_numlock(&self, enabled: bool) -> Result<(), CommandError> {
        self.numlock.lock().unwrap().push(enabled);
        Ok(())
    }

    fn set_keyboard_lock(&self, _locked: bool) -> Result<(), CommandError> {
        Ok(())
    }
}

struct Terminal {
    backend: MockBackend,
    executor: Arc<ActionExecutor>,
    scripts: UnboundedReceiver<String>,
    credited: Arc<Mutex<Vec<u32>>>,
}

/// Builds the same subscriber set as the binary, over a mock backend.
fn terminal(backend: MockBackend) -> Terminal {
    let (tx, scripts) = unbounded_channel();
    let executor = Arc::new(ActionExecutor::new(
        Arc::new(ChannelBrowser(tx)),
        Arc::new(RecordingOs::default()),
        Handle::current(),
        Arc::new(AtomicBool::new(false)),
    ));
    register_hotkeys(&backend, &default_bindings(), Arc::clone(&executor));

    let credited = Arc::new(Mutex::new(Vec::new()));
    let c = Arc::clone(&credited);
    CashRecognizer::new(
        DenominationTable::default_brl(),
        Arc::new(move |amount: u32| c.lock().unwrap().push(amount)),
    )
    .register(&backend);

    Terminal {
        backend,
        executor,
        scripts,
        credited,
    }
}

fn evdev_terminal() -> Terminal {
    terminal(MockBackend::new(Arc::new(Dispatcher::new(Handle::current()))))
}

async fn next_script(rx: &mut UnboundedReceiver<String>) -> String {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("script within timeout")
        .expect("channel open")
}

// ── Cash ──────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_top_row_seven_and_keypad_seven_each_credit_one_hundred() {
    // Arrange: evdev code 8 is "7", code 85 is "kp_7".
    let t = evdev_terminal();
    let t0 = Instant::now();

    // Act
    let top = t.backend.inject_inline_at(8, t0);
    let keypad = t.backend.inject_inline_at(85, t0 + Duration::from_millis(5));

    // Assert
    assert_eq!(top, Some(Delivery::Dispatched(1)));
    assert_eq!(keypad, Some(Delivery::Dispatched(1)));
    assert_eq!(*t.credited.lock().unwrap(), vec![100, 100]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hook_table_credits_keypad_notes() {
    // Hook code 83 is kp_4 (R$10), 90 is kp_0 (unbound).
    let t = terminal(MockBackend::with_keymap(
        Arc::new(Dispatcher::new(Handle::current())),
        Box::new(HookKeyMap::new()),
    ));
    let t0 = Instant::now();

    t.backend.inject_inline_at(83, t0);
    let unbound = t.backend.inject_inline_at(90, t0);

    assert_eq!(unbound, Some(Delivery::Unsubscribed));
    assert_eq!(*t.credited.lock().unwrap(), vec![10]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bill_acceptor_burst_credits_one_note() {
    let t = evdev_terminal();
    let t0 = Instant::now();

    for ms in [0, 30, 60, 90, 120] {
        t.backend.inject_inline_at(7, t0 + Duration::from_millis(ms));
    }

    // Evdev code 7 is "6", the R$50 key.
    assert_eq!(*t.credited.lock().unwrap(), vec![50]);
}

// ── Hot keys ──────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_hotkey_bounce_at_ten_ms_is_dropped_and_at_six_hundred_ms_accepted() {
    // Arrange: evdev code 21 is "y".
    let mut t = evdev_terminal();
    let t0 = Instant::now();

    // Act
    let first = t.backend.inject_inline_at(21, t0);
    let bounce = t.backend.inject_inline_at(21, t0 + Duration::from_millis(10));
    let again = t.backend.inject_inline_at(21, t0 + Duration::from_millis(600));

    // Assert
    assert_eq!(first, Some(Delivery::Dispatched(1)));
    assert_eq!(
        bounce,
        Some(Delivery::Debounced {
            since: Duration::from_millis(10)
        })
    );
    assert_eq!(again, Some(Delivery::Dispatched(1)));
    for _ in 0..2 {
        assert!(next_script(&mut t.scripts).await.contains("openModalDeposit"));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(t.scripts.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_up_and_o_both_change_game() {
    // Evdev code 103 is "up", 24 is "o".
    let mut t = evdev_terminal();

    t.backend.inject_code(103);
    t.backend.inject_code(24);

    for _ in 0..2 {
        assert!(next_script(&mut t.scripts).await.contains("changeGame"));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_simulated_close_key_requests_shutdown() {
    let t = evdev_terminal();

    let outcome = t.backend.simulate_signal(&SymbolicKey::from("f"));

    assert_eq!(outcome, Delivery::Dispatched(1));
    assert!(t.executor.shutdown_requested());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extra_subscriber_runs_alongside_defaults() {
    // Arrange: a second subscriber on a key the hot-key table already uses.
    let mut t = evdev_terminal();
    let seen = Arc::new(Mutex::new(0u32));
    let s = Arc::clone(&seen);
    t.backend.register(
        &[SymbolicKey::from(" ")],
        Arc::new(move |_: &kiosk_core::InputEvent| *s.lock().unwrap() += 1),
    );

    // Act
    let outcome = t.backend.simulate_signal(&SymbolicKey::from(" "));

    // Assert
    assert_eq!(outcome, Delivery::Dispatched(2));
    assert_eq!(*seen.lock().unwrap(), 1);
    assert!(next_script(&mut t.scripts).await.contains("startGame"));
}
