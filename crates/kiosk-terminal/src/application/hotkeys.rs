//! Hot-key command registry.
//!
//! Maps symbolic keys to kiosk actions: browser events for the front end,
//! page navigation, OS toggles (NumLock, Alt+F4 lock) and program shutdown.
//! Each binding becomes one dispatcher subscriber; the subscriber hands its
//! action to the shared [`ActionExecutor`].
//!
//! Action failures are logged at `warn` and dropped.  Nothing is retried
//! and nothing reaches the input path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kiosk_core::{InputEvent, SymbolicKey};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::infrastructure::browser::{dispatch_event_script, BrowserSink};
use crate::infrastructure::input_capture::InputBackend;
use crate::infrastructure::os_command::OsCommand;

/// What a hot key does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyAction {
    /// Dispatch a DOM event with this name on the page's `window`.
    BrowserEvent(String),
    /// Navigate the page to this URL.
    Navigate(String),
    SetNumLock(bool),
    /// `true` disables Alt+F4.
    KeyboardLock(bool),
    /// Request process shutdown.
    CloseProgram,
}

/// One or more keys bound to one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub keys: Vec<SymbolicKey>,
    pub action: HotkeyAction,
}

impl HotkeyBinding {
    pub fn new(keys: &[&'static str], action: HotkeyAction) -> Self {
        Self {
            keys: keys.iter().copied().map(SymbolicKey::from_static).collect(),
            action,
        }
    }

    fn browser_event(keys: &[&'static str], event: &str) -> Self {
        Self::new(keys, HotkeyAction::BrowserEvent(event.to_string()))
    }
}

/// The terminal's built-in hot keys.
pub fn default_bindings() -> Vec<HotkeyBinding> {
    vec![
        HotkeyBinding::browser_event(&["y"], "openModalDeposit"),
        // "g" is gotoHome only; changeGame is reached through "up" and "o".
        HotkeyBinding::browser_event(&["g"], "gotoHome"),
        HotkeyBinding::browser_event(&["j"], "openModalWithdrawall"),
        HotkeyBinding::browser_event(&["r"], "confirmWithdrawal"),
        HotkeyBinding::browser_event(&["b"], "openReport"),
        HotkeyBinding::browser_event(&["="], "increaseBet"),
        HotkeyBinding::browser_event(&["-"], "decreaseBet"),
        HotkeyBinding::browser_event(&["up", "o"], "changeGame"),
        HotkeyBinding::browser_event(&[" "], "startGame"),
        HotkeyBinding::new(&["f"], HotkeyAction::CloseProgram),
    ]
}

/// Runs [`HotkeyAction`]s against the browser and the OS.
///
/// Browser calls are spawned on `runtime` and not awaited, so a subscriber
/// thread never blocks on the page.  OS commands run on the calling thread.
pub struct ActionExecutor {
    browser: Arc<dyn BrowserSink>,
    os: Arc<dyn OsCommand>,
    runtime: Handle,
    shutdown: Arc<AtomicBool>,
}

impl ActionExecutor {
    pub fn new(
        browser: Arc<dyn BrowserSink>,
        os: Arc<dyn OsCommand>,
        runtime: Handle,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            browser,
            os,
            runtime,
            shutdown,
        }
    }

    /// Whether a [`HotkeyAction::CloseProgram`] has run.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Process exit status: `1` once the close key has run, `0` otherwise.
    ///
    /// A supervisor sees a close from the keypad as a failed exit, unlike
    /// an operator's Ctrl-C.
    pub fn exit_status(&self) -> u8 {
        u8::from(self.shutdown_requested())
    }

    pub fn execute(&self, action: &HotkeyAction) {
        match action {
            HotkeyAction::BrowserEvent(event) => {
                let browser = Arc::clone(&self.browser);
                let script = dispatch_event_script(event);
                let event = event.clone();
                drop(self.runtime.spawn(async move {
                    if let Err(e) = browser.evaluate(&script).await {
                        warn!(%event, "browser event failed: {e}");
                    }
                }));
            }
            HotkeyAction::Navigate(url) => {
                let browser = Arc::clone(&self.browser);
                let url = url.clone();
                drop(self.runtime.spawn(async move {
                    if let Err(e) = browser.navigate(&url).await {
                        warn!(%url, "navigation failed: {e}");
                    }
                }));
            }
            HotkeyAction::SetNumLock(enabled) => {
                if let Err(e) = self.os.set_numlock(*enabled) {
                    warn!(enabled, "NumLock toggle failed: {e}");
                }
            }
            HotkeyAction::KeyboardLock(locked) => {
                if let Err(e) = self.os.set_keyboard_lock(*locked) {
                    warn!(locked, "keyboard lock toggle failed: {e}");
                }
            }
            HotkeyAction::CloseProgram => {
                info!("close requested from keyboard");
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Registers one subscriber per binding on `backend`.
pub fn register_hotkeys(
    backend: &dyn InputBackend,
    bindings: &[HotkeyBinding],
    executor: Arc<ActionExecutor>,
) {
    for binding in bindings {
        let action = binding.action.clone();
        let executor = Arc::clone(&executor);
        backend.register(
            &binding.keys,
            Arc::new(move |event: &InputEvent| {
                debug!(key = %event.key, ?action, "hot key");
                executor.execute(&action);
            }),
        );
    }
    info!(bindings = bindings.len(), "hot keys registered");
}
