//! X11 global keyboard hook built on the RECORD extension.
//!
//! The RECORD extension lets a client observe every device event the X
//! server processes, regardless of which window has focus.  Two display
//! connections are used:
//!
//! - the **data** connection, on which `XRecordEnableContext` blocks for the
//!   lifetime of the hook and invokes [`record_callback`] per intercepted
//!   event;
//! - the **control** connection, which creates the record context and is
//!   handed to the callback for keycode → keysym lookups.
//!
//! Both live on one dedicated thread.  The callback only decodes the raw
//! record and pushes it into a channel; a second thread resolves the key and
//! hands it to the dispatcher, so the X event stream is never held up by key
//! resolution or dispatch.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Xlib FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "linux")]

use std::os::raw::{c_char, c_int, c_uchar, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use kiosk_core::{HookKeyMap, InputEvent, SymbolicKey};
use tracing::{debug, error, info, trace};
use x11::{xlib, xrecord};

use super::{CaptureError, InputBackend};
use crate::application::dispatch::{Delivery, Dispatcher, Subscriber};

/// A key press as decoded inside the RECORD callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HookRecord {
    keycode: u8,
    keychar: Option<char>,
}

/// Global sender used by the RECORD callback to deliver key records.
/// Filled once the record context is enabled; stays empty after a failed
/// start so the next attempt can install its own.
static RECORD_SENDER: Mutex<Option<Sender<HookRecord>>> = Mutex::new(None);

/// Cleared by `stop()`; the callback drops records while it is `false`.
static HOOK_ACTIVE: AtomicBool = AtomicBool::new(false);

/// How often the consumer thread re-checks the stop flag while idle.
const CONSUMER_POLL: Duration = Duration::from_millis(200);

fn record_sender() -> MutexGuard<'static, Option<Sender<HookRecord>>> {
    RECORD_SENDER.lock().unwrap_or_else(PoisonError::into_inner)
}

/// X11 RECORD-based input backend.
pub struct X11HookBackend {
    dispatcher: Arc<Dispatcher>,
    keymap: HookKeyMap,
    started: AtomicBool,
    running: Arc<AtomicBool>,
}

impl X11HookBackend {
    /// Creates an unstarted hook backend.  No X connection is made until
    /// [`start_listening`](InputBackend::start_listening).
    pub fn new(dispatcher: Arc<Dispatcher>, keymap: HookKeyMap) -> Self {
        Self {
            dispatcher,
            keymap,
            started: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    fn start(&self) -> Result<(), CaptureError> {
        // A record thread, once enabled, stays parked until process exit.
        if record_sender().is_some() {
            return Err(CaptureError::RecordUnavailable(
                "a keyboard hook is already running in this process".to_string(),
            ));
        }

        // The hook thread reports whether the context could be enabled.
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();
        thread::Builder::new()
            .name("kiosk-x11-record".to_string())
            .spawn(move || run_record_loop(&ready_tx))
            .map_err(|e| CaptureError::ThreadSpawn(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(CaptureError::RecordUnavailable(
                    "record thread exited during setup".to_string(),
                ));
            }
        }

        let (tx, rx) = mpsc::channel::<HookRecord>();
        *record_sender() = Some(tx);
        HOOK_ACTIVE.store(true, Ordering::SeqCst);

        let dispatcher = Arc::clone(&self.dispatcher);
        let running = Arc::clone(&self.running);
        let keymap = self.keymap;
        thread::Builder::new()
            .name("kiosk-x11-consumer".to_string())
            .spawn(move || consume_records(&rx, &keymap, &dispatcher, &running))
            .map_err(|e| {
                HOOK_ACTIVE.store(false, Ordering::SeqCst);
                CaptureError::ThreadSpawn(e.to_string())
            })?;

        info!("X11 keyboard hook active");
        Ok(())
    }
}

impl InputBackend for X11HookBackend {
    fn register(&self, keys: &[SymbolicKey], subscriber: Subscriber) {
        self.dispatcher.register(keys, subscriber);
    }

    fn simulate_signal(&self, key: &SymbolicKey) -> Delivery {
        self.dispatcher.deliver_inline(InputEvent::simulated(key.clone()))
    }

    fn start_listening(&self) -> Result<(), CaptureError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyStopped);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("X11 hook already started");
            return Ok(());
        }
        let result = self.start();
        if result.is_err() {
            // Leave the backend startable again.
            self.started.store(false, Ordering::SeqCst);
        }
        result
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        HOOK_ACTIVE.store(false, Ordering::SeqCst);
        // The record thread stays parked in XRecordEnableContext until the
        // process exits; with the flag cleared it forwards nothing.
    }
}

/// Resolves records from the callback and feeds the dispatcher.
fn consume_records(
    rx: &Receiver<HookRecord>,
    keymap: &HookKeyMap,
    dispatcher: &Dispatcher,
    running: &AtomicBool,
) {
    while running.load(Ordering::SeqCst) {
        let record = match rx.recv_timeout(CONSUMER_POLL) {
            Ok(record) => record,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let Some(key) = keymap.resolve_with_char(u16::from(record.keycode), record.keychar) else {
            trace!(keycode = record.keycode, "unmapped hook key");
            continue;
        };
        debug!(keycode = record.keycode, keychar = ?record.keychar, %key, "hook key press");
        dispatcher.deliver(InputEvent::now(key, i32::from(record.keycode)));
    }
    info!("X11 hook consumer stopped");
}

/// Entry point for the dedicated RECORD thread.
///
/// Sends exactly one message on `ready`: `Ok` right before blocking in
/// `XRecordEnableContext`, or the setup error.
fn run_record_loop(ready: &Sender<Result<(), CaptureError>>) {
    // SAFETY: XOpenDisplay with a null name reads $DISPLAY; a null return is
    // handled below.  Both connections are used only on this thread.
    let (control, data) = unsafe { (xlib::XOpenDisplay(ptr::null()), xlib::XOpenDisplay(ptr::null())) };
    if control.is_null() || data.is_null() {
        // SAFETY: only non-null connections are closed.
        unsafe {
            if !control.is_null() {
                xlib::XCloseDisplay(control);
            }
            if !data.is_null() {
                xlib::XCloseDisplay(data);
            }
        }
        let name = std::env::var("DISPLAY").unwrap_or_else(|_| "(unset)".to_string());
        let _ = ready.send(Err(CaptureError::DisplayUnavailable(name)));
        return;
    }

    // SAFETY: `control` is a valid open display; the range is allocated and
    // freed by Xlib, and the context is created before the range is freed.
    let context = unsafe {
        let mut major: c_int = 0;
        let mut minor: c_int = 0;
        if xrecord::XRecordQueryVersion(control, &mut major, &mut minor) == 0 {
            0
        } else {
            debug!(major, minor, "RECORD extension found");
            let mut range = xrecord::XRecordAllocRange();
            if range.is_null() {
                0
            } else {
                // Key presses only; releases never reach the callback.
                (*range).device_events.first = xlib::KeyPress as c_uchar;
                (*range).device_events.last = xlib::KeyPress as c_uchar;
                let mut clients: xrecord::XRecordClientSpec = xrecord::XRecordAllClients;
                let context = xrecord::XRecordCreateContext(control, 0, &mut clients, 1, &mut range, 1);
                xlib::XFree(range as *mut c_void);
                xlib::XSync(control, xlib::False);
                context
            }
        }
    };

    if context == 0 {
        // SAFETY: both connections are valid and unused elsewhere.
        unsafe {
            xlib::XCloseDisplay(data);
            xlib::XCloseDisplay(control);
        }
        let _ = ready.send(Err(CaptureError::RecordUnavailable(
            "could not create record context".to_string(),
        )));
        return;
    }

    let _ = ready.send(Ok(()));

    // SAFETY: `data` is a valid display distinct from `control`.  The closure
    // pointer is the control display, which outlives the blocking call.
    let status = unsafe {
        xrecord::XRecordEnableContext(data, context, Some(record_callback), control as *mut c_char)
    };
    if status == 0 {
        error!("XRecordEnableContext failed; keyboard hook inactive");
    }

    // SAFETY: the context was created on `control`; neither display is used
    // after closing.
    unsafe {
        xrecord::XRecordFreeContext(control, context);
        xlib::XCloseDisplay(data);
        xlib::XCloseDisplay(control);
    }
}

/// RECORD interception callback.
///
/// # Safety
///
/// Called by Xlib from the record thread inside `XRecordEnableContext`.
/// `closure` is the control display passed at enable time; `data` is owned
/// by Xlib and must be released with `XRecordFreeData`.
unsafe extern "C" fn record_callback(closure: *mut c_char, data: *mut xrecord::XRecordInterceptData) {
    if data.is_null() {
        return;
    }
    let intercept = &*data;

    // Device events carry an xEvent: byte 0 is the type, byte 1 the keycode.
    if intercept.category == xrecord::XRecordFromServer
        && intercept.data_len > 0
        && !intercept.data.is_null()
        && HOOK_ACTIVE.load(Ordering::SeqCst)
    {
        let bytes = intercept.data;
        let event_type = c_int::from(*bytes & 0x7F);
        let keycode = *bytes.add(1);
        if event_type == xlib::KeyPress {
            let display = closure as *mut xlib::Display;
            // SAFETY: the control display is valid for the lifetime of the
            // enable call and only used on this thread.
            let keysym = xlib::XkbKeycodeToKeysym(display, keycode, 0, 0);
            let record = HookRecord {
                keycode,
                keychar: keysym_to_char(keysym),
            };
            if let Some(sender) = record_sender().as_ref() {
                // Ignore send errors (consumer gone during shutdown).
                let _ = sender.send(record);
            }
        }
    }

    // SAFETY: every intercept record must be freed exactly once.
    xrecord::XRecordFreeData(data);
}

/// Printable character of a keysym, if it has one.
///
/// Latin-1 keysyms equal their code point; Unicode keysyms carry the code
/// point below the `0x0100_0000` marker.
fn keysym_to_char(keysym: xlib::KeySym) -> Option<char> {
    let keysym = u32::try_from(keysym).ok()?;
    let code_point = match keysym {
        0x20..=0x7E | 0xA0..=0xFF => keysym,
        0x0100_0100..=0x0110_FFFF => keysym - 0x0100_0000,
        _ => return None,
    };
    char::from_u32(code_point).filter(|c| !c.is_control())
}
