//! Raw-device backend reading `/dev/input/event*` directly.
//!
//! Compositor-only Wayland sessions expose no global keyboard hook, so the
//! terminal reads the kernel's input devices itself.  At construction every
//! event device is classified by its name; each retained keyboard later gets
//! its own blocking reader thread.
//!
//! Only `EV_KEY` records with value `1` (press) are considered.  Releases
//! (`0`) and auto-repeats (`2`) are discarded before the key table is
//! consulted.
//!
//! Reading requires membership in the `input` group (or root).

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use kiosk_core::{EvdevKeyMap, InputEvent, KeyCodeMap, SymbolicKey};
use tracing::{debug, error, info};

use super::{CaptureError, InputBackend};
use crate::application::dispatch::{Delivery, Dispatcher, Subscriber};

/// `EV_KEY` value for a key press.
const KEY_PRESS: i32 = 1;

/// Device name fragments that are never keyboards, checked first.
const EXCLUDED_NAMES: &[&str] = &[
    "mouse",
    "touchpad",
    "speaker",
    "lid switch",
    "power button",
    "sleep button",
    "video bus",
    "hdmi",
    "headphone",
    "hda",
    "webcam",
    "camera",
];

/// Device name fragments identifying keyboards.
const KEYBOARD_NAMES: &[&str] = &["keyboard", "kbd", "at translated set 2"];

/// Outcome of classifying a device by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Keyboard,
    Excluded,
    Unrecognised,
}

/// Classifies an input device by its (case-insensitive) name.
///
/// Exclusions are checked first, so "Keyboard with Touchpad" is rejected.
/// Names matching neither list are rejected as well.
pub fn classify_device_name(name: &str) -> DeviceClass {
    let name = name.to_lowercase();
    if EXCLUDED_NAMES.iter().any(|fragment| name.contains(fragment)) {
        DeviceClass::Excluded
    } else if KEYBOARD_NAMES.iter().any(|fragment| name.contains(fragment)) {
        DeviceClass::Keyboard
    } else {
        DeviceClass::Unrecognised
    }
}

/// One record read from an event device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    /// `true` for `EV_KEY` records.
    pub is_key: bool,
    pub code: u16,
    pub value: i32,
}

impl RawRecord {
    /// A key record (`EV_KEY`).
    pub fn key(code: u16, value: i32) -> Self {
        Self {
            is_key: true,
            code,
            value,
        }
    }

    fn is_press(&self) -> bool {
        self.is_key && self.value == KEY_PRESS
    }
}

/// A readable input device.
///
/// The production implementation wraps an `evdev::Device`; tests supply
/// scripted devices.
pub trait KeyDevice: Send + 'static {
    /// Human-readable device name, used for classification and logging.
    fn name(&self) -> &str;

    /// Blocks until the device has records, then returns them.  An error ends
    /// the reader loop for this device.
    fn read_records(&mut self) -> io::Result<Vec<RawRecord>>;
}

/// Raw-device input backend.
pub struct EvdevBackend<D: KeyDevice> {
    dispatcher: Arc<Dispatcher>,
    keymap: EvdevKeyMap,
    /// Retained keyboards; taken by `start_listening`.
    devices: Mutex<Vec<D>>,
    running: Arc<AtomicBool>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl<D: KeyDevice> EvdevBackend<D> {
    /// Classifies `candidates` and keeps the keyboards.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoKeyboardFound`] if no candidate is a keyboard.
    pub fn with_devices(
        dispatcher: Arc<Dispatcher>,
        candidates: Vec<D>,
    ) -> Result<Self, CaptureError> {
        let mut keyboards = Vec::new();
        for device in candidates {
            match classify_device_name(device.name()) {
                DeviceClass::Keyboard => {
                    info!(device = device.name(), "keyboard detected");
                    keyboards.push(device);
                }
                class => debug!(device = device.name(), ?class, "device skipped"),
            }
        }
        if keyboards.is_empty() {
            return Err(CaptureError::NoKeyboardFound);
        }
        Ok(Self {
            dispatcher,
            keymap: EvdevKeyMap,
            devices: Mutex::new(keyboards),
            running: Arc::new(AtomicBool::new(true)),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        })
    }

    /// Number of retained keyboards not yet handed to reader threads.
    pub fn pending_devices(&self) -> usize {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<D: KeyDevice> InputBackend for EvdevBackend<D> {
    fn register(&self, keys: &[SymbolicKey], subscriber: Subscriber) {
        self.dispatcher.register(keys, subscriber);
    }

    fn simulate_signal(&self, key: &SymbolicKey) -> Delivery {
        self.dispatcher.deliver_inline(InputEvent::simulated(key.clone()))
    }

    fn start_listening(&self) -> Result<(), CaptureError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CaptureError::AlreadyStopped);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let devices: Vec<D> = std::mem::take(
            &mut *self.devices.lock().unwrap_or_else(PoisonError::into_inner),
        );
        info!(count = devices.len(), "starting raw-device readers");

        for (index, device) in devices.into_iter().enumerate() {
            let dispatcher = Arc::clone(&self.dispatcher);
            let running = Arc::clone(&self.running);
            let keymap = self.keymap;
            thread::Builder::new()
                .name(format!("kiosk-evdev-{index}"))
                .spawn(move || read_loop(device, &keymap, &dispatcher, &running))
                .map_err(|e| CaptureError::ThreadSpawn(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        // Devices never started are closed right away; readers drop theirs on
        // their next wake-up.
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Blocking reader loop for one device.  Returns on read error or stop.
fn read_loop<D: KeyDevice>(
    mut device: D,
    keymap: &impl KeyCodeMap,
    dispatcher: &Dispatcher,
    running: &AtomicBool,
) {
    let name = device.name().to_string();
    while running.load(Ordering::SeqCst) {
        let records = match device.read_records() {
            Ok(records) => records,
            Err(e) => {
                error!(device = %name, "read failed, reader exiting: {e}");
                return;
            }
        };
        if !running.load(Ordering::SeqCst) {
            break;
        }
        for record in records.iter().filter(|r| r.is_press()) {
            let Some(key) = keymap.resolve(record.code) else {
                continue;
            };
            debug!(device = %name, code = record.code, %key, "key press");
            dispatcher.deliver(InputEvent::now(key, i32::from(record.code)));
        }
    }
    info!(device = %name, "reader stopped");
}

// ── Real devices ─────────────────────────────────────────────────────────────

#[cfg(target_os = "linux")]
pub use linux::LinuxEvdevDevice;

#[cfg(target_os = "linux")]
mod linux {
    use std::io;
    use std::path::PathBuf;
    use std::sync::Arc;

    use evdev::{Device, EventType};
    use tracing::warn;

    use super::{EvdevBackend, KeyDevice, RawRecord};
    use crate::application::dispatch::Dispatcher;
    use crate::infrastructure::input_capture::CaptureError;

    /// An opened `/dev/input/event*` device.
    pub struct LinuxEvdevDevice {
        path: PathBuf,
        name: String,
        device: Device,
    }

    impl LinuxEvdevDevice {
        /// Path the device was opened from.
        pub fn path(&self) -> &std::path::Path {
            &self.path
        }
    }

    impl KeyDevice for LinuxEvdevDevice {
        fn name(&self) -> &str {
            &self.name
        }

        fn read_records(&mut self) -> io::Result<Vec<RawRecord>> {
            Ok(self
                .device
                .fetch_events()?
                .map(|ev| RawRecord {
                    is_key: ev.event_type() == EventType::KEY,
                    code: ev.code(),
                    value: ev.value(),
                })
                .collect())
        }
    }

    impl EvdevBackend<LinuxEvdevDevice> {
        /// Enumerates every event device the process can open and keeps the
        /// keyboards.  Devices that cannot be opened are skipped.
        ///
        /// # Errors
        ///
        /// [`CaptureError::NoKeyboardFound`] when nothing usable remains.
        pub fn open_system(dispatcher: Arc<Dispatcher>) -> Result<Self, CaptureError> {
            let candidates: Vec<LinuxEvdevDevice> = evdev::enumerate()
                .map(|(path, device)| LinuxEvdevDevice {
                    name: device.name().unwrap_or_default().to_string(),
                    path,
                    device,
                })
                .collect();
            if candidates.is_empty() {
                warn!("no readable /dev/input/event* devices; check input group membership");
            }
            Self::with_devices(dispatcher, candidates)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::mpsc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    /// Device replaying scripted batches, then failing with `UnexpectedEof`.
    struct ScriptedDevice {
        name: String,
        batches: VecDeque<Vec<RawRecord>>,
        delay: Duration,
    }

    impl ScriptedDevice {
        fn new(name: &str, batches: Vec<Vec<RawRecord>>) -> Self {
            Self {
                name: name.to_string(),
                batches: batches.into(),
                delay: Duration::ZERO,
            }
        }
    }

    impl KeyDevice for ScriptedDevice {
        fn name(&self) -> &str {
            &self.name
        }

        fn read_records(&mut self) -> io::Result<Vec<RawRecord>> {
            std::thread::sleep(self.delay);
            self.batches
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "device removed"))
        }
    }

    fn key(k: &'static str) -> SymbolicKey {
        SymbolicKey::from(k)
    }

    fn recording_subscriber() -> (Subscriber, mpsc::Receiver<InputEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let sub: Subscriber = Arc::new(move |e: &InputEvent| {
            let _ = tx.lock().unwrap().send(e.clone());
        });
        (sub, rx)
    }

    // ── Classification ────────────────────────────────────────────────────────

    #[test]
    fn test_classify_recognises_keyboards() {
        for name in [
            "AT Translated Set 2 keyboard",
            "USB KBD",
            "Logitech USB Keyboard",
            "at translated set 2",
        ] {
            assert_eq!(classify_device_name(name), DeviceClass::Keyboard, "{name}");
        }
    }

    #[test]
    fn test_classify_excludes_known_non_keyboards() {
        for name in [
            "Logitech USB Optical Mouse",
            "SynPS/2 Synaptics TouchPad",
            "PC Speaker",
            "Lid Switch",
            "Power Button",
            "Sleep Button",
            "Video Bus",
            "HDA Intel PCH HDMI/DP,pcm=3",
            "HDA Intel PCH Headphone",
            "Integrated Webcam: Integrated C",
            "USB Camera",
        ] {
            assert_eq!(classify_device_name(name), DeviceClass::Excluded, "{name}");
        }
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        assert_eq!(
            classify_device_name("Keyboard with Touchpad"),
            DeviceClass::Excluded
        );
    }

    #[test]
    fn test_unknown_names_are_unrecognised() {
        assert_eq!(classify_device_name("Bill Validator"), DeviceClass::Unrecognised);
        assert_eq!(classify_device_name(""), DeviceClass::Unrecognised);
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread")]
    async fn test_zero_keyboards_is_no_keyboard_found() {
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let devices = vec![
            ScriptedDevice::new("Power Button", vec![]),
            ScriptedDevice::new("Logitech Mouse", vec![]),
        ];

        let result = EvdevBackend::with_devices(dispatcher, devices);

        assert!(matches!(result, Err(CaptureError::NoKeyboardFound)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_only_keyboards_are_retained() {
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let devices = vec![
            ScriptedDevice::new("AT Translated Set 2 keyboard", vec![]),
            ScriptedDevice::new("Video Bus", vec![]),
            ScriptedDevice::new("USB Kbd", vec![]),
        ];

        let backend = EvdevBackend::with_devices(dispatcher, devices).expect("keyboards found");

        assert_eq!(backend.pending_devices(), 2);
    }

    // ── Reader loops ──────────────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread")]
    async fn test_only_key_presses_reach_subscribers() {
        // Arrange: release, repeat and a non-key record around one press.
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let device = ScriptedDevice::new(
            "usb keyboard",
            vec![vec![
                RawRecord::key(21, 0),
                RawRecord::key(21, 2),
                RawRecord { is_key: false, code: 21, value: 1 },
                RawRecord::key(21, 1),
            ]],
        );
        let backend = EvdevBackend::with_devices(dispatcher, vec![device]).expect("keyboard");
        let (sub, rx) = recording_subscriber();
        backend.register(&[key("y")], sub);

        // Act
        backend.start_listening().expect("start");

        // Assert
        let event = rx.recv_timeout(Duration::from_secs(5)).expect("one press");
        assert_eq!(event.key, key("y"));
        assert_eq!(event.raw_code, 21);
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_codes_are_ignored() {
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let device = ScriptedDevice::new(
            "usb keyboard",
            vec![vec![RawRecord::key(30, 1), RawRecord::key(34, 1)]],
        );
        let backend = EvdevBackend::with_devices(dispatcher, vec![device]).expect("keyboard");
        let (sub, rx) = recording_subscriber();
        backend.register(&[key("g")], sub);

        backend.start_listening().expect("start");

        let event = rx.recv_timeout(Duration::from_secs(5)).expect("g press");
        assert_eq!(event.key, key("g"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_read_error_ends_only_that_device_loop() {
        // Arrange: the first keyboard fails immediately; the second delivers
        // a press after the first has already died.
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let broken = ScriptedDevice::new("broken keyboard", vec![]);
        let mut healthy =
            ScriptedDevice::new("healthy keyboard", vec![vec![RawRecord::key(36, 1)]]);
        healthy.delay = Duration::from_millis(100);
        let backend =
            EvdevBackend::with_devices(dispatcher, vec![broken, healthy]).expect("keyboards");
        let (sub, rx) = recording_subscriber();
        backend.register(&[key("j")], sub);

        // Act
        backend.start_listening().expect("start");

        // Assert
        let event = rx.recv_timeout(Duration::from_secs(5)).expect("j press");
        assert_eq!(event.key, key("j"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bouncing_press_is_debounced_across_batches() {
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let device = ScriptedDevice::new(
            "usb keyboard",
            vec![vec![RawRecord::key(85, 1)], vec![RawRecord::key(85, 1)]],
        );
        let backend = EvdevBackend::with_devices(dispatcher, vec![device]).expect("keyboard");
        let (sub, rx) = recording_subscriber();
        backend.register(&[key("kp_7")], sub);

        backend.start_listening().expect("start");

        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_twice_is_noop_and_stop_blocks_restart() {
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let device = ScriptedDevice::new("usb keyboard", vec![]);
        let backend = EvdevBackend::with_devices(dispatcher, vec![device]).expect("keyboard");

        assert!(backend.start_listening().is_ok());
        assert!(backend.start_listening().is_ok());
        assert_eq!(backend.pending_devices(), 0);

        backend.stop();
        assert!(matches!(
            backend.start_listening(),
            Err(CaptureError::AlreadyStopped)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_simulate_signal_goes_through_debounce() {
        let dispatcher = Arc::new(Dispatcher::new(Handle::current()));
        let device = ScriptedDevice::new("usb keyboard", vec![]);
        let backend = EvdevBackend::with_devices(dispatcher, vec![device]).expect("keyboard");
        let (sub, rx) = recording_subscriber();
        backend.register(&[key("b")], sub);

        assert_eq!(backend.simulate_signal(&key("b")), Delivery::Dispatched(1));
        assert!(matches!(
            backend.simulate_signal(&key("b")),
            Delivery::Debounced { .. }
        ));
        assert_eq!(rx.try_recv().map(|e| e.raw_code), Ok(0));
        assert!(rx.try_recv().is_err());
    }
}
