//! Input capture infrastructure for the kiosk terminal.
//!
//! Two structurally different sources feed the same [`Dispatcher`]:
//!
//! - **X11 hook** ([`x11_hook::X11HookBackend`]): the X RECORD extension
//!   delivers one global stream of key records on a dedicated thread.  Used
//!   whenever an X server is available.
//! - **Raw devices** ([`evdev_backend::EvdevBackend`]): one blocking reader
//!   thread per `/dev/input/event*` keyboard.  Used under compositor-only
//!   Wayland sessions, where no global hook exists.
//!
//! Backends share nothing but the symbolic key vocabulary: each resolves its
//! own raw codes through its own table and hands [`InputEvent`]s to the
//! dispatcher, which owns debouncing and fan-out.
//!
//! # Testability
//!
//! [`mock::MockBackend`] injects raw codes through a real key table without
//! any device, and `EvdevBackend` is generic over [`evdev_backend::KeyDevice`]
//! so device loops run against scripted devices in unit tests.
//!
//! [`InputEvent`]: kiosk_core::InputEvent

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use kiosk_core::{HookKeyMap, SymbolicKey};
use tracing::info;

use crate::application::dispatch::{Delivery, Dispatcher, Subscriber};

pub mod evdev_backend;
pub mod mock;

#[cfg(target_os = "linux")]
pub mod x11_hook;

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no keyboard device found in /dev/input (missing permissions? try the input group or root)")]
    NoKeyboardFound,
    #[error("failed to enumerate input devices: {0}")]
    DeviceEnumeration(String),
    #[error("failed to open X display {0}")]
    DisplayUnavailable(String),
    #[error("X RECORD extension unavailable: {0}")]
    RecordUnavailable(String),
    #[error("failed to start capture thread: {0}")]
    ThreadSpawn(String),
    #[error("capture service has already been stopped")]
    AlreadyStopped,
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Capability set shared by every input backend.
pub trait InputBackend: Send + Sync {
    /// Registers `subscriber` for every key in `keys`.  Additive; insertion
    /// order is dispatch order.
    fn register(&self, keys: &[SymbolicKey], subscriber: Subscriber);

    /// Injects `key` as if a device had produced it.  Goes through the
    /// debounce gate, then runs the subscribers synchronously on the calling
    /// thread.
    fn simulate_signal(&self, key: &SymbolicKey) -> Delivery;

    /// Starts the device reader threads.  A second call is a no-op.
    fn start_listening(&self) -> Result<(), CaptureError>;

    /// Signals every reader to exit.  In-flight subscribers are not awaited.
    fn stop(&self);
}

/// Which display server the session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    X11,
    Wayland,
}

impl DisplayServer {
    /// Detects the display server from the process environment.
    ///
    /// `XDG_SESSION_TYPE` wins when set; otherwise `WAYLAND_DISPLAY` means
    /// Wayland and `DISPLAY` means X11; with nothing set, X11 is assumed.
    pub fn detect() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self::detect_from(
            var("XDG_SESSION_TYPE").as_deref(),
            var("WAYLAND_DISPLAY").as_deref(),
            var("DISPLAY").as_deref(),
        )
    }

    /// Pure form of [`detect`](Self::detect) over explicit variable values.
    pub fn detect_from(
        session_type: Option<&str>,
        wayland_display: Option<&str>,
        display: Option<&str>,
    ) -> Self {
        if let Some(kind) = session_type {
            // Any session type other than wayland ("x11", "tty", …) uses the hook.
            return if kind.eq_ignore_ascii_case("wayland") {
                DisplayServer::Wayland
            } else {
                DisplayServer::X11
            };
        }
        match (wayland_display, display) {
            (Some(_), _) => DisplayServer::Wayland,
            (None, Some(_)) => DisplayServer::X11,
            (None, None) => DisplayServer::X11,
        }
    }
}

impl FromStr for DisplayServer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x11" => Ok(DisplayServer::X11),
            "wayland" => Ok(DisplayServer::Wayland),
            other => Err(format!("unknown display server {other:?} (expected x11 or wayland)")),
        }
    }
}

impl fmt::Display for DisplayServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayServer::X11 => "x11",
            DisplayServer::Wayland => "wayland",
        })
    }
}

/// Backend construction settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendSettings {
    /// Correction applied by the hook backend to top-row key codes.
    pub keycode_offset: Option<i32>,
}

impl BackendSettings {
    /// The hook key table configured with these settings.
    pub fn hook_keymap(&self) -> HookKeyMap {
        match self.keycode_offset {
            Some(offset) => HookKeyMap::with_offset(offset),
            None => HookKeyMap::new(),
        }
    }
}

/// Creates the backend matching `display`.
///
/// Wayland selects the raw-device backend, which enumerates keyboards now;
/// X11 selects the hook backend, which connects to the X server when
/// listening starts.
///
/// # Errors
///
/// [`CaptureError::NoKeyboardFound`] when no raw keyboard device is usable,
/// [`CaptureError::UnsupportedPlatform`] off Linux.
pub fn new_input_handler(
    display: DisplayServer,
    settings: BackendSettings,
    dispatcher: Arc<Dispatcher>,
) -> Result<Box<dyn InputBackend>, CaptureError> {
    let display_server = &display;
    info!(display = %display_server, "selecting input backend");

    #[cfg(target_os = "linux")]
    {
        match display {
            DisplayServer::Wayland => {
                let backend = evdev_backend::EvdevBackend::open_system(dispatcher)?;
                Ok(Box::new(backend))
            }
            DisplayServer::X11 => Ok(Box::new(x11_hook::X11HookBackend::new(
                dispatcher,
                settings.hook_keymap(),
            ))),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = (settings, dispatcher);
        Err(CaptureError::UnsupportedPlatform(format!(
            "{display} input capture requires Linux"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_type_wins_over_other_variables() {
        assert_eq!(
            DisplayServer::detect_from(Some("x11"), Some("wayland-0"), None),
            DisplayServer::X11
        );
        assert_eq!(
            DisplayServer::detect_from(Some("Wayland"), None, Some(":0")),
            DisplayServer::Wayland
        );
    }

    #[test]
    fn test_wayland_display_detected_without_session_type() {
        assert_eq!(
            DisplayServer::detect_from(None, Some("wayland-0"), Some(":0")),
            DisplayServer::Wayland
        );
    }

    #[test]
    fn test_display_or_nothing_defaults_to_x11() {
        assert_eq!(DisplayServer::detect_from(None, None, Some(":0")), DisplayServer::X11);
        assert_eq!(DisplayServer::detect_from(None, None, None), DisplayServer::X11);
    }

    #[test]
    fn test_tty_session_uses_hook_backend() {
        assert_eq!(DisplayServer::detect_from(Some("tty"), None, None), DisplayServer::X11);
    }

    #[test]
    fn test_display_server_parses_case_insensitively() {
        assert_eq!("WAYLAND".parse::<DisplayServer>(), Ok(DisplayServer::Wayland));
        assert_eq!("x11".parse::<DisplayServer>(), Ok(DisplayServer::X11));
        assert!("mir".parse::<DisplayServer>().is_err());
    }

    #[test]
    fn test_settings_build_hook_keymap_with_offset() {
        let settings = BackendSettings {
            keycode_offset: Some(1),
        };
        assert_eq!(settings.hook_keymap().keycode_offset(), Some(1));
        assert_eq!(BackendSettings::default().hook_keymap().keycode_offset(), None);
    }
}
