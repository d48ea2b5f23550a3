//! # kiosk-core
//!
//! Shared library for the kiosk terminal containing the symbolic key
//! vocabulary, the key code translation tables, the domain entities for cash
//! denominations and sessions, and the JSON payloads exchanged with the
//! backend.
//!
//! This crate has zero dependencies on OS APIs, device files, or network
//! sockets.
//!
//! # Architecture overview
//!
//! The kiosk terminal drives a locked-down browser session from physical
//! buttons and a bill acceptor.  Both kinds of hardware present themselves to
//! the operating system as a keyboard, so every signal arrives as a key press.
//!
//! - **`keymap`** – Translation tables that turn backend-specific raw codes
//!   (Linux input event codes read from `/dev/input`, key codes delivered by
//!   the X11 hook) into one symbolic vocabulary such as `"7"`, `"kp_7"` or
//!   `"up"`.  Nothing above the device drivers ever sees a raw code.
//!
//! - **`domain`** – The [`InputEvent`] handed to subscribers, the
//!   [`DenominationTable`] that maps bill-acceptor keys to amounts, and the
//!   [`SessionKind`] that decides the NumLock policy.
//!
//! - **`protocol`** – JSON payloads: the cash deposit request sent to the
//!   backend, remote commands, and notification events.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::denomination::{DenominationBinding, DenominationError, DenominationTable};
pub use domain::event::InputEvent;
pub use domain::session::SessionKind;
pub use keymap::symbol::SymbolicKey;
pub use keymap::{EvdevKeyMap, HookKeyMap, KeyCodeMap};
pub use protocol::messages::{DepositCashRequest, NotificationEvent, RemoteCommand, UnknownCommand};
