//! Infrastructure layer for the kiosk terminal.
//!
//! Contains OS-facing adapters: keyboard capture backends, the browser
//! DevTools sink, OS commands (NumLock, keyboard lock), the deposit HTTP
//! client and file-system configuration.

pub mod accounting;
pub mod browser;
pub mod input_capture;
pub mod os_command;
pub mod storage;
