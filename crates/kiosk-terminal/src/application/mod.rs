//! Application layer use cases for the kiosk terminal.
//!
//! Use cases in this layer orchestrate domain types from `kiosk_core` and
//! reach the outside world only through the infrastructure traits
//! (`InputBackend`, `BrowserSink`, `OsCommand`), so every use case runs
//! against mocks in tests.
//!
//! # Sub-modules
//!
//! - **`dispatch`** – Debounce gate and subscriber fan-out shared by every
//!   input backend.  Runs on every key press.
//!
//! - **`hotkeys`** – Default key → action table and the executor that turns
//!   actions into browser events, OS toggles and shutdown requests.
//!
//! - **`cash`** – Credits a note amount for each denomination key press.
//!
//! - **`session`** – NumLock policy for PIX and cash sessions.
//!
//! - **`remote`** – Keyboard lock commands sent by the backend.

pub mod cash;
pub mod dispatch;
pub mod hotkeys;
pub mod remote;
pub mod session;
