//! Domain entities for the kiosk terminal.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no device files, no X server, no sockets.  Everything here
//! compiles and tests on any platform.
//!
//! Code in outer layers (input backends, dispatcher, browser sink) depends on
//! the domain, but the domain never depends on them.

/// Cash denominations bound to bill-acceptor keys.
pub mod denomination;

/// The immutable event handed to every subscriber.
pub mod event;

/// Session kind derived from the session id.
pub mod session;
