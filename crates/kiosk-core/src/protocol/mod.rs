//! Protocol module containing the JSON payloads exchanged with the backend.

pub mod messages;

pub use messages::*;
