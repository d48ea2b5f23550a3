//! Session kind of the terminal.
//!
//! Session ids look like `PIX_1234` or `CASH_5678`; the prefix before the first
//! underscore says how the current customer pays.  PIX sessions type their
//! amounts on the keypad and need NumLock on.  Cash sessions need it off so
//! that keypad pulses from the bill acceptor arrive as `kp_*` keys.

use serde::{Deserialize, Serialize};

/// How the customer of the current session pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionKind {
    Pix,
    Cash,
    /// Missing, empty, or unrecognised session id.
    Unknown,
}

impl SessionKind {
    /// Parses the prefix of a full session id (`"PIX_1234"` → `Pix`).
    pub fn from_session_id(session_id: &str) -> Self {
        let prefix = session_id.split('_').next().unwrap_or_default();
        Self::from_tag(prefix)
    }

    /// Parses a bare tag as sent by notifications (`"PIX"`, `"CASH"`).
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "PIX" => SessionKind::Pix,
            "CASH" => SessionKind::Cash,
            _ => SessionKind::Unknown,
        }
    }

    /// NumLock state for this session at startup.  Only PIX turns it on.
    pub fn numlock_enabled(self) -> bool {
        matches!(self, SessionKind::Pix)
    }
}
