//! Payloads exchanged with the terminal backend.
//!
//! - [`DepositCashRequest`]: JSON body POSTed when the bill acceptor accepts
//!   a note.
//! - [`RemoteCommand`]: operator commands delivered to the terminal by name.
//! - [`NotificationEvent`]: backend notifications the terminal reacts to.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::session::SessionKind;

// ── Cash deposit ──────────────────────────────────────────────────────────────

/// Body of the cash deposit request.
///
/// ```json
/// {"amount": 50, "notas": {"50": 1}, "terminalId": "T-01"}
/// ```
///
/// `notas` counts notes per denomination; one request always carries exactly
/// one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositCashRequest {
    pub amount: u32,
    pub notas: BTreeMap<String, u32>,
    #[serde(rename = "terminalId")]
    pub terminal_id: String,
}

impl DepositCashRequest {
    /// Builds the request for a single accepted note of `amount`.
    pub fn single_note(amount: u32, terminal_id: impl Into<String>) -> Self {
        let mut notas = BTreeMap::new();
        notas.insert(amount.to_string(), 1);
        Self {
            amount,
            notas,
            terminal_id: terminal_id.into(),
        }
    }
}

// ── Remote commands ───────────────────────────────────────────────────────────

/// Operator command addressed to this terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteCommand {
    #[serde(rename = "DISABLE_ALT_F4")]
    DisableAltF4,
    #[serde(rename = "ENABLE_ALT_F4")]
    EnableAltF4,
    #[serde(rename = "DISABLE_KEYS")]
    DisableKeys,
    #[serde(rename = "ENABLED_KEYS")]
    EnabledKeys,
}

/// Error returned when a command name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown remote command: {0:?}")]
pub struct UnknownCommand(pub String);

impl RemoteCommand {
    /// The wire name of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteCommand::DisableAltF4 => "DISABLE_ALT_F4",
            RemoteCommand::EnableAltF4 => "ENABLE_ALT_F4",
            RemoteCommand::DisableKeys => "DISABLE_KEYS",
            RemoteCommand::EnabledKeys => "ENABLED_KEYS",
        }
    }

    /// Whether this command locks the keyboard (as opposed to unlocking it).
    pub fn locks_keyboard(self) -> bool {
        matches!(self, RemoteCommand::DisableAltF4 | RemoteCommand::DisableKeys)
    }
}

impl FromStr for RemoteCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISABLE_ALT_F4" => Ok(RemoteCommand::DisableAltF4),
            "ENABLE_ALT_F4" => Ok(RemoteCommand::EnableAltF4),
            "DISABLE_KEYS" => Ok(RemoteCommand::DisableKeys),
            "ENABLED_KEYS" => Ok(RemoteCommand::EnabledKeys),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Notifications ─────────────────────────────────────────────────────────────

/// Event name of the deposit-completed notification.
pub const EVENT_DEPOSIT_DONE: &str = "deposit_done";

/// Event name of the balance-changed notification.
pub const EVENT_AMOUNT: &str = "amount";

/// Transaction type signalling the session timed out.
pub const TRANSACTION_INACTIVITY: &str = "inactivity";

/// A backend notification, decoded from its event name and JSON data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// A deposit finished; `session` says which payment mode is now active.
    DepositDone { session: SessionKind },
    /// The balance changed; `transaction_type` is absent for plain updates.
    AmountChanged { transaction_type: Option<String> },
    /// Any event this terminal does not handle.
    Other { event: String },
}

impl NotificationEvent {
    /// Decodes a notification.  Missing or mistyped fields decode to the
    /// least specific variant rather than failing.
    pub fn from_parts(event: &str, data: &Value) -> Self {
        match event {
            EVENT_DEPOSIT_DONE => NotificationEvent::DepositDone {
                session: data
                    .get("session")
                    .and_then(Value::as_str)
                    .map(SessionKind::from_tag)
                    .unwrap_or(SessionKind::Unknown),
            },
            EVENT_AMOUNT => NotificationEvent::AmountChanged {
                transaction_type: data
                    .get("transactionType")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            other => NotificationEvent::Other {
                event: other.to_string(),
            },
        }
    }

    /// Whether this is the inactivity timeout notification.
    pub fn is_inactivity(&self) -> bool {
        matches!(
            self,
            NotificationEvent::AmountChanged { transaction_type: Some(t) } if t == TRANSACTION_INACTIVITY
        )
    }
}
