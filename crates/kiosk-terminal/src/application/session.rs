//! Session-driven NumLock policy.
//!
//! PIX sessions type amounts on the keypad and need NumLock on; cash
//! sessions receive notes on the keypad keys and need it off.  The policy
//! is applied at startup from the stored session id, and again whenever the
//! backend reports a finished deposit or an inactivity timeout.  A terminal
//! starting without a recognised session comes up with NumLock off.

use std::sync::Arc;

use kiosk_core::{NotificationEvent, SessionKind};
use tracing::{debug, info, warn};

use crate::infrastructure::os_command::OsCommand;

/// Applies NumLock state for the active session.
pub struct SessionController {
    os: Arc<dyn OsCommand>,
}

impl SessionController {
    pub fn new(os: Arc<dyn OsCommand>) -> Self {
        Self { os }
    }

    /// Sets NumLock for `kind` at startup.  Only PIX sessions get it on.
    pub fn apply_startup(&self, kind: SessionKind) {
        info!(?kind, "applying startup NumLock policy");
        self.set_numlock(kind.numlock_enabled());
    }

    /// Reacts to one backend notification.
    ///
    /// A finished deposit applies its session's policy; an inactivity
    /// timeout turns NumLock off.  Anything else, including a deposit with
    /// an unrecognised session tag, is ignored.
    pub fn handle_notification(&self, event: &NotificationEvent) {
        match event {
            NotificationEvent::DepositDone {
                session: SessionKind::Unknown,
            } => debug!("deposit for unknown session; NumLock left as is"),
            NotificationEvent::DepositDone { session } => {
                info!(?session, "deposit done; applying session NumLock policy");
                self.set_numlock(session.numlock_enabled());
            }
            event if event.is_inactivity() => {
                info!("transaction inactivity; NumLock off");
                self.set_numlock(false);
            }
            other => debug!(?other, "notification ignored"),
        }
    }

    fn set_numlock(&self, enabled: bool) {
        if let Err(e) = self.os.set_numlock(enabled) {
            warn!(enabled, "NumLock toggle failed: {e}");
        }
    }
}
