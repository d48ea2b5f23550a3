//! Remote keyboard-lock commands.
//!
//! The backend can lock or release the kiosk keyboard while the terminal
//! runs.  Commands arrive as strings (`DISABLE_ALT_F4`, …) and are parsed
//! into [`RemoteCommand`] before reaching this module.

use kiosk_core::RemoteCommand;
use tracing::info;

use crate::infrastructure::os_command::{CommandError, OsCommand};

/// Applies `command` to the OS keyboard lock.
///
/// # Errors
///
/// Returns the [`CommandError`] of the underlying OS command.
pub fn apply_remote_command(command: RemoteCommand, os: &dyn OsCommand) -> Result<(), CommandError> {
    let locked = command.locks_keyboard();
    info!(%command, locked, "applying remote command");
    os.set_keyboard_lock(locked)
}
