//! Operating-system side effects: NumLock state and the Alt+F4 lock.
//!
//! On Linux these shell out to `numlockx` and `xmodmap` against the local X
//! display.  Both tools are synchronous and quick, so the trait is blocking;
//! callers already run on the blocking pool.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

/// X display targeted by `numlockx`.
const X_DISPLAY: &str = ":0";

/// Error type for OS command execution.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} {args} exited with {status}")]
    Failed {
        program: &'static str,
        args: String,
        status: std::process::ExitStatus,
    },
}

/// OS-level controls the terminal needs.
#[cfg_attr(test, mockall::automock)]
pub trait OsCommand: Send + Sync {
    /// Turns NumLock on or off.
    fn set_numlock(&self, enabled: bool) -> Result<(), CommandError>;
    /// `true` disables Alt+F4 so customers cannot close the browser;
    /// `false` restores it.
    fn set_keyboard_lock(&self, locked: bool) -> Result<(), CommandError>;
}

/// One external program call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: &'static str,
    pub args: Vec<&'static str>,
    pub env: Vec<(&'static str, &'static str)>,
}

/// `numlockx on|off` against the local display.
pub fn numlock_invocation(enabled: bool) -> Invocation {
    Invocation {
        program: "numlockx",
        args: vec![if enabled { "on" } else { "off" }],
        env: vec![("DISPLAY", X_DISPLAY)],
    }
}

/// `xmodmap` calls remapping Alt_L (keycode 64) and F4 (keycode 70).
pub fn keyboard_lock_invocations(locked: bool) -> [Invocation; 2] {
    let (alt, f4) = if locked {
        ("keycode 64 = NoSymbol", "keycode 70 = NoSymbol")
    } else {
        ("keycode 64 = Alt_L", "keycode 70 = F4")
    };
    [alt, f4].map(|expr| Invocation {
        program: "xmodmap",
        args: vec!["-e", expr],
        env: Vec::new(),
    })
}

fn run(invocation: &Invocation) -> Result<(), CommandError> {
    debug!(program = invocation.program, args = ?invocation.args, "running");
    let status = Command::new(invocation.program)
        .args(&invocation.args)
        .envs(invocation.env.iter().copied())
        .status()
        .map_err(|source| CommandError::Spawn {
            program: invocation.program,
            source,
        })?;
    if !status.success() {
        return Err(CommandError::Failed {
            program: invocation.program,
            args: invocation.args.join(" "),
            status,
        });
    }
    Ok(())
}

/// Linux implementation shelling out to the X tools.
#[derive(Debug, Default)]
pub struct LinuxCommand;

impl OsCommand for LinuxCommand {
    fn set_numlock(&self, enabled: bool) -> Result<(), CommandError> {
        run(&numlock_invocation(enabled))?;
        info!(enabled, "NumLock set");
        Ok(())
    }

    fn set_keyboard_lock(&self, locked: bool) -> Result<(), CommandError> {
        // Stops at the first failure, leaving F4 untouched if Alt failed.
        for invocation in &keyboard_lock_invocations(locked) {
            run(invocation)?;
        }
        info!(locked, "Alt+F4 lock set");
        Ok(())
    }
}

/// Implementation for platforms without the X tools; logs and succeeds.
#[derive(Debug, Default)]
pub struct NoopCommand;

impl OsCommand for NoopCommand {
    fn set_numlock(&self, enabled: bool) -> Result<(), CommandError> {
        info!(enabled, "NumLock change skipped on this platform");
        Ok(())
    }

    fn set_keyboard_lock(&self, locked: bool) -> Result<(), CommandError> {
        info!(locked, "Alt+F4 lock skipped on this platform");
        Ok(())
    }
}

/// The OS command implementation for the current platform.
pub fn platform_command() -> Box<dyn OsCommand> {
    if cfg!(target_os = "linux") {
        Box::new(LinuxCommand)
    } else {
        Box::new(NoopCommand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numlock_invocation_targets_local_display() {
        let on = numlock_invocation(true);
        assert_eq!(on.program, "numlockx");
        assert_eq!(on.args, vec!["on"]);
        assert_eq!(on.env, vec![("DISPLAY", ":0")]);
        assert_eq!(numlock_invocation(false).args, vec!["off"]);
    }

    #[test]
    fn test_keyboard_lock_clears_alt_and_f4() {
        let calls = keyboard_lock_invocations(true);
        assert_eq!(calls[0].args, vec!["-e", "keycode 64 = NoSymbol"]);
        assert_eq!(calls[1].args, vec!["-e", "keycode 70 = NoSymbol"]);
        assert!(calls.iter().all(|c| c.program == "xmodmap"));
    }

    #[test]
    fn test_keyboard_unlock_restores_alt_and_f4() {
        let calls = keyboard_lock_invocations(false);
        assert_eq!(calls[0].args, vec!["-e", "keycode 64 = Alt_L"]);
        assert_eq!(calls[1].args, vec!["-e", "keycode 70 = F4"]);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let bogus = Invocation {
            program: "kiosk-terminal-no-such-program",
            args: Vec::new(),
            env: Vec::new(),
        };
        assert!(matches!(run(&bogus), Err(CommandError::Spawn { .. })));
    }

    #[test]
    fn test_noop_command_always_succeeds() {
        assert!(NoopCommand.set_numlock(true).is_ok());
        assert!(NoopCommand.set_keyboard_lock(true).is_ok());
    }
}
