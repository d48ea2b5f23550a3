//! Key code translation tables for the terminal's input backends.
//!
//! The canonical representation is the [`SymbolicKey`] token.  Each backend
//! speaks its own raw code space, so each gets its own table:
//!
//! - [`EvdevKeyMap`] for Linux input event codes read from `/dev/input/event*`.
//! - [`HookKeyMap`] for key codes delivered by the global keyboard hook.
//!
//! The two tables are independent: the same raw number can mean different
//! keys in the two spaces (code 79 is `"kp_1"` for evdev and `"kp_7"` for the
//! hook).

pub mod evdev;
pub mod hook;
pub mod symbol;

pub use symbol::SymbolicKey;

/// Translation from a backend's raw key code to a [`SymbolicKey`].
///
/// Implementations are pure lookups: no allocation for table hits, no I/O,
/// and never panic for any input.
pub trait KeyCodeMap: Send + Sync {
    /// Resolves a raw code.  Returns `None` for codes the table does not know;
    /// callers silently ignore those.
    fn resolve(&self, code: u16) -> Option<SymbolicKey>;
}

/// Table for Linux input event codes (`linux/input-event-codes.h`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EvdevKeyMap;

impl KeyCodeMap for EvdevKeyMap {
    fn resolve(&self, code: u16) -> Option<SymbolicKey> {
        evdev::code_to_symbol(code).map(SymbolicKey::from_static)
    }
}

/// Table for key codes delivered by the global keyboard hook.
///
/// Remote-desktop sessions sometimes shift the top-row digit codes by a fixed
/// amount.  When `keycode_offset` is set, codes `10..=20` are corrected by
/// that offset before lookup, but only if the corrected code maps to a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookKeyMap {
    keycode_offset: Option<i32>,
}

/// Codes subject to the remote-desktop keycode correction.
const OFFSET_RANGE: std::ops::RangeInclusive<u16> = 10..=20;

/// Character the hook reports when it has no printable key character.
const NO_CHAR: char = '\u{FFFF}';

impl HookKeyMap {
    /// Creates a table with no keycode correction.
    pub const fn new() -> Self {
        Self { keycode_offset: None }
    }

    /// Creates a table applying `offset` to the top-row digit codes.
    pub const fn with_offset(offset: i32) -> Self {
        Self {
            keycode_offset: Some(offset),
        }
    }

    /// Returns the configured keycode correction, if any.
    pub fn keycode_offset(&self) -> Option<i32> {
        self.keycode_offset
    }

    /// Resolves `code`, falling back to the OS-supplied `keychar` when the
    /// table has no entry and the character is printable.
    ///
    /// The table always wins over the character: remote-desktop tools are
    /// known to deliver a wrong character alongside a correct code.
    pub fn resolve_with_char(&self, code: u16, keychar: Option<char>) -> Option<SymbolicKey> {
        if let Some(key) = self.resolve(code) {
            return Some(key);
        }
        keychar
            .filter(|c| *c != NO_CHAR && !c.is_control())
            .map(SymbolicKey::from)
    }

    fn corrected(&self, code: u16) -> Option<&'static str> {
        let offset = self.keycode_offset?;
        if !OFFSET_RANGE.contains(&code) {
            return None;
        }
        let shifted = i32::from(code)
            .checked_add(offset)
            .and_then(|c| u16::try_from(c).ok())?;
        let symbol = hook::code_to_symbol(shifted)?;
        tracing::debug!(code, shifted, symbol, "hook keycode corrected");
        Some(symbol)
    }
}

impl KeyCodeMap for HookKeyMap {
    fn resolve(&self, code: u16) -> Option<SymbolicKey> {
        self.corrected(code)
            .or_else(|| hook::code_to_symbol(code))
            .map(SymbolicKey::from_static)
    }
}
