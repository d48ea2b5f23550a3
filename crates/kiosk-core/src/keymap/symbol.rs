//! The symbolic key vocabulary shared by every input backend.
//!
//! A [`SymbolicKey`] is the only key representation visible to the dispatcher
//! and its subscribers.  Tokens follow a small naming convention:
//!
//! | Token        | Meaning                               |
//! |--------------|---------------------------------------|
//! | `"0"`–`"9"`  | top-row digit keys                    |
//! | `"kp_0"`…    | numeric keypad digits                 |
//! | `"a"`–`"z"`  | letter keys (lowercase)               |
//! | `" "`        | space bar                             |
//! | `"up"`       | arrow keys (`up`, `down`, …)          |
//! | `"super"`    | the Super / Windows key               |
//!
//! Top-row and keypad digits are deliberately different tokens so a
//! subscriber can bind one, the other, or both.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical token naming one logical input.
///
/// Static table entries are stored without allocation; tokens built at
/// runtime (configuration, hook key characters) own their string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolicKey(Cow<'static, str>);

impl SymbolicKey {
    /// Wraps a static token without allocating.
    pub const fn from_static(token: &'static str) -> Self {
        Self(Cow::Borrowed(token))
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for SymbolicKey {
    fn from(token: &'static str) -> Self {
        Self::from_static(token)
    }
}

impl From<String> for SymbolicKey {
    fn from(token: String) -> Self {
        Self(Cow::Owned(token))
    }
}

impl From<char> for SymbolicKey {
    fn from(c: char) -> Self {
        Self(Cow::Owned(c.to_string()))
    }
}

impl AsRef<str> for SymbolicKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
