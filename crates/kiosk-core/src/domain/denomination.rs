//! Cash denomination table for the bill acceptor.
//!
//! The bill acceptor emits one key press per recognised note.  Each
//! denomination is bound to a set of symbolic keys (typically a top-row digit
//! and its keypad twin).  A key may belong to at most one denomination, so a
//! single key press can never be counted as two different amounts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keymap::SymbolicKey;

/// Errors that can occur when building a [`DenominationTable`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DenominationError {
    /// The same key is bound to two different amounts.
    #[error("key {key} is bound to both {first} and {second}")]
    OverlappingKey {
        key: SymbolicKey,
        first: u32,
        second: u32,
    },

    /// A binding has no keys.
    #[error("denomination {0} has no keys")]
    NoKeys(u32),

    /// An amount of zero cannot be credited.
    #[error("denomination amount must be positive")]
    ZeroAmount,
}

/// A cash amount and the keys that report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenominationBinding {
    /// Whole currency units credited when any of `keys` fires.
    pub amount: u32,
    /// Keys reporting this amount.
    pub keys: Vec<SymbolicKey>,
}

impl DenominationBinding {
    /// Convenience constructor for static key lists.
    pub fn new(amount: u32, keys: &[&'static str]) -> Self {
        Self {
            amount,
            keys: keys.iter().copied().map(SymbolicKey::from_static).collect(),
        }
    }
}

/// A validated, immutable set of denomination bindings.
///
/// Construct with [`DenominationTable::new`], which rejects overlapping keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenominationTable {
    bindings: Vec<DenominationBinding>,
}

impl DenominationTable {
    /// Validates `bindings` and builds the table.
    ///
    /// # Errors
    ///
    /// - [`DenominationError::ZeroAmount`] for a zero amount.
    /// - [`DenominationError::NoKeys`] for a binding without keys.
    /// - [`DenominationError::OverlappingKey`] when a key appears under two
    ///   different amounts.  Repeating a key inside one binding is allowed.
    pub fn new(bindings: Vec<DenominationBinding>) -> Result<Self, DenominationError> {
        let mut owner: HashMap<&SymbolicKey, u32> = HashMap::new();
        for binding in &bindings {
            if binding.amount == 0 {
                return Err(DenominationError::ZeroAmount);
            }
            if binding.keys.is_empty() {
                return Err(DenominationError::NoKeys(binding.amount));
            }
            for key in &binding.keys {
                match owner.get(key) {
                    Some(&first) if first != binding.amount => {
                        return Err(DenominationError::OverlappingKey {
                            key: key.clone(),
                            first,
                            second: binding.amount,
                        });
                    }
                    _ => {
                        owner.insert(key, binding.amount);
                    }
                }
            }
        }
        Ok(Self { bindings })
    }

    /// The Brazilian real table used by the terminal's bill acceptor.
    pub fn default_brl() -> Self {
        Self {
            bindings: vec![
                DenominationBinding::new(2, &["2", "kp_2"]),
                DenominationBinding::new(5, &["3", "kp_3"]),
                DenominationBinding::new(10, &["4", "kp_4"]),
                DenominationBinding::new(20, &["5", "kp_5"]),
                DenominationBinding::new(50, &["6", "kp_6"]),
                DenominationBinding::new(100, &["7", "kp_7"]),
            ],
        }
    }

    /// All bindings in declaration order.
    pub fn bindings(&self) -> &[DenominationBinding] {
        &self.bindings
    }

    /// Returns the amount bound to `key`, if any.
    pub fn amount_for(&self, key: &SymbolicKey) -> Option<u32> {
        self.bindings
            .iter()
            .find(|b| b.keys.contains(key))
            .map(|b| b.amount)
    }
}

impl Default for DenominationTable {
    fn default() -> Self {
        Self::default_brl()
    }
}
