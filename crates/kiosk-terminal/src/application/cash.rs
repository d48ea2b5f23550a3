//! Cash-note recognizer.
//!
//! The bill acceptor reports each accepted note as a key press: one key (or
//! its keypad twin) per denomination.  [`CashRecognizer`] subscribes to
//! every key of its [`DenominationTable`] and reports the matching amount to
//! the accounting callback.
//!
//! The acceptor bounces; a note is credited once because the dispatcher
//! drops repeats of a key within its debounce window.

use std::sync::Arc;

use kiosk_core::{DenominationTable, InputEvent};
use tracing::{debug, info};

use crate::infrastructure::input_capture::InputBackend;

/// Called with the note amount, in whole currency units, once per
/// accepted note.  Runs on a dispatcher thread and must not block for long.
pub type NoteCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Turns denomination key presses into credited amounts.
pub struct CashRecognizer {
    table: DenominationTable,
    on_note_accepted: NoteCallback,
}

impl CashRecognizer {
    pub fn new(table: DenominationTable, on_note_accepted: NoteCallback) -> Self {
        Self {
            table,
            on_note_accepted,
        }
    }

    pub fn table(&self) -> &DenominationTable {
        &self.table
    }

    /// Registers one subscriber per denomination on `backend`.
    pub fn register(&self, backend: &dyn InputBackend) {
        for binding in self.table.bindings() {
            let amount = binding.amount;
            let callback = Arc::clone(&self.on_note_accepted);
            backend.register(
                &binding.keys,
                Arc::new(move |event: &InputEvent| {
                    info!(amount, key = %event.key, "note accepted");
                    callback(amount);
                }),
            );
            debug!(amount, keys = binding.keys.len(), "denomination registered");
        }
    }
}
