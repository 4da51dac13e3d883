//! Hook for closing terminal dialogs when a transaction concludes.

use crate::engine::WeakEngine;

/// Presents (and dismisses) the terminal's transaction dialog on the POS.
///
/// The engine calls [`close_dialog`](Self::close_dialog) once for every
/// response whose kind is the paired response of the last request that
/// started a transaction.
pub trait DialogHandler: Send + Sync {
    /// Closes any open transaction dialog.
    fn close_dialog(&self);

    /// Called once when the handler is installed on an engine, so it can
    /// forward key presses back through it.
    fn attach(&self, engine: WeakEngine) {
        let _ = engine;
    }
}
