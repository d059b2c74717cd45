//! Request-scoped, set-once completion token.
//!
//! Forwarders report through a [`Completion`] rather than a return value so they
//! can hand the caller its result and keep working on the socket afterwards
//! (draining a tunnel, keeping a WebSocket open). The dispatcher holds a clone to
//! report errors; whichever side completes first wins and later calls are no-ops.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

pub struct Completion<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> std::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Create a completion token and the receiver its single value arrives on.
pub fn channel<T>() -> (Completion<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Completion {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

impl<T> Completion<T> {
    /// Deliver `value` if nothing was delivered yet.
    ///
    /// Returns `true` only for the call that delivered to a live receiver.
    pub fn complete(&self, value: T) -> bool {
        let sender = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        match sender {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }

    /// The receiver is gone: the caller disconnected or the value was delivered.
    pub fn is_abandoned(&self) -> bool {
        match self.slot.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }
}
