//! Bus seam: addressed delivery of replies and signals.
//!
//! The scheduler talks to the bus through the [`Bus`] trait only; the
//! concrete [`SocketBus`] fans signals out to every connected client of
//! the bundled Unix-socket transport.
//!
//! # Architecture
//!
//! - **protocol**: wire message types (ClientMessage/ServerMessage)
//! - **codec**: newline-delimited JSON framing for AsyncRead/AsyncWrite

pub mod codec;
pub mod protocol;

use std::collections::HashSet;
use std::sync::Mutex as StdMutex;

use tokio::sync::broadcast;

use crate::slot::PromptPath;

use self::protocol::{RESPONSE_SIGNAL, ServerMessage};

/// What the scheduler needs from the transport layer.
///
/// Calls are synchronous and non-blocking; implementations queue work for
/// their own IO tasks.
pub trait Bus: Send + Sync {
    /// Make an identifier addressable.
    fn register(&self, path: &PromptPath);

    /// Retract an identifier after its slot is destroyed.
    fn unregister(&self, path: &PromptPath);

    /// Emit the outcome signal on a slot's identifier.
    fn emit_response(&self, path: &PromptPath, code: i32);
}

/// Bus implementation backed by the Unix-socket transport.
///
/// Signals are broadcast to every connected client; the exported-path set
/// exists for introspection and tests, routing itself consults the slot
/// table.
pub struct SocketBus {
    signals: broadcast::Sender<ServerMessage>,
    exported: StdMutex<HashSet<String>>,
}

impl SocketBus {
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(64);
        Self {
            signals,
            exported: StdMutex::new(HashSet::new()),
        }
    }

    /// Subscribe a connection to the signal stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.signals.subscribe()
    }

    pub fn is_exported(&self, path: &str) -> bool {
        self.lock_exported().contains(path)
    }

    fn lock_exported(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        match self.exported.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SocketBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SocketBus {
    fn register(&self, path: &PromptPath) {
        tracing::debug!(%path, "exporting prompt path");
        self.lock_exported().insert(path.as_str().to_string());
    }

    fn unregister(&self, path: &PromptPath) {
        tracing::debug!(%path, "retracting prompt path");
        self.lock_exported().remove(path.as_str());
    }

    fn emit_response(&self, path: &PromptPath, code: i32) {
        let signal = ServerMessage::Signal {
            path: path.as_str().to_string(),
            name: RESPONSE_SIGNAL.to_string(),
            code,
        };
        // No subscribers is fine - nobody is listening for outcomes.
        let _ = self.signals.send(signal);
    }
}
