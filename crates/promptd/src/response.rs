//! User outcomes and their response-code encodings.
//!
//! Surfaces hand discrete outcomes to the scheduler through a
//! [`ResponseChannel`]; the scheduler encodes them per slot kind and
//! emits the resulting code on the bus.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::slot::PromptPath;

/// Sentinel meaning "no response yet" or "dismissed without a choice".
pub const NO_RESPONSE: i32 = -1;

/// Discrete outcome reported by a prompt surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReply {
    /// The affirmative button.
    Accepted,
    /// The negative button.
    Declined,
    /// Toolkit-level dismissal without an explicit choice.
    Dismissed,
    /// Dual-checkbox prompts: which boxes were checked on accept.
    Options { first: bool, second: bool },
}

/// How a slot kind maps replies to response codes.
///
/// Fixed per kind, never mixed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEncoding {
    /// Accept = 0, decline = 1, anything else = -1.
    Choice,
    /// Bitmask of checked boxes; decline = 1, dismissal = -1.
    OptionMask,
}

impl ResponseEncoding {
    pub fn encode(&self, reply: &PromptReply) -> i32 {
        match self {
            Self::Choice => match reply {
                PromptReply::Accepted => 0,
                PromptReply::Declined => 1,
                _ => NO_RESPONSE,
            },
            Self::OptionMask => match reply {
                PromptReply::Options { first, second } => {
                    (*first as i32) | ((*second as i32) << 1)
                }
                PromptReply::Accepted => 0,
                PromptReply::Declined => 1,
                PromptReply::Dismissed => NO_RESPONSE,
            },
        }
    }
}

/// A reply routed back to the scheduler's event loop.
#[derive(Debug)]
pub struct ReplyEvent {
    pub path: PromptPath,
    pub reply: PromptReply,
}

pub type ReplySender = mpsc::UnboundedSender<ReplyEvent>;
pub type ReplyReceiver = mpsc::UnboundedReceiver<ReplyEvent>;

pub fn reply_channel() -> (ReplySender, ReplyReceiver) {
    mpsc::unbounded_channel()
}

/// Per-surface handle for submitting the user's outcome.
///
/// Cloned into every materialized surface; submissions are queued and
/// processed by the event loop after the current event completes.
#[derive(Debug, Clone)]
pub struct ResponseChannel {
    path: PromptPath,
    tx: ReplySender,
}

impl ResponseChannel {
    pub fn new(path: PromptPath, tx: ReplySender) -> Self {
        Self { path, tx }
    }

    pub fn path(&self) -> &PromptPath {
        &self.path
    }

    pub fn submit(&self, reply: PromptReply) {
        if self
            .tx
            .send(ReplyEvent {
                path: self.path.clone(),
                reply,
            })
            .is_err()
        {
            tracing::warn!(path = %self.path, "scheduler gone, dropping prompt reply");
        }
    }
}
