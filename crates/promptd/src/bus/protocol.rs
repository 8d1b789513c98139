//! Wire message types for the bus transport.
//!
//! One inbound shape (method calls) and three outbound shapes (replies,
//! errors, signals). Frames are newline-delimited JSON; see
//! [`codec`](super::codec).

use serde::{Deserialize, Serialize};

/// Messages from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A named method call addressed to an object path.
    Call {
        /// Client-chosen correlation id, echoed in the reply.
        serial: u64,
        path: String,
        method: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },
}

/// Messages from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Successful method return.
    Reply {
        serial: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<serde_json::Value>,
    },

    /// Protocol-level failure of a method call.
    Error {
        serial: u64,
        name: String,
        message: String,
        /// The in-flight outcome, carried on busy conflicts so the caller
        /// can observe the prior result without blocking.
        #[serde(skip_serializing_if = "Option::is_none")]
        response_code: Option<i32>,
    },

    /// Broadcast notification emitted on a slot's path.
    Signal { path: String, name: String, code: i32 },
}

/// Well-known error reply names.
pub mod error_name {
    pub const UNKNOWN_OBJECT: &str = "unknown_object";
    pub const UNKNOWN_METHOD: &str = "unknown_method";
    pub const IN_USE: &str = "in_use";
    pub const INVALID_ARGS: &str = "invalid_args";
    pub const SHUTTING_DOWN: &str = "shutting_down";
}

/// Name of the outcome signal emitted when a prompt is answered.
pub const RESPONSE_SIGNAL: &str = "response";
