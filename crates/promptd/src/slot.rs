//! Prompt slot descriptors and per-slot runtime state.

use serde::{Deserialize, Serialize};

use crate::presenter::PromptSurface;
use crate::response::{NO_RESPONSE, ResponseEncoding};

/// Stable external address of a prompt slot.
///
/// Used for routing inbound calls, for outcome signals, and for
/// registration with the bus. Unique among all live slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptPath(String);

impl PromptPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PromptPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PromptPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No request in flight.
    Idle,
    /// Admitted, waiting for activation.
    Queued,
    /// Currently presented to the user.
    Active,
    /// Answered, waiting for the requester to close it.
    Closed,
}

impl SlotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

/// Static identity of a prompt slot.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    /// External address, unique among all slots.
    pub path: PromptPath,
    /// Prompt kind name the presenter dispatches on.
    pub kind: String,
    /// Higher wins; ties go to the slot earlier in table order.
    pub priority: i32,
    /// How user outcomes map to response codes.
    pub encoding: ResponseEncoding,
    /// Catalog slots survive close and cycle back to idle; one-shot
    /// slots are removed from the table after a single close.
    pub reusable: bool,
}

impl PromptSpec {
    /// A built-in catalog slot, retained across activations.
    pub fn reusable(
        path: impl Into<String>,
        kind: impl Into<String>,
        priority: i32,
        encoding: ResponseEncoding,
    ) -> Self {
        Self {
            path: PromptPath::new(path),
            kind: kind.into(),
            priority,
            encoding,
            reusable: true,
        }
    }

    /// A one-shot slot created on client request.
    pub fn one_shot(
        path: PromptPath,
        kind: impl Into<String>,
        priority: i32,
        encoding: ResponseEncoding,
    ) -> Self {
        Self {
            path,
            kind: kind.into(),
            priority,
            encoding,
            reusable: false,
        }
    }
}

/// One schedulable prompt: static identity plus runtime state.
///
/// Storage only - the scheduler mutates the crate-visible fields directly.
pub struct Slot {
    pub(crate) spec: PromptSpec,
    pub(crate) state: SlotState,
    pub(crate) argument: Option<serde_json::Value>,
    pub(crate) response_code: i32,
    pub(crate) surface: Option<Box<dyn PromptSurface>>,
    pub(crate) request_args: Vec<serde_json::Value>,
}

impl Slot {
    pub fn new(spec: PromptSpec) -> Self {
        Self {
            spec,
            state: SlotState::Idle,
            argument: None,
            response_code: NO_RESPONSE,
            surface: None,
            request_args: Vec::new(),
        }
    }

    /// A one-shot slot carrying the arguments supplied at creation time.
    pub fn with_request_args(spec: PromptSpec, request_args: Vec<serde_json::Value>) -> Self {
        Self {
            request_args,
            ..Self::new(spec)
        }
    }

    pub fn spec(&self) -> &PromptSpec {
        &self.spec
    }

    pub fn path(&self) -> &PromptPath {
        &self.spec.path
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn response_code(&self) -> i32 {
        self.response_code
    }

    /// Opaque data supplied by the requester at display time.
    pub fn argument(&self) -> Option<&serde_json::Value> {
        self.argument.as_ref()
    }

    /// Arguments supplied when the slot was created (one-shot slots only).
    pub fn request_args(&self) -> &[serde_json::Value] {
        &self.request_args
    }

    /// Back to idle: argument consumed, outcome forgotten.
    pub(crate) fn reset(&mut self) {
        self.state = SlotState::Idle;
        self.argument = None;
        self.response_code = NO_RESPONSE;
    }
}
