//! Stateless routing of inbound method calls to scheduler operations.
//!
//! Routing is two explicit string lookups: slot paths accept `display`
//! and `close`; the service root accepts the creation requests and
//! `info`. Unknown methods are left for the transport's default error
//! path, unknown objects become an explicit protocol error.

use serde_json::Value;

use crate::bus::protocol::error_name;
use crate::catalog::{AdhocKind, SERVICE_PATH};
use crate::scheduler::{CloseError, CreateError, DisplayError, Scheduler};
use crate::slot::PromptPath;
use crate::version::ServiceInfo;

/// An inbound method call, decoupled from its wire framing.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub path: String,
    pub method: String,
    pub args: Vec<Value>,
}

impl MethodCall {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }
}

/// Successful method return values.
#[derive(Debug)]
pub enum MethodReturn {
    /// `display` succeeded.
    Unit,
    /// `close` reply: the captured response code.
    Code(i32),
    /// Creation reply: the new slot's identifier.
    Path(PromptPath),
    /// `info` reply.
    Info(Value),
}

impl MethodReturn {
    /// Wire value for the reply message.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Unit => None,
            Self::Code(code) => Some(Value::from(code)),
            Self::Path(path) => Some(Value::String(path.as_str().to_string())),
            Self::Info(value) => Some(value),
        }
    }
}

/// Protocol-level failures, recovered locally into error replies.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no prompt object at {0}")]
    UnknownObject(String),
    #[error("prompt already in flight")]
    InUse { last_response: i32 },
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("service is shutting down")]
    ShuttingDown,
}

impl DispatchError {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnknownObject(_) => error_name::UNKNOWN_OBJECT,
            Self::InUse { .. } => error_name::IN_USE,
            Self::InvalidArgs(_) => error_name::INVALID_ARGS,
            Self::ShuttingDown => error_name::SHUTTING_DOWN,
        }
    }

    /// Busy conflicts carry the in-flight outcome.
    pub fn response_code(&self) -> Option<i32> {
        match self {
            Self::InUse { last_response } => Some(*last_response),
            _ => None,
        }
    }
}

/// Outcome of routing one call.
#[derive(Debug)]
pub enum Dispatch {
    Replied(Result<MethodReturn, DispatchError>),
    /// Unknown method name; the transport applies its default error path.
    NotHandled,
}

/// Methods accepted on slot paths.
#[derive(Debug, Clone, Copy)]
enum SlotMethod {
    Display,
    Close,
}

fn slot_method(name: &str) -> Option<SlotMethod> {
    match name {
        "display" => Some(SlotMethod::Display),
        "close" => Some(SlotMethod::Close),
        _ => None,
    }
}

/// Route one inbound call to a scheduler operation.
pub fn dispatch(scheduler: &mut Scheduler, call: &MethodCall) -> Dispatch {
    if call.path == SERVICE_PATH {
        return dispatch_service(scheduler, call);
    }

    match slot_method(&call.method) {
        Some(SlotMethod::Display) => {
            let argument = call.args.first().cloned();
            Dispatch::Replied(match scheduler.display(&call.path, argument) {
                Ok(()) => Ok(MethodReturn::Unit),
                Err(DisplayError::NotFound(path)) => Err(DispatchError::UnknownObject(path)),
                Err(DisplayError::InUse { last_response }) => {
                    Err(DispatchError::InUse { last_response })
                }
            })
        }
        Some(SlotMethod::Close) => Dispatch::Replied(match scheduler.close(&call.path) {
            Ok(code) => Ok(MethodReturn::Code(code)),
            Err(CloseError::NotFound(path)) => Err(DispatchError::UnknownObject(path)),
        }),
        None => {
            tracing::debug!(path = %call.path, method = %call.method, "method not handled");
            Dispatch::NotHandled
        }
    }
}

fn dispatch_service(scheduler: &mut Scheduler, call: &MethodCall) -> Dispatch {
    if let Some(kind) = AdhocKind::lookup(&call.method) {
        return Dispatch::Replied(match scheduler.create_adhoc(kind, &call.args) {
            Ok(path) => Ok(MethodReturn::Path(path)),
            Err(CreateError::InvalidArgs(message)) => Err(DispatchError::InvalidArgs(message)),
        });
    }

    if call.method == "info" {
        let info = ServiceInfo::gather(scheduler);
        let value = serde_json::to_value(&info).unwrap_or(Value::Null);
        return Dispatch::Replied(Ok(MethodReturn::Info(value)));
    }

    tracing::debug!(method = %call.method, "service method not handled");
    Dispatch::NotHandled
}
