//! promptd: serialized presentation of modal prompts requested over IPC.
//!
//! Other processes ask for prompts by object path; the scheduler shows at
//! most one at a time, picks the next by priority, reports each outcome as
//! a broadcast signal, and shuts the process down after an idle period.

pub mod bus;
pub mod catalog;
pub mod dispatch;
pub mod presenter;
pub mod response;
pub mod scheduler;
pub mod service;
pub mod slot;
pub mod transport;
mod version;

pub use catalog::{ADHOC_KINDS, AdhocKind, SERVICE_PATH, builtin_prompts};
pub use dispatch::{Dispatch, DispatchError, MethodCall, MethodReturn, dispatch};
pub use presenter::{Presenter, PromptSurface};
pub use response::{
    NO_RESPONSE, PromptReply, ReplyEvent, ResponseChannel, ResponseEncoding, reply_channel,
};
pub use scheduler::{CloseError, CreateError, DisplayError, Scheduler};
pub use service::{Mailbox, mailbox, run};
pub use slot::{PromptPath, PromptSpec, Slot, SlotState};
pub use version::{PROMPTD_VERSION, ServiceInfo};
