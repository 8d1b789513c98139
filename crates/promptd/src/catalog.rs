//! The fixed prompt catalog: built-in reusable slots and the named
//! creation requests that allocate one-shot slots.

use crate::response::ResponseEncoding;
use crate::slot::PromptSpec;

/// Root object path of the service. Creation requests and the info
/// method are addressed here; slots live underneath it.
pub const SERVICE_PATH: &str = "/org/promptd";

fn builtin(kind: &str, priority: i32, encoding: ResponseEncoding) -> PromptSpec {
    PromptSpec::reusable(format!("{SERVICE_PATH}/{kind}"), kind, priority, encoding)
}

/// The built-in catalog, in table order.
///
/// Table order matters: it is the tie-break for equal-priority scheduling.
pub fn builtin_prompts() -> Vec<PromptSpec> {
    vec![
        builtin("bt_disconnected", 1, ResponseEncoding::Choice),
        builtin("disclaimer", 5, ResponseEncoding::Choice),
        builtin("enable_gps", 3, ResponseEncoding::Choice),
        builtin("enable_network", 3, ResponseEncoding::Choice),
        builtin("enable_positioning", 5, ResponseEncoding::OptionMask),
        builtin("enable_agnss", 2, ResponseEncoding::Choice),
        builtin("bt_disabled", 1, ResponseEncoding::Choice),
    ]
}

/// A named creation request accepted on [`SERVICE_PATH`].
///
/// Each allocates a one-shot slot parameterized by the call arguments.
#[derive(Debug, Clone, Copy)]
pub struct AdhocKind {
    /// Method name on the service root, also the prompt kind name.
    pub request: &'static str,
    pub priority: i32,
    pub encoding: ResponseEncoding,
    /// Number of leading string arguments the request must carry.
    pub required_args: usize,
}

/// The creation-request catalog.
pub const ADHOC_KINDS: &[AdhocKind] = &[
    AdhocKind {
        request: "location_verification",
        priority: 4,
        encoding: ResponseEncoding::Choice,
        required_args: 2,
    },
    AdhocKind {
        request: "location_information",
        priority: 2,
        encoding: ResponseEncoding::Choice,
        required_args: 2,
    },
    AdhocKind {
        request: "location_timeout",
        priority: 2,
        encoding: ResponseEncoding::Choice,
        required_args: 2,
    },
    AdhocKind {
        request: "location_expired",
        priority: 2,
        encoding: ResponseEncoding::Choice,
        required_args: 2,
    },
    AdhocKind {
        request: "location_default_supl",
        priority: 2,
        encoding: ResponseEncoding::Choice,
        required_args: 2,
    },
];

impl AdhocKind {
    pub fn lookup(request: &str) -> Option<&'static AdhocKind> {
        ADHOC_KINDS.iter().find(|kind| kind.request == request)
    }
}
