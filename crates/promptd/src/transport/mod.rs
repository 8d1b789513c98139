//! Transport layer for the bus surface.
//!
//! Currently a Unix-domain-socket server; the scheduler side only ever
//! sees the [`Mailbox`](crate::service::Mailbox) and [`Bus`](crate::bus::Bus)
//! seams, so other transports can be added as submodules.

pub mod socket;

pub use socket::{ServerConfig, serve};
