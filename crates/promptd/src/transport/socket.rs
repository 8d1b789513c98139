//! Unix-domain-socket server for the bus surface.
//!
//! One task per connection. Calls are forwarded to the event loop through
//! the mailbox and every reply is written and flushed before the next
//! frame from that client is read; outcome signals are fanned out to all
//! connected clients.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bus::SocketBus;
use crate::bus::codec::WireCodec;
use crate::bus::protocol::{ClientMessage, ServerMessage, error_name};
use crate::dispatch::{Dispatch, MethodCall};
use crate::service::Mailbox;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
}

impl ServerConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }
}

/// Accept clients until the shutdown watch flips.
///
/// A stale socket file from a previous run is removed before binding.
pub async fn serve(
    config: ServerConfig,
    mailbox: Mailbox,
    bus: Arc<SocketBus>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)?;
    tracing::info!(path = %config.socket_path.display(), "bus socket listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let mailbox = mailbox.clone();
                    let signals = bus.subscribe();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, mailbox, signals).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            },

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("bus socket shut down");
    let _ = std::fs::remove_file(&config.socket_path);
    Ok(())
}

async fn serve_connection(
    stream: UnixStream,
    mailbox: Mailbox,
    mut signals: broadcast::Receiver<ServerMessage>,
) -> io::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, WireCodec::<ClientMessage>::new());
    let mut writer = FramedWrite::new(write_half, WireCodec::<ServerMessage>::new());

    loop {
        tokio::select! {
            inbound = reader.next() => match inbound {
                Some(Ok(ClientMessage::Call { serial, path, method, args })) => {
                    let call = MethodCall { path, method, args };
                    let outcome = mailbox.call(call).await;
                    // send() flushes; the reply is on the wire before the
                    // next frame from this client is read.
                    writer.send(reply_message(serial, outcome)).await?;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "dropping client after bad frame");
                    return Err(e);
                }
                None => return Ok(()),
            },

            signal = signals.recv() => match signal {
                Ok(message) => writer.send(message).await?,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "client fell behind the signal stream");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

fn reply_message(serial: u64, outcome: Dispatch) -> ServerMessage {
    match outcome {
        Dispatch::Replied(Ok(ret)) => ServerMessage::Reply {
            serial,
            value: ret.into_value(),
        },
        Dispatch::Replied(Err(err)) => ServerMessage::Error {
            serial,
            name: err.name().to_string(),
            message: err.to_string(),
            response_code: err.response_code(),
        },
        Dispatch::NotHandled => ServerMessage::Error {
            serial,
            name: error_name::UNKNOWN_METHOD.to_string(),
            message: "method not handled".to_string(),
            response_code: None,
        },
    }
}
