//! promptd daemon: terminal presenter, Unix-socket bus transport.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use promptd::bus::SocketBus;
use promptd::transport::{ServerConfig, serve};
use promptd::{Scheduler, builtin_prompts, mailbox, reply_channel, run};

mod tty;

#[derive(Parser, Debug)]
#[command(name = "promptd", about = "Serializes modal prompts requested over IPC", version)]
struct Args {
    /// Unix socket path for the bus transport.
    #[arg(long, default_value = "/tmp/promptd.sock")]
    socket: PathBuf,

    /// Seconds without queued or shown prompts before the daemon exits.
    #[arg(long, default_value_t = 15)]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let bus = Arc::new(SocketBus::new());
    let (reply_tx, reply_rx) = reply_channel();
    let presenter = tty::TerminalPresenter::spawn();
    let scheduler = Scheduler::new(
        builtin_prompts(),
        Box::new(presenter),
        bus.clone(),
        reply_tx,
        Duration::from_secs(args.idle_timeout),
    );

    let (mailbox, calls_rx) = mailbox();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(run(scheduler, calls_rx, reply_rx, shutdown_tx));

    serve(
        ServerConfig::new(args.socket),
        mailbox,
        bus,
        with_signals(shutdown_rx),
    )
    .await?;

    Ok(())
}

/// Merge OS termination signals into the scheduler's shutdown watch.
fn with_signals(scheduler_rx: watch::Receiver<bool>) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let mut scheduler_rx = scheduler_rx;

        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install SIGINT handler");
        };

        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };

        let scheduler_done = async {
            while !*scheduler_rx.borrow() {
                if scheduler_rx.changed().await.is_err() {
                    break;
                }
            }
        };

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
            _ = terminate => tracing::info!("received SIGTERM, shutting down"),
            _ = scheduler_done => {}
        }
        let _ = tx.send(true);
    });
    rx
}
