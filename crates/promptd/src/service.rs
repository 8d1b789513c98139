//! Single-reactor event loop around the scheduler.
//!
//! One task owns the [`Scheduler`] and processes one event to completion
//! at a time: inbound method calls (each carrying a oneshot reply slot),
//! prompt replies from surfaces, and the idle timer. Requests are handled
//! strictly in arrival order; nothing the scheduler does suspends
//! mid-flight.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::dispatch::{Dispatch, DispatchError, MethodCall, dispatch};
use crate::response::ReplyReceiver;
use crate::scheduler::Scheduler;

type CallEnvelope = (MethodCall, oneshot::Sender<Dispatch>);

pub type CallReceiver = mpsc::Receiver<CallEnvelope>;

/// Handle transports use to submit calls into the event loop.
#[derive(Clone)]
pub struct Mailbox {
    calls: mpsc::Sender<CallEnvelope>,
}

impl Mailbox {
    /// Submit one call and wait for its dispatch outcome.
    ///
    /// Returns a shutting-down error when the event loop is gone.
    pub async fn call(&self, call: MethodCall) -> Dispatch {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.calls.send((call, reply_tx)).await.is_err() {
            return Dispatch::Replied(Err(DispatchError::ShuttingDown));
        }
        match reply_rx.await {
            Ok(outcome) => outcome,
            Err(_) => Dispatch::Replied(Err(DispatchError::ShuttingDown)),
        }
    }
}

/// Create the call channel for the event loop.
pub fn mailbox() -> (Mailbox, CallReceiver) {
    let (calls, rx) = mpsc::channel(32);
    (Mailbox { calls }, rx)
}

/// Run the scheduler until idle shutdown or the call channel closes.
///
/// Flips the shutdown watch on exit so the transport can drain.
pub async fn run(
    mut scheduler: Scheduler,
    mut calls: CallReceiver,
    mut replies: ReplyReceiver,
    shutdown: watch::Sender<bool>,
) {
    loop {
        let idle = scheduler.idle_deadline();
        tokio::select! {
            biased;

            call = calls.recv() => match call {
                Some((call, reply_tx)) => {
                    let outcome = dispatch(&mut scheduler, &call);
                    if reply_tx.send(outcome).is_err() {
                        tracing::debug!(path = %call.path, "caller went away before the reply");
                    }
                }
                None => {
                    tracing::info!("call channel closed, stopping scheduler");
                    break;
                }
            },

            Some(event) = replies.recv() => {
                scheduler.retire(event.path.as_str(), event.reply);
            }

            _ = tokio::time::sleep_until(idle.unwrap_or_else(Instant::now)), if idle.is_some() => {
                if scheduler.on_idle_expired() {
                    break;
                }
            }
        }
    }

    let _ = shutdown.send(true);
    tracing::info!("prompt scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use crate::catalog::builtin_prompts;
    use crate::presenter::{Presenter, PromptSurface};
    use crate::response::{PromptReply, ResponseChannel, reply_channel};
    use crate::slot::{PromptPath, Slot};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    struct QuietBus;

    impl Bus for QuietBus {
        fn register(&self, _path: &PromptPath) {}
        fn unregister(&self, _path: &PromptPath) {}
        fn emit_response(&self, _path: &PromptPath, _code: i32) {}
    }

    /// Surface that answers the prompt the moment it is shown.
    struct AutoReplySurface {
        channel: ResponseChannel,
        reply: PromptReply,
    }

    impl PromptSurface for AutoReplySurface {
        fn show(&mut self) {
            self.channel.submit(self.reply);
        }

        fn hide(&mut self) {}
    }

    struct AutoReplyPresenter {
        reply: PromptReply,
    }

    impl Presenter for AutoReplyPresenter {
        fn materialize(&self, _slot: &Slot, replies: ResponseChannel) -> Box<dyn PromptSurface> {
            Box::new(AutoReplySurface {
                channel: replies,
                reply: self.reply,
            })
        }
    }

    /// Surface that never answers.
    struct SilentSurface;

    impl PromptSurface for SilentSurface {
        fn show(&mut self) {}
        fn hide(&mut self) {}
    }

    struct SilentPresenter;

    impl Presenter for SilentPresenter {
        fn materialize(&self, _slot: &Slot, _replies: ResponseChannel) -> Box<dyn PromptSurface> {
            Box::new(SilentSurface)
        }
    }

    struct Harness {
        mailbox: Mailbox,
        shutdown_rx: watch::Receiver<bool>,
        loop_handle: JoinHandle<()>,
    }

    fn start(presenter: Box<dyn Presenter>, idle_timeout: Duration) -> Harness {
        let (reply_tx, reply_rx) = reply_channel();
        let scheduler = Scheduler::new(
            builtin_prompts(),
            presenter,
            Arc::new(QuietBus),
            reply_tx,
            idle_timeout,
        );
        let (mailbox, calls_rx) = mailbox();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_handle = tokio::spawn(run(scheduler, calls_rx, reply_rx, shutdown_tx));
        Harness {
            mailbox,
            shutdown_rx,
            loop_handle,
        }
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_daemon_shuts_down_after_timeout() {
        let mut h = start(Box::new(SilentPresenter), Duration::from_secs(15));

        h.shutdown_rx.changed().await.unwrap();
        assert!(*h.shutdown_rx.borrow());
        h.loop_handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn display_cancels_pending_idle_shutdown() {
        let mut h = start(Box::new(SilentPresenter), Duration::from_secs(15));

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(!h.loop_handle.is_finished());

        let outcome = h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "display"))
            .await;
        assert!(matches!(outcome, Dispatch::Replied(Ok(_))));

        // A shown prompt has no timeout of its own; the daemon stays up.
        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;
        assert!(!h.loop_handle.is_finished());

        // Closing the shown prompt empties the schedule and re-arms the timer.
        let outcome = h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "close"))
            .await;
        assert!(matches!(outcome, Dispatch::Replied(Ok(_))));

        h.shutdown_rx.changed().await.unwrap();
        h.loop_handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn answered_prompt_rearms_idle_timer() {
        let mut h = start(
            Box::new(AutoReplyPresenter {
                reply: PromptReply::Accepted,
            }),
            Duration::from_secs(15),
        );

        let outcome = h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "display"))
            .await;
        assert!(matches!(outcome, Dispatch::Replied(Ok(_))));
        settle().await;

        // The auto-reply retired the prompt; close it and observe the
        // captured outcome.
        match h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "close"))
            .await
        {
            Dispatch::Replied(Ok(crate::dispatch::MethodReturn::Code(code))) => {
                assert_eq!(code, 0)
            }
            other => panic!("expected close reply, got {other:?}"),
        }

        // Nothing queued, nothing shown: idle shutdown follows.
        h.shutdown_rx.changed().await.unwrap();
        h.loop_handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_method_reported_as_not_handled() {
        let mut h = start(Box::new(SilentPresenter), Duration::from_secs(15));

        let outcome = h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "wiggle"))
            .await;
        assert!(matches!(outcome, Dispatch::NotHandled));

        h.shutdown_rx.changed().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn calls_processed_in_arrival_order() {
        let mut h = start(Box::new(SilentPresenter), Duration::from_secs(15));

        // Queue both; the first one shown is the first one displayed,
        // regardless of the second one's higher priority.
        let first = h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "display"))
            .await;
        let second = h
            .mailbox
            .call(MethodCall::new("/org/promptd/disclaimer", "display"))
            .await;
        assert!(matches!(first, Dispatch::Replied(Ok(_))));
        assert!(matches!(second, Dispatch::Replied(Ok(_))));

        // Repeated display on the shown prompt observes the busy conflict.
        match h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "display"))
            .await
        {
            Dispatch::Replied(Err(err)) => assert_eq!(err.response_code(), Some(-1)),
            other => panic!("expected in_use, got {other:?}"),
        }

        h.mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "close"))
            .await;
        h.mailbox
            .call(MethodCall::new("/org/promptd/disclaimer", "close"))
            .await;
        h.shutdown_rx.changed().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn mailbox_reports_shutdown_after_loop_exit() {
        let mut h = start(Box::new(SilentPresenter), Duration::from_secs(15));

        h.shutdown_rx.changed().await.unwrap();
        h.loop_handle.await.unwrap();

        match h
            .mailbox
            .call(MethodCall::new("/org/promptd/enable_gps", "display"))
            .await
        {
            Dispatch::Replied(Err(DispatchError::ShuttingDown)) => {}
            other => panic!("expected shutting_down, got {other:?}"),
        }
    }
}
