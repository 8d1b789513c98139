//! Prompt scheduler: admission, activation, retirement.
//!
//! Owns the slot table and the at-most-one-active invariant. All
//! operations are synchronous and run to completion inside the event
//! loop; there is no internal concurrency. Protocol-level misuse
//! (unknown identifiers, busy slots, bad creation arguments) comes back
//! as typed errors; broken invariants are programming defects and abort.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::bus::Bus;
use crate::catalog::{AdhocKind, SERVICE_PATH};
use crate::presenter::Presenter;
use crate::response::{PromptReply, ReplySender, ResponseChannel};
use crate::slot::{PromptPath, PromptSpec, Slot, SlotState};

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("no prompt object at {0}")]
    NotFound(String),
    /// The slot already has a request in flight; carries its current
    /// response code so the caller can observe the outcome without
    /// blocking.
    #[error("prompt already in flight")]
    InUse { last_response: i32 },
}

#[derive(Debug, thiserror::Error)]
pub enum CloseError {
    #[error("no prompt object at {0}")]
    NotFound(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

/// Serializes presentation of prompts and reports outcomes on the bus.
pub struct Scheduler {
    /// Insertion-ordered; order is the equal-priority tie-break.
    slots: Vec<Slot>,
    /// At most one shown prompt at any instant.
    active: Option<PromptPath>,
    idle_timeout: Duration,
    idle_deadline: Option<Instant>,
    presenter: Box<dyn Presenter>,
    bus: Arc<dyn Bus>,
    replies: ReplySender,
}

impl Scheduler {
    /// Build the scheduler over a fixed catalog.
    ///
    /// Every catalog path is registered with the bus, and the idle timer
    /// starts armed: a daemon that never receives a request shuts down
    /// after one idle period.
    pub fn new(
        catalog: Vec<PromptSpec>,
        presenter: Box<dyn Presenter>,
        bus: Arc<dyn Bus>,
        replies: ReplySender,
        idle_timeout: Duration,
    ) -> Self {
        for spec in &catalog {
            bus.register(&spec.path);
        }
        let mut scheduler = Self {
            slots: catalog.into_iter().map(Slot::new).collect(),
            active: None,
            idle_timeout,
            idle_deadline: None,
            presenter,
            bus,
            replies,
        };
        scheduler.arm_idle_timer();
        scheduler
    }

    /// Admit a prompt request.
    ///
    /// Queues the slot and, when nothing is currently shown, activates it
    /// synchronously. Never blocks.
    pub fn display(
        &mut self,
        path: &str,
        argument: Option<serde_json::Value>,
    ) -> Result<(), DisplayError> {
        let idx = self
            .index_of(path)
            .ok_or_else(|| DisplayError::NotFound(path.to_string()))?;
        let slot = &mut self.slots[idx];
        if slot.state != SlotState::Idle {
            tracing::debug!(%path, state = slot.state.as_str(), "display refused, prompt in flight");
            return Err(DisplayError::InUse {
                last_response: slot.response_code,
            });
        }

        slot.argument = argument;
        slot.state = SlotState::Queued;
        tracing::debug!(%path, priority = slot.spec.priority, "prompt queued");

        self.idle_deadline = None;
        if self.active.is_none() {
            self.schedule_next();
        }
        Ok(())
    }

    /// Retract a prompt request and collect its outcome.
    ///
    /// Returns the response code captured before the artifact is touched.
    /// Reusable slots reset to idle; one-shot slots are removed from the
    /// table and retracted from the bus. Closing the shown prompt before
    /// the user answers is the cancellation path and frees the schedule.
    pub fn close(&mut self, path: &str) -> Result<i32, CloseError> {
        let idx = self
            .index_of(path)
            .ok_or_else(|| CloseError::NotFound(path.to_string()))?;
        let pre_state = self.slots[idx].state;
        let code = self.slots[idx].response_code;
        let was_active = self
            .active
            .as_ref()
            .is_some_and(|active| active.as_str() == path);

        if self.slots[idx].spec.reusable {
            let slot = &mut self.slots[idx];
            let destroy = slot
                .surface
                .as_ref()
                .is_some_and(|surface| surface.destroy_on_close());
            if destroy {
                slot.surface = None;
            } else if pre_state == SlotState::Active
                && let Some(surface) = slot.surface.as_mut()
            {
                surface.hide();
            }
            slot.reset();
            tracing::debug!(%path, code, "prompt closed");
        } else {
            let slot = self.slots.remove(idx);
            self.bus.unregister(slot.path());
            tracing::debug!(%path, code, "one-shot prompt removed");
        }

        if was_active && pre_state == SlotState::Active {
            self.active = None;
            self.schedule_next();
        }
        Ok(code)
    }

    /// Record a user outcome reported by the presenter.
    ///
    /// Encodes the reply per the slot kind, emits the outcome signal, and
    /// hides the artifact. The slot stays in the table as `Closed` until
    /// the requester acknowledges with `close`.
    pub fn retire(&mut self, path: &str, reply: PromptReply) {
        let Some(idx) = self.index_of(path) else {
            tracing::warn!(%path, "reply for unknown prompt dropped");
            return;
        };
        if self.slots[idx].surface.is_none() {
            tracing::warn!(%path, "reply for a prompt that was never shown dropped");
            return;
        }

        let slot = &mut self.slots[idx];
        let code = slot.spec.encoding.encode(&reply);
        slot.response_code = code;
        self.bus.emit_response(&slot.spec.path, code);
        if let Some(surface) = slot.surface.as_mut() {
            surface.hide();
        }
        slot.state = SlotState::Closed;
        tracing::info!(%path, code, "prompt answered");

        if self
            .active
            .as_ref()
            .is_some_and(|active| active.as_str() == path)
        {
            self.active = None;
            self.schedule_next();
        }
    }

    /// Allocate a one-shot slot for a named creation request.
    ///
    /// Validates the kind's required leading string arguments, generates
    /// a unique path, and registers it with the bus. The slot becomes
    /// visible only once the caller displays it.
    pub fn create_adhoc(
        &mut self,
        kind: &AdhocKind,
        args: &[serde_json::Value],
    ) -> Result<PromptPath, CreateError> {
        if args.len() < kind.required_args {
            return Err(CreateError::InvalidArgs(format!(
                "{} requires {} leading string arguments, got {}",
                kind.request,
                kind.required_args,
                args.len()
            )));
        }
        if args[..kind.required_args].iter().any(|a| !a.is_string()) {
            return Err(CreateError::InvalidArgs(format!(
                "{} requires {} leading string arguments",
                kind.request, kind.required_args
            )));
        }

        let path = PromptPath::new(format!(
            "{SERVICE_PATH}/{}/{}",
            kind.request,
            uuid::Uuid::new_v4().simple()
        ));
        let spec = PromptSpec::one_shot(path.clone(), kind.request, kind.priority, kind.encoding);
        self.bus.register(&path);
        self.slots.push(Slot::with_request_args(spec, args.to_vec()));
        tracing::info!(%path, kind = kind.request, "one-shot prompt created");
        Ok(path)
    }

    /// Pick and activate the next prompt, or arm the idle timer.
    ///
    /// Linear scan in table order; strict greater-than comparison keeps
    /// the first queued slot seen at the winning priority.
    fn schedule_next(&mut self) {
        assert!(
            self.active.is_none(),
            "scheduling entered while a prompt is still shown"
        );

        let mut winner: Option<(usize, i32)> = None;
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.state != SlotState::Queued {
                continue;
            }
            match winner {
                Some((_, best)) if slot.spec.priority <= best => {}
                _ => winner = Some((idx, slot.spec.priority)),
            }
        }

        let Some((idx, priority)) = winner else {
            if self.idle_deadline.is_none() {
                self.arm_idle_timer();
            }
            return;
        };

        if self.slots[idx].surface.is_none() {
            let channel =
                ResponseChannel::new(self.slots[idx].path().clone(), self.replies.clone());
            let surface = self.presenter.materialize(&self.slots[idx], channel);
            self.slots[idx].surface = Some(surface);
        }

        let slot = &mut self.slots[idx];
        slot.state = SlotState::Active;
        slot.surface
            .as_mut()
            .expect("activated prompt lost its surface")
            .show();
        let path = slot.spec.path.clone();
        tracing::info!(%path, priority, "prompt activated");

        self.active = Some(path);
        self.idle_deadline = None;
    }

    /// The idle timer fired. Returns true when the daemon should exit.
    pub fn on_idle_expired(&mut self) -> bool {
        self.idle_deadline = None;
        let queued = self.slots.iter().any(|s| s.state == SlotState::Queued);
        if self.active.is_none() && !queued {
            tracing::info!(
                timeout_secs = self.idle_timeout.as_secs(),
                "no prompt activity, shutting down"
            );
            true
        } else {
            // A queued or shown prompt should have cancelled the timer.
            tracing::warn!("idle timer fired while prompts are pending");
            false
        }
    }

    fn arm_idle_timer(&mut self) {
        self.idle_deadline = Some(Instant::now() + self.idle_timeout);
        tracing::debug!(
            timeout_secs = self.idle_timeout.as_secs(),
            "idle timer armed"
        );
    }

    /// Deadline the event loop sleeps on; `None` while a prompt is queued
    /// or shown.
    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle_deadline
    }

    pub fn active_path(&self) -> Option<&PromptPath> {
        self.active.as_ref()
    }

    pub fn slot(&self, path: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.path().as_str() == path)
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    fn index_of(&self, path: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.path().as_str() == path)
    }
}
