//! Presenter seam: the external collaborator that renders prompts.
//!
//! The scheduler never builds UI. It asks a [`Presenter`] to materialize a
//! [`PromptSurface`] for a slot (once per slot lifetime), then drives the
//! surface with `show`/`hide`. The surface reports the user's outcome
//! through the [`ResponseChannel`](crate::response::ResponseChannel) it was
//! given at materialization time.

use crate::response::ResponseChannel;
use crate::slot::Slot;

/// A displayable artifact owned by a slot while it is live.
pub trait PromptSurface: Send {
    /// Bring the artifact to the foreground.
    fn show(&mut self);

    /// Take the artifact off screen without destroying it.
    fn hide(&mut self);

    /// Whether the scheduler should drop this surface when the slot is
    /// closed. Artifact types that manage their own lifetime return true
    /// and get rebuilt lazily on the next activation.
    fn destroy_on_close(&self) -> bool {
        false
    }
}

/// Factory for prompt surfaces.
///
/// `materialize` is called at most once per slot lifetime, from within the
/// scheduler's event loop; implementations must not block. A presenter that
/// cannot build a surface for a catalog kind has a broken catalog, which is
/// a programming defect, not a runtime error.
pub trait Presenter: Send {
    fn materialize(&self, slot: &Slot, replies: ResponseChannel) -> Box<dyn PromptSurface>;
}
