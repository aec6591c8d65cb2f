//! Errors surfaced by the dispatcher and worker crate boundary.

use thiserror::Error;

/// Failure modes the dispatcher/worker can report to a caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A poster id collided with one already registered.
    #[error("poster {0:?} is already registered")]
    DuplicatePoster(tonebus_core::EventPosterId),

    /// The dispatcher thread has already been stopped.
    #[error("dispatcher has already stopped")]
    AlreadyStopped,
}
