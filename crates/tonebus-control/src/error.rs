//! Errors a control frontend can observe.

use thiserror::Error;

/// Failure modes a [`crate::ControlFrontend`] can report to its caller.
///
/// These are send-side failures only; whether the dispatcher later
/// *applies* the event successfully is reported through the event's own
/// completion callback, not through this type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// The dispatcher's event channel has been dropped (it has shut
    /// down); the event was not sent.
    #[error("dispatcher is no longer accepting events")]
    DispatcherGone,

    /// `kind` did not name a recognised built-in processor constructor.
    #[error("unknown processor kind: {0}")]
    UnknownProcessorKind(String),

    /// The constructed processor failed to initialise for the engine's
    /// sample rate.
    #[error(transparent)]
    ProcessorInit(#[from] tonebus_core::ProcessorError),
}
