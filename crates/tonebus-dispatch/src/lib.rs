//! Non-real-time scheduling for the tonebus audio host.
//!
//! This crate owns the boundary between "whenever you like" control-plane
//! requests and the audio thread's per-block RT queues: [`EventDispatcher`]
//! classifies and times [`tonebus_core::Event`]s, converting the ones
//! addressed to the engine into [`tonebus_core::RtEvent`]s at the right
//! sample offset; [`Worker`] runs the work that must never block the
//! dispatcher tick — async closures and teardown finalization.

mod dispatcher;
mod error;
mod worker;

pub use dispatcher::{DispatcherHandle, EventDispatcher, DEFAULT_TICK_PERIOD};
pub use error::DispatchError;
pub use worker::{Worker, WorkerHandle, DEFAULT_TIMING_REPORT_INTERVAL};
