//! Processor chains, the per-block engine core, and the host-control
//! facade for the tonebus real-time audio host.
//!
//! [`Engine::process_chunk`] is the only entry point an audio I/O
//! backend calls on the audio thread. Everything else in this crate
//! supports that one hot path: [`Chain`] composes processors, the
//! [`host_control`] module is the non-RT half of the facade processors
//! use to talk back to the control plane, and [`processors`] ships the
//! two built-in processors that exercise the contract end to end.

mod engine;
mod host_control;
pub mod processors;
mod telemetry;

pub use engine::Engine;
pub use host_control::HostControl;
pub use telemetry::EngineTelemetry;
pub use tonebus_core::Chain;
