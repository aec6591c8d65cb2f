//! Control frontend base for the tonebus audio host.
//!
//! [`ControlFrontend`] is the shared non-RT producer every concrete
//! frontend (MIDI, OSC, gRPC, a CLI harness) builds on. It never touches
//! the RT queue or the engine directly — everything flows through the
//! dispatcher's event channel.

mod error;
mod frontend;
mod processor_kind;

pub use error::ControlError;
pub use frontend::ControlFrontend;
pub use processor_kind::ProcessorKind;
