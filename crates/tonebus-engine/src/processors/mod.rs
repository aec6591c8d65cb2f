//! Two trivial built-in processors that exist only to exercise the
//! processor contract end to end. Neither is meant as a DSP library —
//! concrete plugin-format wrappers and real DSP algorithms are out of
//! scope for this crate.

mod gain;
mod transposer;

pub use gain::GainProcessor;
pub use transposer::TransposerProcessor;
