//! Error types for the core event/queue data model.

use thiserror::Error;

/// Errors surfaced by [`crate::RtEventQueue`] construction.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Requested capacity was zero; a ring buffer needs room for at least
    /// one in-flight event.
    #[error("RT queue capacity must be non-zero")]
    ZeroCapacity,
}

/// Errors surfaced while validating the six recognised configuration knobs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// `block_size` was zero.
    #[error("block_size must be greater than zero")]
    ZeroBlockSize,

    /// `rt_queue_capacity` was not a power of two.
    #[error("rt_queue_capacity ({0}) must be a power of two")]
    CapacityNotPowerOfTwo(usize),

    /// A tick period (dispatcher or worker) was zero.
    #[error("{field} must be greater than zero milliseconds")]
    ZeroTickPeriod {
        /// Name of the offending field.
        field: &'static str,
    },

    /// `timing_report_interval_s` was zero.
    #[error("timing_report_interval_s must be greater than zero")]
    ZeroTimingInterval,
}
