//! Lock-free counters the audio thread updates and other threads poll.
//!
//! Grounded on the atomic-bridge pattern used to move values off the
//! audio thread elsewhere in this lineage: plain atomics behind a cheap
//! `Arc` handle, no locks, no allocation on the write side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    blocks_processed: AtomicU64,
    events_dropped: AtomicU64,
    rt_queue_overflows: AtomicU64,
}

/// A cheap, cloneable handle onto the engine's audio-thread counters.
///
/// The engine writes through this with `Ordering::Relaxed` fetch-adds;
/// the dispatcher reads it once per timing-report interval and logs the
/// deltas via `tracing` on the engine's behalf — the audio thread itself
/// never calls into `tracing`.
#[derive(Debug, Clone, Default)]
pub struct EngineTelemetry {
    counters: Arc<Counters>,
}

impl EngineTelemetry {
    /// Creates a fresh, zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_block(&self) {
        self.counters.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_event(&self) {
        self.counters.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rt_queue_overflow(&self) {
        self.counters.rt_queue_overflows.fetch_add(1, Ordering::Relaxed);
    }

    /// Total blocks processed since construction.
    #[must_use]
    pub fn blocks_processed(&self) -> u64 {
        self.counters.blocks_processed.load(Ordering::Relaxed)
    }

    /// Total inbound events dropped for naming an unknown chain or
    /// processor.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.counters.events_dropped.load(Ordering::Relaxed)
    }

    /// Total outbound pushes that found the RT queue full.
    #[must_use]
    pub fn rt_queue_overflows(&self) -> u64 {
        self.counters.rt_queue_overflows.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_handles_share_the_same_counters() {
        let telemetry = EngineTelemetry::new();
        let clone = telemetry.clone();
        telemetry.record_block();
        clone.record_block();
        assert_eq!(telemetry.blocks_processed(), 2);
    }
}
