//! The non-real-time half of the host-control facade.
//!
//! A [`Processor`](tonebus_core::Processor) never sees the dispatcher or
//! engine directly. At construction time it is handed a [`HostControl`]
//! for posting non-RT [`Event`]s and querying time/sample rate. The
//! real-time half of the facade — pushing an `RtEvent` onto the outbound
//! queue from inside `process_event`/`process_audio` — is the
//! `OutputSink` callback those trait methods receive directly, since a
//! shared handle cannot safely carry a second producer onto a
//! single-producer queue.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tonebus_core::{Event, Time};

/// Shared wall-clock reading updated by the engine once per block and
/// read by any number of [`HostControl`] handles without locking.
#[derive(Debug, Clone, Default)]
pub(crate) struct EngineClock(Arc<AtomicI64>);

impl EngineClock {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicI64::new(0)))
    }

    pub(crate) fn set(&self, time: Time) {
        self.0.store(time.as_micros(), Ordering::Relaxed);
    }

    fn get(&self) -> Time {
        Time::from_micros(self.0.load(Ordering::Relaxed))
    }
}

/// Handle passed to every processor at construction time.
#[derive(Clone)]
pub struct HostControl {
    sample_rate: u32,
    clock: EngineClock,
    event_tx: Sender<Event>,
}

impl HostControl {
    pub(crate) fn new(sample_rate: u32, clock: EngineClock, event_tx: Sender<Event>) -> Self {
        Self {
            sample_rate,
            clock,
            event_tx,
        }
    }

    /// The engine's configured sample rate.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The engine's current view of wall-clock time, as of the start of
    /// the most recently processed block.
    #[must_use]
    pub fn time_now(&self) -> Time {
        self.clock.get()
    }

    /// Posts a non-real-time event to the dispatcher. Returns `false`
    /// (without panicking) if the dispatcher has shut down.
    pub fn post_event(&self, event: Event) -> bool {
        self.event_tx.send(event).is_ok()
    }
}

/// A `HostControl` backed by a disconnected channel, for processor unit
/// tests that only need the facade to exist, not to be observed.
#[cfg(test)]
pub(crate) fn test_host_control() -> HostControl {
    let (tx, _rx) = crossbeam_channel::unbounded();
    HostControl::new(48_000, EngineClock::new(), tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_clock_round_trips_a_reading() {
        let clock = EngineClock::new();
        clock.set(Time::from_micros(4_200));
        assert_eq!(clock.get(), Time::from_micros(4_200));
    }

    #[test]
    fn post_event_fails_once_the_receiver_is_gone() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let control = HostControl::new(48_000, EngineClock::new(), tx);
        drop(rx);
        let event = tonebus_core::Event::immediate(
            tonebus_core::EventPosterId::Worker,
            tonebus_core::EventKind::AsyncWork,
            tonebus_core::EventPayload::AsyncWork(Box::new(|| Ok(()))),
        );
        assert!(!control.post_event(event));
    }
}
