//! Core data model for the tonebus real-time audio host.
//!
//! This crate provides the foundational building blocks shared by every
//! other tonebus crate: stable object identifiers, a monotonic time type, the
//! fixed-size `RtEvent` record that crosses the audio/non-audio boundary, the
//! wait-free single-producer/single-consumer queue that carries it, the
//! `EventTimer` that maps between wall-clock time and sample offsets, and the
//! non-real-time `Event` that the dispatcher and worker operate on.
//!
//! # Real-time safety
//!
//! [`RtEventQueue`] never allocates or blocks on push/pop. The audio thread
//! is expected to touch only [`RtEventProducer`]/[`RtEventConsumer`] and the
//! [`Processor`] contract — nothing in this crate's hot path takes a lock.
//!
//! # Example
//!
//! ```
//! use tonebus_core::{RtEvent, RtEventQueue, ObjectId};
//!
//! let (mut producer, mut consumer) = RtEventQueue::new(16).split();
//! let event = RtEvent::parameter_change(ObjectId::new(1), ObjectId::new(2), 0.5, 0);
//! assert!(producer.push(event));
//! assert!(consumer.pop().is_some());
//! ```

mod chain;
mod error;
mod event;
mod ids;
mod processor;
mod queue;
mod rt_event;
mod timer;

pub use chain::Chain;
pub use error::{ConfigValidationError, QueueError};
pub use event::{
    CompletionCallback, CompletionStatus, Event, EventKind, EventPayload, EventPosterId,
    EventStatus, Poster,
};
pub use ids::ObjectId;
pub use processor::{
    ChannelCount, OutputSink, ParameterDescriptor, ParameterKind, ParameterTable, Processor,
    ProcessorError, ProcessorEventOutcome,
};
pub use queue::{RtEventConsumer, RtEventProducer, RtEventQueue};
pub use rt_event::{KeyboardEvent, KeyboardEventKind, RawMidi, RtEvent, RtEventKind};
pub use timer::{EventTimer, Schedule};

/// Signed 64-bit microsecond timestamp against a monotonic epoch established
/// at engine start.
///
/// `Time` is deliberately a thin newtype over `i64`: it participates in
/// plain arithmetic (`Time + Duration`) without pulling in a calendar/
/// timezone dependency the real-time path has no use for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(i64);

impl Time {
    /// Construct a `Time` from a raw microsecond count.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// The raw microsecond count since the engine epoch.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// `self + micros`, saturating on overflow rather than panicking.
    #[must_use]
    pub const fn plus_micros(self, micros: i64) -> Self {
        Self(self.0.saturating_add(micros))
    }

    /// Microseconds elapsed from `earlier` to `self` (negative if `self` is
    /// before `earlier`).
    #[must_use]
    pub const fn micros_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}
