//! Wait-free single-producer/single-consumer queue carrying [`RtEvent`]s
//! across the audio/non-audio boundary.

use crate::error::QueueError;
use crate::rt_event::RtEvent;

/// A wait-free SPSC ring buffer sized at construction time.
///
/// Splitting yields one [`RtEventProducer`] and one [`RtEventConsumer`];
/// each may only be used from its own thread for the lifetime of the
/// engine. Neither side allocates or blocks once split.
pub struct RtEventQueue {
    inner: (rtrb::Producer<RtEvent>, rtrb::Consumer<RtEvent>),
}

impl RtEventQueue {
    /// Allocates a queue with room for `capacity` in-flight events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Prefer [`RtEventQueue::try_new`] when
    /// the capacity comes from untrusted configuration.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).expect("RT queue capacity must be non-zero")
    }

    /// Fallible constructor for untrusted capacities.
    pub fn try_new(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            inner: rtrb::RingBuffer::new(capacity),
        })
    }

    /// Splits the queue into its producer and consumer halves.
    #[must_use]
    pub fn split(self) -> (RtEventProducer, RtEventConsumer) {
        let (producer, consumer) = self.inner;
        (RtEventProducer { inner: producer }, RtEventConsumer { inner: consumer })
    }
}

/// The producer half of an [`RtEventQueue`].
///
/// Owned by whichever thread originates events: the audio thread for
/// outbound notifications, the worker thread for inbound commands.
pub struct RtEventProducer {
    inner: rtrb::Producer<RtEvent>,
}

impl RtEventProducer {
    /// Pushes an event, returning `true` on success and `false` if the
    /// queue is full. Never blocks, never allocates.
    pub fn push(&mut self, event: RtEvent) -> bool {
        self.inner.push(event).is_ok()
    }

    /// Number of slots currently free. Racy by construction — the
    /// consumer may pop concurrently — useful only for telemetry.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.inner.slots()
    }

    /// Whether the paired consumer has been dropped.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.inner.is_abandoned()
    }
}

/// The consumer half of an [`RtEventQueue`].
pub struct RtEventConsumer {
    inner: rtrb::Consumer<RtEvent>,
}

impl RtEventConsumer {
    /// Pops the oldest pending event, if any. Never blocks, never
    /// allocates.
    pub fn pop(&mut self) -> Option<RtEvent> {
        self.inner.pop().ok()
    }

    /// Number of events currently queued. Racy by construction — useful
    /// only for telemetry.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.inner.slots()
    }

    /// Whether the paired producer has been dropped.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.inner.is_abandoned()
    }
}
