//! Non-real-time events exchanged with the dispatcher and worker.
//!
//! Unlike [`crate::RtEvent`], an [`Event`] is free to allocate: it carries
//! owned strings, boxed callbacks, and travels over an
//! `crossbeam-channel`, never the wait-free queue.

use crate::ids::ObjectId;
use crate::Time;

/// Identifies who posted an [`Event`], for routing replies and for the
/// dispatcher's listener tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPosterId {
    /// Posted by a control frontend (OSC, gRPC, CLI, ...).
    Control,
    /// Posted by a processor from inside `process_event`/`process_audio`
    /// via the host-control facade.
    Processor(ObjectId),
    /// The dispatcher itself, addressed when an event targets the
    /// dispatcher's own handling (timed RT conversion, async re-routing).
    Dispatcher,
    /// The engine core, addressed by notifications flowing from the audio
    /// thread back through the dispatcher.
    AudioEngine,
    /// The worker thread, addressed by engine-mutation and async-work
    /// events.
    Worker,
}

/// The kind of work an [`Event`] carries, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Change a numeric parameter value.
    ParameterChange,
    /// Change a parameter from a string representation.
    StringParameterChange,
    /// A processor reporting, via its `HostControl`, that one of its own
    /// parameters changed — broadcast straight to parameter-change
    /// listeners rather than re-applied to the processor that posted it.
    ParameterChangeNotification,
    /// Deliver a keyboard event to a chain.
    Keyboard,
    /// Create a new, empty chain.
    AddChain,
    /// Remove a chain and every processor it holds.
    DeleteChain,
    /// Insert a processor into a chain.
    AddProcessor,
    /// Remove a processor from a chain.
    DeleteProcessor,
    /// Run a unit of work on the worker's async executor.
    AsyncWork,
}

/// The data carried by an [`Event`], one variant per [`EventKind`].
pub enum EventPayload {
    /// See [`EventKind::ParameterChange`].
    ParameterChange {
        /// Target chain.
        chain_id: ObjectId,
        /// Target processor.
        processor_id: ObjectId,
        /// Target parameter.
        parameter_id: ObjectId,
        /// New normalized value.
        value: f32,
    },
    /// See [`EventKind::StringParameterChange`].
    StringParameterChange {
        /// Target chain.
        chain_id: ObjectId,
        /// Target processor.
        processor_id: ObjectId,
        /// Target parameter.
        parameter_id: ObjectId,
        /// String form of the new value, parsed by the processor.
        value: String,
    },
    /// See [`EventKind::ParameterChangeNotification`].
    ParameterChangeNotification {
        /// Owning chain.
        chain_id: ObjectId,
        /// Processor reporting the change.
        processor_id: ObjectId,
        /// Changed parameter.
        parameter_id: ObjectId,
        /// The parameter's new value.
        value: f32,
    },
    /// See [`EventKind::Keyboard`].
    Keyboard(crate::rt_event::KeyboardEvent),
    /// See [`EventKind::AddChain`].
    AddChain {
        /// Name of the new chain, for introspection.
        name: String,
        /// Required input/output channel count.
        channels: crate::processor::ChannelCount,
    },
    /// See [`EventKind::DeleteChain`].
    DeleteChain {
        /// Chain to remove.
        chain_id: ObjectId,
    },
    /// See [`EventKind::AddProcessor`].
    AddProcessor {
        /// Target chain.
        chain_id: ObjectId,
        /// Insertion index within the chain.
        position: usize,
        /// The processor to insert.
        processor: Box<dyn crate::processor::Processor>,
    },
    /// See [`EventKind::DeleteProcessor`].
    DeleteProcessor {
        /// Owning chain.
        chain_id: ObjectId,
        /// Processor to remove.
        processor_id: ObjectId,
    },
    /// See [`EventKind::AsyncWork`]. Returns `Err` instead of panicking
    /// to signal failure — the worker surfaces it as
    /// [`CompletionStatus::Error`] without needing to catch unwinds.
    AsyncWork(Box<dyn FnOnce() -> Result<(), String> + Send>),
}

impl std::fmt::Debug for EventPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParameterChange { chain_id, processor_id, parameter_id, value } => f
                .debug_struct("ParameterChange")
                .field("chain_id", chain_id)
                .field("processor_id", processor_id)
                .field("parameter_id", parameter_id)
                .field("value", value)
                .finish(),
            Self::StringParameterChange { chain_id, processor_id, parameter_id, value } => f
                .debug_struct("StringParameterChange")
                .field("chain_id", chain_id)
                .field("processor_id", processor_id)
                .field("parameter_id", parameter_id)
                .field("value", value)
                .finish(),
            Self::ParameterChangeNotification { chain_id, processor_id, parameter_id, value } => f
                .debug_struct("ParameterChangeNotification")
                .field("chain_id", chain_id)
                .field("processor_id", processor_id)
                .field("parameter_id", parameter_id)
                .field("value", value)
                .finish(),
            Self::Keyboard(event) => f.debug_tuple("Keyboard").field(event).finish(),
            Self::AddChain { name, channels } => f
                .debug_struct("AddChain")
                .field("name", name)
                .field("channels", channels)
                .finish(),
            Self::DeleteChain { chain_id } => {
                f.debug_struct("DeleteChain").field("chain_id", chain_id).finish()
            }
            Self::AddProcessor { chain_id, position, processor } => f
                .debug_struct("AddProcessor")
                .field("chain_id", chain_id)
                .field("position", position)
                .field("processor", &processor.id())
                .finish(),
            Self::DeleteProcessor { chain_id, processor_id } => f
                .debug_struct("DeleteProcessor")
                .field("chain_id", chain_id)
                .field("processor_id", processor_id)
                .finish(),
            Self::AsyncWork(_) => f.debug_tuple("AsyncWork").field(&"<closure>").finish(),
        }
    }
}

/// Immediate outcome of routing a single [`Event`] to a [`Poster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// The event was applied immediately.
    HandledOk,
    /// The event's deadline has not arrived yet, or it was handed off to
    /// another thread; it remains owned elsewhere and must not be
    /// completed or dropped by the caller.
    QueuedHandling,
    /// No registered poster understands this event kind.
    UnrecognizedEvent,
    /// The event's `poster_id` does not name a registered poster, or its
    /// `chain_id`/`processor_id`/`parameter_id` does not name a live
    /// object.
    UnrecognizedReceiver,
    /// The event was recognized and addressed, but applying it failed.
    Error,
}

/// Terminal status delivered to an [`Event`]'s completion callback.
///
/// Distinct from [`EventStatus`]: a poster's immediate routing outcome
/// (`HandledOk`, `QueuedHandling`, ...) is not itself a terminal state —
/// `QueuedHandling` only ever resolves, later, into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// The event was applied successfully.
    Ok,
    /// The event was recognized but applying it failed.
    Error,
    /// The event was dropped, unapplied, by a `stop()` shutdown.
    Cancelled,
    /// The event's scheduled time passed without it reaching a poster.
    TimedOut,
}

/// A callback invoked exactly once, when an [`Event`] reaches a terminal
/// [`CompletionStatus`].
pub type CompletionCallback = Box<dyn FnOnce(CompletionStatus) + Send>;

/// A unit of non-real-time work posted to the dispatcher.
pub struct Event {
    /// Stable identifier for this specific event instance.
    pub id: ObjectId,
    /// Who posted it.
    pub poster_id: EventPosterId,
    /// What kind of work it represents.
    pub kind: EventKind,
    /// The work's data.
    pub payload: EventPayload,
    /// When to apply it; `None` means "as soon as the dispatcher sees
    /// it".
    pub scheduled_time: Option<Time>,
    /// Invoked exactly once, when the event reaches a terminal status.
    pub completion: Option<CompletionCallback>,
}

impl Event {
    /// Builds an immediate (non-scheduled) event with no completion
    /// callback.
    #[must_use]
    pub fn immediate(poster_id: EventPosterId, kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: ObjectId::next(),
            poster_id,
            kind,
            payload,
            scheduled_time: None,
            completion: None,
        }
    }

    /// Attaches a scheduled delivery time, consuming and returning
    /// `self`.
    #[must_use]
    pub fn at(mut self, time: Time) -> Self {
        self.scheduled_time = Some(time);
        self
    }

    /// Attaches a completion callback, consuming and returning `self`.
    #[must_use]
    pub fn on_complete(mut self, callback: CompletionCallback) -> Self {
        self.completion = Some(callback);
        self
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("poster_id", &self.poster_id)
            .field("kind", &self.kind)
            .field("scheduled_time", &self.scheduled_time)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}

/// Something that can receive events pushed out of the dispatcher:
/// keyboard listeners and parameter-change listeners registered by
/// control frontends.
pub trait Poster: Send {
    /// Inspects/applies an event addressed to this poster and returns
    /// its immediate routing outcome. The dispatcher retains ownership
    /// of `event` regardless of the outcome: on `QueuedHandling` it
    /// keeps the event on its waiting list and presents it again on a
    /// later tick; on any terminal status it invokes the event's
    /// completion callback itself and drops it. Implementations should
    /// return promptly; the dispatcher calls this inline from its tick
    /// loop.
    fn receive(&mut self, event: &Event) -> EventStatus;

    /// This poster's own id, for replies and notification tables.
    fn poster_id(&self) -> EventPosterId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_event_has_no_scheduled_time() {
        let event = Event::immediate(
            EventPosterId::Control,
            EventKind::AddChain,
            EventPayload::AddChain {
                name: "main".to_string(),
                channels: crate::processor::ChannelCount::symmetric(2),
            },
        );
        assert!(event.scheduled_time.is_none());
        assert!(event.completion.is_none());
    }

    #[test]
    fn at_and_on_complete_chain() {
        let event = Event::immediate(
            EventPosterId::Control,
            EventKind::DeleteChain,
            EventPayload::DeleteChain {
                chain_id: ObjectId::new(1),
            },
        )
        .at(Time::from_micros(100))
        .on_complete(Box::new(|_status: CompletionStatus| {}));
        assert_eq!(event.scheduled_time, Some(Time::from_micros(100)));
        assert!(event.completion.is_some());
    }
}
