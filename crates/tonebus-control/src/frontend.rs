//! The control frontend base: a non-RT producer shared by every concrete
//! frontend (MIDI, OSC, gRPC, the CLI harness, ...).
//!
//! Every method here posts an [`Event`] to the dispatcher's inbound
//! channel; none of them touch the RT queue directly. The dispatcher
//! alone holds the inbound `RtEventProducer`, since a wait-free
//! single-producer/single-consumer ring cannot safely have more than one
//! writer — routing every non-RT producer, including this one, through
//! the dispatcher's single-threaded tick loop preserves that invariant
//! while keeping the same fire-and-forget latency characteristics the
//! ring buffer would have offered directly (the dispatcher ticks every
//! `dispatcher_tick_ms`, typically 1 ms).

use crossbeam_channel::Sender;
use tonebus_core::{
    ChannelCount, CompletionCallback, Event, EventKind, EventPayload, EventPosterId, KeyboardEvent,
    ObjectId, Processor,
};
use tonebus_engine::HostControl;
use tracing::warn;

use crate::error::ControlError;
use crate::processor_kind::ProcessorKind;

/// Shared base for control-plane producers.
///
/// Cloning a `ControlFrontend` is cheap: it's a thin handle around the
/// dispatcher's event sender and the engine's host-control facade,
/// intended to be held by every concrete frontend implementation (one
/// per transport) without sharing mutable state between them.
#[derive(Clone)]
pub struct ControlFrontend {
    dispatch_tx: Sender<Event>,
    host_control: HostControl,
}

impl ControlFrontend {
    /// Builds a frontend posting to the dispatcher reachable through
    /// `dispatch_tx` (the sender returned by `EventDispatcher::new`).
    /// `host_control` is handed to every processor this frontend
    /// constructs, via [`Engine::make_host_control`](tonebus_engine::Engine::make_host_control).
    #[must_use]
    pub const fn new(dispatch_tx: Sender<Event>, host_control: HostControl) -> Self {
        Self {
            dispatch_tx,
            host_control,
        }
    }

    fn post(&self, event: Event) -> Result<(), ControlError> {
        self.dispatch_tx
            .send(event)
            .map_err(|_| ControlError::DispatcherGone)
    }

    fn post_logged(&self, event: Event, what: &str) {
        if self.post(event).is_err() {
            warn!(what, "dispatcher gone; event dropped");
        }
    }

    /// Changes a numeric parameter. Fire-and-forget: failures are logged,
    /// not returned, matching the RT-queue semantics this stands in for.
    pub fn send_parameter_change_event(
        &self,
        chain_id: ObjectId,
        processor_id: ObjectId,
        parameter_id: ObjectId,
        value: f32,
    ) {
        let event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::ParameterChange,
            EventPayload::ParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value,
            },
        );
        self.post_logged(event, "parameter_change");
    }

    /// Changes a parameter from its string representation. The string is
    /// moved into the event; whichever side eventually applies it owns
    /// the allocation.
    pub fn send_string_parameter_change_event(
        &self,
        chain_id: ObjectId,
        processor_id: ObjectId,
        parameter_id: ObjectId,
        value: impl Into<String>,
    ) {
        let event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::StringParameterChange,
            EventPayload::StringParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value: value.into(),
            },
        );
        self.post_logged(event, "string_parameter_change");
    }

    /// Delivers a keyboard event to a chain's processors.
    pub fn send_keyboard_event(&self, event: KeyboardEvent) {
        let event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::Keyboard,
            EventPayload::Keyboard(event),
        );
        self.post_logged(event, "keyboard");
    }

    /// Creates a new, empty chain with the given channel count. Returns
    /// the id assigned to it; the chain is not guaranteed to exist until
    /// `on_complete` (if given) fires with `CompletionStatus::Ok`.
    pub fn add_chain(
        &self,
        name: impl Into<String>,
        channels: ChannelCount,
        on_complete: Option<CompletionCallback>,
    ) -> ObjectId {
        let chain_id = ObjectId::next();
        let mut event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::AddChain,
            EventPayload::AddChain {
                name: name.into(),
                channels,
            },
        );
        event.id = chain_id;
        if let Some(callback) = on_complete {
            event = event.on_complete(callback);
        }
        self.post_logged(event, "add_chain");
        chain_id
    }

    /// Removes a chain and every processor it holds.
    pub fn delete_chain(&self, chain_id: ObjectId, on_complete: Option<CompletionCallback>) {
        let mut event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::DeleteChain,
            EventPayload::DeleteChain { chain_id },
        );
        if let Some(callback) = on_complete {
            event = event.on_complete(callback);
        }
        self.post_logged(event, "delete_chain");
    }

    /// Constructs a built-in processor of the named `kind`, initialises
    /// it for the engine's sample rate, and posts its insertion. Returns
    /// `Err` immediately (without posting anything) if `kind` names no
    /// built-in constructor or if `init` fails; otherwise returns the id
    /// assigned to the new processor.
    pub fn add_processor(
        &self,
        chain_id: ObjectId,
        position: usize,
        kind: &str,
        name: impl Into<String>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<ObjectId, ControlError> {
        let kind = ProcessorKind::parse(kind)
            .ok_or_else(|| ControlError::UnknownProcessorKind(kind.to_string()))?;
        let processor_id = ObjectId::next();
        let mut processor = kind.construct(processor_id, name, self.host_control.clone());
        processor.init(self.host_control.sample_rate())?;
        let mut event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::AddProcessor,
            EventPayload::AddProcessor {
                chain_id,
                position,
                processor,
            },
        );
        if let Some(callback) = on_complete {
            event = event.on_complete(callback);
        }
        self.post_logged(event, "add_processor");
        Ok(processor_id)
    }

    /// Removes a processor from a chain. The audio thread hands the
    /// processor back for the worker to drop; it is never deallocated on
    /// the audio thread.
    pub fn delete_processor(
        &self,
        chain_id: ObjectId,
        processor_id: ObjectId,
        on_complete: Option<CompletionCallback>,
    ) {
        let mut event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::DeleteProcessor,
            EventPayload::DeleteProcessor {
                chain_id,
                processor_id,
            },
        );
        if let Some(callback) = on_complete {
            event = event.on_complete(callback);
        }
        self.post_logged(event, "delete_processor");
    }
}
