//! Fixed-size event record that crosses the audio/non-audio boundary.

use crate::ids::ObjectId;
use crate::Time;

/// A single MIDI message, carried verbatim.
///
/// `RawMidi` does not interpret its bytes; interpretation is a processor's
/// job. Carrying at most 4 bytes (a status byte plus up to three data
/// bytes, covering sysex-free channel and system messages) keeps it a
/// small, `Copy` record — no allocation, no indirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMidi {
    /// Status byte followed by up to three data bytes.
    pub bytes: [u8; 4],
    /// Number of bytes actually populated (1..=4).
    pub len: u8,
}

impl RawMidi {
    /// Builds a raw MIDI message from its significant bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 4], len: u8) -> Self {
        Self { bytes, len }
    }

    /// The populated slice of `bytes`.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Keyboard event kind, mirroring note-on/note-off/aftertouch/raw MIDI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardEventKind {
    /// Note-on with velocity in `[0, 127]`.
    NoteOn {
        /// MIDI note number, `0..=127`.
        note: u8,
        /// Note-on velocity, `0..=127`.
        velocity: u8,
    },
    /// Note-off with release velocity in `[0, 127]`.
    NoteOff {
        /// MIDI note number, `0..=127`.
        note: u8,
        /// Release velocity, `0..=127`.
        velocity: u8,
    },
    /// Polyphonic or channel aftertouch pressure, `0..=127`.
    Aftertouch {
        /// MIDI note number, `0..=127`.
        note: u8,
        /// Pressure value, `0..=127`.
        pressure: u8,
    },
    /// A raw MIDI message a processor opts to receive unparsed.
    RawMidi(RawMidi),
}

/// A keyboard event addressed to a single chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// Destination chain.
    pub chain_id: ObjectId,
    /// The keyboard action itself.
    pub kind: KeyboardEventKind,
}

/// The record carried by [`crate::RtEventQueue`] in both directions:
/// engine-bound commands from the non-RT side, and audio-thread-bound
/// notifications flowing back out.
///
/// Most variants (`ParameterChange`, `Keyboard`, `Ack`, `Sync`, ...) are
/// small and self-contained. A handful — `AddChain`, `InsertProcessor`,
/// `ReorderChain`, and the `*Returned` notifications — own a heap
/// allocation (a built [`crate::Chain`], a `Box<dyn Processor>`, a
/// `Vec<ObjectId>`) that was built off the audio thread and is only ever
/// moved, never allocated or freed, while on it. Because of those boxed
/// variants `RtEvent` derives only `Debug`, not `Copy`.
pub enum RtEvent {
    /// Change a single parameter's value on a processor.
    ParameterChange {
        /// Owning chain.
        chain_id: ObjectId,
        /// Target processor within the chain.
        processor_id: ObjectId,
        /// Parameter identifier, scoped to `processor_id`.
        parameter_id: ObjectId,
        /// New normalized value.
        value: f32,
        /// Block-relative sample at which the change takes effect.
        sample_offset: u32,
    },
    /// Change a parameter from its string representation. The string is
    /// boxed once by the sender and moved through the queue; whichever
    /// side takes the event owns (and eventually drops) the allocation —
    /// no raw pointers, no `unsafe`, just ordinary move semantics.
    StringParameterChange {
        /// Owning chain.
        chain_id: ObjectId,
        /// Target processor within the chain.
        processor_id: ObjectId,
        /// Parameter identifier, scoped to `processor_id`.
        parameter_id: ObjectId,
        /// String form of the new value, parsed by the processor.
        value: Box<str>,
        /// Block-relative sample at which the change takes effect.
        sample_offset: u32,
    },
    /// Deliver a keyboard event to a chain's processors.
    Keyboard {
        /// The keyboard event payload.
        event: KeyboardEvent,
        /// Block-relative sample at which the event takes effect.
        sample_offset: u32,
    },
    /// Install a new, empty chain, already fully constructed — including
    /// its scratch buffers — off the audio thread. The processor it will
    /// eventually hold arrives separately via [`RtEvent::InsertProcessor`].
    /// Mirrors `InsertProcessor`: the audio thread only ever moves this
    /// value into place, never allocates it.
    AddChain {
        /// The chain to install.
        chain: crate::chain::Chain,
    },
    /// Remove a chain and hand its processors back out-of-band so the
    /// non-RT side can drop them.
    RemoveChain {
        /// Chain to remove.
        chain_id: ObjectId,
    },
    /// Insert a processor into a chain at `position`.
    InsertProcessor {
        /// Owning chain.
        chain_id: ObjectId,
        /// Insertion index within the chain's processor list.
        position: usize,
        /// The processor to insert. Allocated off the audio thread.
        processor: Box<dyn crate::processor::Processor>,
    },
    /// Remove a processor from a chain and hand it back out-of-band so the
    /// non-RT side can drop it.
    RemoveProcessor {
        /// Owning chain.
        chain_id: ObjectId,
        /// Processor to remove.
        processor_id: ObjectId,
    },
    /// Reorder a chain's processor list to the given id sequence.
    ReorderChain {
        /// Owning chain.
        chain_id: ObjectId,
        /// New processor order, by id.
        order: Vec<ObjectId>,
    },
    /// Outbound: a processor removed from the audio thread, handed back to
    /// the non-RT side for deallocation.
    ProcessorReturned {
        /// Chain the processor was removed from.
        chain_id: ObjectId,
        /// The processor instance itself, ready to drop off the audio
        /// thread.
        processor: Box<dyn crate::processor::Processor>,
    },
    /// Outbound: a chain removed from the audio thread, handed back with
    /// every processor it still held so the non-RT side can drop them.
    ChainReturned {
        /// The chain that was removed.
        chain_id: ObjectId,
        /// The processors it still held, in signal-flow order.
        processors: Vec<Box<dyn crate::processor::Processor>>,
    },
    /// Outbound: acknowledges a structural command completed on the audio
    /// thread.
    Ack {
        /// Chain the command targeted.
        chain_id: ObjectId,
    },
    /// Outbound: emitted once per block so the dispatcher can align its
    /// event timer with the audio thread's wall-clock view.
    Sync {
        /// Wall-clock time at which the block currently being produced
        /// started.
        block_start: Time,
    },
}

impl std::fmt::Debug for RtEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParameterChange { chain_id, processor_id, parameter_id, value, sample_offset } => f
                .debug_struct("ParameterChange")
                .field("chain_id", chain_id)
                .field("processor_id", processor_id)
                .field("parameter_id", parameter_id)
                .field("value", value)
                .field("sample_offset", sample_offset)
                .finish(),
            Self::StringParameterChange { chain_id, processor_id, parameter_id, value, sample_offset } => f
                .debug_struct("StringParameterChange")
                .field("chain_id", chain_id)
                .field("processor_id", processor_id)
                .field("parameter_id", parameter_id)
                .field("value", value)
                .field("sample_offset", sample_offset)
                .finish(),
            Self::Keyboard { event, sample_offset } => f
                .debug_struct("Keyboard")
                .field("event", event)
                .field("sample_offset", sample_offset)
                .finish(),
            Self::AddChain { chain } => f.debug_struct("AddChain").field("chain", chain).finish(),
            Self::RemoveChain { chain_id } => {
                f.debug_struct("RemoveChain").field("chain_id", chain_id).finish()
            }
            Self::InsertProcessor { chain_id, position, processor } => f
                .debug_struct("InsertProcessor")
                .field("chain_id", chain_id)
                .field("position", position)
                .field("processor", &processor.id())
                .finish(),
            Self::RemoveProcessor { chain_id, processor_id } => f
                .debug_struct("RemoveProcessor")
                .field("chain_id", chain_id)
                .field("processor_id", processor_id)
                .finish(),
            Self::ReorderChain { chain_id, order } => f
                .debug_struct("ReorderChain")
                .field("chain_id", chain_id)
                .field("order", order)
                .finish(),
            Self::ProcessorReturned { chain_id, processor } => f
                .debug_struct("ProcessorReturned")
                .field("chain_id", chain_id)
                .field("processor", &processor.id())
                .finish(),
            Self::ChainReturned { chain_id, processors } => f
                .debug_struct("ChainReturned")
                .field("chain_id", chain_id)
                .field("processors", &processors.iter().map(|p| p.id()).collect::<Vec<_>>())
                .finish(),
            Self::Ack { chain_id } => f.debug_struct("Ack").field("chain_id", chain_id).finish(),
            Self::Sync { block_start } => {
                f.debug_struct("Sync").field("block_start", block_start).finish()
            }
        }
    }
}

impl RtEvent {
    /// Convenience constructor for a parameter-change event.
    #[must_use]
    pub fn parameter_change(
        chain_id: ObjectId,
        processor_id: ObjectId,
        value: f32,
        sample_offset: u32,
    ) -> Self {
        Self::ParameterChange {
            chain_id,
            processor_id,
            parameter_id: ObjectId::new(0),
            value,
            sample_offset,
        }
    }
}

/// Discriminant-only view of [`RtEvent`], useful for counters and logging
/// that must not touch the boxed payload variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtEventKind {
    /// See [`RtEvent::ParameterChange`].
    ParameterChange,
    /// See [`RtEvent::StringParameterChange`].
    StringParameterChange,
    /// See [`RtEvent::Keyboard`].
    Keyboard,
    /// See [`RtEvent::AddChain`].
    AddChain,
    /// See [`RtEvent::RemoveChain`].
    RemoveChain,
    /// See [`RtEvent::InsertProcessor`].
    InsertProcessor,
    /// See [`RtEvent::RemoveProcessor`].
    RemoveProcessor,
    /// See [`RtEvent::ReorderChain`].
    ReorderChain,
    /// See [`RtEvent::ProcessorReturned`].
    ProcessorReturned,
    /// See [`RtEvent::ChainReturned`].
    ChainReturned,
    /// See [`RtEvent::Ack`].
    Ack,
    /// See [`RtEvent::Sync`].
    Sync,
}

impl RtEvent {
    /// The discriminant of this event, without touching boxed payloads.
    #[must_use]
    pub fn kind(&self) -> RtEventKind {
        match self {
            Self::ParameterChange { .. } => RtEventKind::ParameterChange,
            Self::StringParameterChange { .. } => RtEventKind::StringParameterChange,
            Self::Keyboard { .. } => RtEventKind::Keyboard,
            Self::AddChain { .. } => RtEventKind::AddChain,
            Self::RemoveChain { .. } => RtEventKind::RemoveChain,
            Self::InsertProcessor { .. } => RtEventKind::InsertProcessor,
            Self::RemoveProcessor { .. } => RtEventKind::RemoveProcessor,
            Self::ReorderChain { .. } => RtEventKind::ReorderChain,
            Self::ProcessorReturned { .. } => RtEventKind::ProcessorReturned,
            Self::ChainReturned { .. } => RtEventKind::ChainReturned,
            Self::Ack { .. } => RtEventKind::Ack,
            Self::Sync { .. } => RtEventKind::Sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_change_round_trips_fields() {
        let event = RtEvent::parameter_change(ObjectId::new(1), ObjectId::new(2), 0.75, 42);
        match event {
            RtEvent::ParameterChange {
                chain_id,
                processor_id,
                value,
                sample_offset,
                ..
            } => {
                assert_eq!(chain_id, ObjectId::new(1));
                assert_eq!(processor_id, ObjectId::new(2));
                assert_eq!(value, 0.75);
                assert_eq!(sample_offset, 42);
            }
            _ => unreachable!("constructed as ParameterChange"),
        }
    }

    #[test]
    fn kind_matches_discriminant() {
        let event = RtEvent::Ack {
            chain_id: ObjectId::new(3),
        };
        assert_eq!(event.kind(), RtEventKind::Ack);
    }

    #[test]
    fn raw_midi_as_slice_respects_len() {
        let msg = RawMidi::new([0x90, 60, 100, 0], 3);
        assert_eq!(msg.as_slice(), &[0x90, 60, 100]);
    }

    #[test]
    fn raw_midi_carries_a_full_four_byte_message() {
        let msg = RawMidi::new([0xF0, 0x7E, 0x7F, 0x06], 4);
        assert_eq!(msg.as_slice(), &[0xF0, 0x7E, 0x7F, 0x06]);
    }
}
