//! A named, ordered sequence of processors forming one signal path.

use crate::processor::{ChannelCount, Processor, ProcessorEventOutcome};
use crate::rt_event::RtEvent;
use crate::ids::ObjectId;

/// An ordered sequence of [`Processor`]s with a fixed channel count.
///
/// A `Chain` is always built off the audio thread — construction
/// allocates its two scratch buffers plus its (initially empty)
/// processor list — and then moved into the engine core whole, via
/// [`RtEvent::AddChain`], mirroring how [`RtEvent::InsertProcessor`]
/// carries an already-built processor. Once installed, the audio thread
/// is the only mutator of a `Chain`'s processor list: every
/// insert/remove/reorder reaches it as an [`RtEvent`] applied at step 2
/// of the per-block protocol, never through a direct method call from
/// another thread.
pub struct Chain {
    id: ObjectId,
    name: String,
    channels: ChannelCount,
    processors: Vec<Box<dyn Processor>>,
    buf_a: Vec<f32>,
    buf_b: Vec<f32>,
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("channels", &self.channels)
            .field(
                "processors",
                &self.processors.iter().map(|p| p.id()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Chain {
    /// Creates an empty chain sized for `block_size` frames at
    /// `channels`. The two scratch buffers used to pipe audio between
    /// processors are allocated here, once, never again on the hot path.
    #[must_use]
    pub fn new(id: ObjectId, name: impl Into<String>, channels: ChannelCount, block_size: usize) -> Self {
        let frame_count = block_size * usize::from(channels.inputs.max(channels.outputs));
        Self {
            id,
            name: name.into(),
            channels,
            processors: Vec::new(),
            buf_a: vec![0.0; frame_count],
            buf_b: vec![0.0; frame_count],
        }
    }

    /// This chain's stable id.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// This chain's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This chain's required channel count.
    #[must_use]
    pub const fn channels(&self) -> ChannelCount {
        self.channels
    }

    /// The processors currently held, in signal-flow order.
    #[must_use]
    pub fn processors(&self) -> &[Box<dyn Processor>] {
        &self.processors
    }

    /// Inserts a processor at `position`, clamped to the current length.
    pub fn insert(&mut self, position: usize, processor: Box<dyn Processor>) {
        let position = position.min(self.processors.len());
        self.processors.insert(position, processor);
    }

    /// Removes the processor with id `processor_id`, handing it back to
    /// the caller rather than dropping it here — destruction always
    /// happens off the audio thread.
    pub fn remove_by_id(&mut self, processor_id: ObjectId) -> Option<Box<dyn Processor>> {
        let index = self.processors.iter().position(|p| p.id() == processor_id)?;
        Some(self.processors.remove(index))
    }

    /// Consumes the chain, handing back every processor it still held so
    /// the caller can drop them off the audio thread. The chain's own
    /// scratch buffers are dropped here; they hold no processor state and
    /// their deallocation is bounded by `block_size`.
    #[must_use]
    pub fn into_processors(self) -> Vec<Box<dyn Processor>> {
        self.processors
    }

    /// Reorders the processor list to match `order`. Ids absent from
    /// `order` keep their relative position at the end; unknown ids in
    /// `order` are skipped.
    ///
    /// This is the one documented simplification around the audio
    /// thread's no-allocation rule: `reorder` requests are rare
    /// structural commands, not per-block traffic, so the scratch `Vec`
    /// built here is accepted as a bounded, occasional allocation rather
    /// than threading a caller-owned buffer through for this single
    /// uncommon path.
    pub fn reorder(&mut self, order: &[ObjectId]) {
        let mut reordered = Vec::with_capacity(self.processors.len());
        for wanted in order {
            if let Some(index) = self.processors.iter().position(|p| p.id() == *wanted) {
                reordered.push(self.processors.remove(index));
            }
        }
        reordered.append(&mut self.processors);
        self.processors = reordered;
    }

    /// Delivers an [`RtEvent`] to the processor named by `processor_id`,
    /// if this chain holds one.
    pub fn dispatch_event(
        &mut self,
        processor_id: ObjectId,
        event: &RtEvent,
        mut output: impl FnMut(RtEvent),
    ) -> ProcessorEventOutcome {
        for processor in &mut self.processors {
            if processor.id() == processor_id {
                return processor.process_event(event, &mut output);
            }
        }
        ProcessorEventOutcome::Ignored
    }

    /// Delivers an [`RtEvent`] to every processor in the chain — used for
    /// keyboard events, which are not addressed to a single processor id.
    pub fn dispatch_broadcast(&mut self, event: &RtEvent, mut output: impl FnMut(RtEvent)) {
        for processor in &mut self.processors {
            processor.process_event(event, &mut output);
        }
    }

    /// Runs every processor in order, piping each one's output into the
    /// next one's input via the chain's two pre-allocated scratch
    /// buffers.
    pub fn process_audio(&mut self, input: &[f32], output: &mut [f32], mut emit: impl FnMut(RtEvent)) {
        let len = input.len().min(self.buf_a.len());
        self.buf_a[..len].copy_from_slice(&input[..len]);
        for processor in &mut self.processors {
            processor.process_audio(&self.buf_a, &mut self.buf_b, &mut emit);
            std::mem::swap(&mut self.buf_a, &mut self.buf_b);
        }
        let out_len = output.len().min(self.buf_a.len());
        output[..out_len].copy_from_slice(&self.buf_a[..out_len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{OutputSink, ParameterTable, ProcessorError};

    struct PassThrough {
        id: ObjectId,
        params: ParameterTable,
    }

    impl Processor for PassThrough {
        fn init(&mut self, _sample_rate: u32) -> Result<(), ProcessorError> {
            Ok(())
        }
        fn id(&self) -> ObjectId {
            self.id
        }
        fn name(&self) -> &str {
            "pass_through"
        }
        fn channel_count(&self) -> ChannelCount {
            ChannelCount::symmetric(1)
        }
        fn parameters(&self) -> &ParameterTable {
            &self.params
        }
        fn process_event(&mut self, _event: &RtEvent, _output: OutputSink<'_>) -> ProcessorEventOutcome {
            ProcessorEventOutcome::Ignored
        }
        fn process_audio(&mut self, input: &[f32], output: &mut [f32], _emit: OutputSink<'_>) {
            output.copy_from_slice(input);
        }
    }

    #[test]
    fn empty_chain_passes_audio_through() {
        let mut chain = Chain::new(ObjectId::new(1), "main", ChannelCount::symmetric(1), 4);
        let input = [0.1, 0.2, 0.3, 0.4];
        let mut output = [0.0; 4];
        chain.process_audio(&input, &mut output, |_event| {});
        assert_eq!(output, input);
    }

    #[test]
    fn single_processor_chain_passes_audio_through() {
        let mut chain = Chain::new(ObjectId::new(1), "main", ChannelCount::symmetric(1), 4);
        chain.insert(
            0,
            Box::new(PassThrough {
                id: ObjectId::new(9),
                params: ParameterTable::new(),
            }),
        );
        let input = [0.1, 0.2, 0.3, 0.4];
        let mut output = [0.0; 4];
        chain.process_audio(&input, &mut output, |_event| {});
        assert_eq!(output, input);
        assert_eq!(chain.processors().len(), 1);
    }

    #[test]
    fn remove_by_id_hands_back_the_processor() {
        let mut chain = Chain::new(ObjectId::new(1), "main", ChannelCount::symmetric(1), 4);
        chain.insert(
            0,
            Box::new(PassThrough {
                id: ObjectId::new(9),
                params: ParameterTable::new(),
            }),
        );
        let removed = chain.remove_by_id(ObjectId::new(9));
        assert!(removed.is_some());
        assert!(chain.processors().is_empty());
    }

    #[test]
    fn reorder_moves_named_processors_to_the_front() {
        let mut chain = Chain::new(ObjectId::new(1), "main", ChannelCount::symmetric(1), 4);
        chain.insert(
            0,
            Box::new(PassThrough {
                id: ObjectId::new(1),
                params: ParameterTable::new(),
            }),
        );
        chain.insert(
            1,
            Box::new(PassThrough {
                id: ObjectId::new(2),
                params: ParameterTable::new(),
            }),
        );
        chain.reorder(&[ObjectId::new(2)]);
        assert_eq!(chain.processors()[0].id(), ObjectId::new(2));
        assert_eq!(chain.processors()[1].id(), ObjectId::new(1));
    }
}
