//! The processor contract: the unit of audio-thread work hosted inside a
//! chain.

use thiserror::Error;

use crate::ids::ObjectId;
use crate::rt_event::RtEvent;

/// Input/output channel counts a processor requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCount {
    /// Number of input channels consumed per block.
    pub inputs: u16,
    /// Number of output channels produced per block.
    pub outputs: u16,
}

impl ChannelCount {
    /// Convenience constructor for a processor with matching input/output
    /// channel counts.
    #[must_use]
    pub const fn symmetric(channels: u16) -> Self {
        Self {
            inputs: channels,
            outputs: channels,
        }
    }
}

/// The shape of a single parameter's value space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterKind {
    /// A continuous value normalized to `[0.0, 1.0]`.
    Continuous,
    /// A value that only takes `steps` discrete positions across
    /// `[0.0, 1.0]`.
    Stepped {
        /// Number of discrete positions, at least 2.
        steps: u32,
    },
    /// An on/off value; `0.0` is off, anything else is on.
    Toggle,
}

impl ParameterKind {
    /// Clamps a proposed value into this parameter's legal value space.
    #[must_use]
    pub fn clamp(self, value: f32) -> f32 {
        let value = value.clamp(0.0, 1.0);
        match self {
            Self::Continuous => value,
            Self::Toggle => {
                if value > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Stepped { steps } => {
                let steps = steps.max(2);
                let step_index = (value * (steps - 1) as f32).round();
                step_index / (steps - 1) as f32
            }
        }
    }
}

/// Static metadata describing one of a processor's parameters.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Identifier, unique within the owning processor.
    pub id: ObjectId,
    /// Human-readable name, e.g. `"gain"`.
    pub name: String,
    /// The parameter's value space.
    pub kind: ParameterKind,
    /// Value a freshly constructed processor starts with.
    pub default: f32,
}

/// A processor's parameter descriptors, addressable by id or name.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    descriptors: Vec<ParameterDescriptor>,
}

impl ParameterTable {
    /// An empty table, for processors with no exposed parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Builds a table from its descriptors.
    #[must_use]
    pub fn from_descriptors(descriptors: Vec<ParameterDescriptor>) -> Self {
        Self { descriptors }
    }

    /// All descriptors, in declaration order.
    #[must_use]
    pub fn descriptors(&self) -> &[ParameterDescriptor] {
        &self.descriptors
    }

    /// Looks up a descriptor by id.
    #[must_use]
    pub fn by_id(&self, id: ObjectId) -> Option<&ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Looks up a descriptor by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }
}

/// Errors a processor can raise while handling a parameter change or
/// string parameter change.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessorError {
    /// No parameter with this id is exposed by the processor.
    #[error("unknown parameter id {0}")]
    UnknownParameter(ObjectId),

    /// A string value could not be parsed into the parameter's value
    /// space.
    #[error("could not parse {value:?} for parameter {parameter}")]
    InvalidStringValue {
        /// The offending parameter.
        parameter: ObjectId,
        /// The string that failed to parse.
        value: String,
    },

    /// `init` could not prepare the processor for the given sample rate.
    #[error("processor failed to initialise: {reason}")]
    InitFailed {
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Outcome of delivering an [`RtEvent`] to a processor's
/// [`Processor::process_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorEventOutcome {
    /// The processor consumed the event.
    Handled,
    /// The event was not addressed to this processor or it does not
    /// understand it; the chain should not treat this as an error.
    Ignored,
}

/// Callback a processor uses to push an [`RtEvent`] onto the engine's
/// outgoing queue from inside [`Processor::process_event`] or
/// [`Processor::process_audio`] — the audio-thread half of the
/// host-control facade. Pre-bound to the engine's single outbound
/// producer by the caller; invoking it never allocates or blocks.
pub type OutputSink<'a> = &'a mut dyn FnMut(RtEvent);

/// The unit of audio-thread work hosted by a chain.
///
/// Implementations run entirely on the audio thread and must never
/// allocate, lock, or block. Structural mutation — inserting or removing
/// whole processors — happens one level up, in the engine core, not
/// inside this trait.
pub trait Processor: Send {
    /// Prepares the processor for the given sample rate. Called exactly
    /// once, off the audio thread, after construction and before the
    /// processor is ever handed to a chain — so it is free to allocate
    /// whatever sample-rate-dependent state it needs (filter coefficients,
    /// delay-line buffers, ...), unlike every other method in this trait.
    fn init(&mut self, sample_rate: u32) -> Result<(), ProcessorError>;

    /// This processor's stable id, unique within the owning engine.
    fn id(&self) -> ObjectId;

    /// A short, stable name for logging and introspection. Globally
    /// unique within the engine.
    fn name(&self) -> &str;

    /// Channel counts this processor requires.
    fn channel_count(&self) -> ChannelCount;

    /// This processor's exposed parameters.
    fn parameters(&self) -> &ParameterTable;

    /// Applies a parameter-change or keyboard [`RtEvent`] addressed to
    /// this processor, before `process_audio` runs for the same block.
    /// Any event kind this processor does not understand should be
    /// ignored. Implementations that re-route events (e.g. a transposer
    /// re-emitting a shifted note) call `output` and return
    /// [`ProcessorEventOutcome::Handled`] to swallow the original.
    fn process_event(&mut self, event: &RtEvent, output: OutputSink<'_>) -> ProcessorEventOutcome;

    /// Produces `output_audio` from `input` for one block. `input` and
    /// `output_audio` are interleaved-by-channel sample slices whose
    /// lengths match this processor's [`ChannelCount`] times the engine's
    /// block size. `emit` accepts any notification events this block of
    /// processing produces.
    fn process_audio(&mut self, input: &[f32], output_audio: &mut [f32], emit: OutputSink<'_>);
}
