//! Built-in processor constructors a control frontend can name by kind.
//!
//! Concrete plugin-format loading (VST3, CLAP, ...) is out of scope for
//! this slice; `add_processor` can only build one of the processors this
//! crate ships.

use tonebus_core::{ObjectId, Processor};
use tonebus_engine::processors::{GainProcessor, TransposerProcessor};
use tonebus_engine::HostControl;

/// A built-in processor a control frontend can ask to have constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    /// See [`GainProcessor`].
    Gain,
    /// See [`TransposerProcessor`].
    Transposer,
}

impl ProcessorKind {
    /// Parses a kind name as used in config files and CLI flags.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "gain" => Some(Self::Gain),
            "transposer" => Some(Self::Transposer),
            _ => None,
        }
    }

    /// Constructs the processor this kind names, under `id` and `name`.
    /// `host` is the facade passed to the processor at construction, per
    /// spec: it has not yet had `init` called on it.
    #[must_use]
    pub fn construct(self, id: ObjectId, name: impl Into<String>, host: HostControl) -> Box<dyn Processor> {
        match self {
            Self::Gain => Box::new(GainProcessor::new(id, name, host)),
            Self::Transposer => Box::new(TransposerProcessor::new(id, name, host)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_built_in_kinds() {
        assert_eq!(ProcessorKind::parse("gain"), Some(ProcessorKind::Gain));
        assert_eq!(
            ProcessorKind::parse("transposer"),
            Some(ProcessorKind::Transposer)
        );
        assert_eq!(ProcessorKind::parse("reverb"), None);
    }

    #[test]
    fn construct_builds_the_named_processor() {
        let (_to_engine_tx, to_engine_rx) = tonebus_core::RtEventQueue::new(8).split();
        let (from_engine_tx, _from_engine_rx) = tonebus_core::RtEventQueue::new(8).split();
        let engine = tonebus_engine::Engine::new(to_engine_rx, from_engine_tx, 48_000, 64);
        let (host_tx, _host_rx) = crossbeam_channel::unbounded();
        let host = engine.make_host_control(host_tx);
        let processor = ProcessorKind::Gain.construct(ObjectId::new(1), "g1", host);
        assert_eq!(processor.id(), ObjectId::new(1));
        assert_eq!(processor.name(), "g1");
    }
}
