//! A note transposer: re-emits note-on/note-off events shifted by a
//! `transpose` parameter and swallows the originals.

use tonebus_core::{
    ChannelCount, Event, EventKind, EventPayload, EventPosterId, KeyboardEvent, KeyboardEventKind,
    ObjectId, OutputSink, ParameterDescriptor, ParameterKind, ParameterTable, Processor,
    ProcessorError, ProcessorEventOutcome, RtEvent,
};

use crate::HostControl;

const MAX_SEMITONES: f32 = 24.0;

/// Shifts note-on/note-off events by a configurable number of
/// semitones, `[-24, 24]`, default `0`.
pub struct TransposerProcessor {
    id: ObjectId,
    name: String,
    transpose_param_id: ObjectId,
    semitones: i32,
    parameters: ParameterTable,
    host: HostControl,
}

impl TransposerProcessor {
    /// Builds a transposer with no shift applied. `host` is the facade
    /// this processor uses to report parameter changes back to the
    /// control plane; per spec, every processor receives one at
    /// construction.
    #[must_use]
    pub fn new(id: ObjectId, name: impl Into<String>, host: HostControl) -> Self {
        let transpose_param_id = ObjectId::next();
        let parameters = ParameterTable::from_descriptors(vec![ParameterDescriptor {
            id: transpose_param_id,
            name: "transpose".to_string(),
            kind: ParameterKind::Stepped { steps: 49 },
            default: 0.5,
        }]);
        Self {
            id,
            name: name.into(),
            transpose_param_id,
            semitones: 0,
            parameters,
            host,
        }
    }

    /// Current transpose amount in semitones, for tests.
    #[must_use]
    pub fn semitones(&self) -> i32 {
        self.semitones
    }

    fn semitones_from_normalized(value: f32) -> i32 {
        ((value - 0.5) * 2.0 * MAX_SEMITONES).round() as i32
    }

    fn shift_note(&self, note: u8) -> u8 {
        (i32::from(note) + self.semitones).clamp(0, 127) as u8
    }
}

impl Processor for TransposerProcessor {
    fn init(&mut self, _sample_rate: u32) -> Result<(), ProcessorError> {
        Ok(())
    }

    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn channel_count(&self) -> ChannelCount {
        ChannelCount::symmetric(2)
    }

    fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    fn process_event(&mut self, event: &RtEvent, output: OutputSink<'_>) -> ProcessorEventOutcome {
        match event {
            RtEvent::ParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value,
                ..
            } if *processor_id == self.id && *parameter_id == self.transpose_param_id => {
                let clamped = ParameterKind::Stepped { steps: 49 }.clamp(*value);
                self.semitones = Self::semitones_from_normalized(clamped);
                self.host.post_event(Event::immediate(
                    EventPosterId::Processor(self.id),
                    EventKind::ParameterChangeNotification,
                    EventPayload::ParameterChangeNotification {
                        chain_id: *chain_id,
                        processor_id: self.id,
                        parameter_id: self.transpose_param_id,
                        value: clamped,
                    },
                ));
                ProcessorEventOutcome::Handled
            }
            RtEvent::Keyboard {
                event: kb_event,
                sample_offset,
            } => self.retranspose(kb_event, *sample_offset, output),
            _ => ProcessorEventOutcome::Ignored,
        }
    }

    fn process_audio(&mut self, input: &[f32], output: &mut [f32], _emit: OutputSink<'_>) {
        let len = input.len().min(output.len());
        output[..len].copy_from_slice(&input[..len]);
    }
}

impl TransposerProcessor {
    fn retranspose(
        &self,
        kb_event: &KeyboardEvent,
        sample_offset: u32,
        output: OutputSink<'_>,
    ) -> ProcessorEventOutcome {
        let shifted_kind = match kb_event.kind {
            KeyboardEventKind::NoteOn { note, velocity } => KeyboardEventKind::NoteOn {
                note: self.shift_note(note),
                velocity,
            },
            KeyboardEventKind::NoteOff { note, velocity } => KeyboardEventKind::NoteOff {
                note: self.shift_note(note),
                velocity,
            },
            _ => return ProcessorEventOutcome::Ignored,
        };
        output(RtEvent::Keyboard {
            event: KeyboardEvent {
                chain_id: kb_event.chain_id,
                kind: shifted_kind,
            },
            sample_offset,
        });
        ProcessorEventOutcome::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_control::test_host_control;

    #[test]
    fn transpose_parameter_maps_normalized_value_to_semitones() {
        let mut processor =
            TransposerProcessor::new(ObjectId::new(1), "transposer", test_host_control());
        let param_id = processor.parameters().descriptors()[0].id;
        let mut sink = |_e: RtEvent| {};
        processor.process_event(
            &RtEvent::ParameterChange {
                chain_id: ObjectId::new(1),
                processor_id: ObjectId::new(1),
                parameter_id: param_id,
                value: 1.0,
                sample_offset: 0,
            },
            &mut sink,
        );
        assert_eq!(processor.semitones(), 24);
    }

    #[test]
    fn note_on_is_re_emitted_shifted_and_swallowed() {
        let mut processor =
            TransposerProcessor::new(ObjectId::new(1), "transposer", test_host_control());
        let param_id = processor.parameters().descriptors()[0].id;
        let mut sink = |_e: RtEvent| {};
        processor.process_event(
            &RtEvent::ParameterChange {
                chain_id: ObjectId::new(1),
                processor_id: ObjectId::new(1),
                parameter_id: param_id,
                value: 0.75,
                sample_offset: 0,
            },
            &mut sink,
        );
        assert_eq!(processor.semitones(), 12);

        let mut emitted = Vec::new();
        let outcome = processor.process_event(
            &RtEvent::Keyboard {
                event: KeyboardEvent {
                    chain_id: ObjectId::new(1),
                    kind: KeyboardEventKind::NoteOn { note: 60, velocity: 100 },
                },
                sample_offset: 5,
            },
            &mut |e| emitted.push(e),
        );
        assert_eq!(outcome, ProcessorEventOutcome::Handled);
        assert_eq!(emitted.len(), 1);
        match &emitted[0] {
            RtEvent::Keyboard { event, .. } => match event.kind {
                KeyboardEventKind::NoteOn { note, .. } => assert_eq!(note, 72),
                _ => panic!("expected NoteOn"),
            },
            _ => panic!("expected Keyboard"),
        }
    }
}
