//! A unity/variable-gain processor, purely to exercise the parameter
//! path end to end.

use tonebus_core::{
    ChannelCount, Event, EventKind, EventPayload, EventPosterId, ObjectId, OutputSink,
    ParameterDescriptor, ParameterKind, ParameterTable, Processor, ProcessorError,
    ProcessorEventOutcome, RtEvent,
};

use crate::HostControl;

/// Multiplies every sample by a single `gain` parameter, default `1.0`
/// (unity).
pub struct GainProcessor {
    id: ObjectId,
    name: String,
    gain_param_id: ObjectId,
    gain: f32,
    parameters: ParameterTable,
    host: HostControl,
}

impl GainProcessor {
    /// Builds a gain processor with its parameter storage at the
    /// default value. `host` is the facade this processor uses to report
    /// parameter changes back to the control plane; per spec, every
    /// processor receives one at construction.
    #[must_use]
    pub fn new(id: ObjectId, name: impl Into<String>, host: HostControl) -> Self {
        let gain_param_id = ObjectId::next();
        let parameters = ParameterTable::from_descriptors(vec![ParameterDescriptor {
            id: gain_param_id,
            name: "gain".to_string(),
            kind: ParameterKind::Continuous,
            default: 1.0,
        }]);
        Self {
            id,
            name: name.into(),
            gain_param_id,
            gain: 1.0,
            parameters,
            host,
        }
    }

    /// Current gain value, for tests and introspection.
    #[must_use]
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Processor for GainProcessor {
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

    fn process_event(&mut self, event: &RtEvent, _output: OutputSink<'_>) -> ProcessorEventOutcome {
        match event {
            RtEvent::ParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value,
                ..
            } if *processor_id == self.id && *parameter_id == self.gain_param_id => {
                self.gain = ParameterKind::Continuous.clamp(*value);
                self.host.post_event(Event::immediate(
                    EventPosterId::Processor(self.id),
                    EventKind::ParameterChangeNotification,
                    EventPayload::ParameterChangeNotification {
                        chain_id: *chain_id,
                        processor_id: self.id,
                        parameter_id: self.gain_param_id,
                        value: self.gain,
                    },
                ));
                ProcessorEventOutcome::Handled
            }
            _ => ProcessorEventOutcome::Ignored,
        }
    }

    fn process_audio(&mut self, input: &[f32], output: &mut [f32], _emit: OutputSink<'_>) {
        for (sample_in, sample_out) in input.iter().zip(output.iter_mut()) {
            *sample_out = sample_in * self.gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_control::test_host_control;

    #[test]
    fn parameter_change_updates_gain_before_process_audio() {
        let mut processor = GainProcessor::new(ObjectId::new(1), "gain", test_host_control());
        let gain_param_id = processor.parameters().descriptors()[0].id;
        let event = RtEvent::ParameterChange {
            chain_id: ObjectId::new(1),
            processor_id: ObjectId::new(1),
            parameter_id: gain_param_id,
            value: 0.5,
            sample_offset: 0,
        };
        let mut sink = |_e: RtEvent| {};
        let outcome = processor.process_event(&event, &mut sink);
        assert_eq!(outcome, ProcessorEventOutcome::Handled);
        assert_eq!(processor.gain(), 0.5);
    }

    #[test]
    fn process_audio_scales_every_sample() {
        let mut processor = GainProcessor::new(ObjectId::new(1), "gain", test_host_control());
        let gain_param_id = processor.parameters().descriptors()[0].id;
        let mut sink = |_e: RtEvent| {};
        processor.process_event(
            &RtEvent::ParameterChange {
                chain_id: ObjectId::new(1),
                processor_id: ObjectId::new(1),
                parameter_id: gain_param_id,
                value: 0.5,
                sample_offset: 0,
            },
            &mut sink,
        );
        let input = [1.0, 1.0, 1.0, 1.0];
        let mut output = [0.0; 4];
        processor.process_audio(&input, &mut output, &mut sink);
        assert_eq!(output, [0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn unrelated_event_is_ignored() {
        let mut processor = GainProcessor::new(ObjectId::new(1), "gain", test_host_control());
        let mut sink = |_e: RtEvent| {};
        let outcome = processor.process_event(&RtEvent::Ack { chain_id: ObjectId::new(1) }, &mut sink);
        assert_eq!(outcome, ProcessorEventOutcome::Ignored);
    }
}
