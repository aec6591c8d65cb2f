//! The per-block engine core: drains inbound RT events, runs every chain,
//! collects emitted RT events.

use tonebus_core::{Chain, EventTimer, ObjectId, RtEvent, RtEventConsumer, RtEventProducer, Time};

use crate::host_control::{EngineClock, HostControl};
use crate::telemetry::EngineTelemetry;

/// Owns every [`Chain`] in the engine and the RT queues that connect it
/// to the non-real-time side.
///
/// `Engine::process_chunk` is the only method ever called from the audio
/// thread's hot path; it never allocates, locks, or blocks.
pub struct Engine {
    chains: Vec<Chain>,
    inbound: RtEventConsumer,
    outbound: RtEventProducer,
    timer: EventTimer,
    telemetry: EngineTelemetry,
    clock: EngineClock,
    sample_rate: u32,
    block_size: u32,
    scratch_a: Vec<f32>,
    scratch_b: Vec<f32>,
}

impl Engine {
    /// Builds an engine with no chains yet. Chains are added with
    /// [`Engine::add_chain`] before the first block, or inserted as
    /// structural RT events like everything else.
    #[must_use]
    pub fn new(
        inbound: RtEventConsumer,
        outbound: RtEventProducer,
        sample_rate: u32,
        block_size: u32,
    ) -> Self {
        let frame_count = block_size as usize * 2;
        Self {
            chains: Vec::new(),
            inbound,
            outbound,
            timer: EventTimer::new(sample_rate, block_size, Time::from_micros(0)),
            telemetry: EngineTelemetry::new(),
            clock: EngineClock::new(),
            sample_rate,
            block_size,
            scratch_a: vec![0.0; frame_count],
            scratch_b: vec![0.0; frame_count],
        }
    }

    /// A cloneable handle onto this engine's audio-thread counters, for
    /// the dispatcher to poll.
    #[must_use]
    pub fn telemetry(&self) -> EngineTelemetry {
        self.telemetry.clone()
    }

    /// The block size this engine was constructed with, for callers that
    /// need to build a [`Chain`] off the audio thread before handing it
    /// in via `RtEvent::AddChain`.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Builds a [`HostControl`] facade for a processor the worker is
    /// about to construct, wired to this engine's clock and the given
    /// channel back to the dispatcher.
    #[must_use]
    pub fn make_host_control(&self, event_tx: crossbeam_channel::Sender<tonebus_core::Event>) -> HostControl {
        HostControl::new(self.sample_rate, self.clock.clone(), event_tx)
    }

    /// Adds a chain directly. Intended for setup before the audio thread
    /// starts; once running, chains are added via an `RtEvent::AddChain`
    /// mutation entering through the inbound queue instead (see
    /// [`Engine::apply_inbound`]).
    pub fn add_chain(&mut self, chain: Chain) {
        self.chains.push(chain);
    }

    /// Removes a chain entirely, returning it (and the processors it
    /// still holds) for the caller to drop off the audio thread.
    pub fn remove_chain(&mut self, chain_id: ObjectId) -> Option<Chain> {
        let index = self.chains.iter().position(|c| c.id() == chain_id)?;
        Some(self.chains.remove(index))
    }

    /// The chains currently held, in processing order.
    #[must_use]
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Updates the engine's view of wall-clock time for the block about
    /// to be processed. Called once per block, before `process_chunk`.
    pub fn update_time(&mut self, wall_clock_now: Time) {
        self.timer.advance_block(wall_clock_now);
        self.clock.set(wall_clock_now);
    }

    /// Runs the full per-block protocol: time sync, drain inbound
    /// events, run every chain in order, push emitted events outbound.
    pub fn process_chunk(&mut self, input: &[f32], output: &mut [f32]) {
        if !self.outbound.push(RtEvent::Sync {
            block_start: self.timer.block_start(),
        }) {
            self.telemetry.record_rt_queue_overflow();
        }

        while let Some(event) = self.inbound.pop() {
            self.apply_inbound(event);
        }

        let len = input.len().min(self.scratch_a.len());
        self.scratch_a[..len].copy_from_slice(&input[..len]);
        for chain in &mut self.chains {
            let outbound = &mut self.outbound;
            let telemetry = &self.telemetry;
            chain.process_audio(&self.scratch_a, &mut self.scratch_b, |event| {
                if !outbound.push(event) {
                    telemetry.record_rt_queue_overflow();
                }
            });
            std::mem::swap(&mut self.scratch_a, &mut self.scratch_b);
        }
        let out_len = output.len().min(self.scratch_a.len());
        output[..out_len].copy_from_slice(&self.scratch_a[..out_len]);

        self.telemetry.record_block();
    }

    fn apply_inbound(&mut self, event: RtEvent) {
        match event {
            RtEvent::ParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value,
                sample_offset,
            } => {
                let rebuilt = RtEvent::ParameterChange {
                    chain_id,
                    processor_id,
                    parameter_id,
                    value,
                    sample_offset,
                };
                self.deliver_to_processor(chain_id, processor_id, &rebuilt);
            }
            RtEvent::StringParameterChange { .. } => {
                // Neither built-in processor exposes a string-typed
                // parameter in this slice; count as dropped rather than
                // silently discarding.
                self.telemetry.record_dropped_event();
            }
            RtEvent::Keyboard { event: kb, sample_offset } => {
                let rebuilt = RtEvent::Keyboard { event: kb, sample_offset };
                self.broadcast_to_chain(kb.chain_id, &rebuilt);
            }
            RtEvent::AddChain { chain } => {
                let chain_id = chain.id();
                if self.chains.iter().any(|c| c.id() == chain_id) {
                    self.telemetry.record_dropped_event();
                } else {
                    self.chains.push(chain);
                    let _ = self.outbound.push(RtEvent::Ack { chain_id });
                }
            }
            RtEvent::RemoveChain { chain_id } => match self.remove_chain(chain_id) {
                Some(chain) => {
                    let processors = chain.into_processors();
                    if !self
                        .outbound
                        .push(RtEvent::ChainReturned { chain_id, processors })
                    {
                        self.telemetry.record_rt_queue_overflow();
                    }
                }
                None => self.telemetry.record_dropped_event(),
            },
            RtEvent::InsertProcessor {
                chain_id,
                position,
                processor,
            } => {
                if let Some(chain) = self.chains.iter_mut().find(|c| c.id() == chain_id) {
                    chain.insert(position, processor);
                    let _ = self.outbound.push(RtEvent::Ack { chain_id });
                } else {
                    self.telemetry.record_dropped_event();
                }
            }
            RtEvent::RemoveProcessor {
                chain_id,
                processor_id,
            } => {
                let removed = self
                    .chains
                    .iter_mut()
                    .find(|c| c.id() == chain_id)
                    .and_then(|chain| chain.remove_by_id(processor_id));
                match removed {
                    Some(processor) => {
                        if !self
                            .outbound
                            .push(RtEvent::ProcessorReturned { chain_id, processor })
                        {
                            self.telemetry.record_rt_queue_overflow();
                        }
                    }
                    None => self.telemetry.record_dropped_event(),
                }
            }
            RtEvent::ReorderChain { chain_id, order } => {
                if let Some(chain) = self.chains.iter_mut().find(|c| c.id() == chain_id) {
                    chain.reorder(&order);
                    let _ = self.outbound.push(RtEvent::Ack { chain_id });
                } else {
                    self.telemetry.record_dropped_event();
                }
            }
            // Outbound-only variants arriving inbound would be a
            // protocol violation; drop and count rather than panic.
            RtEvent::ProcessorReturned { .. }
            | RtEvent::ChainReturned { .. }
            | RtEvent::Ack { .. }
            | RtEvent::Sync { .. } => {
                self.telemetry.record_dropped_event();
            }
        }
    }

    fn deliver_to_processor(&mut self, chain_id: ObjectId, processor_id: ObjectId, event: &RtEvent) {
        let Some(chain) = self.chains.iter_mut().find(|c| c.id() == chain_id) else {
            self.telemetry.record_dropped_event();
            return;
        };
        let outbound = &mut self.outbound;
        let telemetry = &self.telemetry;
        let outcome = chain.dispatch_event(processor_id, event, |emitted| {
            if !outbound.push(emitted) {
                telemetry.record_rt_queue_overflow();
            }
        });
        if outcome == tonebus_core::ProcessorEventOutcome::Ignored {
            self.telemetry.record_dropped_event();
        }
    }

    fn broadcast_to_chain(&mut self, chain_id: ObjectId, event: &RtEvent) {
        let Some(chain) = self.chains.iter_mut().find(|c| c.id() == chain_id) else {
            self.telemetry.record_dropped_event();
            return;
        };
        let outbound = &mut self.outbound;
        let telemetry = &self.telemetry;
        chain.dispatch_broadcast(event, |emitted| {
            if !outbound.push(emitted) {
                telemetry.record_rt_queue_overflow();
            }
        });
    }
}
