//! The non-real-time event dispatcher: classifies control events, routes
//! them to registered posters, converts timed events into RT events at
//! the right block, and fans notifications out to subscribers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tonebus_core::{
    CompletionStatus, Event, EventKind, EventPayload, EventPosterId, EventStatus, EventTimer,
    Poster, RtEvent, RtEventConsumer, RtEventProducer, Schedule,
};
use tracing::{debug, trace, warn};

/// Default dispatcher tick period, matching the typical value in §6's
/// configuration table.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1);

fn complete(event: Event, status: CompletionStatus) {
    if let Some(callback) = event.completion {
        callback(status);
    }
}

fn terminal_status(status: EventStatus) -> CompletionStatus {
    match status {
        EventStatus::HandledOk => CompletionStatus::Ok,
        EventStatus::QueuedHandling => {
            unreachable!("QueuedHandling is not a terminal status")
        }
        EventStatus::UnrecognizedEvent | EventStatus::UnrecognizedReceiver | EventStatus::Error => {
            CompletionStatus::Error
        }
    }
}

/// Non-real-time scheduler owning the dispatcher thread's state.
///
/// Nothing here runs concurrently with itself — every method is called
/// from the single dispatcher thread (or, in tests, synchronously from
/// the calling thread). Cross-thread producers only ever touch the
/// cloneable [`Sender<Event>`] handed out by [`EventDispatcher::new`].
pub struct EventDispatcher {
    in_rx: Receiver<Event>,
    waiting_list: VecDeque<Event>,
    posters: HashMap<EventPosterId, Box<dyn Poster>>,
    keyboard_listeners: Vec<Box<dyn FnMut(&Event) + Send>>,
    parameter_change_listeners: Vec<Box<dyn FnMut(&Event) + Send>>,
    to_engine: RtEventProducer,
    from_engine: RtEventConsumer,
    worker_tx: Sender<Event>,
    timer: EventTimer,
    tick_period: Duration,
    block_size: usize,
    rt_queue_overflows: u64,
}

/// Owns the dedicated thread started by [`EventDispatcher::spawn`].
///
/// Dropping a `DispatcherHandle` without calling
/// [`DispatcherHandle::stop`] leaks the thread rather than silently
/// detaching cancellation semantics onto `Drop`.
pub struct DispatcherHandle {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<EventDispatcher>>,
}

impl DispatcherHandle {
    /// Signals the dispatcher thread to stop after its current tick,
    /// joins it, and drains whatever is left with
    /// [`CompletionStatus::Cancelled`] via [`EventDispatcher::stop`].
    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(dispatcher) => dispatcher.stop(),
                Err(_) => warn!("dispatcher thread panicked before it could be stopped cleanly"),
            }
        }
    }
}

impl EventDispatcher {
    /// Builds a dispatcher wired to the engine's RT queues and the
    /// worker's event channel. Returns the dispatcher plus a cloneable
    /// sender any control frontend can use to post [`Event`]s.
    #[must_use]
    pub fn new(
        to_engine: RtEventProducer,
        from_engine: RtEventConsumer,
        worker_tx: Sender<Event>,
        sample_rate: u32,
        block_size: u32,
        tick_period: Duration,
    ) -> (Self, Sender<Event>) {
        let (in_tx, in_rx) = crossbeam_channel::unbounded();
        let dispatcher = Self {
            in_rx,
            waiting_list: VecDeque::new(),
            posters: HashMap::new(),
            keyboard_listeners: Vec::new(),
            parameter_change_listeners: Vec::new(),
            to_engine,
            from_engine,
            worker_tx,
            timer: EventTimer::new(sample_rate, block_size, tonebus_core::Time::from_micros(0)),
            tick_period,
            block_size: block_size as usize,
            rt_queue_overflows: 0,
        };
        (dispatcher, in_tx)
    }

    /// This dispatcher's tick period.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Registers a poster under `id`. Fails if a poster is already
    /// registered under that id; unregister by address-specific
    /// construction elsewhere rather than overwriting silently.
    pub fn register_poster(
        &mut self,
        id: EventPosterId,
        poster: Box<dyn Poster>,
    ) -> Result<(), crate::DispatchError> {
        if self.posters.contains_key(&id) {
            return Err(crate::DispatchError::DuplicatePoster(id));
        }
        self.posters.insert(id, poster);
        Ok(())
    }

    /// Subscribes a listener to every broadcast keyboard notification.
    pub fn add_keyboard_listener(&mut self, listener: Box<dyn FnMut(&Event) + Send>) {
        self.keyboard_listeners.push(listener);
    }

    /// Subscribes a listener to every broadcast parameter-change
    /// notification.
    pub fn add_parameter_change_listener(&mut self, listener: Box<dyn FnMut(&Event) + Send>) {
        self.parameter_change_listeners.push(listener);
    }

    /// Runs one full tick: drains the waiting list and inbound queue,
    /// then drains notifications arriving from the engine. Does not
    /// sleep — callers drive the periodic cadence.
    pub fn tick(&mut self) {
        while let Some(event) = self.waiting_list.pop_front() {
            self.handle_event(event);
        }
        while let Ok(event) = self.in_rx.try_recv() {
            self.handle_event(event);
        }
        self.drain_engine_notifications();
    }

    /// Runs this dispatcher on a dedicated thread, ticking every
    /// `tick_period` until [`DispatcherHandle::stop`] is called.
    #[must_use]
    pub fn spawn(mut self) -> DispatcherHandle {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();
        let tick_period = self.tick_period;
        let thread = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                self.tick();
                thread::sleep(tick_period);
            }
            self
        });
        DispatcherHandle {
            stop_flag,
            thread: Some(thread),
        }
    }

    fn handle_event(&mut self, event: Event) {
        if matches!(event.kind, EventKind::ParameterChangeNotification) {
            // Posted by a processor's own `HostControl`, not scheduled and
            // not re-applied to a poster: it is broadcast straight to
            // subscribers, the same destination a `ParameterChange`
            // notification arriving from the audio thread reaches in
            // `drain_engine_notifications`.
            for listener in &mut self.parameter_change_listeners {
                listener(&event);
            }
            complete(event, CompletionStatus::Ok);
            return;
        }

        if matches!(event.poster_id, EventPosterId::Dispatcher) {
            self.handle_self_addressed(event);
            return;
        }

        let Some(poster) = self.posters.get_mut(&event.poster_id) else {
            warn!(poster_id = ?event.poster_id, "event addressed to unregistered poster");
            complete(event, CompletionStatus::Error);
            return;
        };
        let status = poster.receive(&event);
        match status {
            EventStatus::QueuedHandling => self.waiting_list.push_back(event),
            other => complete(event, terminal_status(other)),
        }
    }

    fn handle_self_addressed(&mut self, event: Event) {
        match &event.kind {
            EventKind::AsyncWork => {
                trace!("re-routing async-work event to worker");
                if self.worker_tx.send(event).is_err() {
                    warn!("worker channel closed; async-work event dropped");
                }
            }
            EventKind::ParameterChange
            | EventKind::Keyboard
            | EventKind::StringParameterChange
            | EventKind::AddChain
            | EventKind::DeleteChain
            | EventKind::AddProcessor
            | EventKind::DeleteProcessor => {
                // The processor (or chain parameters) is already
                // constructed by the caller; no background work is
                // needed, so these structural mutations are scheduled
                // exactly like a parameter change rather than detouring
                // through the worker.
                self.schedule_or_send(event);
            }
            _ => {
                warn!(kind = ?event.kind, "dispatcher cannot self-address this event kind");
                complete(event, CompletionStatus::Error);
            }
        }
    }

    fn schedule_or_send(&mut self, event: Event) {
        let Some(deadline) = event.scheduled_time else {
            self.push_rt_event(event, 0);
            return;
        };
        match self.timer.schedule(deadline) {
            Schedule::WithinBlock(offset) => self.push_rt_event(event, offset),
            Schedule::Late => self.push_rt_event(event, 0),
            Schedule::Future => self.waiting_list.push_back(event),
        }
    }

    fn push_rt_event(&mut self, event: Event, sample_offset: u32) {
        let completion = event.completion;
        let Some(rt_event) = self.into_rt_event(event.id, event.payload, sample_offset) else {
            if let Some(callback) = completion {
                callback(CompletionStatus::Error);
            }
            return;
        };
        if self.to_engine.push(rt_event) {
            if let Some(callback) = completion {
                callback(CompletionStatus::Ok);
            }
        } else {
            self.rt_queue_overflows += 1;
            if let Some(callback) = completion {
                callback(CompletionStatus::Error);
            }
        }
    }

    fn drain_engine_notifications(&mut self) {
        while let Some(rt_event) = self.from_engine.pop() {
            match rt_event {
                RtEvent::Sync { block_start } => self.timer.advance_block(block_start),
                RtEvent::Keyboard { event: kb, sample_offset } => {
                    let notification = Event::immediate(
                        EventPosterId::AudioEngine,
                        EventKind::Keyboard,
                        EventPayload::Keyboard(kb),
                    )
                    .at(self.timer.time_at_offset(sample_offset));
                    for listener in &mut self.keyboard_listeners {
                        listener(&notification);
                    }
                }
                RtEvent::ParameterChange {
                    chain_id,
                    processor_id,
                    parameter_id,
                    value,
                    sample_offset,
                } => {
                    let notification = Event::immediate(
                        EventPosterId::AudioEngine,
                        EventKind::ParameterChange,
                        EventPayload::ParameterChange {
                            chain_id,
                            processor_id,
                            parameter_id,
                            value,
                        },
                    )
                    .at(self.timer.time_at_offset(sample_offset));
                    for listener in &mut self.parameter_change_listeners {
                        listener(&notification);
                    }
                }
                RtEvent::ProcessorReturned { chain_id, processor } => {
                    debug!(chain_id = %chain_id, "processor returned from audio thread; forwarding to worker for drop");
                    let event = Event::immediate(
                        EventPosterId::AudioEngine,
                        EventKind::DeleteProcessor,
                        EventPayload::DeleteProcessor {
                            chain_id,
                            processor_id: processor.id(),
                        },
                    );
                    let _ = self.worker_tx.send(event);
                    drop(processor);
                }
                RtEvent::ChainReturned { chain_id, processors } => {
                    debug!(
                        chain_id = %chain_id,
                        processor_count = processors.len(),
                        "chain removed from audio thread; dropping its processors"
                    );
                    let event = Event::immediate(
                        EventPosterId::AudioEngine,
                        EventKind::DeleteChain,
                        EventPayload::DeleteChain { chain_id },
                    );
                    let _ = self.worker_tx.send(event);
                    drop(processors);
                }
                RtEvent::Ack { .. }
                | RtEvent::AddChain { .. }
                | RtEvent::RemoveChain { .. }
                | RtEvent::InsertProcessor { .. }
                | RtEvent::RemoveProcessor { .. }
                | RtEvent::ReorderChain { .. }
                | RtEvent::StringParameterChange { .. } => {
                    trace!("ignoring inbound-only RtEvent kind arriving from engine");
                }
            }
        }
    }

    /// Drops every queued and waiting event, invoking each completion
    /// callback with [`CompletionStatus::Cancelled`].
    pub fn stop(mut self) {
        while let Some(event) = self.waiting_list.pop_front() {
            complete(event, CompletionStatus::Cancelled);
        }
        while let Ok(event) = self.in_rx.try_recv() {
            complete(event, CompletionStatus::Cancelled);
        }
    }

    /// Total RT-queue push failures observed while forwarding timed
    /// events to the engine.
    #[must_use]
    pub fn rt_queue_overflows(&self) -> u64 {
        self.rt_queue_overflows
    }

    /// Converts an owned [`EventPayload`] into the [`RtEvent`] that carries
    /// it across the ring buffer. Takes the payload by value (not by
    /// reference) because `AddProcessor` carries a boxed
    /// [`Processor`](tonebus_core::Processor) that must move, never clone,
    /// onto the audio thread.
    ///
    /// `event_id` seeds a freshly created chain's id for `AddChain`, since
    /// the control frontend that built the event has no earlier
    /// opportunity to name one. `AddChain`'s scratch buffers are sized
    /// from this dispatcher's own `block_size` and built here, off the
    /// audio thread, so `Engine::apply_inbound` only ever moves the
    /// finished `Chain` into place.
    fn into_rt_event(
        &self,
        event_id: tonebus_core::ObjectId,
        payload: EventPayload,
        sample_offset: u32,
    ) -> Option<RtEvent> {
        match payload {
            EventPayload::ParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value,
            } => Some(RtEvent::ParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value,
                sample_offset,
            }),
            EventPayload::StringParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value,
            } => Some(RtEvent::StringParameterChange {
                chain_id,
                processor_id,
                parameter_id,
                value: value.into_boxed_str(),
                sample_offset,
            }),
            EventPayload::Keyboard(kb) => Some(RtEvent::Keyboard {
                event: kb,
                sample_offset,
            }),
            EventPayload::AddChain { name, channels } => {
                let chain =
                    tonebus_core::Chain::new(event_id, name, channels, self.block_size);
                Some(RtEvent::AddChain { chain })
            }
            EventPayload::DeleteChain { chain_id } => Some(RtEvent::RemoveChain { chain_id }),
            EventPayload::AddProcessor {
                chain_id,
                position,
                processor,
            } => Some(RtEvent::InsertProcessor {
                chain_id,
                position,
                processor,
            }),
            EventPayload::DeleteProcessor {
                chain_id,
                processor_id,
            } => Some(RtEvent::RemoveProcessor {
                chain_id,
                processor_id,
            }),
            EventPayload::AsyncWork(_) => None,
            EventPayload::ParameterChangeNotification { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tonebus_core::{ObjectId, RtEventQueue};

    fn wiring() -> (EventDispatcher, Sender<Event>, RtEventConsumer, RtEventProducer, Receiver<Event>) {
        let (engine_in_tx, engine_in_rx) = RtEventQueue::new(16).split();
        let (engine_out_tx, engine_out_rx) = RtEventQueue::new(16).split();
        let (worker_tx, worker_rx) = crossbeam_channel::unbounded();
        let (dispatcher, control_tx) = EventDispatcher::new(
            engine_in_tx,
            engine_out_rx,
            worker_tx,
            48_000,
            64,
            DEFAULT_TICK_PERIOD,
        );
        (dispatcher, control_tx, engine_in_rx, engine_out_tx, worker_rx)
    }

    #[test]
    fn immediate_parameter_change_reaches_the_engine_queue() {
        let (mut dispatcher, control_tx, mut engine_in_rx, _engine_out_tx, _worker_rx) = wiring();
        let completed = Arc::new(AtomicU32::new(0));
        let completed_clone = completed.clone();
        let event = Event::immediate(
            EventPosterId::Dispatcher,
            EventKind::ParameterChange,
            EventPayload::ParameterChange {
                chain_id: ObjectId::new(1),
                processor_id: ObjectId::new(2),
                parameter_id: ObjectId::new(3),
                value: 0.5,
            },
        )
        .on_complete(Box::new(move |status| {
            assert_eq!(status, CompletionStatus::Ok);
            completed_clone.fetch_add(1, Ordering::SeqCst);
        }));
        control_tx.send(event).unwrap();
        dispatcher.tick();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        let rt_event = engine_in_rx.pop().expect("rt event forwarded");
        assert_eq!(rt_event.kind(), tonebus_core::RtEventKind::ParameterChange);
    }

    #[test]
    fn sync_event_from_engine_advances_the_timer() {
        let (mut dispatcher, _control_tx, _engine_in_rx, engine_out_tx, _worker_rx) = wiring();
        let mut producer = engine_out_tx;
        assert!(producer.push(RtEvent::Sync {
            block_start: tonebus_core::Time::from_micros(5_000)
        }));
        dispatcher.tick();
        assert_eq!(dispatcher.timer.block_start(), tonebus_core::Time::from_micros(5_000));
    }

    #[test]
    fn unregistered_poster_completes_with_error() {
        let (mut dispatcher, control_tx, _engine_in_rx, _engine_out_tx, _worker_rx) = wiring();
        let completed = Arc::new(AtomicU32::new(0));
        let completed_clone = completed.clone();
        let event = Event::immediate(
            EventPosterId::Worker,
            EventKind::AddChain,
            EventPayload::AddChain {
                name: "main".into(),
                channels: tonebus_core::ChannelCount::symmetric(2),
            },
        )
        .on_complete(Box::new(move |status| {
            assert_eq!(status, CompletionStatus::Error);
            completed_clone.fetch_add(1, Ordering::SeqCst);
        }));
        control_tx.send(event).unwrap();
        dispatcher.tick();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_cancels_pending_events() {
        let (mut dispatcher, control_tx, _engine_in_rx, _engine_out_tx, _worker_rx) = wiring();
        let completed = Arc::new(AtomicU32::new(0));
        for _ in 0..5 {
            let completed_clone = completed.clone();
            let event = Event::immediate(
                EventPosterId::Worker,
                EventKind::AsyncWork,
                EventPayload::AsyncWork(Box::new(|| Ok(()))),
            )
            .on_complete(Box::new(move |status| {
                assert_eq!(status, CompletionStatus::Cancelled);
                completed_clone.fetch_add(1, Ordering::SeqCst);
            }));
            control_tx.send(event).unwrap();
        }
        dispatcher.stop();
        assert_eq!(completed.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn parameter_change_notification_broadcasts_directly_to_listeners() {
        let (mut dispatcher, control_tx, _engine_in_rx, _engine_out_tx, _worker_rx) = wiring();
        let received = Arc::new(AtomicU32::new(0));
        let received_clone = received.clone();
        dispatcher.add_parameter_change_listener(Box::new(move |_event| {
            received_clone.fetch_add(1, Ordering::SeqCst);
        }));
        let event = Event::immediate(
            EventPosterId::Processor(ObjectId::new(7)),
            EventKind::ParameterChangeNotification,
            EventPayload::ParameterChangeNotification {
                chain_id: ObjectId::new(1),
                processor_id: ObjectId::new(7),
                parameter_id: ObjectId::new(3),
                value: 0.25,
            },
        );
        control_tx.send(event).unwrap();
        dispatcher.tick();
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    /// Scenario F: a dispatcher and worker driven by their own dedicated
    /// threads, posted a batch of async work, then stopped. `stop()` must
    /// join promptly and every event must reach a terminal status — `Ok`
    /// if it was drained before the stop signal landed, `Cancelled`
    /// otherwise — never left pending.
    #[test]
    fn spawned_dispatcher_and_worker_drain_then_stop_promptly() {
        let (engine_in_tx, _engine_in_rx) = RtEventQueue::new(16).split();
        let (_engine_out_tx, engine_out_rx) = RtEventQueue::new(16).split();
        let (worker_tx, worker_rx) = crossbeam_channel::unbounded();
        let (dispatcher, control_tx) = EventDispatcher::new(
            engine_in_tx,
            engine_out_rx,
            worker_tx,
            48_000,
            64,
            Duration::from_millis(1),
        );
        let worker = crate::Worker::new(
            worker_rx,
            tonebus_engine::EngineTelemetry::new(),
            Duration::from_secs(3600),
            Duration::from_millis(1),
        );

        const COUNT: u32 = 100;
        let completed = Arc::new(AtomicU32::new(0));
        for _ in 0..COUNT {
            let completed_clone = completed.clone();
            let event = Event::immediate(
                EventPosterId::Dispatcher,
                EventKind::AsyncWork,
                EventPayload::AsyncWork(Box::new(|| Ok(()))),
            )
            .on_complete(Box::new(move |status| {
                assert!(matches!(
                    status,
                    CompletionStatus::Ok | CompletionStatus::Cancelled
                ));
                completed_clone.fetch_add(1, Ordering::SeqCst);
            }));
            control_tx.send(event).unwrap();
        }

        let dispatcher_handle = dispatcher.spawn();
        let worker_handle = worker.spawn();

        thread::sleep(Duration::from_millis(50));

        let started_stop = std::time::Instant::now();
        dispatcher_handle.stop();
        worker_handle.stop();
        assert!(
            started_stop.elapsed() < Duration::from_millis(500),
            "stop() did not join its thread promptly"
        );

        assert_eq!(completed.load(Ordering::SeqCst), COUNT);
    }
}
