//! The worker: a background thread (or, in tests, a synchronously driven
//! loop) that runs everything the dispatcher must not block on — async
//! work closures and the drop side of two-phase processor/chain teardown.
//!
//! Structural engine mutations that only need an already-constructed
//! payload (a processor the control frontend already allocated, a chain
//! name) are applied directly by the dispatcher, the same way a parameter
//! change is: there is no background work to perform, so routing them
//! through the worker would just add a hop. The worker's real job is
//! anything that might take a while — decoding a sample, loading a
//! preset — and finalizing teardown notifications the dispatcher forwards
//! after the audio thread has already let go of a processor or chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use tonebus_core::{CompletionStatus, Event, EventKind, EventPayload};
use tonebus_engine::EngineTelemetry;
use tracing::{error, info, trace, warn};

/// Default interval between periodic telemetry reports, matching the
/// typical value in the configuration table.
pub const DEFAULT_TIMING_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Runs async work and finalizes teardown notifications off the
/// dispatcher thread.
///
/// Every method here is safe to call from whatever thread owns the
/// `Worker` — there's no shared mutable state beyond the channel and the
/// telemetry handle, both of which are designed for cross-thread use.
pub struct Worker {
    rx: Receiver<Event>,
    telemetry: EngineTelemetry,
    timing_report_interval: Duration,
    tick_period: Duration,
    last_report: Instant,
}

/// Owns the dedicated thread started by [`Worker::spawn`].
///
/// Dropping a `WorkerHandle` without calling [`WorkerHandle::stop`] leaks
/// the thread (it keeps ticking forever) rather than silently detaching
/// cancellation semantics onto `Drop`.
pub struct WorkerHandle {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<Worker>>,
}

impl WorkerHandle {
    /// Signals the worker thread to stop after its current tick, joins it,
    /// and drains whatever is left in its queue with
    /// [`CompletionStatus::Cancelled`].
    pub fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(worker) => worker.stop(),
                Err(_) => warn!("worker thread panicked before it could be stopped cleanly"),
            }
        }
    }
}

impl Worker {
    /// Builds a worker draining `rx`, reporting `telemetry` on
    /// `timing_report_interval`, ticking every `tick_period` once spawned.
    #[must_use]
    pub fn new(
        rx: Receiver<Event>,
        telemetry: EngineTelemetry,
        timing_report_interval: Duration,
        tick_period: Duration,
    ) -> Self {
        Self {
            rx,
            telemetry,
            timing_report_interval,
            tick_period,
            last_report: Instant::now(),
        }
    }

    /// Drains every event currently queued, then reports timing telemetry
    /// if the report interval has elapsed. Does not block or sleep;
    /// callers drive the periodic cadence.
    pub fn tick(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
        }
        if self.last_report.elapsed() >= self.timing_report_interval {
            self.report_timing();
            self.last_report = Instant::now();
        }
    }

    /// Runs this worker on a dedicated thread, ticking every `tick_period`
    /// until [`WorkerHandle::stop`] is called.
    #[must_use]
    pub fn spawn(mut self) -> WorkerHandle {
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
        WorkerHandle {
            stop_flag,
            thread: Some(thread),
        }
    }

    /// Drops every event still queued, invoking each completion callback
    /// with [`CompletionStatus::Cancelled`].
    pub fn stop(mut self) {
        while let Ok(event) = self.rx.try_recv() {
            complete(event, CompletionStatus::Cancelled);
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event.kind {
            EventKind::AsyncWork => self.run_async_work(event),
            EventKind::DeleteProcessor | EventKind::DeleteChain => {
                trace!(kind = ?event.kind, "teardown notification finalized");
                complete(event, CompletionStatus::Ok);
            }
            other => {
                warn!(kind = ?other, "worker received an event it does not execute");
                complete(event, CompletionStatus::Error);
            }
        }
    }

    fn run_async_work(&mut self, event: Event) {
        let Event { payload, completion, .. } = event;
        let EventPayload::AsyncWork(work) = payload else {
            unreachable!("matched on EventKind::AsyncWork above");
        };
        let result = work();
        let status = match result {
            Ok(()) => CompletionStatus::Ok,
            Err(reason) => {
                error!(reason = %reason, "async work failed");
                CompletionStatus::Error
            }
        };
        if let Some(callback) = completion {
            callback(status);
        }
    }

    fn report_timing(&self) {
        info!(
            blocks_processed = self.telemetry.blocks_processed(),
            events_dropped = self.telemetry.events_dropped(),
            rt_queue_overflows = self.telemetry.rt_queue_overflows(),
            "engine telemetry"
        );
    }
}

fn complete(event: Event, status: CompletionStatus) {
    if let Some(callback) = event.completion {
        callback(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tonebus_core::{EventPosterId, ObjectId};

    #[test]
    fn async_work_success_completes_ok() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut worker = Worker::new(rx, EngineTelemetry::new(), Duration::from_secs(3600), Duration::from_millis(10));
        let completed = Arc::new(AtomicU32::new(0));
        let completed_clone = completed.clone();
        let event = Event::immediate(
            EventPosterId::Worker,
            EventKind::AsyncWork,
            EventPayload::AsyncWork(Box::new(|| Ok(()))),
        )
        .on_complete(Box::new(move |status| {
            assert_eq!(status, CompletionStatus::Ok);
            completed_clone.fetch_add(1, Ordering::SeqCst);
        }));
        tx.send(event).unwrap();
        worker.tick();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn async_work_failure_completes_error_without_unwinding() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut worker = Worker::new(rx, EngineTelemetry::new(), Duration::from_secs(3600), Duration::from_millis(10));
        let completed = Arc::new(AtomicU32::new(0));
        let completed_clone = completed.clone();
        let event = Event::immediate(
            EventPosterId::Worker,
            EventKind::AsyncWork,
            EventPayload::AsyncWork(Box::new(|| Err("decode failed".to_string()))),
        )
        .on_complete(Box::new(move |status| {
            assert_eq!(status, CompletionStatus::Error);
            completed_clone.fetch_add(1, Ordering::SeqCst);
        }));
        tx.send(event).unwrap();
        worker.tick();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delete_processor_notification_completes_ok() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut worker = Worker::new(rx, EngineTelemetry::new(), Duration::from_secs(3600), Duration::from_millis(10));
        let event = Event::immediate(
            EventPosterId::AudioEngine,
            EventKind::DeleteProcessor,
            EventPayload::DeleteProcessor {
                chain_id: ObjectId::new(1),
                processor_id: ObjectId::new(2),
            },
        );
        tx.send(event).unwrap();
        worker.tick();
    }

    #[test]
    fn unexecutable_kind_completes_error() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut worker = Worker::new(rx, EngineTelemetry::new(), Duration::from_secs(3600), Duration::from_millis(10));
        let completed = Arc::new(AtomicU32::new(0));
        let completed_clone = completed.clone();
        let event = Event::immediate(
            EventPosterId::Worker,
            EventKind::ParameterChange,
            EventPayload::ParameterChange {
                chain_id: ObjectId::new(1),
                processor_id: ObjectId::new(2),
                parameter_id: ObjectId::new(3),
                value: 0.5,
            },
        )
        .on_complete(Box::new(move |status| {
            assert_eq!(status, CompletionStatus::Error);
            completed_clone.fetch_add(1, Ordering::SeqCst);
        }));
        tx.send(event).unwrap();
        worker.tick();
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }
}
