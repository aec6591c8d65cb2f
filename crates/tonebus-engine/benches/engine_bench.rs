//! Criterion benchmarks for the per-block engine hot path.
//!
//! Run with: cargo bench -p tonebus-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tonebus_core::{ChannelCount, ObjectId, Processor, RtEventQueue};
use tonebus_engine::processors::{GainProcessor, TransposerProcessor};
use tonebus_engine::{Chain, Engine};

const SAMPLE_RATE: u32 = 48_000;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn engine_with_chain(
    block_size: usize,
    build_processors: impl FnOnce(&Engine) -> Vec<Box<dyn Processor>>,
) -> Engine {
    let (_to_engine_tx, to_engine_rx) = RtEventQueue::new(16).split();
    let (from_engine_tx, _from_engine_rx) = RtEventQueue::new(16).split();
    let engine = Engine::new(to_engine_rx, from_engine_tx, SAMPLE_RATE, block_size as u32);
    let processors = build_processors(&engine);
    let mut engine = engine;
    let mut chain = Chain::new(ObjectId::new(1), "bench", ChannelCount::symmetric(1), block_size);
    for (i, processor) in processors.into_iter().enumerate() {
        chain.insert(i, processor);
    }
    engine.add_chain(chain);
    engine
}

fn bench_empty_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine_EmptyChain");
    for &block_size in BLOCK_SIZES {
        let mut engine = engine_with_chain(block_size, |_engine| Vec::new());
        let input = vec![0.0f32; block_size];
        let mut output = vec![0.0f32; block_size];
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, _| {
            b.iter(|| {
                engine.process_chunk(black_box(&input), black_box(&mut output));
            });
        });
    }
    group.finish();
}

fn bench_gain_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine_GainChain");
    for &block_size in BLOCK_SIZES {
        let mut engine = engine_with_chain(block_size, |engine| {
            let (host_tx, _host_rx) = crossbeam_channel::unbounded();
            vec![Box::new(GainProcessor::new(
                ObjectId::new(10),
                "gain",
                engine.make_host_control(host_tx),
            )) as Box<dyn Processor>]
        });
        let input = vec![0.5f32; block_size];
        let mut output = vec![0.0f32; block_size];
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, _| {
            b.iter(|| {
                engine.process_chunk(black_box(&input), black_box(&mut output));
            });
        });
    }
    group.finish();
}

fn bench_gain_transposer_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine_GainTransposerChain");
    for &block_size in BLOCK_SIZES {
        let mut engine = engine_with_chain(block_size, |engine| {
            let (gain_tx, _gain_rx) = crossbeam_channel::unbounded();
            let (transpose_tx, _transpose_rx) = crossbeam_channel::unbounded();
            vec![
                Box::new(GainProcessor::new(
                    ObjectId::new(10),
                    "gain",
                    engine.make_host_control(gain_tx),
                )) as Box<dyn Processor>,
                Box::new(TransposerProcessor::new(
                    ObjectId::new(11),
                    "transposer",
                    engine.make_host_control(transpose_tx),
                )) as Box<dyn Processor>,
            ]
        });
        let input = vec![0.5f32; block_size];
        let mut output = vec![0.0f32; block_size];
        group.bench_with_input(BenchmarkId::from_parameter(block_size), &block_size, |b, _| {
            b.iter(|| {
                engine.process_chunk(black_box(&input), black_box(&mut output));
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_empty_chain,
    bench_gain_chain,
    bench_gain_transposer_chain
);
criterion_main!(benches);
