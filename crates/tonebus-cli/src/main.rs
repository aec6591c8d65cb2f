//! tonebus - demo/harness binary wiring the engine, dispatcher, worker,
//! and control frontend end to end.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tonebus_config::EngineConfig;
use tonebus_control::ControlFrontend;
use tonebus_core::{KeyboardEvent, KeyboardEventKind, RtEventQueue, Time};
use tonebus_dispatch::{EventDispatcher, Worker};
use tonebus_engine::Engine;

#[derive(Parser)]
#[command(name = "tonebus")]
#[command(author, version, about = "tonebus real-time audio host demo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine/dispatcher/worker loop for a fixed number of blocks.
    Run(RunArgs),
    /// Print the resolved configuration as TOML, validating it first.
    Config(ConfigArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Optional TOML configuration file; falls back to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of audio blocks to process before exiting.
    #[arg(long, default_value_t = 64)]
    blocks: u32,
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// Optional TOML configuration file; falls back to built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Config(args) => print_config(args),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn print_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config)?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(args.config)?;
    tracing::info!(?config, "starting tonebus engine");

    let (to_engine_tx, to_engine_rx) = RtEventQueue::try_new(config.rt_queue_capacity)?.split();
    let (from_engine_tx, from_engine_rx) = RtEventQueue::try_new(config.rt_queue_capacity)?.split();
    let mut engine = Engine::new(to_engine_rx, from_engine_tx, config.sample_rate, config.block_size);

    let (worker_tx, worker_rx) = crossbeam_channel::unbounded();
    let (mut dispatcher, control_tx) = EventDispatcher::new(
        to_engine_tx,
        from_engine_rx,
        worker_tx,
        config.sample_rate,
        config.block_size,
        Duration::from_millis(config.dispatcher_tick_ms),
    );
    let mut worker = Worker::new(
        worker_rx,
        engine.telemetry(),
        Duration::from_secs(config.timing_report_interval_s),
        Duration::from_millis(config.worker_tick_ms),
    );
    let host_control = engine.make_host_control(control_tx.clone());
    let frontend = ControlFrontend::new(control_tx, host_control);

    let chain_id = frontend.add_chain("main", tonebus_core::ChannelCount::symmetric(2), None);
    let processor_id = frontend
        .add_processor(chain_id, 0, "gain", "g1", None)
        .expect("gain is a known built-in kind");
    tracing::info!(%chain_id, %processor_id, "requested chain and processor");

    let block_size = config.block_size as usize;
    let block_duration_micros = (1_000_000_u64 * block_size as u64) / u64::from(config.sample_rate);
    let silence_in = vec![0.0f32; block_size];
    let mut silence_out = vec![0.0f32; block_size];
    let mut wall_clock = Time::from_micros(0);

    for block in 0..args.blocks {
        dispatcher.tick();
        worker.tick();
        if block == 4 {
            frontend.send_keyboard_event(KeyboardEvent {
                chain_id,
                kind: KeyboardEventKind::NoteOn {
                    note: 60,
                    velocity: 100,
                },
            });
        }
        engine.update_time(wall_clock);
        engine.process_chunk(&silence_in, &mut silence_out);
        wall_clock = wall_clock.plus_micros(block_duration_micros as i64);
    }
    dispatcher.tick();
    worker.tick();

    let telemetry = engine.telemetry();
    tracing::info!(
        blocks_processed = telemetry.blocks_processed(),
        events_dropped = telemetry.events_dropped(),
        rt_queue_overflows = telemetry.rt_queue_overflows(),
        rt_queue_overflows_seen_by_dispatcher = dispatcher.rt_queue_overflows(),
        "run complete"
    );
    dispatcher.stop();
    Ok(())
}
