mod background;
mod catalog;
mod cli;
mod config;
mod element;
mod grid;
mod logger;
mod orbital;
mod orchestrator;
mod particles;
mod tone;

use catalog::ElementCatalog;
use clap::Parser;
use cli::Args;
use config::EngineConfig;
use orchestrator::{Command, Orchestrator, ToneSink};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tone::ToneBuffer;

/// Headless runs have no audio device; tones are summarized in the log.
struct LogSink;

impl ToneSink for LogSink {
    fn play(&mut self, tone: ToneBuffer) {
        log::info!(
            "Tone: {:?} {:.1} Hz, {:.2} s, peak {}",
            tone.spec.waveform,
            tone.spec.frequency,
            tone.duration_secs(),
            tone.peak()
        );
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = logger::init() {
        eprintln!("logger: {e}");
    }

    let args = Args::parse();

    println!("Proton Fusion Drift - headless");
    println!("==============================");

    let (config, msg) = EngineConfig::load(args.config.as_deref());
    log::info!("{msg}");
    let catalog_path = args.catalog.as_deref().or(config.catalog_path.as_deref());
    let catalog = ElementCatalog::load_or_fallback(catalog_path);

    let mut engine = Orchestrator::new(catalog, &config, LogSink);
    let tick = Duration::from_millis(config.tick_interval_ms());
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut last_tick = started;
    let mut last_step = 0u64;
    let mut last_status = 0u64;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Interrupted");
                break;
            }
            now = interval.tick() => {
                let dt = now.duration_since(last_tick).as_millis() as u64;
                last_tick = now;
                engine.tick(dt);

                let clock = engine.context().clock_ms;
                if clock - last_step >= args.step_ms {
                    last_step = clock;
                    engine.apply(Command::AdvanceNext);
                }
                if clock - last_status >= 1_000 {
                    last_status = clock;
                    log::info!(
                        "{} | particles {} | grid factor {:.3}",
                        engine.status_line(),
                        engine.particles().len(),
                        engine.grid_factor()
                    );
                }
                if let Some(limit) = args.seconds {
                    if now.duration_since(started) >= Duration::from_secs(limit) {
                        break;
                    }
                }
            }
        }
    }

    log::info!(
        "Stopped after {} ms, {} tones, progression {:.0}%",
        engine.context().clock_ms,
        engine.tones_synthesized(),
        engine.progress() * 100.0
    );
}
