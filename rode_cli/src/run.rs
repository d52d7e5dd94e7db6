//! Command execution: config mapping, hardware or sim assembly, run loop.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rode_core::error::Result as CoreResult;
use rode_core::runner::{self, RunParams};
use rode_core::{EncoderCfg, PersistCfg, Tracker};
use rode_hardware::FileStore;
use rode_hardware::LogSink;
use rode_traits::CountStore;
#[cfg(not(feature = "hardware"))]
use rode_traits::PhaseSample;

/// Final numbers for the `run` summary output.
pub struct RunSummary {
    pub deployed_m: f32,
    pub capacity_m: f32,
    pub count: i32,
}

pub fn run_tracker(
    cfg: &rode_config::Config,
    ticks: Option<u64>,
    sim_deploy: Option<usize>,
    sim_retrieve: Option<usize>,
    shutdown: Arc<AtomicBool>,
) -> CoreResult<RunSummary> {
    let input = make_input(cfg, sim_deploy, sim_retrieve)?;
    let store = FileStore::new(&cfg.persistence.file, cfg.persistence.address);
    let sink = LogSink::new(cfg.telemetry.path.clone(), cfg.telemetry.unit.clone());

    let mut tracker = Tracker::builder()
        .with_input(input)
        .with_store(store)
        .with_sink(sink)
        .with_encoder_cfg(EncoderCfg::from(&cfg.encoder))
        .with_persist_cfg(PersistCfg::from(&cfg.persistence))
        .build()?;

    // The button watcher only enqueues the reset; all state changes and
    // storage I/O stay inside the tick loop.
    #[cfg(feature = "hardware")]
    if let Some(pin) = cfg.pins.reset_button {
        let handle = tracker.reset_handle();
        match rode_hardware::gpio::spawn_reset_watcher(pin, 10, move || handle.trigger()) {
            Ok(()) => tracing::info!(pin, "reset button enabled"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to init reset button; continuing without it");
            }
        }
    }

    let params = RunParams {
        rate_hz: cfg.tick.rate_hz,
        max_ticks: ticks,
    };
    let deployed_m = runner::run(&mut tracker, params, &shutdown)?;
    Ok(RunSummary {
        deployed_m,
        capacity_m: tracker.capacity_m(),
        count: tracker.count(),
    })
}

#[cfg(feature = "hardware")]
fn make_input(
    cfg: &rode_config::Config,
    sim_deploy: Option<usize>,
    sim_retrieve: Option<usize>,
) -> CoreResult<Box<dyn rode_traits::EncoderInput>> {
    let _ = (sim_deploy, sim_retrieve); // real pins take precedence
    let enc = rode_hardware::gpio::GpioEncoder::new(cfg.pins.encoder_a, cfg.pins.encoder_b)
        .map_err(|e| eyre::eyre!(e))?;
    tracing::info!(
        phase_a = cfg.pins.encoder_a,
        phase_b = cfg.pins.encoder_b,
        "encoder pins opened"
    );
    Ok(Box::new(enc))
}

#[cfg(not(feature = "hardware"))]
fn make_input(
    _cfg: &rode_config::Config,
    sim_deploy: Option<usize>,
    sim_retrieve: Option<usize>,
) -> CoreResult<Box<dyn rode_traits::EncoderInput>> {
    let deploy = sim_deploy.unwrap_or(0);
    let retrieve = sim_retrieve.unwrap_or(0);
    tracing::info!(deploy, retrieve, "using simulated encoder");
    Ok(Box::new(rode_hardware::SimulatedEncoder::new(sim_script(
        deploy, retrieve,
    ))))
}

/// Idle baseline, then `deploy` pulses out followed by `retrieve` pulses in.
#[cfg(not(feature = "hardware"))]
fn sim_script(deploy: usize, retrieve: usize) -> Vec<PhaseSample> {
    let mut script = Vec::with_capacity(deploy + retrieve + 1);
    let mut a = false;
    script.push(PhaseSample { a, b: false });
    for _ in 0..deploy {
        a = !a;
        script.push(PhaseSample { a, b: a });
    }
    for _ in 0..retrieve {
        a = !a;
        script.push(PhaseSample { a, b: !a });
    }
    script
}

/// `reset` subcommand: zero the slot directly, without running the tracker.
pub fn reset_slot(cfg: &rode_config::Config) -> eyre::Result<()> {
    let mut store = FileStore::new(&cfg.persistence.file, cfg.persistence.address);
    store.store(0).map_err(|e| eyre::eyre!(e))?;
    tracing::info!(
        file = %cfg.persistence.file,
        address = cfg.persistence.address,
        "count slot zeroed"
    );
    println!("count slot zeroed");
    Ok(())
}

/// `self-check` subcommand: prove the slot round-trips at the configured
/// address. Preserves an existing count; a missing slot is seeded with zero.
pub fn self_check(cfg: &rode_config::Config) -> eyre::Result<()> {
    let mut store = FileStore::new(&cfg.persistence.file, cfg.persistence.address);
    let value = store.load().unwrap_or_default();
    store.store(value).map_err(|e| eyre::eyre!(e))?;
    let read = store.load().map_err(|e| eyre::eyre!(e))?;
    if read != value {
        eyre::bail!("count slot read back {read}, expected {value}");
    }
    println!(
        "self-check ok: {} @ {} holds {}",
        cfg.persistence.file, cfg.persistence.address, read
    );
    Ok(())
}
