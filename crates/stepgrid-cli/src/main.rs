//! `stepgrid-cli` – runs the floor-tile detector against the simulated sensor.
//!
//! This binary:
//!
//! 1. Loads `~/.stepgrid/config.toml` (defaults when absent), with
//!    `STEPGRID_*` environment overrides applied.
//! 2. Starts the [`DetectionWorker`] and a sensor producer thread that
//!    publishes frames at the configured rate.
//! 3. Supervises both with a [`Watchdog`], logs occupancy updates from the
//!    [`DetectionBus`], and hot-reloads the `[detection]` table whenever the
//!    config file changes.
//! 4. Intercepts **Ctrl-C** to stop the worker after its current cycle.

mod board;
mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error, info, warn};

use stepgrid_hal::{FrameSource, SimDepthSensor};
use stepgrid_kernel::Watchdog;
use stepgrid_middleware::DetectionBus;
use stepgrid_perception::DetectionPipeline;
use stepgrid_runtime::{BusSink, DetectionWorker, FrameExchange, Tee, init_tracing};
use stepgrid_types::StepGridError;

use crate::board::TileBoard;
use crate::config::{Config, SensorConfig};

const WORKER_ID: &str = "detection_worker";
const PRODUCER_ID: &str = "sensor_producer";
const SUPERVISOR_PERIOD: Duration = Duration::from_millis(500);
const MIN_STALL_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    let telemetry = init_tracing("stepgrid");
    info!(otlp = telemetry.is_exporting(), "tracing initialised");

    let path = config::config_path();
    let cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            info!(path = %path.display(), "config loaded");
            cfg
        }
        Ok(None) => {
            let defaults = Config::default();
            match config::save_to(&defaults, &path) {
                Ok(()) => info!(path = %path.display(), "no config file, wrote defaults"),
                Err(e) => warn!(error = %e, "no config file and defaults could not be written"),
            }
            config::defaults_with_env()
        }
        Err(e) => {
            warn!(error = %e, "config unusable, using defaults");
            config::defaults_with_env()
        }
    };

    match run(cfg, path).await {
        Ok(cycles) => {
            info!(cycles, "stepgrid stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "stepgrid failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cfg: Config, path: PathBuf) -> Result<u64, StepGridError> {
    let bus = DetectionBus::default();
    let mut updates = bus.subscribe_occupancy();
    let mut diagnostics = bus.subscribe_diagnostics();

    let pipeline = DetectionPipeline::new(cfg.sensor.width, cfg.sensor.height);
    let sink = Tee(TileBoard::new(), BusSink::new(bus.clone()));
    let worker = DetectionWorker::spawn(pipeline, cfg.detection, sink)?;

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        let exchange = worker.exchange();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Ctrl-C received, stopping after the current cycle");
            shutdown.store(true, Ordering::SeqCst);
            exchange.request_stop();
        }) {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    // ── Sensor producer ───────────────────────────────────────────────────
    let frames = Arc::new(AtomicU64::new(0));
    let producer = spawn_producer(
        &cfg.sensor,
        worker.exchange(),
        Arc::clone(&shutdown),
        Arc::clone(&frames),
    )?;

    // ── Supervision ───────────────────────────────────────────────────────
    let stall_timeout = MIN_STALL_TIMEOUT.max(frame_period(cfg.sensor.fps) * 10);
    let mut watchdog = Watchdog::new();
    watchdog.register(WORKER_ID, stall_timeout);
    watchdog.register(PRODUCER_ID, stall_timeout);

    let mut last_modified = config::modified_time(&path);
    let mut ticker = tokio::time::interval(SUPERVISOR_PERIOD);

    while !shutdown.load(Ordering::SeqCst) {
        tokio::select! {
            _ = ticker.tick() => {
                watchdog.observe(WORKER_ID, worker.cycle_count());
                watchdog.observe(PRODUCER_ID, frames.load(Ordering::Relaxed));
                watchdog.check_all();
                reload_if_changed(&path, &mut last_modified, &cfg.sensor, &worker);
            }
            Some(update) = updates.next() => {
                debug!(
                    cycle = update.cycle,
                    occupied = update.grid.occupied_count(),
                    "occupancy update"
                );
            }
            Some(frame) = diagnostics.next() => {
                debug!(
                    cycle = frame.cycle,
                    width = frame.image.width,
                    height = frame.image.height,
                    "diagnostic frame"
                );
            }
        }
    }

    worker.request_stop();
    if producer.join().is_err() {
        error!("sensor producer thread panicked");
    }
    Ok(worker.join())
}

fn frame_period(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Re-read the config file when its modification time moved and install
/// the new detection settings if they differ.
fn reload_if_changed(
    path: &Path,
    last_modified: &mut Option<SystemTime>,
    sensor: &SensorConfig,
    worker: &DetectionWorker,
) {
    let modified = config::modified_time(path);
    if modified == *last_modified {
        return;
    }
    *last_modified = modified;

    match config::load_from(path) {
        Ok(Some(cfg)) => {
            if cfg.sensor != *sensor {
                warn!("sensor settings changed; restart to apply them");
            }
            if cfg.detection != *worker.detection_settings() {
                worker.set_detection_settings(cfg.detection);
                info!(mode = %cfg.detection.diagnostic_mode, "detection settings reloaded");
            }
        }
        Ok(None) => debug!("config file removed; keeping current settings"),
        Err(e) => warn!(error = %e, "config reload failed; keeping current settings"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sensor producer
// ─────────────────────────────────────────────────────────────────────────────

fn spawn_producer(
    cfg: &SensorConfig,
    exchange: Arc<FrameExchange>,
    shutdown: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
) -> Result<JoinHandle<()>, StepGridError> {
    let mut sensor =
        SimDepthSensor::new("sim_floor", cfg.width, cfg.height).with_background(cfg.background);
    if let Some(target) = cfg.target {
        sensor = sensor.with_target(target);
    }
    if cfg.color {
        sensor = sensor.with_color();
    }
    let period = frame_period(cfg.fps);

    thread::Builder::new()
        .name("stepgrid-sensor".to_string())
        .spawn(move || produce(&mut sensor, &exchange, &shutdown, &frames, period))
        .map_err(|e| StepGridError::WorkerSpawn(e.to_string()))
}

fn produce<S: FrameSource>(
    source: &mut S,
    exchange: &FrameExchange,
    shutdown: &AtomicBool,
    frames: &AtomicU64,
    period: Duration,
) {
    let (width, height) = source.dimensions();
    info!(sensor = source.id(), width, height, ?period, "sensor producer started");

    while !shutdown.load(Ordering::SeqCst) && !exchange.is_stop_requested() {
        let started = Instant::now();
        match source.capture() {
            Ok(snapshot) => {
                exchange.publish(snapshot);
                frames.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => warn!(error = %e, "frame capture failed"),
        }
        if let Some(rest) = period.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    }
    info!(frames = frames.load(Ordering::Relaxed), "sensor producer stopped");
}
