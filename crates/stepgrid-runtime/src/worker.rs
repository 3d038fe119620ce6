//! [`DetectionWorker`] – the dedicated detection thread.
//!
//! # State machine
//!
//! ```text
//!            frame ready               cycle done
//!   Idle ───────────────► Processing ─────────────► Idle
//!    │                                                │
//!    └──── stop requested ──► Stopped ◄───────────────┘
//! ```
//!
//! Stop is checked before every wait and when a wait ends.  A cycle that has
//! started always runs to completion first.
//!
//! Each cycle reads exactly one settings snapshot, runs the
//! [`DetectionPipeline`], maps the grid into logical coordinates, reports to
//! the [`DetectionSink`] and then bumps the cycle counter.  A frame whose
//! size does not match the pipeline is logged at `error` level and skipped
//! without counting a cycle.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use stepgrid_perception::DetectionPipeline;
use stepgrid_types::{DetectionSettings, FrameSnapshot, StepGridError};
use tracing::{debug, error, info, info_span};

use crate::exchange::{FrameExchange, Wake};
use crate::settings::SettingsCell;
use crate::sink::DetectionSink;

const THREAD_NAME: &str = "stepgrid-detect";

/// Observable state of the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Idle = 0,
    Processing = 1,
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => WorkerState::Idle,
            1 => WorkerState::Processing,
            _ => WorkerState::Stopped,
        }
    }
}

/// State shared between the handle and the thread.
struct Shared {
    exchange: Arc<FrameExchange>,
    settings: Arc<SettingsCell>,
    cycles: AtomicU64,
    state: AtomicU8,
}

impl Shared {
    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Handle to a running detection thread.
///
/// ```no_run
/// use stepgrid_perception::DetectionPipeline;
/// use stepgrid_runtime::{DetectionWorker, FnSink};
/// use stepgrid_types::{DepthFrame, DetectionSettings, FrameSnapshot};
///
/// let sink = FnSink::new(|cycle, grid| println!("{cycle}: vacant = {}", grid.is_vacant()));
/// let worker = DetectionWorker::spawn(
///     DetectionPipeline::new(200, 150),
///     DetectionSettings::default(),
///     sink,
/// )?;
/// worker.publish(FrameSnapshot::depth_only(1, DepthFrame::blank(200, 150)));
/// worker.request_stop();
/// let cycles = worker.join();
/// # Ok::<(), stepgrid_types::StepGridError>(())
/// ```
pub struct DetectionWorker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    /// Start the worker thread in the `Idle` state.
    ///
    /// # Errors
    ///
    /// Returns [`StepGridError::WorkerSpawn`] when the OS refuses to create
    /// the thread.
    pub fn spawn<S>(
        pipeline: DetectionPipeline,
        settings: DetectionSettings,
        sink: S,
    ) -> Result<Self, StepGridError>
    where
        S: DetectionSink + 'static,
    {
        let shared = Arc::new(Shared {
            exchange: Arc::new(FrameExchange::new()),
            settings: Arc::new(SettingsCell::new(settings)),
            cycles: AtomicU64::new(0),
            state: AtomicU8::new(WorkerState::Idle as u8),
        });
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(&thread_shared, pipeline, sink))
            .map_err(|e| StepGridError::WorkerSpawn(e.to_string()))?;

        info!(
            width = pipeline.width(),
            height = pipeline.height(),
            "detection worker started"
        );
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Replace the active settings.  Takes effect on the next cycle.
    pub fn set_detection_settings(&self, settings: DetectionSettings) {
        self.shared.settings.replace(settings);
        debug!(mode = ?settings.diagnostic_mode, "detection settings replaced");
    }

    /// The settings the next cycle will use.
    pub fn detection_settings(&self) -> Arc<DetectionSettings> {
        self.shared.settings.snapshot()
    }

    /// Shared handle to the frame mailbox, for a producer on another thread.
    pub fn exchange(&self) -> Arc<FrameExchange> {
        Arc::clone(&self.shared.exchange)
    }

    /// Publish a frame and signal that it is ready.
    pub fn publish(&self, snapshot: FrameSnapshot) {
        self.shared.exchange.publish(snapshot);
    }

    /// Raise the frame-ready signal for the frame already in the slot.
    pub fn signal_frame_ready(&self) {
        self.shared.exchange.signal_frame_ready();
    }

    /// True while a signaled frame is waiting to be consumed.
    pub fn poll(&self) -> bool {
        self.shared.exchange.poll()
    }

    /// Ask the worker to stop after any in-flight cycle.  Idempotent.
    pub fn request_stop(&self) {
        self.shared.exchange.request_stop();
    }

    /// Number of completed cycles.
    pub fn cycle_count(&self) -> u64 {
        self.shared.cycles.load(Ordering::Acquire)
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Wait for the thread to exit and return the final cycle count.
    ///
    /// Does not request a stop by itself.
    pub fn join(mut self) -> u64 {
        self.join_thread();
        self.cycle_count()
    }

    fn join_thread(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("detection worker thread panicked");
                self.shared.set_state(WorkerState::Stopped);
            }
        }
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.request_stop();
            self.join_thread();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Thread body
// ────────────────────────────────────────────────────────────────────────────

fn run<S: DetectionSink>(shared: &Shared, pipeline: DetectionPipeline, mut sink: S) {
    loop {
        if shared.exchange.is_stop_requested() {
            break;
        }
        let snapshot = match shared.exchange.wait() {
            Wake::Stop => break,
            Wake::Frame(snapshot) => snapshot,
        };

        shared.set_state(WorkerState::Processing);
        process(shared, &pipeline, &snapshot, &mut sink);
        shared.set_state(WorkerState::Idle);
    }
    shared.set_state(WorkerState::Stopped);
    info!(
        cycles = shared.cycles.load(Ordering::Acquire),
        "detection worker stopped"
    );
}

fn process<S: DetectionSink>(
    shared: &Shared,
    pipeline: &DetectionPipeline,
    snapshot: &FrameSnapshot,
    sink: &mut S,
) {
    let settings = shared.settings.snapshot();
    // Only this thread writes the counter.
    let cycle = shared.cycles.load(Ordering::Acquire) + 1;
    let span = info_span!("detection_cycle", cycle, sequence = snapshot.sequence);
    let _entered = span.enter();

    let output = match pipeline.run(snapshot, &settings) {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "frame rejected, cycle skipped");
            return;
        }
    };

    let logical = output.grid.remapped(&settings.axis_mapping);
    for (col, row, occupied) in logical.iter() {
        sink.set_tile_status(col, row, occupied);
    }
    sink.on_occupancy(cycle, &logical);
    if let Some(image) = output.diagnostic {
        sink.on_diagnostic(cycle, image);
    }

    shared.cycles.store(cycle, Ordering::Release);
    debug!(
        blobs = output.blobs.len(),
        occupied = logical.occupied_count(),
        vacant = logical.is_vacant(),
        "cycle complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FnSink;
    use std::sync::mpsc;
    use std::time::Duration;
    use stepgrid_types::{DepthFrame, OccupancyGrid};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn processes_each_published_frame() {
        let (tx, rx) = mpsc::channel();
        let sink = FnSink::new(move |cycle, grid: &OccupancyGrid| {
            let _ = tx.send((cycle, grid.is_vacant()));
        });
        let worker =
            DetectionWorker::spawn(DetectionPipeline::new(8, 8), DetectionSettings::default(), sink)
                .unwrap();

        worker.publish(FrameSnapshot::depth_only(1, DepthFrame::blank(8, 8)));
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), (1, true));
        worker.publish(FrameSnapshot::depth_only(2, DepthFrame::blank(8, 8)));
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), (2, true));

        worker.request_stop();
        assert_eq!(worker.join(), 2);
    }

    #[test]
    fn stop_before_any_frame_exits_idle_worker() {
        let sink = FnSink::new(|_, _: &OccupancyGrid| {});
        let worker =
            DetectionWorker::spawn(DetectionPipeline::new(4, 4), DetectionSettings::default(), sink)
                .unwrap();
        assert_eq!(worker.cycle_count(), 0);
        worker.request_stop();
        worker.request_stop();
        assert_eq!(worker.join(), 0);
    }

    #[test]
    fn drop_stops_the_thread() {
        let (tx, rx) = mpsc::channel::<()>();
        let sink = FnSink::new(move |_, _: &OccupancyGrid| {
            let _ = tx.send(());
        });
        let worker =
            DetectionWorker::spawn(DetectionPipeline::new(4, 4), DetectionSettings::default(), sink)
                .unwrap();
        drop(worker);
        // The sink (and its sender) is gone once the thread has exited.
        assert!(rx.recv_timeout(TIMEOUT).is_err());
    }

    #[test]
    fn worker_state_round_trips_through_u8() {
        for state in [WorkerState::Idle, WorkerState::Processing, WorkerState::Stopped] {
            assert_eq!(WorkerState::from_u8(state as u8), state);
        }
    }
}
