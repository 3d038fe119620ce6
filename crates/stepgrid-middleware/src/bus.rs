//! Typed publish/subscribe fan-out for detection results.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the detection worker.
//!
//! # Lanes
//!
//! | Lane | Message | Typical consumer |
//! |---|---|---|
//! | [`Lane::Occupancy`] | [`OccupancyUpdate`] | tile controller, logging, dashboards |
//! | [`Lane::Diagnostics`] | [`DiagnosticFrame`] | operator preview window |
//!
//! Publishing never blocks.  A slow subscriber that falls more than the
//! channel capacity behind sees [`broadcast::error::RecvError::Lagged`] and
//! skips ahead.

use std::sync::Arc;

use stepgrid_types::{DiagnosticImage, OccupancyGrid, StepGridError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered messages before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// The two result lanes of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// One message per completed detection cycle.
    Occupancy,
    /// At most one message per cycle, only when a diagnostic mode is active.
    Diagnostics,
}

/// The logical occupancy grid of one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyUpdate {
    /// Cycle counter value after the cycle completed.
    pub cycle: u64,
    /// Grid in logical tile coordinates.
    pub grid: OccupancyGrid,
}

/// A rendered diagnostic image of one cycle.
///
/// The pixel buffer is shared between subscribers and must not be mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticFrame {
    pub cycle: u64,
    pub image: Arc<DiagnosticImage>,
}

/// Shared detection bus.  Clone it cheaply – all clones share the same
/// underlying broadcast channels.
#[derive(Clone, Debug)]
pub struct DetectionBus {
    occupancy: broadcast::Sender<OccupancyUpdate>,
    diagnostics: broadcast::Sender<DiagnosticFrame>,
}

impl DetectionBus {
    /// Create a new bus.  `capacity` applies to each lane independently and is
    /// raised to at least one.
    pub fn new(capacity: usize) -> Self {
        let (occupancy, _) = broadcast::channel(capacity.max(1));
        let (diagnostics, _) = broadcast::channel(capacity.max(1));
        Self {
            occupancy,
            diagnostics,
        }
    }

    /// Publish an occupancy update.
    ///
    /// Returns the number of subscribers that were handed the update.
    ///
    /// # Errors
    ///
    /// Returns [`StepGridError::Channel`] when nobody is subscribed to the
    /// lane.  Callers that do not care may ignore it.
    pub fn publish_occupancy(&self, update: OccupancyUpdate) -> Result<usize, StepGridError> {
        self.occupancy
            .send(update)
            .map_err(|_| no_subscribers(Lane::Occupancy))
    }

    /// Publish a diagnostic frame.
    ///
    /// # Errors
    ///
    /// Returns [`StepGridError::Channel`] when nobody is subscribed to the lane.
    pub fn publish_diagnostic(&self, frame: DiagnosticFrame) -> Result<usize, StepGridError> {
        self.diagnostics
            .send(frame)
            .map_err(|_| no_subscribers(Lane::Diagnostics))
    }

    /// Subscribe to occupancy updates published from now on.
    pub fn subscribe_occupancy(&self) -> LaneReceiver<OccupancyUpdate> {
        LaneReceiver {
            lane: Lane::Occupancy,
            receiver: self.occupancy.subscribe(),
        }
    }

    /// Subscribe to diagnostic frames published from now on.
    pub fn subscribe_diagnostics(&self) -> LaneReceiver<DiagnosticFrame> {
        LaneReceiver {
            lane: Lane::Diagnostics,
            receiver: self.diagnostics.subscribe(),
        }
    }

    /// Number of live subscribers on `lane`.
    pub fn subscriber_count(&self, lane: Lane) -> usize {
        match lane {
            Lane::Occupancy => self.occupancy.receiver_count(),
            Lane::Diagnostics => self.diagnostics.receiver_count(),
        }
    }
}

impl Default for DetectionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn no_subscribers(lane: Lane) -> StepGridError {
    StepGridError::Channel(format!("No subscribers for lane {lane:?}"))
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to one [`Lane`].
pub struct LaneReceiver<T> {
    lane: Lane,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> LaneReceiver<T> {
    /// Wait for the next message on this lane.
    ///
    /// Returns:
    /// * `Ok(message)` – a successfully received message.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – every bus handle is gone.
    pub async fn recv(&mut self) -> Result<T, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Wait for the next message, skipping over lag.
    ///
    /// Returns `None` once the bus is closed.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lane = ?self.lane, lagged_by = n, "LaneReceiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive for callers outside an async runtime.
    pub fn try_recv(&mut self) -> Result<T, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Lane`] this receiver is bound to.
    pub fn lane(&self) -> Lane {
        self.lane
    }
}
