//! [`FrameExchange`] – handoff of sensor frames from producer to worker.
//!
//! The producer publishes each frame as an immutable `Arc<FrameSnapshot>`:
//! the slot only ever holds a pointer, so publishing is a pointer swap and
//! the worker can keep reading the snapshot it took while the next one is
//! being written.
//!
//! The slot, a ready flag and a stop flag live together behind one mutex and
//! condition variable, so publishing a frame and consuming it are each a
//! single step.  The worker blocks in [`FrameExchange::wait`] until one of
//! the flags is raised; there is no polling loop.
//!
//! | Flag | Raised by | Cleared by |
//! |---|---|---|
//! | frame ready | [`publish`](FrameExchange::publish), [`signal_frame_ready`](FrameExchange::signal_frame_ready) | [`wait`](FrameExchange::wait), when it hands out a frame |
//! | stop | [`request_stop`](FrameExchange::request_stop) | never |

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use stepgrid_types::FrameSnapshot;
use tracing::warn;

/// Why [`FrameExchange::wait`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wake {
    /// A new frame is ready; its ready flag has already been cleared.
    Frame(Arc<FrameSnapshot>),
    /// Stop was requested.
    Stop,
}

#[derive(Debug, Default)]
struct State {
    latest: Option<Arc<FrameSnapshot>>,
    frame_ready: bool,
    stop: bool,
}

/// Single-slot, latest-wins frame mailbox with a blocking wait.
#[derive(Debug, Default)]
pub struct FrameExchange {
    state: Mutex<State>,
    wake: Condvar,
}

impl FrameExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in `snapshot` as the latest frame and raise the ready flag.
    ///
    /// A frame that was published but not yet consumed is replaced; the
    /// worker always processes the most recent one.
    pub fn publish(&self, snapshot: FrameSnapshot) {
        let snapshot = Arc::new(snapshot);
        let mut state = self.lock();
        state.latest = Some(snapshot);
        state.frame_ready = true;
        drop(state);
        self.wake.notify_all();
    }

    /// Raise the ready flag without replacing the slot.
    ///
    /// The next [`wait`](Self::wait) hands out whatever the slot holds.
    pub fn signal_frame_ready(&self) {
        self.lock().frame_ready = true;
        self.wake.notify_all();
    }

    /// True while a signaled frame has not been consumed yet.
    pub fn poll(&self) -> bool {
        self.lock().frame_ready
    }

    /// Ask the worker to stop.  Idempotent.
    pub fn request_stop(&self) {
        self.lock().stop = true;
        self.wake.notify_all();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.lock().stop
    }

    /// The most recently published snapshot, if any.
    pub fn latest(&self) -> Option<Arc<FrameSnapshot>> {
        self.lock().latest.clone()
    }

    /// Block until a frame is ready or stop is requested.
    ///
    /// Stop wins over a pending frame.  A ready signal with an empty slot is
    /// logged and consumed, and the wait continues.
    pub fn wait(&self) -> Wake {
        let mut state = self.lock();
        loop {
            while !state.stop && !state.frame_ready {
                state = self
                    .wake
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if state.stop {
                return Wake::Stop;
            }
            state.frame_ready = false;
            match state.latest.clone() {
                Some(snapshot) => return Wake::Frame(snapshot),
                None => warn!("frame ready signaled with no frame published"),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
