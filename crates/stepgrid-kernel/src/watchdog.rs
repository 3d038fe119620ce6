//! [`Watchdog`] – liveness monitor driven by progress counters.
//!
//! Long-running components (the detection worker, the sensor producer)
//! expose a monotonic counter.  A supervisor feeds the latest counter value
//! to [`Watchdog::observe`]; the watchdog only treats it as a heartbeat when
//! the counter has moved since the last observation.  A component whose
//! counter stays put for longer than its deadline is reported as stalled.
//!
//! Components without a counter can still call [`Watchdog::heartbeat`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::warn;

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Health state reported for a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// The component made progress within its deadline.
    Healthy,
    /// The component has not made progress within its deadline.
    Stalled,
}

// ────────────────────────────────────────────────────────────────────────────
// Internal entry
// ────────────────────────────────────────────────────────────────────────────

struct ComponentEntry {
    last_progress: Instant,
    counter: u64,
    timeout: Duration,
}

impl ComponentEntry {
    fn is_stalled(&self) -> bool {
        self.last_progress.elapsed() > self.timeout
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Watchdog
// ────────────────────────────────────────────────────────────────────────────

/// Tracks progress of registered components and detects stalled ones.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use stepgrid_kernel::watchdog::{ComponentHealth, Watchdog};
///
/// let mut wd = Watchdog::new();
/// wd.register("detection_worker", Duration::from_secs(1));
/// assert!(wd.observe("detection_worker", 1));
///
/// assert_eq!(wd.health("detection_worker"), ComponentHealth::Healthy);
/// ```
#[derive(Default)]
pub struct Watchdog {
    components: HashMap<String, ComponentEntry>,
}

impl Watchdog {
    /// Create an empty watchdog with no registered components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component_id` with a maximum stall `timeout`.
    ///
    /// The component starts healthy with a counter of zero.  Re-registering
    /// an existing component resets both.
    pub fn register(&mut self, component_id: &str, timeout: Duration) {
        self.components.insert(
            component_id.to_string(),
            ComponentEntry {
                last_progress: Instant::now(),
                counter: 0,
                timeout,
            },
        );
    }

    /// Record an unconditional heartbeat for `component_id`.
    ///
    /// No-ops for components that have not been registered.
    pub fn heartbeat(&mut self, component_id: &str) {
        if let Some(entry) = self.components.get_mut(component_id) {
            entry.last_progress = Instant::now();
        }
    }

    /// Feed the latest progress `counter` of `component_id`.
    ///
    /// Returns `true` when the counter advanced, which resets the deadline.
    /// Unknown components and unchanged counters return `false`.
    pub fn observe(&mut self, component_id: &str, counter: u64) -> bool {
        let Some(entry) = self.components.get_mut(component_id) else {
            return false;
        };
        if counter > entry.counter {
            entry.counter = counter;
            entry.last_progress = Instant::now();
            true
        } else {
            false
        }
    }

    /// Return the [`ComponentHealth`] of `component_id`.
    ///
    /// Returns [`ComponentHealth::Stalled`] for unknown components.
    pub fn health(&self, component_id: &str) -> ComponentHealth {
        match self.components.get(component_id) {
            Some(entry) if !entry.is_stalled() => ComponentHealth::Healthy,
            _ => ComponentHealth::Stalled,
        }
    }

    /// Time since `component_id` last made progress.
    pub fn idle_for(&self, component_id: &str) -> Option<Duration> {
        self.components
            .get(component_id)
            .map(|entry| entry.last_progress.elapsed())
    }

    /// Return the IDs of all stalled components, sorted, logging each one.
    pub fn check_all(&self) -> Vec<String> {
        let mut stalled: Vec<String> = self
            .components
            .iter()
            .filter(|(_, entry)| entry.is_stalled())
            .map(|(id, entry)| {
                warn!(
                    component = %id,
                    counter = entry.counter,
                    idle_ms = entry.last_progress.elapsed().as_millis() as u64,
                    "component stalled"
                );
                id.clone()
            })
            .collect();
        stalled.sort();
        stalled
    }
}
