//! `stepgrid-runtime` – the detection loop.
//!
//! Runs the perception pipeline on a dedicated thread, one cycle per sensor
//! frame, and hands the results to whoever is listening.
//!
//! # Modules
//!
//! - [`worker`] – [`DetectionWorker`]: the Idle → Processing → Idle state
//!   machine with a terminal Stopped state, and its monotonic cycle counter.
//! - [`exchange`] – [`FrameExchange`]: latest-wins frame slot plus the
//!   frame-ready and stop signals the worker blocks on.
//! - [`settings`] – [`SettingsCell`]: wholesale swap of
//!   [`DetectionSettings`][stepgrid_types::DetectionSettings], read once per cycle.
//! - [`sink`] – [`DetectionSink`] and its adapters ([`FnSink`], [`BusSink`],
//!   [`Tee`]).
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to export the
//!   `detection_cycle` spans to any OTLP-compatible collector.
//!
//! # Threading
//!
//! The worker is a plain OS thread.  It never holds a lock while running the
//! pipeline: frames arrive as `Arc` snapshots and settings as `Arc` values,
//! each taken once at the top of a cycle.

pub mod exchange;
pub mod settings;
pub mod sink;
pub mod telemetry;
pub mod worker;

pub use exchange::{FrameExchange, Wake};
pub use settings::SettingsCell;
pub use sink::{BusSink, DetectionSink, FnSink, Tee};
pub use telemetry::{init_tracing, LogFormat, TracerProviderGuard};
pub use worker::{DetectionWorker, WorkerState};
