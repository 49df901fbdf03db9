//! Vitalink - Telemetry ingestion and daily aggregation engine for
//! wearable health devices
//!
//! Vitalink reads line-delimited JSON frames from a single wearable
//! device, keeps running daily aggregates per metric, tracks the latest
//! GPS position, and raises emergency alerts through a registered
//! recipient: transport → ingestion → events → {aggregation | location |
//! alert}, with a once-per-day flush to a persistence collaborator.
//!
//! ## Modules
//!
//! - **frame**: decode one raw line into typed events
//! - **store**: per-metric running daily aggregates (average or sum)
//! - **location**: single most-recent position fix
//! - **alert**: emergency dispatch toward the newest recipient
//! - **scheduler**: once-per-day snapshot/persist/reset
//! - **ingest**: the blocking transport read loop
//! - **engine**: wiring plus the location/emergency query surfaces

pub mod alert;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod location;
pub mod persist;
pub mod scheduler;
pub mod store;
pub mod types;

pub use alert::{AlertMessage, EmergencyDispatcher, InMemoryRecipientRegistry, RecipientRegistry};
pub use engine::{EmergencyOutcome, TelemetryEngine};
pub use error::{AlertError, EngineError, FrameWarning, ParseError, PersistError};
pub use frame::{parse, ParsedFrame};
pub use location::LocationTracker;
pub use persist::{InMemoryGateway, PersistenceGateway};
pub use scheduler::DailyFlushScheduler;
pub use store::AggregationStore;
pub use types::{Coordinates, DailySnapshot, Event, MetricKind, WorkoutTime};

/// Vitalink version stamped into alert payloads and CLI output
pub const VITALINK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for logs and CLI output
pub const PRODUCER_NAME: &str = "vitalink";
