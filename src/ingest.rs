//! Transport ingestion loop
//!
//! Owns the transport read cycle for the lifetime of the process: block on
//! one line, decode it, dispatch each resulting event to its owning
//! component, and move on. Per-frame and per-key defects are logged and
//! fully contained; only transport closure escapes the loop.

use crate::alert::{self, EmergencyDispatcher, RecipientRegistry};
use crate::engine::lock;
use crate::error::EngineError;
use crate::frame;
use crate::location::LocationTracker;
use crate::store::AggregationStore;
use crate::types::{Coordinates, Event, MetricKind};
use log::{debug, error, warn};
use std::io::BufRead;
use std::sync::{Arc, Mutex};

/// Blocking read/decode/dispatch cycle over the device transport.
///
/// The loop is the sole writer into the aggregation store and the location
/// tracker; the blocking read is its only suspension point and is expected
/// to block indefinitely between frames.
pub struct IngestionLoop {
    store: Arc<Mutex<AggregationStore>>,
    tracker: Arc<Mutex<LocationTracker>>,
    registry: Arc<Mutex<Box<dyn RecipientRegistry>>>,
    dispatcher: Arc<dyn EmergencyDispatcher>,
}

impl IngestionLoop {
    pub fn new(
        store: Arc<Mutex<AggregationStore>>,
        tracker: Arc<Mutex<LocationTracker>>,
        registry: Arc<Mutex<Box<dyn RecipientRegistry>>>,
        dispatcher: Arc<dyn EmergencyDispatcher>,
    ) -> Self {
        Self {
            store,
            tracker,
            registry,
            dispatcher,
        }
    }

    /// Run until the transport closes or becomes unreadable.
    ///
    /// Returns [`EngineError::TransportFatal`] in either case; the caller
    /// supervises. The loop never exits on a per-frame error.
    pub fn run<R: BufRead>(self, mut reader: R) -> Result<(), EngineError> {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    return Err(EngineError::TransportFatal(
                        "transport closed (end of stream)".to_string(),
                    ))
                }
                Ok(_) => self.handle_line(&line),
                Err(e) => return Err(EngineError::TransportFatal(e.to_string())),
            }
        }
    }

    fn handle_line(&self, raw_line: &str) {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            return;
        }

        let parsed = match frame::parse(trimmed) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("dropping frame: {}", e);
                return;
            }
        };

        for warning in &parsed.warnings {
            warn!("{}", warning);
        }

        for event in parsed.events {
            self.dispatch(event);
        }
    }

    fn dispatch(&self, event: Event) {
        match event {
            Event::Weight(kg) => self.update_metric(MetricKind::Weight, kg),
            Event::Distance(meters) => self.update_metric(MetricKind::Distance, meters),
            Event::Heartbeat(bpm) => self.update_metric(MetricKind::Heartbeat, bpm as f64),
            Event::Oxygen(percent) => self.update_metric(MetricKind::Oxygen, percent),
            Event::Temperature(celsius) => self.update_metric(MetricKind::Temperature, celsius),
            Event::WorkoutTime(wt) => {
                self.update_metric(MetricKind::WorkoutTime, wt.total_minutes())
            }
            Event::Location {
                latitude,
                longitude,
            } => {
                lock(&self.tracker).update(latitude, longitude);
                debug!("location updated: ({}, {})", latitude, longitude);
            }
            Event::Emergency => self.raise_emergency(),
        }
    }

    fn update_metric(&self, kind: MetricKind, value: f64) {
        lock(&self.store).update(kind, value);
        debug!("{} sample accepted: {}", kind.as_str(), value);
    }

    /// Alert delivery failures are the collaborator's concern; nothing on
    /// this path is allowed to take the loop down. The registry guard is
    /// released before the dispatcher runs, so a slow delivery never
    /// blocks recipient registration.
    fn raise_emergency(&self) {
        let location = lock(&self.tracker).get().map(Coordinates::from);
        let token = match lock(&self.registry).most_recent() {
            Some(token) => token,
            None => {
                warn!("emergency received but no alert recipient is registered");
                return;
            }
        };
        match alert::dispatch_alert(&token, self.dispatcher.as_ref(), location) {
            Ok(message) => debug!("emergency alert {} dispatched", message.id),
            Err(e) => error!("emergency alert dispatch failed: {}", e),
        }
    }
}
