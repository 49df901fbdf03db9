//! Engine wiring and query surfaces
//!
//! [`TelemetryEngine`] owns the guarded aggregation store and location
//! tracker, wires them to the alert collaborators, and exposes the
//! surfaces the serving layer consumes: the current location, the
//! emergency trigger, recipient registration, and snapshot reads.
//!
//! Concurrency model: the ingestion loop is the sole writer into the
//! store and the tracker, the scheduler reads-then-resets the store, and
//! each structure sits behind its own mutex. Every guard is held only
//! long enough to copy state in or out.

use crate::alert::{self, AlertMessage, EmergencyDispatcher, InMemoryRecipientRegistry, RecipientRegistry};
use crate::error::{AlertError, EngineError};
use crate::ingest::IngestionLoop;
use crate::location::LocationTracker;
use crate::persist::PersistenceGateway;
use crate::scheduler::DailyFlushScheduler;
use crate::store::AggregationStore;
use crate::types::{Coordinates, DailySnapshot};
use log::info;
use std::io::BufRead;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// Acquire a guard, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of the emergency trigger surface.
///
/// A missing recipient is an answer for the caller, not an engine fault,
/// so it is a variant here rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub enum EmergencyOutcome {
    /// The alert was handed to the dispatcher
    Dispatched(AlertMessage),
    /// No recipient has ever been registered; the dispatcher was not invoked
    NoRecipient,
}

/// Single-device telemetry engine: guarded state plus collaborator wiring
pub struct TelemetryEngine {
    store: Arc<Mutex<AggregationStore>>,
    tracker: Arc<Mutex<LocationTracker>>,
    registry: Arc<Mutex<Box<dyn RecipientRegistry>>>,
    dispatcher: Arc<dyn EmergencyDispatcher>,
}

impl TelemetryEngine {
    /// Create an engine with the in-memory recipient registry
    pub fn new(dispatcher: impl EmergencyDispatcher + 'static) -> Self {
        Self::with_registry(InMemoryRecipientRegistry::new(), dispatcher)
    }

    /// Create an engine with a custom recipient registry collaborator
    pub fn with_registry(
        registry: impl RecipientRegistry + 'static,
        dispatcher: impl EmergencyDispatcher + 'static,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(AggregationStore::new())),
            tracker: Arc::new(Mutex::new(LocationTracker::new())),
            registry: Arc::new(Mutex::new(Box::new(registry))),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Register an alert recipient token (idempotent by token value)
    pub fn register_recipient(&self, token: &str) {
        lock(&self.registry).register(token);
        info!("alert recipient registered");
    }

    /// Latest known device position, or `None` before the first fix
    pub fn current_location(&self) -> Option<Coordinates> {
        lock(&self.tracker).get().map(Coordinates::from)
    }

    /// Raise an emergency alert toward the newest registered recipient.
    ///
    /// Proceeds with the "no location known" sentinel when no fix has
    /// arrived yet. Only dispatch transport failures surface as errors.
    /// The registry guard is released before the dispatcher runs, so a
    /// slow delivery never blocks recipient registration.
    pub fn trigger_emergency(&self) -> Result<EmergencyOutcome, AlertError> {
        let location = self.current_location();
        let token = lock(&self.registry).most_recent();
        match token {
            Some(token) => {
                let message = alert::dispatch_alert(&token, self.dispatcher.as_ref(), location)?;
                Ok(EmergencyOutcome::Dispatched(message))
            }
            None => Ok(EmergencyOutcome::NoRecipient),
        }
    }

    /// Point-in-time copy of the current-day aggregates for status queries
    pub fn snapshot(&self) -> DailySnapshot {
        lock(&self.store).snapshot()
    }

    /// Shared handle to the aggregation store (scheduler side)
    pub fn store(&self) -> Arc<Mutex<AggregationStore>> {
        Arc::clone(&self.store)
    }

    /// Start the ingestion loop on a dedicated thread.
    ///
    /// The returned handle yields the loop's exit cause: the loop runs
    /// until the transport closes or becomes unreadable, which it reports
    /// as [`EngineError::TransportFatal`]. The query and emergency
    /// surfaces stay servable after ingestion has stopped.
    pub fn spawn_ingestion<R>(&self, reader: R) -> JoinHandle<Result<(), EngineError>>
    where
        R: BufRead + Send + 'static,
    {
        let ingestion = IngestionLoop::new(
            Arc::clone(&self.store),
            Arc::clone(&self.tracker),
            Arc::clone(&self.registry),
            Arc::clone(&self.dispatcher),
        );
        std::thread::Builder::new()
            .name("vitalink-ingest".to_string())
            .spawn(move || ingestion.run(reader))
            .expect("failed to spawn ingestion thread")
    }

    /// Start the daily flush scheduler on a dedicated thread
    pub fn spawn_scheduler(
        &self,
        scheduler: DailyFlushScheduler,
        gateway: Box<dyn PersistenceGateway>,
    ) -> JoinHandle<()> {
        scheduler.spawn(Arc::clone(&self.store), gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<(String, AlertMessage)>>,
    }

    impl RecordingDispatcher {
        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl EmergencyDispatcher for Arc<RecordingDispatcher> {
        fn dispatch(&self, token: &str, message: &AlertMessage) -> Result<(), AlertError> {
            self.sent
                .lock()
                .unwrap()
                .push((token.to_string(), message.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_trigger_without_recipient_is_no_recipient() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = TelemetryEngine::new(Arc::clone(&dispatcher));

        let outcome = engine.trigger_emergency().unwrap();
        assert_eq!(outcome, EmergencyOutcome::NoRecipient);
        assert_eq!(dispatcher.sent_count(), 0);
    }

    #[test]
    fn test_trigger_uses_latest_location() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = TelemetryEngine::new(Arc::clone(&dispatcher));
        engine.register_recipient("guardian-phone");

        {
            let tracker = engine.tracker.clone();
            lock(&tracker).update(37.5, 127.0);
        }

        let outcome = engine.trigger_emergency().unwrap();
        match outcome {
            EmergencyOutcome::Dispatched(message) => {
                let loc = message.location.unwrap();
                assert_eq!(loc.latitude, 37.5);
                assert_eq!(loc.longitude, 127.0);
            }
            EmergencyOutcome::NoRecipient => panic!("expected dispatch"),
        }
        assert_eq!(dispatcher.sent_count(), 1);
    }

    #[test]
    fn test_trigger_before_first_fix_sends_sentinel() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = TelemetryEngine::new(Arc::clone(&dispatcher));
        engine.register_recipient("guardian-phone");

        let outcome = engine.trigger_emergency().unwrap();
        match outcome {
            EmergencyOutcome::Dispatched(message) => assert_eq!(message.location, None),
            EmergencyOutcome::NoRecipient => panic!("expected dispatch"),
        }
    }

    #[test]
    fn test_registration_not_blocked_by_slow_dispatch() {
        use std::sync::mpsc;

        // Dispatcher that signals entry and then parks until released,
        // holding the delivery open mid-flight
        struct GatedDispatcher {
            entered: Mutex<mpsc::Sender<()>>,
            release: Mutex<mpsc::Receiver<()>>,
        }

        impl EmergencyDispatcher for GatedDispatcher {
            fn dispatch(&self, _token: &str, _message: &AlertMessage) -> Result<(), AlertError> {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
                Ok(())
            }
        }

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let engine = Arc::new(TelemetryEngine::new(GatedDispatcher {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }));
        engine.register_recipient("guardian-phone");

        let trigger = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || engine.trigger_emergency())
        };

        // With the delivery held open, registration must still complete;
        // it would deadlock here if the registry guard were held across
        // the dispatcher call
        entered_rx.recv().unwrap();
        engine.register_recipient("second-phone");

        release_tx.send(()).unwrap();
        let outcome = trigger.join().unwrap().unwrap();
        assert!(matches!(outcome, EmergencyOutcome::Dispatched(_)));
    }

    #[test]
    fn test_current_location_surface() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let engine = TelemetryEngine::new(Arc::clone(&dispatcher));

        assert_eq!(engine.current_location(), None);

        lock(&engine.tracker).update(35.1, 129.0);
        let loc = engine.current_location().unwrap();
        assert_eq!(loc.latitude, 35.1);
        assert_eq!(loc.longitude, 129.0);
    }
}
