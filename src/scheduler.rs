//! Daily flush scheduler
//!
//! Fires once per calendar day at a configured local time-of-day (default
//! one minute before midnight): snapshot the aggregation store, hand the
//! snapshot to the persistence gateway, and reset the store only on
//! success. The next fire instant is computed explicitly and slept to,
//! so "one fire per day" is an invariant rather than a polling artifact.
//!
//! If the process was not running at the scheduled instant, that day's
//! fire is skipped entirely; there is no backfill, and accumulation simply
//! continues into the next day's window.

use crate::engine::lock;
use crate::error::PersistError;
use crate::persist::PersistenceGateway;
use crate::store::AggregationStore;
use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Default fire instant: one minute before midnight, local clock
pub fn default_flush_at() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).expect("valid time")
}

/// What a single fire accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// A snapshot was persisted and the store reset
    Persisted,
    /// No metric received a sample that day; nothing handed off
    NothingToFlush,
}

/// Once-per-day snapshot/persist/reset driver
#[derive(Debug, Clone, Copy)]
pub struct DailyFlushScheduler {
    fire_at: NaiveTime,
}

impl Default for DailyFlushScheduler {
    fn default() -> Self {
        Self::new(default_flush_at())
    }
}

impl DailyFlushScheduler {
    pub fn new(fire_at: NaiveTime) -> Self {
        Self { fire_at }
    }

    /// The next fire instant strictly after `now`: today's configured
    /// time-of-day if still ahead, otherwise tomorrow's.
    pub fn next_fire_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        let mut date = now.date_naive();
        loop {
            // DST gaps can make a local time nonexistent; skip to the next day
            if let Some(candidate) = Local
                .from_local_datetime(&date.and_time(self.fire_at))
                .earliest()
            {
                if candidate > now {
                    return candidate;
                }
            }
            date = date.succ_opt().expect("calendar overflow");
        }
    }

    /// Run the sleep/fire loop on a dedicated thread
    pub fn spawn(
        self,
        store: Arc<Mutex<AggregationStore>>,
        mut gateway: Box<dyn PersistenceGateway>,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("vitalink-flush".to_string())
            .spawn(move || loop {
                let now = Local::now();
                let fire_at = self.next_fire_after(now);
                let wait = (fire_at - now).max(Duration::zero());
                debug!("next daily flush at {}", fire_at);
                thread::sleep(wait.to_std().unwrap_or_default());

                match flush_once(&store, gateway.as_mut()) {
                    Ok(FlushOutcome::Persisted) => {}
                    Ok(FlushOutcome::NothingToFlush) => {
                        debug!("no samples accumulated today, flush skipped");
                    }
                    Err(e) => {
                        // Store intentionally not reset: the next fire retries
                        // with whatever has accumulated, which may over-count.
                        error!("daily flush failed, keeping accumulated state: {}", e);
                    }
                }
            })
            .expect("failed to spawn scheduler thread")
    }
}

/// Perform one snapshot/persist/reset cycle.
///
/// The guard is held only long enough to copy state out (and later to
/// reset); the potentially slow gateway handoff runs with no guard held,
/// so the ingestion path never blocks on persistence I/O.
pub fn flush_once(
    store: &Mutex<AggregationStore>,
    gateway: &mut dyn PersistenceGateway,
) -> Result<FlushOutcome, PersistError> {
    let snapshot = lock(store).snapshot();

    if snapshot.is_empty() {
        return Ok(FlushOutcome::NothingToFlush);
    }

    match gateway.save_daily_record(&snapshot) {
        Ok(()) => {
            lock(store).reset();
            info!("persisted daily record for {}", snapshot.date);
            Ok(FlushOutcome::Persisted)
        }
        Err(e) => {
            if let PersistError::DuplicateDate(date) = &e {
                warn!("daily record for {} already exists, snapshot discarded", date);
            }
            Err(e)
        }
    }
}
